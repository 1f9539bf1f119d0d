//! Listeners for tests and debugging.

use async_trait::async_trait;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::error::ListenerError;
use crate::listener::{Capabilities, Listener};
use crate::packet::{
    CommitData, ModuleInitializationData, ObjectUpdateData, PacketKind, StartBlockData,
};

/// Writes a line per packet to `W`, with the payload rendered as JSON:
///
/// ```text
/// InitializeModuleData: {"module_name":"bank","schema":{...}}
/// StartBlock: {"height":1}
/// OnObjectUpdate: {"module_name":"bank","updates":[...]}
/// Commit
/// ```
pub struct WriterListener<W> {
    out: W,
}

impl<W: Write + Send> WriterListener<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_json<T: Serialize>(&mut self, label: &str, data: &T) -> Result<(), ListenerError> {
        let json = serde_json::to_string(data).map_err(ListenerError::callback)?;
        writeln!(self.out, "{label}: {json}").map_err(ListenerError::callback)
    }
}

#[async_trait]
impl<W: Write + Send> Listener for WriterListener<W> {
    fn capabilities(&self) -> Capabilities {
        [
            PacketKind::ModuleInitialization,
            PacketKind::StartBlock,
            PacketKind::ObjectUpdate,
            PacketKind::Commit,
        ]
        .into_iter()
        .collect()
    }

    async fn initialize_module_data(
        &mut self,
        data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        self.write_json("InitializeModuleData", &data)
    }

    async fn start_block(&mut self, data: StartBlockData) -> Result<(), ListenerError> {
        self.write_json("StartBlock", &data)
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        self.write_json("OnObjectUpdate", &data)
    }

    async fn commit(&mut self, _data: CommitData) -> Result<(), ListenerError> {
        writeln!(self.out, "Commit").map_err(ListenerError::callback)?;
        self.out.flush().map_err(ListenerError::callback)
    }
}

/// An in-memory sink that can be handed to a worker and read back afterwards.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
