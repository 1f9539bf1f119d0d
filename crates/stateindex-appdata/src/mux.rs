//! Synchronous fan-out of packets to several listeners.

use async_trait::async_trait;

use crate::error::ListenerError;
use crate::listener::{Capabilities, Listener};
use crate::packet::{
    CommitData, EventData, KvPairData, ModuleInitializationData, ObjectUpdateData, Packet,
    StartBlockData, TxData,
};

/// Forwards every packet to each member that handles its kind, in
/// registration order. The first member error aborts the dispatch.
///
/// The mux's capabilities are the union of its members'.
pub struct ListenerMux {
    listeners: Vec<Box<dyn Listener>>,
    capabilities: Capabilities,
}

impl ListenerMux {
    pub fn new(listeners: Vec<Box<dyn Listener>>) -> Self {
        let capabilities = listeners
            .iter()
            .fold(Capabilities::NONE, |acc, l| acc | l.capabilities());
        Self {
            listeners,
            capabilities,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Members in registration order.
    pub(crate) fn listeners_mut(&mut self) -> &mut [Box<dyn Listener>] {
        &mut self.listeners
    }

    async fn dispatch(&mut self, packet: Packet) -> Result<(), ListenerError> {
        let kind = packet.kind();
        for listener in self
            .listeners
            .iter_mut()
            .filter(|l| l.capabilities().contains(kind))
        {
            listener.send_packet(packet.clone()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Listener for ListenerMux {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn initialize_module_data(
        &mut self,
        data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn start_block(&mut self, data: StartBlockData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn on_tx(&mut self, data: TxData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn on_event(&mut self, data: EventData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn on_kv_pair(&mut self, data: KvPairData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn commit(&mut self, data: CommitData) -> Result<(), ListenerError> {
        self.dispatch(data.into()).await
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), ListenerError> {
        self.dispatch(packet).await
    }
}
