//! `AsyncListenerMux`: N independently buffered listeners behind one front end.
//!
//! ```text
//! producer ─▶ AsyncListenerMux ─┬─▶ AsyncListener ─▶ queue ─▶ worker ─▶ listener #0
//!                               ├─▶ AsyncListener ─▶ queue ─▶ worker ─▶ listener #1
//!                               └─▶ ...
//!             commit: fan out, then await one result per member, in registration order
//! ```
//!
//! A full member queue blocks the producer; that is the pipeline's backpressure.
//!
//! Commits reach every member, including members without a commit callback,
//! so a failed callback of any member is reported at the next commit.
//! After a commit error the members that failed have stopped; the mux should
//! not be fed further blocks.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::async_listener::{AsyncListener, AsyncListenerOptions, CommitResult};
use crate::error::ListenerError;
use crate::listener::{Capabilities, Listener};
use crate::mux::ListenerMux;
use crate::packet::{
    CommitData, EventData, KvPairData, ModuleInitializationData, ObjectUpdateData, Packet,
    StartBlockData, TxData,
};
use crate::shutdown::ShutdownSignal;

/// Commit results of one member, tagged with its registration index.
struct MemberResults {
    index: usize,
    rx: mpsc::Receiver<CommitResult>,
}

/// Fans the stream out to several listeners, each on its own worker, and
/// synchronizes them at every commit.
pub struct AsyncListenerMux {
    mux: ListenerMux,
    /// One result channel per member, in registration order.
    results: Vec<MemberResults>,
}

impl AsyncListenerMux {
    /// Wraps each listener in an [`AsyncListener`]. Must be called within a
    /// Tokio runtime.
    pub fn new(
        listeners: Vec<Box<dyn Listener>>,
        options: AsyncListenerOptions,
        shutdown: ShutdownSignal,
    ) -> Self {
        let mut members: Vec<Box<dyn Listener>> = Vec::with_capacity(listeners.len());
        let mut results = Vec::new();

        for (index, listener) in listeners.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(1);
            results.push(MemberResults { index, rx });
            members.push(Box::new(AsyncListener::new(
                listener,
                options.buffer_size,
                tx,
                shutdown.clone(),
            )));
        }

        debug!(
            members = members.len(),
            buffer_size = options.buffer_size,
            "async listener mux started"
        );

        Self {
            mux: ListenerMux::new(members),
            results,
        }
    }

    /// Enqueues the commit on every member in registration order. Returns
    /// how many members accepted it, and the error that stopped the fan-out.
    async fn fan_out_commit(&mut self, data: CommitData) -> (usize, Result<(), ListenerError>) {
        let mut sent = 0;
        for listener in self.mux.listeners_mut() {
            if let Err(e) = listener.send_packet(data.into()).await {
                return (sent, Err(e));
            }
            sent += 1;
        }
        (sent, Ok(()))
    }

    /// Awaits one commit result from each of the first `members` members, in
    /// registration order.
    ///
    /// Every one of them is read, even after a failure, so no stale result is
    /// left behind for the next commit. The first error in registration order
    /// wins.
    async fn collect_commit_results(&mut self, members: usize) -> Result<(), ListenerError> {
        let mut first_err = None;

        for member in self.results.iter_mut().take(members) {
            let result = member
                .rx
                .recv()
                .await
                .unwrap_or(Err(ListenerError::WorkerStopped));

            if let Err(e) = result {
                warn!(member = member.index, error = %e, "listener failed at commit");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Listener for AsyncListenerMux {
    fn capabilities(&self) -> Capabilities {
        self.mux.capabilities()
    }

    async fn initialize_module_data(
        &mut self,
        data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        self.mux.initialize_module_data(data).await
    }

    async fn start_block(&mut self, data: StartBlockData) -> Result<(), ListenerError> {
        self.mux.start_block(data).await
    }

    async fn on_tx(&mut self, data: TxData) -> Result<(), ListenerError> {
        self.mux.on_tx(data).await
    }

    async fn on_event(&mut self, data: EventData) -> Result<(), ListenerError> {
        self.mux.on_event(data).await
    }

    async fn on_kv_pair(&mut self, data: KvPairData) -> Result<(), ListenerError> {
        self.mux.on_kv_pair(data).await
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        self.mux.on_object_update(data).await
    }

    async fn commit(&mut self, data: CommitData) -> Result<(), ListenerError> {
        let (sent, fanned_out) = self.fan_out_commit(data).await;
        if let Err(e) = &fanned_out {
            warn!(accepted = sent, error = %e, "commit fan-out failed; draining accepted members");
        }
        let collected = self.collect_commit_results(sent).await;
        fanned_out.and(collected)
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), ListenerError> {
        match packet {
            Packet::Commit(data) => self.commit(data).await,
            other => self.mux.send_packet(other).await,
        }
    }
}
