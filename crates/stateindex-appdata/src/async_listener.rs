//! `AsyncListener`: runs a listener on its own worker behind a bounded queue.
//!
//! # Worker state machine
//!
//! ```text
//!            callback error
//!   Normal ─────────────────▶ Tainted
//!     │  commit: call listener,     │  other packets: dropped
//!     │  send result, stop on error │  commit: send stored error, stop
//!     ▼                             ▼
//! ```
//!
//! A failing callback does not stop the worker right away: it keeps draining
//! its queue up to the next commit, where the stored error is reported once.
//! The wrapped listener never sees a commit after it has failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ListenerError;
use crate::listener::{Capabilities, Listener};
use crate::packet::{
    CommitData, EventData, KvPairData, ModuleInitializationData, ObjectUpdateData, Packet,
    PacketKind, StartBlockData, TxData,
};
use crate::shutdown::ShutdownSignal;

/// Result of one listener's commit, as reported by its worker.
pub type CommitResult = Result<(), ListenerError>;

// ─── Options ──────────────────────────────────────────────────────────────────

/// Options for async listener workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncListenerOptions {
    /// Capacity of each worker's packet queue. A full queue blocks the producer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    100
}

impl Default for AsyncListenerOptions {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

impl AsyncListenerOptions {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

// ─── AsyncListener ────────────────────────────────────────────────────────────

/// Front end of a listener running on a background worker.
///
/// Exposes the same capabilities as the wrapped listener. Each callback only
/// enqueues its packet and returns; commit results are delivered on the
/// channel passed to [`AsyncListener::new`].
///
/// Commit packets are enqueued whatever the wrapped listener handles, so each
/// commit yields exactly one result and a failed callback always surfaces.
/// The wrapped listener's own commit callback only runs if it declares it.
pub struct AsyncListener {
    capabilities: Capabilities,
    packets: mpsc::Sender<Packet>,
    shutdown: ShutdownSignal,
}

impl AsyncListener {
    /// Spawns the worker for `listener` on the current Tokio runtime.
    ///
    /// `buffer_size` is clamped to at least 1.
    pub fn new<L>(
        listener: L,
        buffer_size: usize,
        commit_results: mpsc::Sender<CommitResult>,
        shutdown: ShutdownSignal,
    ) -> Self
    where
        L: Listener + 'static,
    {
        let capabilities = listener.capabilities();
        let (packets, queue) = mpsc::channel(buffer_size.max(1));

        debug!(?capabilities, buffer_size, "spawning async listener worker");
        tokio::spawn(run_worker(listener, queue, commit_results, shutdown.clone()));

        Self {
            capabilities,
            packets,
            shutdown,
        }
    }

    /// Returns `true` once the worker has exited.
    pub fn is_closed(&self) -> bool {
        self.packets.is_closed()
    }

    async fn enqueue(&mut self, packet: Packet) -> Result<(), ListenerError> {
        if !packet.is_commit() && !self.capabilities.contains(packet.kind()) {
            return Ok(());
        }
        if self.shutdown.is_shutdown() {
            return Err(ListenerError::Shutdown);
        }

        tokio::select! {
            biased;
            _ = self.shutdown.recv() => Err(ListenerError::Shutdown),
            sent = self.packets.send(packet) => sent.map_err(|_| ListenerError::WorkerStopped),
        }
    }
}

#[async_trait]
impl Listener for AsyncListener {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn initialize_module_data(
        &mut self,
        data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn start_block(&mut self, data: StartBlockData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn on_tx(&mut self, data: TxData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn on_event(&mut self, data: EventData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn on_kv_pair(&mut self, data: KvPairData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn commit(&mut self, data: CommitData) -> Result<(), ListenerError> {
        self.enqueue(data.into()).await
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), ListenerError> {
        self.enqueue(packet).await
    }
}

// ─── Worker ───────────────────────────────────────────────────────────────────

enum WorkerState {
    Normal,
    /// A callback failed; holds the error until the next commit.
    Tainted(ListenerError),
}

async fn run_worker<L: Listener>(
    mut listener: L,
    mut queue: mpsc::Receiver<Packet>,
    commit_results: mpsc::Sender<CommitResult>,
    mut shutdown: ShutdownSignal,
) {
    let mut state = WorkerState::Normal;
    let handles_commit = listener.capabilities().contains(PacketKind::Commit);

    loop {
        let packet = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("shutdown signalled; async listener worker exiting");
                return;
            }
            packet = queue.recv() => match packet {
                Some(packet) => packet,
                None => {
                    debug!("packet queue closed; async listener worker exiting");
                    return;
                }
            },
        };

        state = match state {
            WorkerState::Normal if packet.is_commit() => {
                let result = if handles_commit {
                    listener.send_packet(packet).await
                } else {
                    Ok(())
                };
                let failed = result.is_err();
                if let Err(e) = &result {
                    warn!(error = %e, "listener commit failed; async listener worker exiting");
                }
                if !report(&commit_results, &mut shutdown, result).await || failed {
                    return;
                }
                WorkerState::Normal
            }
            WorkerState::Normal => {
                let kind = packet.kind();
                match listener.send_packet(packet).await {
                    Ok(()) => WorkerState::Normal,
                    Err(e) => {
                        warn!(error = %e, %kind, "listener callback failed; skipping packets until commit");
                        WorkerState::Tainted(e)
                    }
                }
            }
            WorkerState::Tainted(err) if packet.is_commit() => {
                debug!("reporting stored listener error at commit; async listener worker exiting");
                report(&commit_results, &mut shutdown, Err(err)).await;
                return;
            }
            tainted @ WorkerState::Tainted(_) => tainted,
        };
    }
}

/// Sends a commit result; `false` if nobody can receive it anymore.
async fn report(
    commit_results: &mpsc::Sender<CommitResult>,
    shutdown: &mut ShutdownSignal,
    result: CommitResult,
) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.recv() => false,
        sent = commit_results.send(result) => sent.is_ok(),
    }
}
