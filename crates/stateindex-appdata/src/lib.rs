//! stateindex-appdata: the state-change packet stream and its listeners.
//!
//! # Architecture
//!
//! ```text
//! producer ──▶ Listener (trait)
//!                ├── ListenerMux       (synchronous fan-out, first error wins)
//!                ├── AsyncListener     (bounded queue + worker, errors reported at commit)
//!                └── AsyncListenerMux  (N async listeners, commit awaits every member)
//! ```
//!
//! Packets are delivered per block: `StartBlock`, the block's tx / event /
//! kv-pair / object-update packets, then `Commit`.

pub mod async_listener;
pub mod async_mux;
pub mod error;
pub mod listener;
pub mod mux;
pub mod packet;
pub mod shutdown;
pub mod testing;

pub use async_listener::{AsyncListener, AsyncListenerOptions, CommitResult};
pub use async_mux::AsyncListenerMux;
pub use error::{BoxError, ListenerError};
pub use listener::{Capabilities, Listener};
pub use mux::ListenerMux;
pub use packet::{
    CommitData, EventAttribute, EventData, KvPairData, KvPairUpdate, ModuleInitializationData,
    ModuleKvPairUpdate, ObjectUpdateData, Packet, PacketKind, StartBlockData, TxData,
};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
