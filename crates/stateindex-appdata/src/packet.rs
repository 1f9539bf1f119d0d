//! The packet taxonomy of the state-change stream.
//!
//! A block is delivered as `StartBlock`, then any number of tx / event /
//! kv-pair / object-update packets, then `Commit`. Module initialization data
//! arrives at most once per module, before that module's first block.

use serde::{Deserialize, Serialize};
use stateindex_schema::{ModuleSchema, ObjectUpdate};
use std::fmt;

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// Schema of a module, sent before any of its object updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInitializationData {
    pub module_name: String,
    pub schema: ModuleSchema,
}

/// Marks the beginning of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartBlockData {
    pub height: u64,
    /// Raw block header, if the producer has it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_bytes: Option<Vec<u8>>,
    /// JSON rendering of the block header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_json: Option<serde_json::Value>,
}

/// A transaction included in the current block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxData {
    /// Index of the transaction within the block.
    pub tx_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
}

/// A key/value attribute of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// An event emitted during block execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Index of the emitting transaction; `-1` outside any transaction.
    pub tx_index: i32,
    /// Index of the emitting message within the transaction; `-1` outside a message.
    pub msg_index: i32,
    /// Index of the event within the message, or within the block when outside one.
    pub event_index: i32,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// One raw store write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPairUpdate {
    pub key: Vec<u8>,
    #[serde(default)]
    pub value: Vec<u8>,
    /// `true` if the key was deleted; `value` is then empty.
    #[serde(default)]
    pub remove: bool,
}

/// Raw store writes of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleKvPairUpdate {
    pub module_name: String,
    pub updates: Vec<KvPairUpdate>,
}

/// Raw store writes, grouped by module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPairData {
    pub updates: Vec<ModuleKvPairUpdate>,
}

/// Structured object updates of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdateData {
    pub module_name: String,
    pub updates: Vec<ObjectUpdate>,
}

/// End of the current block's packets; the synchronization boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitData {}

// ─── Packet ───────────────────────────────────────────────────────────────────

/// The discriminant of a [`Packet`], also used as a listener capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    ModuleInitialization,
    StartBlock,
    Tx,
    Event,
    KvPair,
    ObjectUpdate,
    Commit,
}

impl PacketKind {
    pub const ALL: [PacketKind; 7] = [
        PacketKind::ModuleInitialization,
        PacketKind::StartBlock,
        PacketKind::Tx,
        PacketKind::Event,
        PacketKind::KvPair,
        PacketKind::ObjectUpdate,
        PacketKind::Commit,
    ];
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ModuleInitialization => "module_initialization",
            Self::StartBlock => "start_block",
            Self::Tx => "tx",
            Self::Event => "event",
            Self::KvPair => "kv_pair",
            Self::ObjectUpdate => "object_update",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// One immutable unit of the state-change stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Packet {
    ModuleInitialization(ModuleInitializationData),
    StartBlock(StartBlockData),
    Tx(TxData),
    Event(EventData),
    KvPair(KvPairData),
    ObjectUpdate(ObjectUpdateData),
    Commit(CommitData),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::ModuleInitialization(_) => PacketKind::ModuleInitialization,
            Packet::StartBlock(_) => PacketKind::StartBlock,
            Packet::Tx(_) => PacketKind::Tx,
            Packet::Event(_) => PacketKind::Event,
            Packet::KvPair(_) => PacketKind::KvPair,
            Packet::ObjectUpdate(_) => PacketKind::ObjectUpdate,
            Packet::Commit(_) => PacketKind::Commit,
        }
    }

    pub fn is_commit(&self) -> bool {
        matches!(self, Packet::Commit(_))
    }
}

macro_rules! impl_from_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Packet {
                fn from(data: $payload) -> Self {
                    Packet::$variant(data)
                }
            }
        )*
    };
}

impl_from_payload! {
    ModuleInitializationData => ModuleInitialization,
    StartBlockData => StartBlock,
    TxData => Tx,
    EventData => Event,
    KvPairData => KvPair,
    ObjectUpdateData => ObjectUpdate,
    CommitData => Commit,
}
