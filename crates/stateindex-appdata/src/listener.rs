//! The `Listener` trait and its capability set.

use async_trait::async_trait;
use std::fmt;
use std::ops::BitOr;

use crate::error::ListenerError;
use crate::packet::{
    CommitData, EventData, KvPairData, ModuleInitializationData, ObjectUpdateData, Packet,
    PacketKind, StartBlockData, TxData,
};

// ─── Capabilities ─────────────────────────────────────────────────────────────

/// The set of packet kinds a listener handles.
///
/// Dispatchers consult this set before calling a callback, so an absent
/// capability is never invoked (as opposed to being a no-op that succeeds).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const ALL: Capabilities = Capabilities(0b111_1111);

    const fn bit(kind: PacketKind) -> u8 {
        1 << (kind as u8)
    }

    pub const fn with(self, kind: PacketKind) -> Self {
        Capabilities(self.0 | Self::bit(kind))
    }

    pub const fn contains(self, kind: PacketKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    pub const fn union(self, other: Capabilities) -> Self {
        Capabilities(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = PacketKind> {
        PacketKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl FromIterator<PacketKind> for Capabilities {
    fn from_iter<I: IntoIterator<Item = PacketKind>>(iter: I) -> Self {
        iter.into_iter().fold(Capabilities::NONE, Capabilities::with)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// ─── Listener ─────────────────────────────────────────────────────────────────

/// A consumer of the state-change stream.
///
/// Implementors declare the callbacks they handle in [`Listener::capabilities`]
/// and override the matching methods; the defaults do nothing.
#[async_trait]
pub trait Listener: Send {
    /// Which callbacks this listener handles.
    fn capabilities(&self) -> Capabilities;

    async fn initialize_module_data(
        &mut self,
        _data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn start_block(&mut self, _data: StartBlockData) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_tx(&mut self, _data: TxData) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_event(&mut self, _data: EventData) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_kv_pair(&mut self, _data: KvPairData) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn on_object_update(&mut self, _data: ObjectUpdateData) -> Result<(), ListenerError> {
        Ok(())
    }

    async fn commit(&mut self, _data: CommitData) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Routes `packet` to its callback. Packets whose capability is absent
    /// are skipped and reported as success.
    async fn send_packet(&mut self, packet: Packet) -> Result<(), ListenerError> {
        if !self.capabilities().contains(packet.kind()) {
            return Ok(());
        }
        match packet {
            Packet::ModuleInitialization(data) => self.initialize_module_data(data).await,
            Packet::StartBlock(data) => self.start_block(data).await,
            Packet::Tx(data) => self.on_tx(data).await,
            Packet::Event(data) => self.on_event(data).await,
            Packet::KvPair(data) => self.on_kv_pair(data).await,
            Packet::ObjectUpdate(data) => self.on_object_update(data).await,
            Packet::Commit(data) => self.commit(data).await,
        }
    }
}

#[async_trait]
impl Listener for Box<dyn Listener> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    async fn initialize_module_data(
        &mut self,
        data: ModuleInitializationData,
    ) -> Result<(), ListenerError> {
        (**self).initialize_module_data(data).await
    }

    async fn start_block(&mut self, data: StartBlockData) -> Result<(), ListenerError> {
        (**self).start_block(data).await
    }

    async fn on_tx(&mut self, data: TxData) -> Result<(), ListenerError> {
        (**self).on_tx(data).await
    }

    async fn on_event(&mut self, data: EventData) -> Result<(), ListenerError> {
        (**self).on_event(data).await
    }

    async fn on_kv_pair(&mut self, data: KvPairData) -> Result<(), ListenerError> {
        (**self).on_kv_pair(data).await
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        (**self).on_object_update(data).await
    }

    async fn commit(&mut self, data: CommitData) -> Result<(), ListenerError> {
        (**self).commit(data).await
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), ListenerError> {
        (**self).send_packet(packet).await
    }
}
