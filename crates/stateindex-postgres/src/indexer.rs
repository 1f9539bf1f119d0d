//! `PostgresIndexer`: materializes object updates as a [`Listener`].
//!
//! One transaction per block: it is opened at the block's first write and
//! handed back to the [`TransactionSource`] at commit. A failed write rolls
//! the block back; the error then surfaces to the pipeline.
//!
//! Modules initialized during a block are staged with that block's
//! transaction. They become visible to later blocks only once it commits; a
//! rollback discards them together with their tables and enum types.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};

use stateindex_appdata::{
    Capabilities, CommitData, Listener, ListenerError, ModuleInitializationData,
    ObjectUpdateData, PacketKind,
};

use crate::error::PostgresError;
use crate::executor::SqlExecutor;
use crate::module::ModuleManager;
use crate::options::Options;

// ─── TransactionSource ────────────────────────────────────────────────────────

/// Owns the transaction lifecycle on behalf of the indexer.
#[async_trait]
pub trait TransactionSource: Send {
    type Tx: SqlExecutor + Send;

    async fn begin(&mut self) -> Result<Self::Tx, PostgresError>;

    async fn commit(&mut self, tx: Self::Tx) -> Result<(), PostgresError>;

    async fn rollback(&mut self, tx: Self::Tx) -> Result<(), PostgresError>;
}

#[async_trait]
impl TransactionSource for PgPool {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&mut self) -> Result<Self::Tx, PostgresError> {
        Ok(sqlx::Pool::begin(&*self).await?)
    }

    async fn commit(&mut self, tx: Self::Tx) -> Result<(), PostgresError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self, tx: Self::Tx) -> Result<(), PostgresError> {
        tx.rollback().await?;
        Ok(())
    }
}

// ─── PostgresIndexer ──────────────────────────────────────────────────────────

pub struct PostgresIndexer<S: TransactionSource> {
    source: S,
    options: Options,
    /// Modules whose schema is committed.
    modules: HashMap<String, ModuleManager>,
    /// Modules initialized in the open transaction.
    staged: HashMap<String, ModuleManager>,
    /// The open transaction of the current block, if it has written anything.
    tx: Option<S::Tx>,
}

impl<S: TransactionSource> PostgresIndexer<S> {
    pub fn new(source: S, options: Options) -> Self {
        Self {
            source,
            options,
            modules: HashMap::new(),
            staged: HashMap::new(),
            tx: None,
        }
    }

    /// A module whose schema has been committed.
    pub fn module(&self, name: &str) -> Option<&ModuleManager> {
        self.modules.get(name)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    async fn open_tx<'a>(
        source: &mut S,
        slot: &'a mut Option<S::Tx>,
    ) -> Result<&'a mut S::Tx, PostgresError> {
        let tx = match slot.take() {
            Some(tx) => tx,
            None => {
                debug!("beginning block transaction");
                source.begin().await?
            }
        };
        Ok(slot.insert(tx))
    }

    async fn init_module(&mut self, data: ModuleInitializationData) -> Result<(), PostgresError> {
        let mut manager =
            ModuleManager::new(data.module_name.clone(), data.schema, self.options.clone())?;
        let tx = Self::open_tx(&mut self.source, &mut self.tx).await?;
        manager.init_module_schema(tx).await?;

        if self.modules.contains_key(&data.module_name) {
            warn!(module = %data.module_name, "module re-initialized; schema replaced at commit");
        }
        self.staged.insert(data.module_name, manager);
        Ok(())
    }

    async fn write_updates(&mut self, data: &ObjectUpdateData) -> Result<(), PostgresError> {
        let Self {
            source,
            modules,
            staged,
            tx,
            ..
        } = self;
        let module = staged
            .get(&data.module_name)
            .or_else(|| modules.get(&data.module_name))
            .ok_or_else(|| PostgresError::UnknownModule(data.module_name.clone()))?;

        let tx = Self::open_tx(source, tx).await?;
        for update in &data.updates {
            module.apply_update(tx, update).await?;
        }
        Ok(())
    }

    /// Rolls back the open transaction after a failed write and forgets the
    /// modules initialized in it.
    async fn abort(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = self.source.rollback(tx).await {
                warn!(error = %e, "rollback failed");
            }
        }
        for module in std::mem::take(&mut self.staged).into_keys() {
            warn!(module = %module, "module initialization rolled back");
        }
    }
}

#[async_trait]
impl<S: TransactionSource> Listener for PostgresIndexer<S> {
    fn capabilities(&self) -> Capabilities {
        [
            PacketKind::ModuleInitialization,
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
        let module = data.module_name.clone();
        if let Err(e) = self.init_module(data).await {
            warn!(module = %module, error = %e, "module initialization failed");
            self.abort().await;
            return Err(e.into());
        }
        info!(module = %module, "module initialized");
        Ok(())
    }

    async fn on_object_update(&mut self, data: ObjectUpdateData) -> Result<(), ListenerError> {
        if let Err(e) = self.write_updates(&data).await {
            warn!(module = %data.module_name, error = %e, "object update failed");
            self.abort().await;
            return Err(e.into());
        }
        debug!(module = %data.module_name, updates = data.updates.len(), "object updates written");
        Ok(())
    }

    async fn commit(&mut self, _data: CommitData) -> Result<(), ListenerError> {
        let staged = std::mem::take(&mut self.staged);
        match self.tx.take() {
            Some(tx) => {
                self.source.commit(tx).await?;
                debug!("block transaction committed");
            }
            None => debug!("nothing written this block"),
        }
        self.modules.extend(staged);
        Ok(())
    }
}
