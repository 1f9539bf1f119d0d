//! stateindex-schema: the typed data model shared by every StateIndex sink.
//!
//! ```text
//! ModuleSchema
//!   └── ObjectType (name, key fields, value fields, retain_deletions)
//!         └── Field (name, Kind, nullable, EnumDefinition)
//!
//! ObjectUpdate (type name, ObjectKey, ObjectValue | ValueUpdates, delete)
//! ```
//!
//! Updates are validated against their object type before they reach a sink,
//! so storage schemas derived from the model can rely on it.

pub mod error;
pub mod field;
pub mod kind;
pub mod module_schema;
pub mod object_type;
pub mod object_update;

pub use error::SchemaError;
pub use field::{EnumDefinition, Field};
pub use kind::{Kind, Value};
pub use module_schema::ModuleSchema;
pub use object_type::{ObjectType, UniqueConstraint};
pub use object_update::{ObjectKey, ObjectUpdate, ObjectValue, ValueUpdates};
