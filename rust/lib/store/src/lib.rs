//! Per-noun record stores with lifecycle hooks.
//!
//! An `Accessor` owns the records of one noun and exposes CRUD + search over
//! them. Every mutation runs its `before_*` hooks before the store is touched
//! and its `after_*` hooks once the change is visible:
//!
//! ```ignore
//! let registry = NounRegistry::from_config(&config)?;
//! let users = registry.get("User")?;
//! users.add_hooks(Hooks::new().before_create(|mut data| {
//!     data.insert("active".into(), true.into());
//!     Ok(data)
//! }));
//! let user = users.create(json!({"email": "a@example.com"}))?;
//! ```
//!
//! Relationship fields are expanded on `get` by the `RelationResolver`, which
//! reads other nouns through the `NounRegistry`.

pub mod accessor;
pub mod filter;
pub mod hooks;
pub mod record;
pub mod registry;
pub mod relation;
pub mod search;
mod timestamp;

pub use accessor::{Accessor, GetOptions};
pub use hooks::{Hooks, ResolveRelations, cascade_delete, schema_validation};
pub use record::Record;
pub use registry::NounRegistry;
pub use relation::RelationResolver;
pub use search::ScoredRecord;
