//! NounRegistry: owns one accessor per noun.
//!
//! The registry is the only way the relation resolver reaches other nouns'
//! stores; it hands out accessors, never the maps behind them.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use nounbase_core::{NounbaseConfig, ServiceError};
use nounbase_schema::NounSchema;
use parking_lot::RwLock;
use tracing::info;

use crate::accessor::Accessor;
use crate::relation::RelationResolver;

pub struct NounRegistry {
    accessors: RwLock<IndexMap<String, Arc<Accessor>>>,
    this: Weak<NounRegistry>,
}

impl NounRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            accessors: RwLock::new(IndexMap::new()),
            this: this.clone(),
        })
    }

    /// Parse every noun of the config, register it and check that all
    /// relation targets exist.
    pub fn from_config(config: &NounbaseConfig) -> Result<Arc<Self>, ServiceError> {
        let registry = Self::new();
        for (noun, defs) in &config.nouns {
            registry.register(NounSchema::parse(noun, defs)?)?;
        }
        registry.validate()?;
        info!(nouns = registry.len(), "noun registry ready");
        Ok(registry)
    }

    /// A resolver reading through this registry.
    pub fn resolver(&self) -> RelationResolver {
        RelationResolver::new(self.this.clone())
    }

    /// Weak handle for hooks that need to reach other nouns.
    pub fn downgrade(&self) -> Weak<NounRegistry> {
        self.this.clone()
    }

    /// Create an accessor for `schema` with this registry's relation resolver.
    pub fn register(&self, schema: NounSchema) -> Result<Arc<Accessor>, ServiceError> {
        self.insert(Accessor::new(schema))
    }

    /// Register a pre-built accessor, attaching this registry's relation resolver.
    pub fn insert(&self, accessor: Accessor) -> Result<Arc<Accessor>, ServiceError> {
        let accessor = Arc::new(accessor.with_resolver(Arc::new(self.resolver())));
        let noun = accessor.noun().to_string();
        let mut accessors = self.accessors.write();
        if accessors.contains_key(&noun) {
            return Err(ServiceError::Conflict(format!(
                "noun '{}' already registered",
                noun
            )));
        }
        accessors.insert(noun, Arc::clone(&accessor));
        Ok(accessor)
    }

    pub fn accessor(&self, noun: &str) -> Option<Arc<Accessor>> {
        self.accessors.read().get(noun).cloned()
    }

    /// Get an accessor or return NotFound.
    pub fn get(&self, noun: &str) -> Result<Arc<Accessor>, ServiceError> {
        self.accessor(noun)
            .ok_or_else(|| ServiceError::NotFound(format!("noun '{}' not registered", noun)))
    }

    /// Registered noun names, in registration order.
    pub fn nouns(&self) -> Vec<String> {
        self.accessors.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.accessors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every relation field must target a registered noun.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let accessors = self.accessors.read();
        for accessor in accessors.values() {
            let schema = accessor.schema();
            for rel in schema.relations() {
                if !accessors.contains_key(rel.target) {
                    return Err(ServiceError::MalformedSchema(format!(
                        "{}.{} targets unknown noun '{}'",
                        schema.noun(),
                        rel.name,
                        rel.target
                    )));
                }
            }
        }
        Ok(())
    }
}
