//! Command implementations over a loaded registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use nounbase_batch::QueryBatcher;
use nounbase_cache::{QueryCache, cache_key};
use nounbase_core::{BatchOptions, ListOptions, NounbaseConfig, ServiceError};
use nounbase_store::{GetOptions, NounRegistry, Record, schema_validation};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Registry plus the read path (cache + batch options) shared by commands.
pub struct Context {
    registry: Arc<NounRegistry>,
    cache: Arc<QueryCache<Record>>,
    batch: BatchOptions,
}

impl Context {
    /// Load the config file, then the optional seed file.
    pub fn open(config_path: &Path, seed: Option<&Path>, cache_enabled: bool) -> Result<Self> {
        let config = NounbaseConfig::load(config_path)?;
        let ctx = Self::from_config(config, cache_enabled)?;
        if let Some(path) = seed {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read seed {}", path.display()))?;
            let data: Value = serde_json::from_str(&content)
                .with_context(|| format!("parse seed {}", path.display()))?;
            let count = ctx.seed(data)?;
            info!("Seeded {} records from {}", count, path.display());
        }
        Ok(ctx)
    }

    /// Build the registry with schema validation on every noun.
    pub fn from_config(config: NounbaseConfig, cache_enabled: bool) -> Result<Self> {
        let registry = NounRegistry::from_config(&config)?;
        for noun in registry.nouns() {
            let accessor = registry.get(&noun)?;
            accessor.add_hooks(schema_validation(accessor.schema()));
        }
        let cache = QueryCache::new(config.cache.clone());
        if !cache_enabled {
            cache.set_enabled(false);
        }
        Ok(Self {
            registry,
            cache: Arc::new(cache),
            batch: config.batch,
        })
    }

    /// Create every record of `{ "Noun": [records...] }`. Returns the count.
    pub fn seed(&self, data: Value) -> Result<usize> {
        let Value::Object(nouns) = data else {
            bail!("seed must be a JSON object mapping nouns to record arrays");
        };
        let mut count = 0;
        for (noun, records) in nouns {
            let accessor = self.registry.get(&noun)?;
            let Value::Array(records) = records else {
                bail!("seed for {} must be an array", noun);
            };
            for (index, record) in records.into_iter().enumerate() {
                accessor
                    .create(record)
                    .with_context(|| format!("seed {} record #{}", noun, index))?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Load `ids` through one batcher. Fully resolved reads go through the
    /// cache; a single id that does not exist is NotFound.
    pub async fn get(
        &self,
        noun: &str,
        ids: Vec<String>,
        include: Option<Vec<String>>,
    ) -> Result<Value> {
        let accessor = self.registry.get(noun)?;
        let options = GetOptions { include };
        let cache = options.include.is_none().then(|| Arc::clone(&self.cache));
        let cache_noun = noun.to_string();

        let batcher = QueryBatcher::new(
            move |ids: Vec<String>| {
                let accessor = Arc::clone(&accessor);
                let cache = cache.clone();
                let options = options.clone();
                let noun = cache_noun.clone();
                async move {
                    let mut found = HashMap::with_capacity(ids.len());
                    for id in ids {
                        let record = match &cache {
                            Some(cache) => cache
                                .get_or_insert_with(&cache_key(&noun, &id), || accessor.get(&id))?,
                            None => accessor.get_with(&id, &options)?,
                        };
                        if let Some(record) = record {
                            found.insert(id, record);
                        }
                    }
                    Ok::<_, ServiceError>(found)
                }
            },
            self.batch.clone(),
        );

        let records = batcher.load_many(ids.iter().cloned()).await?;
        debug!(stats = ?self.cache.stats(), "query cache");

        if let [id] = ids.as_slice() {
            let record = records.into_iter().next().flatten().ok_or_else(|| {
                ServiceError::NotFound(format!("{} '{}' not found", noun, id))
            })?;
            return Ok(Value::Object(record));
        }
        Ok(Value::Array(
            records
                .into_iter()
                .map(|r| r.map_or(Value::Null, Value::Object))
                .collect(),
        ))
    }

    pub fn list(&self, noun: &str, limit: Option<usize>, offset: usize) -> Result<Value> {
        let accessor = self.registry.get(noun)?;
        let records = accessor.list(&ListOptions { limit, offset });
        Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
    }

    pub fn find(&self, noun: &str, filter: &str) -> Result<Value> {
        let accessor = self.registry.get(noun)?;
        let filter: Value = serde_json::from_str(filter).context("parse filter")?;
        let Value::Object(filter) = filter else {
            bail!("filter must be a JSON object");
        };
        let records = accessor.find(&filter);
        Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
    }

    pub fn search(&self, noun: &str, query: &str, semantic: bool) -> Result<Value> {
        let accessor = self.registry.get(noun)?;
        if semantic {
            return Ok(serde_json::to_value(accessor.semantic_search(query))?);
        }
        let records = accessor.search(query);
        Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
    }

    pub fn schema(&self, noun: &str) -> Result<Value> {
        Ok(self.registry.get(noun)?.schema().to_json())
    }

    /// `{ noun: record count }` in registration order.
    pub fn nouns(&self) -> Value {
        let mut out = Map::new();
        for noun in self.registry.nouns() {
            let count = self.registry.accessor(&noun).map_or(0, |a| a.count());
            out.insert(noun, Value::from(count));
        }
        Value::Object(out)
    }
}
