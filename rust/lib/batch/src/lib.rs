//! Query batcher: coalesces concurrent loads into one bulk call.
//!
//! Every `load(key)` issued within one batch window lands in the same
//! dispatch. A dispatch calls the bulk-load function once with the unique
//! keys in first-seen order, then answers every waiter from the returned map.
//! Keys absent from the map resolve to `None`.
//!
//! ```ignore
//! let users = Arc::clone(&accessor);
//! let batcher = QueryBatcher::new(
//!     move |ids: Vec<String>| {
//!         let users = Arc::clone(&users);
//!         async move {
//!             let mut found = HashMap::new();
//!             for id in ids {
//!                 if let Some(user) = users.get(&id)? {
//!                     found.insert(id, user);
//!                 }
//!             }
//!             Ok(found)
//!         }
//!     },
//!     BatchOptions::default(),
//! );
//! let (a, b) = tokio::join!(batcher.load("u1".into()), batcher.load("u2".into()));
//! ```
//!
//! The window opens when a queued request is first awaited, not when it is
//! queued, so this holds on multi-threaded runtimes as well. Dispatches run on
//! spawned Tokio tasks; the futures returned by `load` must be polled within a
//! Tokio runtime.

mod batcher;

pub use batcher::{BoxFuture, LoadFn, QueryBatcher};
