use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;

use nounbase_core::{BatchOptions, ServiceError};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A boxed, `Send`-able future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased bulk-load function.
///
/// Takes the owned key list so the returned future can be `'static`.
pub type LoadFn<K, V> =
    Arc<dyn Fn(Vec<K>) -> BoxFuture<'static, Result<HashMap<K, V>, ServiceError>> + Send + Sync>;

type Reply<V> = oneshot::Sender<Result<Option<V>, ServiceError>>;

struct Pending<K, V> {
    key: K,
    reply: Reply<V>,
}

struct State<K, V> {
    queue: VecDeque<Pending<K, V>>,
    /// A dispatch task is spawned and has not drained the queue yet.
    scheduled: bool,
}

struct Inner<K, V> {
    load_fn: LoadFn<K, V>,
    options: BatchOptions,
    state: Mutex<State<K, V>>,
}

/// Per-window request coalescer.
///
/// Cloning shares the queue.
pub struct QueryBatcher<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for QueryBatcher<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> QueryBatcher<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new<F, Fut>(load_fn: F, options: BatchOptions) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HashMap<K, V>, ServiceError>> + Send + 'static,
    {
        let load_fn: LoadFn<K, V> = Arc::new(
            move |keys: Vec<K>| -> BoxFuture<'static, Result<HashMap<K, V>, ServiceError>> {
                Box::pin(load_fn(keys))
            },
        );
        Self {
            inner: Arc::new(Inner {
                load_fn,
                options,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    scheduled: false,
                }),
            }),
        }
    }

    /// Queue `key` for the current window.
    ///
    /// The request is enqueued before this returns. The window opens when a
    /// queued request is first awaited, so every `load` issued before the
    /// caller yields lands in the same dispatch. Dropping the future discards
    /// the answer; the request is still dispatched with the rest of its window.
    pub fn load(&self, key: K) -> BoxFuture<'static, Result<Option<V>, ServiceError>> {
        let (reply, answer) = oneshot::channel();
        self.inner.state.lock().queue.push_back(Pending { key, reply });
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            open_window(inner);
            answer
                .await
                .unwrap_or_else(|_| Err(ServiceError::BatchLoad("batch dispatch dropped".into())))
        })
    }

    /// Load every key, all enqueued before the first await.
    ///
    /// Answers come back in key order. The first error wins.
    pub fn load_many<I>(&self, keys: I) -> BoxFuture<'static, Result<Vec<Option<V>>, ServiceError>>
    where
        I: IntoIterator<Item = K>,
    {
        let answers: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        Box::pin(async move {
            let mut values = Vec::with_capacity(answers.len());
            for answer in answers {
                values.push(answer.await?);
            }
            Ok(values)
        })
    }

    /// Requests queued and not yet dispatched.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

}

/// Spawn a windowed dispatch unless one is already waiting or the queue is empty.
fn open_window<K, V>(inner: Arc<Inner<K, V>>)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    {
        let mut state = inner.state.lock();
        if state.scheduled || state.queue.is_empty() {
            return;
        }
        state.scheduled = true;
    }
    spawn_dispatch(inner, true);
}

/// Spawn one dispatch. `wait` holds it for the batch window first.
fn spawn_dispatch<K, V>(inner: Arc<Inner<K, V>>, wait: bool)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        if wait {
            let interval = inner.options.interval();
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
        }
        dispatch(inner).await;
    });
}

async fn dispatch<K, V>(inner: Arc<Inner<K, V>>)
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let (batch, more) = {
        let mut state = inner.state.lock();
        let take = inner.options.max_batch_size.max(1).min(state.queue.len());
        let batch: Vec<Pending<K, V>> = state.queue.drain(..take).collect();
        let more = !state.queue.is_empty();
        state.scheduled = more;
        (batch, more)
    };
    if more {
        spawn_dispatch(Arc::clone(&inner), false);
    }
    if batch.is_empty() {
        return;
    }

    let mut seen = HashSet::with_capacity(batch.len());
    let keys: Vec<K> = batch
        .iter()
        .filter(|p| seen.insert(p.key.clone()))
        .map(|p| p.key.clone())
        .collect();
    debug!(requests = batch.len(), keys = keys.len(), "dispatching batch");

    match (inner.load_fn)(keys).await {
        Ok(values) => {
            for Pending { key, reply } in batch {
                let _ = reply.send(Ok(values.get(&key).cloned()));
            }
        }
        Err(err) => {
            warn!(error = %err, requests = batch.len(), "bulk load failed");
            for Pending { reply, .. } in batch {
                let _ = reply.send(Err(err.clone()));
            }
        }
    }
}
