//! # Request Memoizer
//!
//! Wraps a [`DataManager`] so that identical calls inside a freshness window
//! share one underlying request.
//!
//! The cache stores the *pending* result (a [`Shared`] future), not the
//! resolved value, so concurrent callers that arrive while the first request
//! is still in flight join it instead of issuing their own. Failures are
//! shared the same way.
//!
//! ```text
//! call(cargo, renew) ──► key = digest(project({method, input}, key_path))
//!                          │
//!          fresh entry & !renew ──► clone of the stored SharedFetch
//!                          │
//!                     otherwise ──► data_manager.fetch(cargo), stored
//!                                   with fresh_until = now + timeout
//! ```
//!
//! Clearing never touches the running instance: [`SwappableMemoizer::clear`]
//! swaps in a new one. Requests started under the old instance complete
//! normally but can no longer be found.

use crate::action::Cargo;
use crate::data_manager::DataManager;
use crate::error::FetchError;
use crate::hash::{digest, InputHash};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// A pending (or settled) fetch that any number of callers may await.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Value, FetchError>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoizeOptions {
    /// Keys walked into `{"method": .., "input": ..}` to build the cache key.
    /// Empty means the whole argument object.
    pub key_path: Vec<String>,
    /// Freshness window. `None` never expires.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Bypass any cached entry and overwrite it with a new request.
    pub renew: bool,
}

struct CacheEntry {
    value: SharedFetch,
    fresh_until: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.fresh_until.map_or(true, |until| now < until)
    }
}

pub struct Memoizer {
    data_manager: Arc<dyn DataManager>,
    options: MemoizeOptions,
    cache: Mutex<HashMap<InputHash, CacheEntry>>,
}

impl Memoizer {
    pub fn new(data_manager: Arc<dyn DataManager>, options: MemoizeOptions) -> Self {
        Self {
            data_manager,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &MemoizeOptions {
        &self.options
    }

    /// Cache key of a call.
    pub fn key(&self, cargo: &Cargo) -> InputHash {
        let args = json!({ "method": cargo.method, "input": cargo.input });
        let projected = self
            .options
            .key_path
            .iter()
            .try_fold(&args, |value, key| value.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        digest(&projected)
    }

    pub fn call(&self, cargo: &Cargo, options: CallOptions) -> SharedFetch {
        let key = self.key(cargo);
        let now = Instant::now();
        let mut cache = self.cache.lock();

        if !options.renew {
            if let Some(entry) = cache.get(&key).filter(|entry| entry.is_fresh(now)) {
                debug!(method = %cargo.method, key = %key, "Cache hit");
                return entry.value.clone();
            }
        }
        debug!(method = %cargo.method, key = %key, renew = options.renew, "Cache miss");

        let data_manager = Arc::clone(&self.data_manager);
        let request = cargo.clone();
        let value = async move { data_manager.fetch(&request).await }
            .boxed()
            .shared();
        cache.insert(
            key,
            CacheEntry {
                value: value.clone(),
                fresh_until: self.options.timeout.map(|timeout| now + timeout),
            },
        );
        value
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`Memoizer`] whose cache can be discarded wholesale.
pub struct SwappableMemoizer {
    current: RwLock<Arc<Memoizer>>,
}

impl SwappableMemoizer {
    pub fn new(data_manager: Arc<dyn DataManager>, options: MemoizeOptions) -> Self {
        Self {
            current: RwLock::new(Arc::new(Memoizer::new(data_manager, options))),
        }
    }

    pub fn call(&self, cargo: &Cargo, options: CallOptions) -> SharedFetch {
        let memoizer = Arc::clone(&self.current.read());
        memoizer.call(cargo, options)
    }

    /// Replaces the cache with an empty one using `timeout`.
    pub fn clear(&self, timeout: Option<Duration>) {
        let mut current = self.current.write();
        let fresh = Memoizer::new(
            Arc::clone(&current.data_manager),
            MemoizeOptions {
                key_path: current.options.key_path.clone(),
                timeout,
            },
        );
        info!(dropped = current.len(), ?timeout, "Cache cleared");
        *current = Arc::new(fresh);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.current.read().options.timeout
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }
}
