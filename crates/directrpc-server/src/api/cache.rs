//! API descriptor cache
//!
//! Rendered API descriptors keyed by the parameters they were rendered
//! with. The cache is bounded: once it holds more than its capacity, the
//! least recently used entries are evicted. An evicted entry behaves
//! exactly like a miss.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ApiCacheConfig;

/// Rendering parameters of an API descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ApiCacheKey {
    pub api_ns: Option<String>,
    pub action_ns: Option<String>,
    pub remoting_api_var: Option<String>,
    pub polling_urls_var: Option<String>,
    pub group: Option<String>,
    pub router_url: Option<String>,
    pub debug: bool,
}

impl ApiCacheKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_ns(mut self, api_ns: impl Into<String>) -> Self {
        self.api_ns = Some(api_ns.into());
        self
    }

    pub fn with_action_ns(mut self, action_ns: impl Into<String>) -> Self {
        self.action_ns = Some(action_ns.into());
        self
    }

    pub fn with_remoting_api_var(mut self, var: impl Into<String>) -> Self {
        self.remoting_api_var = Some(var.into());
        self
    }

    pub fn with_polling_urls_var(mut self, var: impl Into<String>) -> Self {
        self.polling_urls_var = Some(var.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_router_url(mut self, url: impl Into<String>) -> Self {
        self.router_url = Some(url.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[derive(Debug)]
struct CachedApi {
    rendered: Arc<str>,
    /// Tick of the last read or write; relaxed loads are fine for LRU ordering
    last_access: AtomicU64,
}

#[derive(Debug)]
pub struct ApiDescriptorCache {
    entries: RwLock<HashMap<ApiCacheKey, CachedApi>>,
    capacity: usize,
    /// Logical clock; every access takes a strictly larger tick
    clock: AtomicU64,
}

impl Default for ApiDescriptorCache {
    fn default() -> Self {
        Self::with_capacity(ApiCacheConfig::default().capacity)
    }
}

impl ApiDescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `config`.
    pub fn with_config(config: ApiCacheConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self::with_capacity(config.capacity))
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, key: &ApiCacheKey) -> Option<Arc<str>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let cached = entries.get(key)?;
        cached.last_access.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&cached.rendered))
    }

    pub fn put(&self, key: ApiCacheKey, rendered: impl Into<Arc<str>>) {
        let cached = CachedApi {
            rendered: rendered.into(),
            last_access: AtomicU64::new(self.tick()),
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, cached);

        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.last_access.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!("Evicting api descriptor {:?}", key);
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Returns the cached rendering, rendering and storing it on a miss.
    ///
    /// `render` runs without holding the lock; concurrent misses may render
    /// the same key more than once.
    pub fn get_or_insert_with<F>(&self, key: &ApiCacheKey, render: F) -> Arc<str>
    where
        F: FnOnce() -> String,
    {
        if let Some(rendered) = self.get(key) {
            return rendered;
        }
        let rendered: Arc<str> = render().into();
        self.put(key.clone(), Arc::clone(&rendered));
        rendered
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
