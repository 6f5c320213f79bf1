//! Descriptor cache
//!
//! Process-wide cache of [`CallDescriptor`]s keyed by handler and operation
//! name. Descriptors are built lazily on first dispatch.
//!
//! # Concurrency
//!
//! The map sits behind an `RwLock` that is only held for the lookup or the
//! insert, never while a descriptor is built. Two threads missing the same
//! key at once both build the descriptor; since construction is a pure
//! function of the handler metadata the results are value-equal and the
//! later insert simply replaces the earlier one.

use directrpc_common::Result;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::descriptor::CallDescriptor;
use crate::metadata::{HandlerRegistry, HandlerType};

/// Cache key: handler name and operation name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorKey {
    pub handler: String,
    pub method: String,
}

impl DescriptorKey {
    pub fn new(handler: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<DescriptorKey, Arc<CallDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handler: &str, method: &str) -> Option<Arc<CallDescriptor>> {
        let key = DescriptorKey::new(handler, method);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Builds the descriptor of `method` on `ty` and stores it.
    pub fn put(&self, handler: &str, method: &str, ty: &HandlerType) -> Result<Arc<CallDescriptor>> {
        let descriptor = Arc::new(CallDescriptor::build(handler, ty, method)?);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(DescriptorKey::new(handler, method), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Returns the cached descriptor, building it on a miss.
    ///
    /// # Errors
    ///
    /// Configuration errors from the registry lookup or from descriptor
    /// construction.
    pub fn get_or_build(
        &self,
        registry: &HandlerRegistry,
        handler: &str,
        method: &str,
    ) -> Result<Arc<CallDescriptor>> {
        if let Some(descriptor) = self.get(handler, method) {
            return Ok(descriptor);
        }
        let ty = registry.get(handler)?;
        self.put(handler, method, ty)
    }

    /// Eagerly registers every marked operation of every registered handler.
    ///
    /// Invalid operations are logged and skipped. Returns the number of
    /// operations registered.
    pub fn populate(&self, registry: &HandlerRegistry) -> usize {
        let mut registered = 0;
        for handler in registry.handler_names() {
            let Ok(ty) = registry.get(handler) else {
                continue;
            };
            for method in ty.marked_method_names() {
                match self.put(handler, method, ty) {
                    Ok(_) => registered += 1,
                    Err(e) => tracing::error!("Skipping {}.{}: {}", handler, method, e),
                }
            }
        }
        tracing::info!("Registered {} operation(s)", registered);
        registered
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

    /// Snapshot of all entries, sorted by key.
    pub fn entries(&self) -> Vec<(DescriptorKey, Arc<CallDescriptor>)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, descriptor)| (key.clone(), Arc::clone(descriptor)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
