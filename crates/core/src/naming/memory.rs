//! Table-backed naming for single-process deployments and tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Naming, NamingFactory, format_name_str};
use crate::error::NamingError;

/// In-memory [`Naming`] backend.
///
/// Names are canonicalized with [`format_name_str`] on every operation, so
/// `a.b.c` and `/a/b/c` address the same bindings.
pub struct MemoryNaming {
    bindings: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryNaming {
    pub fn new() -> Self {
        MemoryNaming {
            bindings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryNaming {
    fn default() -> Self {
        Self::new()
    }
}

impl Naming for MemoryNaming {
    fn register(&self, name: &str, url: &str) -> Result<(), NamingError> {
        let name = format_name_str(name).ok_or(NamingError::InvalidParam)?;
        if url.is_empty() {
            return Err(NamingError::InvalidParam);
        }
        let mut bindings = self.bindings.write();
        let urls = bindings.entry(name.clone()).or_default();
        if urls.iter().any(|u| u == url) {
            return Err(NamingError::UrlRegistered);
        }
        urls.push(url.to_string());
        tracing::debug!(%name, url, instances = urls.len(), "name registered");
        Ok(())
    }

    fn unregister(&self, name: &str) -> Result<(), NamingError> {
        let name = format_name_str(name).ok_or(NamingError::InvalidParam)?;
        if self.bindings.write().remove(&name).is_none() {
            return Err(NamingError::UrlNotBinded);
        }
        tracing::debug!(%name, "name unregistered");
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Vec<String>, NamingError> {
        let name = format_name_str(name).ok_or(NamingError::InvalidParam)?;
        self.bindings
            .read()
            .get(&name)
            .cloned()
            .ok_or(NamingError::UrlNotBinded)
    }
}

/// Factory vending [`MemoryNaming`] instances.
pub struct MemoryNamingFactory;

impl NamingFactory for MemoryNamingFactory {
    fn create_naming(&self) -> Arc<dyn Naming> {
        Arc::new(MemoryNaming::new())
    }
}
