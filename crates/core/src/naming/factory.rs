//! Process-wide registry of naming backends.
//!
//! Each backend kind registers a [`NamingFactory`] under an integer tag at
//! startup; lookups vend the factory for the configured kind. The registry
//! has an explicit lifecycle so teardown order is observable: it starts
//! uninitialized, the map is materialized inside the first
//! [`set_naming_factory`] call, and [`teardown_naming_factories`] retires it
//! for good — later registrations fail with
//! [`NamingError::FactoryMapNull`] rather than resurrecting the map.
//! No replacement or unregistration is provided.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Naming;
use crate::error::NamingError;

/// Creates [`Naming`] backend instances of one kind.
pub trait NamingFactory: Send + Sync {
    fn create_naming(&self) -> Arc<dyn Naming>;
}

enum Registry {
    Uninitialized,
    Live(HashMap<i32, Arc<dyn NamingFactory>>),
    TornDown,
}

static FACTORIES: RwLock<Registry> = RwLock::new(Registry::Uninitialized);

/// Bind `factory` to `backend_type`.
///
/// Fails with [`NamingError::FactoryExisted`] when the tag is already bound
/// and [`NamingError::FactoryMapNull`] after teardown.
pub fn set_naming_factory(
    backend_type: i32,
    factory: Arc<dyn NamingFactory>,
) -> Result<(), NamingError> {
    let mut registry = FACTORIES.write();
    if matches!(*registry, Registry::Uninitialized) {
        *registry = Registry::Live(HashMap::new());
    }
    let map = match &mut *registry {
        Registry::Live(map) => map,
        Registry::TornDown => return Err(NamingError::FactoryMapNull),
        Registry::Uninitialized => unreachable!(),
    };
    if map.contains_key(&backend_type) {
        return Err(NamingError::FactoryExisted);
    }
    map.insert(backend_type, factory);
    tracing::debug!(backend_type, "naming factory registered");
    Ok(())
}

/// The factory bound to `backend_type`, or `None` when the tag is unknown
/// or the registry is unavailable.
pub fn get_naming_factory(backend_type: i32) -> Option<Arc<dyn NamingFactory>> {
    match &*FACTORIES.read() {
        Registry::Live(map) => map.get(&backend_type).cloned(),
        _ => None,
    }
}

/// Retire the registry. Called by application shutdown; afterwards lookups
/// return `None` and registrations fail with
/// [`NamingError::FactoryMapNull`].
pub fn teardown_naming_factories() {
    *FACTORIES.write() = Registry::TornDown;
    tracing::debug!("naming factory registry torn down");
}
