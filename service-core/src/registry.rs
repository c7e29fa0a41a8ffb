//! Type-keyed service registry with singleton, scoped and transient lifetimes.
//!
//! Services are keyed by their (usually trait-object) type and built by a
//! factory closure that receives the registry, so a binding can resolve its
//! own dependencies. Singletons are created lazily on first resolve and shared
//! for the lifetime of the registry; scoped services are cached per [`Scope`];
//! transient services are rebuilt on every resolve.
//!
//! Bindings form a flat graph, so there is no cycle detection. A factory must
//! not resolve its own type.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance for the registry's lifetime.
    Singleton,
    /// One instance per [`Scope`].
    Scoped,
    /// A new instance on every resolve.
    Transient,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Service not registered: {0}")]
    NotRegistered(&'static str),

    #[error("Scoped service {0} must be resolved from a scope")]
    ScopeRequired(&'static str),
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

type Factory<T> = Arc<dyn Fn(&ServiceRegistry) -> Result<Arc<T>, RegistryError> + Send + Sync>;
type Instance = Box<dyn Any + Send + Sync>;

struct Registration {
    lifetime: Lifetime,
    type_name: &'static str,
    /// A `Factory<T>` for the registered `T`.
    factory: Instance,
    /// An `Arc<T>` once a singleton has been built.
    singleton: OnceCell<Instance>,
}

impl Registration {
    fn build<T>(&self, registry: &ServiceRegistry) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let factory = self
            .factory
            .downcast_ref::<Factory<T>>()
            .ok_or(RegistryError::NotRegistered(self.type_name))?;
        factory(registry)
    }

    fn singleton<T>(&self, registry: &ServiceRegistry) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.singleton.get_or_try_init(|| {
            self.build::<T>(registry)
                .map(|built| Box::new(built) as Instance)
        })?;
        downcast::<T>(instance, self.type_name)
    }
}

fn downcast<T>(instance: &Instance, name: &'static str) -> Result<Arc<T>, RegistryError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(RegistryError::NotRegistered(name))
}

#[derive(Default)]
pub struct ServiceRegistry {
    registrations: RwLock<HashMap<TypeId, Arc<Registration>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `T` to `factory`. Registering the same type again replaces the
    /// previous binding, including any singleton it had built.
    pub fn register<T, F>(&self, lifetime: Lifetime, factory: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceRegistry) -> Result<Arc<T>, RegistryError> + Send + Sync + 'static,
    {
        let factory: Factory<T> = Arc::new(factory);
        let registration = Registration {
            lifetime,
            type_name: type_name::<T>(),
            factory: Box::new(factory),
            singleton: OnceCell::new(),
        };

        debug!(service = type_name::<T>(), ?lifetime, "Registered service");
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(registration));
    }

    /// Bind `T` to an already built instance.
    pub fn register_instance<T>(&self, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register::<T, _>(Lifetime::Singleton, move |_| Ok(Arc::clone(&instance)));
    }

    pub fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Resolve a singleton or transient service.
    pub fn resolve<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let registration = self.registration::<T>()?;
        match registration.lifetime {
            Lifetime::Singleton => registration.singleton::<T>(self),
            Lifetime::Transient => registration.build::<T>(self),
            Lifetime::Scoped => Err(RegistryError::ScopeRequired(registration.type_name)),
        }
    }

    /// Drop every registration and every singleton built so far.
    pub fn clear(&self) {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn create_scope(self: &Arc<Self>) -> Scope {
        Scope {
            registry: Arc::clone(self),
            instances: Mutex::new(HashMap::new()),
        }
    }

    // The lock is released before any factory runs.
    fn registration<T>(&self) -> Result<Arc<Registration>, RegistryError>
    where
        T: ?Sized + 'static,
    {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(RegistryError::NotRegistered(type_name::<T>()))
    }
}

/// Resolution boundary for scoped services, typically one per inbound request.
pub struct Scope {
    registry: Arc<ServiceRegistry>,
    instances: Mutex<HashMap<TypeId, Instance>>,
}

impl Scope {
    pub fn resolve<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let registration = self.registry.registration::<T>()?;
        if registration.lifetime != Lifetime::Scoped {
            return self.registry.resolve::<T>();
        }

        let key = TypeId::of::<T>();
        if let Some(existing) = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return downcast::<T>(existing, registration.type_name);
        }

        // Built outside the lock; if two callers race, the first insert wins.
        let built = registration.build::<T>(&self.registry)?;
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = instances
            .entry(key)
            .or_insert_with(|| Box::new(built) as Instance);
        downcast::<T>(entry, registration.type_name)
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn id(&self) -> usize;
    }

    struct Counted(usize);

    impl Greeter for Counted {
        fn id(&self) -> usize {
            self.0
        }
    }

    fn counting_factory(
    ) -> impl Fn(&ServiceRegistry) -> Result<Arc<dyn Greeter>, RegistryError> + Send + Sync + 'static
    {
        let next = Arc::new(AtomicUsize::new(0));
        move |_| Ok(Arc::new(Counted(next.fetch_add(1, Ordering::SeqCst))) as Arc<dyn Greeter>)
    }

    #[test]
    fn test_unregistered_fails() {
        let registry = ServiceRegistry::new();
        let err = registry.resolve::<dyn Greeter>().err();
        assert!(matches!(err, Some(RegistryError::NotRegistered(_))));
        assert!(!registry.is_registered::<dyn Greeter>());
    }

    #[test]
    fn test_singleton_is_identical() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, _>(Lifetime::Singleton, counting_factory());

        let first = registry.resolve::<dyn Greeter>().unwrap();
        let second = registry.resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), 0);
    }

    #[test]
    fn test_transient_is_distinct() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, _>(Lifetime::Transient, counting_factory());

        let first = registry.resolve::<dyn Greeter>().unwrap();
        let second = registry.resolve::<dyn Greeter>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_scoped_requires_scope() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, _>(Lifetime::Scoped, counting_factory());

        assert!(matches!(
            registry.resolve::<dyn Greeter>(),
            Err(RegistryError::ScopeRequired(_))
        ));
    }

    #[test]
    fn test_scoped_shared_within_scope_only() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register::<dyn Greeter, _>(Lifetime::Scoped, counting_factory());

        let scope = registry.create_scope();
        let a = scope.resolve::<dyn Greeter>().unwrap();
        let b = scope.resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.create_scope();
        let c = other.resolve::<dyn Greeter>().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_scope_serves_singletons_from_root() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register::<dyn Greeter, _>(Lifetime::Singleton, counting_factory());

        let root = registry.resolve::<dyn Greeter>().unwrap();
        let scoped = registry.create_scope().resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&root, &scoped));
    }

    #[test]
    fn test_clear_drops_registrations() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, _>(Lifetime::Singleton, counting_factory());
        assert!(registry.is_registered::<dyn Greeter>());

        registry.clear();
        assert!(!registry.is_registered::<dyn Greeter>());
        assert!(registry.resolve::<dyn Greeter>().is_err());
    }

    #[test]
    fn test_concrete_types_resolve() {
        let registry = ServiceRegistry::new();
        registry.register::<String, _>(Lifetime::Transient, |_| Ok(Arc::new("hello".to_string())));
        assert_eq!(registry.resolve::<String>().unwrap().as_str(), "hello");
    }

    struct Welcome(Arc<dyn Greeter>);

    #[test]
    fn test_factory_resolves_current_binding() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register::<Welcome, _>(Lifetime::Scoped, |registry| {
            Ok(Arc::new(Welcome(registry.resolve::<dyn Greeter>()?)))
        });
        registry.register_instance::<dyn Greeter>(Arc::new(Counted(1)));

        let first = registry.create_scope().resolve::<Welcome>().unwrap();
        assert_eq!(first.0.id(), 1);

        registry.register_instance::<dyn Greeter>(Arc::new(Counted(2)));
        let second = registry.create_scope().resolve::<Welcome>().unwrap();
        assert_eq!(second.0.id(), 2);
    }

    #[test]
    fn test_missing_dependency_surfaces_from_factory() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register::<Welcome, _>(Lifetime::Scoped, |registry| {
            Ok(Arc::new(Welcome(registry.resolve::<dyn Greeter>()?)))
        });

        assert!(matches!(
            registry.create_scope().resolve::<Welcome>(),
            Err(RegistryError::NotRegistered(_))
        ));
    }
}
