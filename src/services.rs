//! Dependency resolution for view-model constructors.
//!
//! A view-model factory receives a [`ResolveContext`] and asks it for the
//! values it needs. A request for type `T` is answered by, in order:
//!
//! 1. the view-models of the ancestor route items, nearest first, through
//!    [`ViewModel::provide`](crate::ViewModel::provide);
//! 2. the process-wide [`ServiceLookup`];
//! 3. a default supplied by the caller ([`ResolveContext::resolve_or_else`]);
//!
//! and otherwise fails with
//! [`NavigationError::DependencyResolution`](crate::NavigationError::DependencyResolution).

use crate::error::{NavigationError, Result};
use crate::item::RouteItem;
use crate::navigator::WeakNavigator;
use crate::params::RouteParams;
use crate::trace_log;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

// ============================================================================
// ServiceLookup
// ============================================================================

/// Last-resort source of dependencies: `(type) -> instance | none`.
pub trait ServiceLookup {
    fn lookup(&self, ty: TypeId) -> Option<Rc<dyn Any>>;
}

impl<F> ServiceLookup for F
where
    F: Fn(TypeId) -> Option<Rc<dyn Any>>,
{
    fn lookup(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
        self(ty)
    }
}

/// A type-keyed map of shared services.
///
/// ```
/// use std::rc::Rc;
/// use view_navigator::ServiceCollection;
///
/// struct Clock;
/// let services = ServiceCollection::new().with(Rc::new(Clock));
/// assert!(services.get::<Clock>().is_some());
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    services: HashMap<TypeId, Rc<dyn Any>>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service`, replacing any earlier instance of the same type.
    pub fn insert<T: 'static>(&mut self, service: Rc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: 'static>(mut self, service: Rc<T>) -> Self {
        self.insert(service);
        self
    }

    /// Typed lookup.
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Rc::clone(s).downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLookup for ServiceCollection {
    fn lookup(&self, ty: TypeId) -> Option<Rc<dyn Any>> {
        self.services.get(&ty).cloned()
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("len", &self.services.len())
            .finish_non_exhaustive()
    }
}

/// Lookup that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoServices;

impl ServiceLookup for NoServices {
    fn lookup(&self, _ty: TypeId) -> Option<Rc<dyn Any>> {
        None
    }
}

// ============================================================================
// ResolveContext
// ============================================================================

/// What a view-model factory can see while it runs.
pub struct ResolveContext<'a> {
    pub(crate) params: &'a RouteParams,
    pub(crate) ancestors: &'a [Rc<RouteItem>],
    pub(crate) services: &'a dyn ServiceLookup,
    pub(crate) navigator: &'a WeakNavigator,
    pub(crate) requested_by: &'static str,
}

impl<'a> ResolveContext<'a> {
    /// Parameters of the route part being materialized.
    pub fn params(&self) -> &RouteParams {
        self.params
    }

    /// Handle to the owning navigator, for view-models that navigate or open
    /// dialogs themselves. Weak, so storing it does not keep the navigator
    /// alive.
    pub fn navigator(&self) -> WeakNavigator {
        self.navigator.clone()
    }

    /// Depth of the item being materialized.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Look `T` up without failing.
    pub fn try_resolve<T: 'static>(&self) -> Option<Rc<T>> {
        let ty = TypeId::of::<T>();
        for ancestor in self.ancestors.iter().rev() {
            let Some(view_model) = ancestor.view_model() else {
                continue;
            };
            if let Some(found) = view_model.provide(ty) {
                if let Ok(found) = found.downcast::<T>() {
                    trace_log!(
                        "Resolved {} for {} from ancestor {}",
                        type_name::<T>(),
                        self.requested_by,
                        view_model.debug_name()
                    );
                    return Some(found);
                }
            }
        }
        let found = self.services.lookup(ty)?.downcast::<T>().ok()?;
        trace_log!(
            "Resolved {} for {} from services",
            type_name::<T>(),
            self.requested_by
        );
        Some(found)
    }

    /// Look `T` up, failing with a dependency error if nobody provides it.
    pub fn resolve<T: 'static>(&self) -> Result<Rc<T>> {
        self.try_resolve::<T>()
            .ok_or(NavigationError::DependencyResolution {
                dependency: type_name::<T>(),
                requested_by: self.requested_by,
            })
    }

    /// Look `T` up, falling back to a declared default.
    pub fn resolve_or_else<T: 'static>(&self, default: impl FnOnce() -> T) -> Rc<T> {
        self.try_resolve::<T>()
            .unwrap_or_else(|| Rc::new(default()))
    }
}

impl std::fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("params", &self.params)
            .field("depth", &self.ancestors.len())
            .field("requested_by", &self.requested_by)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
