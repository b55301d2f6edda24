//! View contract and the view registry.
//!
//! Rendering is not this crate's business: a [`View`] is whatever the UI
//! layer builds for a view-model, and the navigator only needs two things
//! from it: the view-model it is bound to, and, for views that host nested
//! navigation, a [`NestedHost`] to place the child view into.
//!
//! Views are registered per view-model type with a [`ViewRegistration`];
//! the [`ViewRegistry`] is filled by [`NavigatorBuilder`](crate::NavigatorBuilder)
//! and never changes afterwards.

use crate::error::{NavigationError, Result};
use crate::lifecycle::ViewModel;
use crate::route::TypeKey;
use crate::services::ResolveContext;
use crate::{debug_log, error_log};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

// ============================================================================
// View and NestedHost
// ============================================================================

/// A materialized view.
pub trait View {
    /// The view-model this view is bound to.
    fn view_model(&self) -> Rc<dyn ViewModel>;

    /// Surface for nested child views, if this view hosts nested navigation.
    fn nested_host(&self) -> Option<Rc<dyn NestedHost>> {
        None
    }
}

/// A slot that shows at most one child view.
pub trait NestedHost {
    /// Replace the shown view. `None` empties the slot.
    fn set_content(&self, content: Option<Rc<dyn View>>);
}

/// Plain [`NestedHost`] that just remembers what it shows.
#[derive(Default)]
pub struct ContentSlot {
    content: RefCell<Option<Rc<dyn View>>>,
}

impl ContentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view currently shown.
    pub fn content(&self) -> Option<Rc<dyn View>> {
        self.content.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.content.borrow().is_none()
    }

    /// Whether the slot currently shows `view`.
    pub fn shows(&self, view: &Rc<dyn View>) -> bool {
        self.content
            .borrow()
            .as_ref()
            .is_some_and(|shown| same_view(shown, view))
    }
}

impl NestedHost for ContentSlot {
    fn set_content(&self, content: Option<Rc<dyn View>>) {
        *self.content.borrow_mut() = content;
    }
}

impl std::fmt::Debug for ContentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSlot")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}

/// Identity comparison of two views.
pub fn same_view(a: &Rc<dyn View>, b: &Rc<dyn View>) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

// ============================================================================
// ViewRegistration
// ============================================================================

/// What a registration produces for one route item.
pub(crate) struct Materialized {
    pub(crate) view_model: Rc<dyn ViewModel>,
    pub(crate) view_model_any: Rc<dyn Any>,
    pub(crate) view: Rc<dyn View>,
}

type BuildFn = dyn Fn(&ResolveContext<'_>) -> Result<Materialized>;

/// How to build the view-model and view for one view-model type.
///
/// # Example
///
/// ```ignore
/// let registration = ViewRegistration::new(
///     |ctx| Ok(ShellViewModel::new(ctx.resolve::<Api>()?)),
///     |vm| ShellView::new(vm),
/// )
/// .hosting_children();
/// ```
pub struct ViewRegistration {
    view_model: TypeKey,
    hosts_children: bool,
    build: Rc<BuildFn>,
}

impl ViewRegistration {
    /// Register a view-model factory and the view built around it.
    pub fn new<VM, V, C, F>(create: C, view: F) -> Self
    where
        VM: ViewModel,
        V: View + 'static,
        C: Fn(&ResolveContext<'_>) -> Result<VM> + 'static,
        F: Fn(Rc<VM>) -> V + 'static,
    {
        let build = move |ctx: &ResolveContext<'_>| -> Result<Materialized> {
            let view_model = Rc::new(create(ctx)?);
            let built: Rc<dyn View> = Rc::new(view(Rc::clone(&view_model)));
            Ok(Materialized {
                view_model: Rc::clone(&view_model) as Rc<dyn ViewModel>,
                view_model_any: view_model as Rc<dyn Any>,
                view: built,
            })
        };
        Self {
            view_model: TypeKey::of::<VM>(),
            hosts_children: false,
            build: Rc::new(build),
        }
    }

    /// Declare that views of this registration can host nested navigation.
    pub fn hosting_children(mut self) -> Self {
        self.hosts_children = true;
        self
    }

    pub fn view_model(&self) -> TypeKey {
        self.view_model
    }

    pub fn hosts_children(&self) -> bool {
        self.hosts_children
    }

    pub(crate) fn build(&self, ctx: &ResolveContext<'_>) -> Result<Materialized> {
        (self.build)(ctx)
    }
}

impl std::fmt::Debug for ViewRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistration")
            .field("view_model", &self.view_model.name())
            .field("hosts_children", &self.hosts_children)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ViewRegistry
// ============================================================================

/// View-model type → view registration.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    registrations: HashMap<TypeId, Rc<ViewRegistration>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration; a second one for the same type is a
    /// configuration error.
    pub fn register(&mut self, registration: ViewRegistration) -> Result<()> {
        let key = registration.view_model();
        if self.registrations.contains_key(&key.id()) {
            error_log!("Duplicate view registration for {}", key.name());
            return Err(NavigationError::configuration(format!(
                "a view is already registered for {}",
                key.name()
            )));
        }
        debug_log!(
            "Registered view for {}{}",
            key.name(),
            if registration.hosts_children() {
                " (hosts children)"
            } else {
                ""
            }
        );
        self.registrations.insert(key.id(), Rc::new(registration));
        Ok(())
    }

    pub fn get(&self, view_model: TypeKey) -> Option<&Rc<ViewRegistration>> {
        self.registrations.get(&view_model.id())
    }

    pub fn contains(&self, view_model: TypeKey) -> bool {
        self.registrations.contains_key(&view_model.id())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
