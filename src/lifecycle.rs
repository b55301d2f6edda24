//! View-model lifecycle contract and navigation action types.
//!
//! This module defines what the navigator calls on the participants of a
//! route:
//!
//! - [`NavigationAction`]: the answer returned by lifecycle and dismiss
//!   callbacks: continue, deny (cancel), or redirect elsewhere.
//! - [`ViewModel`]: the trait every routed view-model implements.
//! - [`NavigatingAwayArgs`] / [`NavigatedToArgs`]: what each callback is
//!   told about the navigation in progress.
//!
//! # Callback order
//!
//! For a navigation from `/a/b` to `/a/c`:
//!
//! 1. `b.on_navigating_away`: may deny; nothing has changed yet
//! 2. history is updated
//! 3. `b.on_navigated_away`: unconditional
//! 4. `a.on_navigated_to` with `already_active = true`
//! 5. `c` is materialized, `c.on_navigated_to`: may redirect
//!
//! Callbacks are asynchronous. The navigator never aborts a running callback;
//! if a newer navigation supersedes the current one while a callback is
//! pending, the callback's answer is discarded.

use crate::dialog::DialogPresenter;
use crate::error::Result;
use crate::navigator::WeakNavigator;
use crate::params::RouteParams;
use crate::route::Route;
use futures::future::LocalBoxFuture;
use std::any::{Any, TypeId};
use std::rc::Rc;

// ============================================================================
// NavigationAction
// ============================================================================

/// Answer of a lifecycle or dismiss callback.
///
/// # Example
///
/// ```
/// use view_navigator::NavigationAction;
///
/// let action = NavigationAction::deny("Unsaved changes");
/// assert!(action.is_deny());
///
/// let action = NavigationAction::redirect("/login");
/// assert_eq!(action.redirect_path(), Some("/login"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Let the navigation proceed.
    Continue,

    /// Stop the navigation.
    Deny {
        /// Human-readable reason for stopping.
        reason: String,
    },

    /// Abandon the current target and navigate to a different path.
    Redirect {
        /// Path to redirect to.
        to: String,
        /// Optional human-readable reason for redirecting.
        reason: Option<String>,
    },
}

impl NavigationAction {
    /// Alias for [`Continue`](Self::Continue).
    pub fn allow() -> Self {
        Self::Continue
    }

    /// Stop the navigation with a reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// Redirect to a different path.
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect {
            to: to.into(),
            reason: None,
        }
    }

    /// Redirect with a human-readable reason.
    pub fn redirect_with_reason(to: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Redirect {
            to: to.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Get the redirect path, if this is a redirect action.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirect { to, .. } => Some(to.as_str()),
            _ => None,
        }
    }
}

// ============================================================================
// Navigation kinds and callback arguments
// ============================================================================

/// Which entry point started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKind {
    /// Navigation to a new route string or descriptor.
    New,
    /// One step back in history.
    Back,
    /// One step forward in history.
    Forward,
    /// Re-entering the current route with a fresh leaf.
    Refresh,
    /// Replacing the nested suffix below an active ancestor.
    Partial,
    /// Restart triggered by an `on_navigated_to` redirect.
    Redirect,
}

/// Arguments of [`ViewModel::on_navigating_away`].
#[derive(Debug, Clone)]
pub struct NavigatingAwayArgs {
    /// Route currently shown.
    pub from: Route,
    /// Route the navigator is about to show.
    pub to: Route,
    pub kind: NavigationKind,
    /// Navigator running the navigation.
    pub navigator: WeakNavigator,
    /// Presenter allowed to open dialogs while this navigation runs.
    pub dialogs: DialogPresenter,
}

/// Arguments of [`ViewModel::on_navigated_to`].
#[derive(Debug, Clone)]
pub struct NavigatedToArgs {
    /// Full target route.
    pub route: Route,
    /// Parameters of this level.
    pub params: RouteParams,
    /// Parameters of this level and all its ancestors.
    pub inherited_params: RouteParams,
    /// Level of this view-model in the route (0 = root).
    pub depth: usize,
    /// First navigation since the view-model was created.
    pub is_first_navigation: bool,
    /// Already shown; only something deeper in the chain changed.
    pub already_active: bool,
    /// A nested child navigation follows this one.
    pub has_child: bool,
    pub kind: NavigationKind,
    pub navigator: WeakNavigator,
    /// Presenter allowed to open dialogs while this navigation runs.
    pub dialogs: DialogPresenter,
}

impl NavigatedToArgs {
    /// Anchor fragment of the target route, if any.
    pub fn anchor(&self) -> Option<&str> {
        self.route.options().anchor.as_deref()
    }
}

// ============================================================================
// ViewModel trait
// ============================================================================

/// Contract between the navigator and a routed view-model.
///
/// Every method has a default, so a passive view-model is just
/// `impl ViewModel for MyViewModel {}`.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use futures::future::LocalBoxFuture;
/// use view_navigator::{NavigatingAwayArgs, NavigationAction, Result, ViewModel};
///
/// struct Editor {
///     dirty: Cell<bool>,
/// }
///
/// impl ViewModel for Editor {
///     fn on_navigating_away<'a>(
///         &'a self,
///         _args: &'a NavigatingAwayArgs,
///     ) -> LocalBoxFuture<'a, Result<NavigationAction>> {
///         Box::pin(async move {
///             if self.dirty.get() {
///                 Ok(NavigationAction::deny("Unsaved changes"))
///             } else {
///                 Ok(NavigationAction::Continue)
///             }
///         })
///     }
///
///     fn can_be_cached(&self) -> bool {
///         false
///     }
/// }
/// ```
pub trait ViewModel: Any {
    /// Cancellable notification before the view-model stops being shown.
    ///
    /// Only called on view-models that completed an incoming navigation.
    /// [`NavigationAction::Deny`] cancels the whole navigation;
    /// [`NavigationAction::Redirect`] replaces its target. Dialogs opened here
    /// must be closed before the future completes.
    fn on_navigating_away<'a>(
        &'a self,
        _args: &'a NavigatingAwayArgs,
    ) -> LocalBoxFuture<'a, Result<NavigationAction>> {
        Box::pin(async { Ok(NavigationAction::Continue) })
    }

    /// Unconditional notification that the view-model is no longer shown.
    fn on_navigated_away(&self) {}

    /// Incoming navigation notification.
    ///
    /// Returning [`NavigationAction::Redirect`] abandons the rest of the chain
    /// and restarts the navigation against the redirect target.
    /// [`NavigationAction::Deny`] is not meaningful here and is ignored.
    fn on_navigated_to<'a>(
        &'a self,
        _args: &'a NavigatedToArgs,
    ) -> LocalBoxFuture<'a, Result<NavigationAction>> {
        Box::pin(async { Ok(NavigationAction::Continue) })
    }

    /// Whether the materialized view may stay alive in back/forward history.
    fn can_be_cached(&self) -> bool {
        true
    }

    /// Expose a dependency of type `ty` to descendant view-models.
    fn provide(&self, _ty: TypeId) -> Option<Rc<dyn Any>> {
        None
    }

    /// Teardown when the materialized view is evicted.
    fn dispose(&self) {}

    /// Name used in log records.
    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_action_continue() {
        let action = NavigationAction::Continue;
        assert!(action.is_continue());
        assert!(!action.is_deny());
        assert!(!action.is_redirect());
        assert_eq!(action.redirect_path(), None);
        assert_eq!(NavigationAction::allow(), action);
    }

    #[test]
    fn test_navigation_action_deny() {
        let action = NavigationAction::deny("Not now");
        assert!(action.is_deny());
        match action {
            NavigationAction::Deny { reason } => assert_eq!(reason, "Not now"),
            _ => panic!("Expected Deny"),
        }
    }

    #[test]
    fn test_navigation_action_redirect_with_reason() {
        let action = NavigationAction::redirect_with_reason("/login", "Auth required");
        assert_eq!(action.redirect_path(), Some("/login"));
        match action {
            NavigationAction::Redirect { to, reason } => {
                assert_eq!(to, "/login");
                assert_eq!(reason, Some("Auth required".to_string()));
            }
            _ => panic!("Expected Redirect"),
        }
    }

    struct Passive;
    impl ViewModel for Passive {}

    #[test]
    fn test_view_model_defaults() {
        let vm = Passive;
        assert!(vm.can_be_cached());
        assert!(vm.provide(TypeId::of::<u32>()).is_none());
        assert!(vm.debug_name().ends_with("Passive"));
    }
}
