//! Error handling for the navigator.
//!
//! Two types describe how a navigation request ended:
//!
//! - [`NavigationResult`]: the normal outcomes of the protocol (`Success`,
//!   `Cancelled`, `Rerouted`). A cancelled or rerouted navigation is not an
//!   error: some participant asked for it to stop, or a newer request took
//!   its place.
//! - [`NavigationError`]: everything that is a real failure: misconfigured
//!   route graphs, unroutable paths, illegal reentrancy, broken
//!   view/view-model wiring and errors raised by lifecycle callbacks.
//!
//! # Examples
//!
//! ```
//! use view_navigator::{NavigationError, NavigationResult};
//!
//! let result = NavigationResult::Success { path: "/home".into() };
//! assert!(result.is_success());
//!
//! let err = NavigationError::RouteNotFound { path: "/nowhere".into() };
//! assert_eq!(err.to_string(), "Route not found: /nowhere");
//! ```

use std::fmt;

/// Crate-wide result alias.
pub type Result<T, E = NavigationError> = std::result::Result<T, E>;

// ============================================================================
// Navigation Result
// ============================================================================

/// Outcome of a navigation request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// The target route was committed and every participant was notified.
    Success { path: String },
    /// A participant refused to be navigated away from; nothing changed.
    Cancelled { reason: String },
    /// A newer navigation superseded this one before it finished.
    Rerouted,
}

impl NavigationResult {
    /// Check if navigation was successful
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    /// Check if navigation was cancelled by a participant
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NavigationResult::Cancelled { .. })
    }

    /// Check if navigation was superseded
    pub fn is_rerouted(&self) -> bool {
        matches!(self, NavigationResult::Rerouted)
    }

    /// Committed path, if the navigation succeeded.
    pub fn path(&self) -> Option<&str> {
        match self {
            NavigationResult::Success { path } => Some(path),
            _ => None,
        }
    }
}

// ============================================================================
// Navigation Error
// ============================================================================

/// Failures raised by route registration, resolution, materialization and
/// the navigation and dialog protocols.
///
/// Every error is detected before any state is mutated, except errors raised
/// by lifecycle callbacks after a navigation has committed, which propagate
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The route graph or a registry was set up incorrectly.
    Configuration { message: String },

    /// A route template could not be compiled.
    Template { template: String, message: String },

    /// Parameter values could not be formatted into a path.
    Format { message: String },

    /// No registered route chain matches the path.
    RouteNotFound { path: String },

    /// A typed route resolved to a different chain than the one requested.
    RouteMismatch { requested: String, resolved: String },

    /// The operation is not allowed in the current navigator state.
    InvalidOperation { message: String },

    /// A view-model constructor asked for a dependency nobody provides.
    DependencyResolution {
        dependency: &'static str,
        requested_by: &'static str,
    },

    /// A view and its view-model disagree about their binding.
    Consistency { message: String },

    /// Redirects kept bouncing between routes.
    RedirectLoop { depth: usize, path: String },

    /// A lifecycle callback reported a failure.
    Lifecycle { message: String },
}

impl NavigationError {
    /// Shorthand for [`NavigationError::InvalidOperation`].
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Shorthand for [`NavigationError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for [`NavigationError::Consistency`].
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Shorthand for [`NavigationError::Lifecycle`], for use inside callbacks.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Errors that indicate broken wiring rather than a bad request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NavigationError::Configuration { .. }
                | NavigationError::Template { .. }
                | NavigationError::DependencyResolution { .. }
                | NavigationError::Consistency { .. }
        )
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            NavigationError::Template { template, message } => {
                write!(f, "Invalid route template '{}': {}", template, message)
            }
            NavigationError::Format { message } => {
                write!(f, "Cannot format route: {}", message)
            }
            NavigationError::RouteNotFound { path } => {
                write!(f, "Route not found: {}", path)
            }
            NavigationError::RouteMismatch {
                requested,
                resolved,
            } => {
                write!(
                    f,
                    "Route mismatch: requested '{}' but the path resolves to '{}'",
                    requested, resolved
                )
            }
            NavigationError::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
            NavigationError::DependencyResolution {
                dependency,
                requested_by,
            } => {
                write!(
                    f,
                    "Cannot resolve dependency {} for {}",
                    dependency, requested_by
                )
            }
            NavigationError::Consistency { message } => {
                write!(f, "Consistency error: {}", message)
            }
            NavigationError::RedirectLoop { depth, path } => {
                write!(
                    f,
                    "Redirect loop detected (depth {}): target '{}'",
                    depth, path
                )
            }
            NavigationError::Lifecycle { message } => {
                write!(f, "Lifecycle callback failed: {}", message)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

// ============================================================================
// Tests
// ============================================================================
