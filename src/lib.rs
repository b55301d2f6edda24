//! # view-navigator
//!
//! A stateful, hierarchical navigation router for view/view-model UIs.
//!
//! Routes are chains of parts, one per nesting level. Each part is a path
//! template bound to a view-model type; a part may only be nested under a
//! parent whose view hosts children. The navigator keeps a back/forward
//! history of materialized routes, reuses the view-models two routes have in
//! common, keeps recently visited views alive in a bounded cache and runs a
//! modal dialog stack next to the page hierarchy.
//!
//! ## Features
//!
//! - Typed path templates such as `items/{id}` with `id: uint`
//! - Nested routes with prefix reuse and partial navigation
//! - Cancellable navigation away and redirects from either side
//! - Last-writer-wins concurrency: a newer navigation reroutes older ones
//! - Back/forward view cache with per-view-model opt-out
//! - Modal dialogs with async results and a dismiss protocol
//! - Optional LRU cache for path resolution (feature `cache`)
//! - Logging through `log` or `tracing` (features `log`, `tracing`)
//!
//! ## Quick start
//!
//! ```ignore
//! use std::rc::Rc;
//! use view_navigator::*;
//!
//! struct Shell;
//! impl ViewModel for Shell {}
//!
//! struct Detail {
//!     id: u64,
//! }
//! impl ViewModel for Detail {}
//!
//! let navigator = Navigator::builder()
//!     .view(ViewRegistration::new(|_| Ok(Shell), ShellView::new).hosting_children())
//!     .view(ViewRegistration::new(
//!         |ctx| Ok(Detail { id: ctx.params().get_as("id").unwrap_or_default() }),
//!         DetailView::new,
//!     ))
//!     .route(RouteDefinition::new::<Shell>(""))
//!     .route(
//!         RouteDefinition::new::<Detail>("items/{id}")
//!             .param("id", ParamKind::UInt)
//!             .child_of::<Shell>(),
//!     )
//!     .build()?;
//!
//! let result = navigator.navigate("/items/42").await?;
//! assert_eq!(result.path(), Some("/items/42"));
//! ```
//!
//! Every handle is `Rc`-based: the navigator lives on one thread, the UI
//! thread, and hands work to the host through a [`TaskRunner`].

#![cfg_attr(docsrs, feature(doc_cfg))]

// Logging macros first so every module below can use them.
#[macro_use]
pub mod logging;

pub mod config;
pub mod dialog;
pub mod error;
pub mod graph;
pub mod item;
pub mod lifecycle;
pub mod navigator;
pub mod params;
pub mod route;
pub mod services;
pub mod state;
pub mod task;
pub mod template;
pub mod view;

mod blocking;

#[cfg(feature = "cache")]
#[cfg_attr(docsrs, doc(cfg(feature = "cache")))]
pub mod cache;

pub use config::NavigatorConfig;
pub use dialog::{
    DialogContent, DialogFrame, DialogHandle, DialogId, DialogPresenter, DialogRegistration,
    DialogResult, DialogSurface, DialogViewModel, NullSurface,
};
pub use error::{NavigationError, NavigationResult, Result};
pub use graph::RouteGraph;
pub use item::RouteItem;
pub use lifecycle::{
    NavigatedToArgs, NavigatingAwayArgs, NavigationAction, NavigationKind, ViewModel,
};
pub use navigator::{NavigationState, Navigator, NavigatorBuilder, WeakNavigator};
pub use params::{ParamKind, ParamValue, RouteParams};
pub use route::{
    ConcreteRoutePart, Route, RouteDefinition, RouteDescriptor, RouteOptions, RoutePart,
    RoutePartId, TypeKey,
};
pub use services::{NoServices, ResolveContext, ServiceCollection, ServiceLookup};
pub use state::{HistoryEntry, HistoryList};
pub use task::{run_as_busy, BusyScope, LocalTaskRunner, TaskRunner};
pub use template::RouteTemplate;
pub use view::{same_view, ContentSlot, NestedHost, View, ViewRegistration, ViewRegistry};

#[cfg(feature = "cache")]
pub use cache::{CacheStats, RouteCache};
