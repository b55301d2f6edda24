//! The route graph and full-path matching.
//!
//! Registered [`RoutePart`]s form a forest: root parts have no parent, child
//! parts hang below every part whose view-model type is their declared
//! parent type. A path resolves to the first root-to-leaf chain, in
//! registration order, whose templates consume the whole path.
//!
//! # Matching
//!
//! ```text
//! path: /shell/items/42
//!
//! roots:   Shell("shell")      → remainder "items/42"
//! ├─ Home("home")              ✗
//! └─ Item("items/{id}")        → remainder ""   ✓
//!
//! chain: [Shell, Item{id=42}]
//! ```
//!
//! The search is a depth-first backtracking walk without memoization.
//! Results are optionally remembered per path by a [`RouteCache`]
//! (feature `cache`); the graph never changes after it is built, so cached
//! results never go stale.

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, RouteCache};
use crate::error::{NavigationError, Result};
use crate::route::{
    ConcreteRoutePart, Route, RouteDefinition, RouteDescriptor, RouteOptions, RoutePart,
    RoutePartId, TypeKey,
};
use crate::view::ViewRegistry;
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
#[cfg(feature = "cache")]
use std::cell::RefCell;
use std::rc::Rc;

/// Maximum nesting depth followed by the matcher.
const MAX_DEPTH: usize = 16;

/// Registered route parts, in registration order.
#[derive(Debug, Default)]
pub struct RouteGraph {
    parts: Vec<Rc<RoutePart>>,
    #[cfg(feature = "cache")]
    cache: Option<RefCell<RouteCache>>,
}

impl RouteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember up to `capacity` resolved paths. Zero disables the cache.
    #[cfg(feature = "cache")]
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| RefCell::new(RouteCache::with_capacity(capacity)));
        self
    }

    /// Register a route part.
    ///
    /// The view-model must have a registered view; a declared parent must
    /// already have a registered route and a view that hosts children.
    pub fn add_route(
        &mut self,
        definition: &RouteDefinition,
        views: &ViewRegistry,
    ) -> Result<RoutePartId> {
        let key = definition.view_model();
        if !views.contains(key) {
            error_log!(
                "Route '{}' registered for {} without a view",
                definition.template,
                key.name()
            );
            return Err(NavigationError::configuration(format!(
                "no view registered for {}",
                key.name()
            )));
        }

        if let Some(parent) = definition.parent {
            if !self.parts.iter().any(|p| p.view_model() == parent) {
                error_log!(
                    "Route '{}' declares parent {} which has no registered route",
                    definition.template,
                    parent.name()
                );
                return Err(NavigationError::configuration(format!(
                    "parent {} of {} has no registered route",
                    parent.name(),
                    key.name()
                )));
            }
            let hosts = views.get(parent).is_some_and(|r| r.hosts_children());
            if !hosts {
                error_log!("View of {} cannot host nested navigation", parent.name());
                return Err(NavigationError::configuration(format!(
                    "view of {} does not host nested navigation, so {} cannot be its child",
                    parent.name(),
                    key.name()
                )));
            }
        }

        let id = RoutePartId(self.parts.len());
        let part = RoutePart::compile(id, definition)?;
        info_log!(
            "Registered route {} '{}' → {}{}",
            id,
            definition.template,
            key.name(),
            definition
                .parent
                .map(|p| format!(" (child of {})", p.name()))
                .unwrap_or_default()
        );
        self.parts.push(Rc::new(part));
        Ok(id)
    }

    /// All parts in registration order.
    pub fn parts(&self) -> &[Rc<RoutePart>] {
        &self.parts
    }

    pub fn get(&self, id: RoutePartId) -> Option<&Rc<RoutePart>> {
        self.parts.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts directly below `parent` (`None` for the roots).
    pub fn children_of(&self, parent: Option<TypeKey>) -> impl Iterator<Item = &Rc<RoutePart>> {
        self.parts.iter().filter(move |p| p.parent() == parent)
    }

    // ------------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------------

    /// Resolve `path` (no query or anchor) to a chain of concrete parts.
    ///
    /// Consults the resolution cache when one is configured.
    pub fn resolve(&self, path: &str) -> Option<Vec<ConcreteRoutePart>> {
        #[cfg(feature = "cache")]
        {
            if let Some(cache) = &self.cache {
                let cached = cache.borrow_mut().get(path);
                if let Some(cached) = cached {
                    return cached;
                }
                let resolved = self.match_full_path(path);
                cache.borrow_mut().insert(path.to_string(), resolved.clone());
                return resolved;
            }
        }
        self.match_full_path(path)
    }

    /// Backtracking search for the first chain consuming all of `path`.
    pub fn match_full_path(&self, path: &str) -> Option<Vec<ConcreteRoutePart>> {
        let mut chain = Vec::new();
        if self.match_level(None, path, 0, &mut chain) {
            debug_log!(
                "Resolved path '{}' → {} levels: [{}]",
                path,
                chain.len(),
                chain
                    .iter()
                    .map(|c| c.part().view_model().name())
                    .collect::<Vec<_>>()
                    .join(" → ")
            );
            Some(chain)
        } else {
            debug_log!("No route matches '{}'", path);
            None
        }
    }

    /// Match `relative` against the subtree below view-model type `parent`.
    pub fn match_below(&self, parent: TypeKey, relative: &str) -> Option<Vec<ConcreteRoutePart>> {
        let mut chain = Vec::new();
        self.match_level(Some(parent), relative, 0, &mut chain)
            .then_some(chain)
    }

    fn match_level(
        &self,
        parent: Option<TypeKey>,
        remaining: &str,
        depth: usize,
        chain: &mut Vec<ConcreteRoutePart>,
    ) -> bool {
        if depth >= MAX_DEPTH {
            warn_log!(
                "Maximum route nesting depth ({}) exceeded. Check for self-nested routes.",
                MAX_DEPTH
            );
            return false;
        }

        for part in self.children_of(parent) {
            let Some(matched) = part.template().match_path(remaining) else {
                continue;
            };
            trace_log!(
                "Level {}: '{}' matched {} (remainder '{}')",
                depth,
                part.template().source(),
                part.view_model().name(),
                matched.remainder
            );
            chain.push(ConcreteRoutePart::from_values(Rc::clone(part), matched.values));
            if matched.remainder.is_empty()
                || self.match_level(Some(part.view_model()), matched.remainder, depth + 1, chain)
            {
                return true;
            }
            chain.pop();
        }
        false
    }

    // ------------------------------------------------------------------------
    // Typed resolution
    // ------------------------------------------------------------------------

    /// Resolve a typed descriptor into a route.
    ///
    /// Each level picks the first part for its view-model type under the
    /// previous level that accepts the given parameters. The formatted path
    /// must resolve back to the same chain, otherwise the registration is
    /// ambiguous and [`NavigationError::RouteMismatch`] is returned.
    pub fn resolve_descriptor(&self, descriptor: &RouteDescriptor) -> Result<Route> {
        let mut parts = Vec::with_capacity(descriptor.levels.len());
        let mut parent = None;
        for (key, params) in &descriptor.levels {
            let concrete = self
                .children_of(parent)
                .filter(|p| p.view_model() == *key)
                .find_map(|p| ConcreteRoutePart::from_params(Rc::clone(p), params).ok())
                .ok_or_else(|| NavigationError::RouteNotFound {
                    path: describe(descriptor),
                })?;
            parts.push(concrete);
            parent = Some(*key);
        }
        if parts.is_empty() {
            return Err(NavigationError::RouteNotFound {
                path: describe(descriptor),
            });
        }

        let requested = Route::new(parts, RouteOptions::default())?;
        let resolved = self.resolve(requested.path());
        if resolved.as_deref() != Some(requested.parts()) {
            let resolved_path = resolved
                .map(|chain| {
                    chain
                        .iter()
                        .map(|c| c.part().view_model().name())
                        .collect::<Vec<_>>()
                        .join(" → ")
                })
                .unwrap_or_else(|| "<no route>".to_string());
            warn_log!(
                "Descriptor {} formats to '{}' which resolves to {}",
                describe(descriptor),
                requested.path(),
                resolved_path
            );
            return Err(NavigationError::RouteMismatch {
                requested: requested.path().to_string(),
                resolved: resolved_path,
            });
        }

        let parts = requested.parts().to_vec();
        Route::new(parts, descriptor.options.clone())
    }

    /// Statistics of the resolution cache, if one is configured.
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.borrow().stats().clone())
    }
}

fn describe(descriptor: &RouteDescriptor) -> String {
    descriptor
        .levels
        .iter()
        .map(|(key, _)| key.name())
        .collect::<Vec<_>>()
        .join(" → ")
}
