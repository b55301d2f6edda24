//! Route parts, concrete routes and route descriptors.
//!
//! - [`RouteDefinition`]: what the application registers: a view-model
//!   type, an optional parent view-model type and a template.
//! - [`RoutePart`]: a compiled, registered definition. Immutable; identity
//!   is its [`RoutePartId`] (registration order), so two parts with the same
//!   template text are still distinct.
//! - [`ConcreteRoutePart`]: a part plus its parameter values.
//! - [`Route`]: a root-to-leaf chain of concrete parts plus
//!   [`RouteOptions`], with its formatted path.
//! - [`RouteDescriptor`]: a typed way to ask for a route without writing
//!   the path string by hand.

use crate::error::{NavigationError, Result};
use crate::params::{ParamKind, ParamValue, RouteParams};
use crate::template::RouteTemplate;
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

// ============================================================================
// TypeKey
// ============================================================================

/// Stable identifier of a Rust type, used as a registry key.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// RouteDefinition
// ============================================================================

/// Registration request for one route part.
///
/// # Example
///
/// ```ignore
/// use view_navigator::{ParamKind, RouteDefinition};
///
/// let shell = RouteDefinition::new::<ShellViewModel>("");
/// let detail = RouteDefinition::new::<DetailViewModel>("items/{id}")
///     .param("id", ParamKind::UInt)
///     .child_of::<ShellViewModel>();
/// ```
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub(crate) view_model: TypeKey,
    pub(crate) parent: Option<TypeKey>,
    pub(crate) template: String,
    pub(crate) params: Vec<(String, ParamKind)>,
}

impl RouteDefinition {
    /// Define a root-level route for view-model type `VM`.
    pub fn new<VM: 'static>(template: impl Into<String>) -> Self {
        Self {
            view_model: TypeKey::of::<VM>(),
            parent: None,
            template: template.into(),
            params: Vec::new(),
        }
    }

    /// Declare the next parameter hole of the template.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push((name.into(), kind));
        self
    }

    /// Attach this route under routes whose view-model type is `P`.
    pub fn child_of<P: 'static>(mut self) -> Self {
        self.parent = Some(TypeKey::of::<P>());
        self
    }

    /// View-model type this definition maps to.
    pub fn view_model(&self) -> TypeKey {
        self.view_model
    }
}

// ============================================================================
// RoutePart
// ============================================================================

/// Identity of a registered route part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePartId(pub(crate) usize);

impl fmt::Display for RoutePartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A compiled node of the route graph.
#[derive(Debug)]
pub struct RoutePart {
    id: RoutePartId,
    view_model: TypeKey,
    parent: Option<TypeKey>,
    template: RouteTemplate,
}

impl RoutePart {
    pub(crate) fn compile(id: RoutePartId, definition: &RouteDefinition) -> Result<Self> {
        let params: Vec<(&str, ParamKind)> = definition
            .params
            .iter()
            .map(|(name, kind)| (name.as_str(), *kind))
            .collect();
        let template = RouteTemplate::compile(&definition.template, &params)?;
        Ok(Self {
            id,
            view_model: definition.view_model,
            parent: definition.parent,
            template,
        })
    }

    pub fn id(&self) -> RoutePartId {
        self.id
    }

    pub fn view_model(&self) -> TypeKey {
        self.view_model
    }

    pub fn parent(&self) -> Option<TypeKey> {
        self.parent
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ============================================================================
// ConcreteRoutePart
// ============================================================================

/// A route part with resolved parameter values.
///
/// Two concrete parts are equal iff they reference the same route part and
/// carry equal parameters.
#[derive(Debug, Clone)]
pub struct ConcreteRoutePart {
    part: Rc<RoutePart>,
    params: RouteParams,
}

impl ConcreteRoutePart {
    /// Pair `part` with values in hole order.
    pub(crate) fn from_values(part: Rc<RoutePart>, values: Vec<ParamValue>) -> Self {
        let params = part
            .template()
            .hole_names()
            .map(str::to_string)
            .zip(values)
            .collect();
        Self { part, params }
    }

    /// Pair `part` with named parameters, reordering them to hole order.
    ///
    /// Fails with [`NavigationError::Format`] when a hole has no value, a
    /// value has the wrong type, or extra names are supplied.
    pub fn from_params(part: Rc<RoutePart>, params: &RouteParams) -> Result<Self> {
        let mut ordered = RouteParams::new();
        for element in part.template().elements() {
            if let crate::template::TemplateElement::Hole { name, kind } = element {
                let Some(value) = params.get(name) else {
                    return Err(NavigationError::Format {
                        message: format!("missing value for parameter '{}'", name),
                    });
                };
                if value.kind() != *kind {
                    return Err(NavigationError::Format {
                        message: format!(
                            "parameter '{}' expects {} but got {}",
                            name,
                            kind,
                            value.kind()
                        ),
                    });
                }
                ordered.insert(name.clone(), value.clone());
            }
        }
        if ordered.len() != params.len() {
            return Err(NavigationError::Format {
                message: format!(
                    "template '{}' does not declare every supplied parameter",
                    part.template().source()
                ),
            });
        }
        Ok(Self {
            part,
            params: ordered,
        })
    }

    pub fn part(&self) -> &Rc<RoutePart> {
        &self.part
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Path segment(s) for this part, without a leading `/`.
    pub fn format(&self) -> Result<String> {
        self.part.template().format(&self.params.values())
    }
}

impl PartialEq for ConcreteRoutePart {
    fn eq(&self, other: &Self) -> bool {
        self.part.id() == other.part.id() && self.params == other.params
    }
}

// ============================================================================
// Route
// ============================================================================

/// Options carried alongside a route chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Fragment after `#`, handed to the leaf view-model.
    pub anchor: Option<String>,
}

/// A fully resolved navigable location.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    parts: Vec<ConcreteRoutePart>,
    options: RouteOptions,
    path: String,
}

impl Route {
    /// Build a route, formatting its canonical path.
    pub fn new(parts: Vec<ConcreteRoutePart>, options: RouteOptions) -> Result<Self> {
        let mut segments = Vec::with_capacity(parts.len());
        for part in &parts {
            let segment = part.format()?;
            if !segment.is_empty() {
                segments.push(segment);
            }
        }
        let mut path = format!("/{}", segments.join("/"));
        if let Some(anchor) = &options.anchor {
            path.push('#');
            path.push_str(anchor);
        }
        Ok(Self {
            parts,
            options,
            path,
        })
    }

    /// Concrete parts from root to leaf.
    pub fn parts(&self) -> &[ConcreteRoutePart] {
        &self.parts
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Canonical path, including the anchor if any.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of levels in the chain.
    pub fn depth(&self) -> usize {
        self.parts.len()
    }

    /// Parameters of every level merged, deeper levels winning.
    pub fn merged_params(&self) -> RouteParams {
        self.parts
            .iter()
            .fold(RouteParams::new(), |acc, part| RouteParams::merge(&acc, part.params()))
    }

    /// Length of the common prefix of concrete parts with `other`.
    pub fn common_prefix_len(&self, other: &Route) -> usize {
        self.parts
            .iter()
            .zip(other.parts.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

// ============================================================================
// Location parsing
// ============================================================================

/// A route string split into its path, query and anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location<'a> {
    pub path: &'a str,
    /// Accepted but not interpreted.
    pub query: Option<&'a str>,
    pub anchor: Option<&'a str>,
}

impl<'a> Location<'a> {
    /// Split `/a/b?query#anchor`.
    pub fn parse(input: &'a str) -> Self {
        let (rest, anchor) = match input.split_once('#') {
            Some((rest, anchor)) => (rest, Some(anchor)),
            None => (input, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        Self {
            path,
            query,
            anchor: anchor.filter(|a| !a.is_empty()),
        }
    }

    /// Route options derived from this location.
    pub fn options(&self) -> RouteOptions {
        RouteOptions {
            anchor: self.anchor.map(str::to_string),
        }
    }
}

// ============================================================================
// RouteDescriptor
// ============================================================================

/// Typed request for a route chain.
///
/// Each level names a view-model type and its parameters. The navigator
/// picks, per level, the first registered part for that type under the
/// previous level, formats the path and then checks that the path resolves
/// back to the same chain.
///
/// ```ignore
/// let descriptor = RouteDescriptor::root::<ShellViewModel>(RouteParams::new())
///     .child::<DetailViewModel>(RouteParams::new().with("id", 42_u64))
///     .anchor("comments");
/// navigator.navigate_to(descriptor).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteDescriptor {
    pub(crate) levels: Vec<(TypeKey, RouteParams)>,
    pub(crate) options: RouteOptions,
}

impl RouteDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a descriptor with its root level.
    pub fn root<VM: 'static>(params: RouteParams) -> Self {
        Self::new().level::<VM>(params)
    }

    /// Append a nested level below the previous one.
    pub fn child<VM: 'static>(self, params: RouteParams) -> Self {
        self.level::<VM>(params)
    }

    /// Append a level for view-model type `VM`.
    pub fn level<VM: 'static>(mut self, params: RouteParams) -> Self {
        self.levels.push((TypeKey::of::<VM>(), params));
        self
    }

    /// Set the anchor fragment.
    pub fn anchor(mut self, anchor: impl Into<String>) -> Self {
        self.options.anchor = Some(anchor.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
