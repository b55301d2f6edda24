//! Route template compiler.
//!
//! A template such as `users/{id}/posts` compiles into an ordered list of
//! [`TemplateElement`]s: literal text and typed parameter holes:
//!
//! ```text
//! users/{id}/posts  →  [Literal("users/"), Hole(id: int), Literal("/posts")]
//! ```
//!
//! # Rules
//!
//! - segments are `/`-separated and may not be empty (`a//b` is rejected);
//! - a hole is written `{name}` and must end its segment, so `item-{id}` is
//!   valid but `{id}.json` is not;
//! - the holes must name, in order, exactly the parameters declared for the
//!   route part;
//! - two literals or two holes may never be adjacent.
//!
//! # Matching
//!
//! [`RouteTemplate::match_path`] consumes a prefix of a candidate path and
//! returns the parsed values plus the unconsumed remainder, which the route
//! graph feeds to child parts. Holes consume greedily up to the next `/`.
//!
//! ```
//! use view_navigator::{ParamKind, ParamValue, RouteTemplate};
//!
//! let template = RouteTemplate::compile("users/{id}", &[("id", ParamKind::Int)]).unwrap();
//! let m = template.match_path("/users/42/posts").unwrap();
//! assert_eq!(m.values, vec![ParamValue::Int(42)]);
//! assert_eq!(m.remainder, "posts");
//!
//! assert_eq!(template.format(&[ParamValue::Int(7)]).unwrap(), "users/7");
//! ```

use crate::error::{NavigationError, Result};
use crate::params::{ParamKind, ParamValue};

/// One compiled piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateElement {
    /// Text that must appear verbatim.
    Literal(String),
    /// A typed parameter occupying the rest of its segment.
    Hole { name: String, kind: ParamKind },
}

/// Result of matching a template against the front of a path.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMatch<'p> {
    /// Parsed values, one per hole, in template order.
    pub values: Vec<ParamValue>,
    /// Unconsumed rest of the path, without its leading `/`.
    pub remainder: &'p str,
}

/// A compiled route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    elements: Vec<TemplateElement>,
}

impl RouteTemplate {
    /// Compile `template` against the ordered list of declared parameters.
    pub fn compile(template: &str, params: &[(&str, ParamKind)]) -> Result<Self> {
        let err = |message: String| NavigationError::Template {
            template: template.to_string(),
            message,
        };

        let trimmed = trim_one_slash(template);
        let mut elements = Vec::new();
        let mut pending = String::new();
        let mut declared = params.iter();

        if !trimmed.is_empty() {
            for (index, segment) in trimmed.split('/').enumerate() {
                if segment.is_empty() {
                    return Err(err("empty path segment".to_string()));
                }
                if index > 0 {
                    pending.push('/');
                }

                let Some(open) = segment.find('{') else {
                    if segment.contains('}') {
                        return Err(err(format!("unmatched '}}' in segment '{}'", segment)));
                    }
                    pending.push_str(segment);
                    continue;
                };

                let prefix = &segment[..open];
                if prefix.contains('}') {
                    return Err(err(format!("unmatched '}}' in segment '{}'", segment)));
                }
                let rest = &segment[open + 1..];
                let Some(close) = rest.find('}') else {
                    return Err(err(format!("unterminated hole in segment '{}'", segment)));
                };
                let name = &rest[..close];
                if name.is_empty() || name.contains('{') {
                    return Err(err(format!("invalid hole name in segment '{}'", segment)));
                }
                if close + 1 != rest.len() {
                    return Err(err(format!(
                        "hole '{{{}}}' must end its segment '{}'",
                        name, segment
                    )));
                }

                let Some(&(declared_name, kind)) = declared.next() else {
                    return Err(err(format!("hole '{}' has no declared parameter", name)));
                };
                if declared_name != name {
                    return Err(err(format!(
                        "hole '{}' does not match declared parameter '{}'",
                        name, declared_name
                    )));
                }

                pending.push_str(prefix);
                if !pending.is_empty() {
                    elements.push(TemplateElement::Literal(std::mem::take(&mut pending)));
                }
                elements.push(TemplateElement::Hole {
                    name: name.to_string(),
                    kind,
                });
            }
        }

        if let Some((missing, _)) = declared.next() {
            return Err(err(format!(
                "declared parameter '{}' has no hole in the template",
                missing
            )));
        }
        if !pending.is_empty() {
            elements.push(TemplateElement::Literal(pending));
        }

        Self::from_elements(template, elements)
    }

    /// Build a template from already-split elements, validating adjacency.
    pub fn from_elements(source: impl Into<String>, elements: Vec<TemplateElement>) -> Result<Self> {
        let source = source.into();
        for pair in elements.windows(2) {
            let adjacent = match (&pair[0], &pair[1]) {
                (TemplateElement::Literal(_), TemplateElement::Literal(_)) => Some("literals"),
                (TemplateElement::Hole { .. }, TemplateElement::Hole { .. }) => Some("holes"),
                _ => None,
            };
            if let Some(what) = adjacent {
                return Err(NavigationError::Template {
                    template: source,
                    message: format!("adjacent {} have an ambiguous boundary", what),
                });
            }
        }
        for (index, element) in elements.iter().enumerate() {
            if let TemplateElement::Literal(text) = element {
                if text.is_empty() || text.contains("//") {
                    return Err(NavigationError::Template {
                        template: source,
                        message: "empty literal or path segment".to_string(),
                    });
                }
                let follows_hole = index > 0;
                if follows_hole && !text.starts_with('/') {
                    return Err(NavigationError::Template {
                        template: source,
                        message: "a hole must end its segment".to_string(),
                    });
                }
            }
        }
        Ok(Self { source, elements })
    }

    /// The template text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiled elements in order.
    pub fn elements(&self) -> &[TemplateElement] {
        &self.elements
    }

    /// `true` for the empty template, which matches without consuming input.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Names of the holes in order.
    pub fn hole_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            TemplateElement::Hole { name, .. } => Some(name.as_str()),
            TemplateElement::Literal(_) => None,
        })
    }

    /// Number of holes.
    pub fn hole_count(&self) -> usize {
        self.hole_names().count()
    }

    /// Produce a path (without leading `/`) from values in hole order.
    ///
    /// Each value is written in its canonical form and percent-escaped, so a
    /// value containing `/` cannot break segment boundaries. Empty values are
    /// rejected because they would produce an empty segment.
    pub fn format(&self, values: &[ParamValue]) -> Result<String> {
        if values.len() != self.hole_count() {
            return Err(NavigationError::Format {
                message: format!(
                    "template '{}' expects {} values, got {}",
                    self.source,
                    self.hole_count(),
                    values.len()
                ),
            });
        }

        let mut out = String::new();
        let mut values = values.iter();
        for element in &self.elements {
            match element {
                TemplateElement::Literal(text) => out.push_str(text),
                TemplateElement::Hole { name, kind } => {
                    let Some(value) = values.next() else {
                        break;
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
                    let text = value.to_canonical_string();
                    if text.is_empty() {
                        return Err(NavigationError::Format {
                            message: format!("parameter '{}' formats to an empty string", name),
                        });
                    }
                    out.push_str(&urlencoding::encode(&text));
                }
            }
        }
        Ok(out)
    }

    /// Match the front of `candidate`.
    ///
    /// Returns `None` on any mismatch: wrong literal, empty hole, value that
    /// fails to parse, a doubled `/`, or a match that ends mid-segment.
    pub fn match_path<'p>(&self, candidate: &'p str) -> Option<TemplateMatch<'p>> {
        let path = trim_one_slash(candidate);
        if path.contains("//") || path.starts_with('/') || path.ends_with('/') {
            return None;
        }

        let mut rest = path;
        let mut values = Vec::with_capacity(self.hole_count());
        for element in &self.elements {
            match element {
                TemplateElement::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                }
                TemplateElement::Hole { kind, .. } => {
                    let end = rest.find('/').unwrap_or(rest.len());
                    if end == 0 {
                        return None;
                    }
                    let decoded = urlencoding::decode(&rest[..end]).ok()?;
                    values.push(ParamValue::parse(*kind, &decoded)?);
                    rest = &rest[end..];
                }
            }
        }

        let consumed = path.len() - rest.len();
        let remainder = if consumed > 0 && !rest.is_empty() {
            rest.strip_prefix('/')?
        } else {
            rest
        };

        Some(TemplateMatch { values, remainder })
    }
}

/// Strip at most one leading and one trailing `/`.
pub(crate) fn trim_one_slash(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str, params: &[(&str, ParamKind)]) -> RouteTemplate {
        RouteTemplate::compile(template, params).unwrap()
    }

    #[test]
    fn test_compile_elements() {
        let t = compile("users/{id}/posts", &[("id", ParamKind::Int)]);
        assert_eq!(
            t.elements(),
            &[
                TemplateElement::Literal("users/".into()),
                TemplateElement::Hole {
                    name: "id".into(),
                    kind: ParamKind::Int
                },
                TemplateElement::Literal("/posts".into()),
            ]
        );
    }

    #[test]
    fn test_compile_empty_template() {
        assert!(compile("", &[]).is_empty());
        assert!(compile("/", &[]).is_empty());
    }

    #[test]
    fn test_compile_rejects_bad_templates() {
        let bad: &[(&str, &[(&str, ParamKind)])] = &[
            ("a//b", &[]),
            ("{id}.json", &[("id", ParamKind::Int)]),
            ("{a}{b}", &[("a", ParamKind::Int), ("b", ParamKind::Int)]),
            ("{id", &[("id", ParamKind::Int)]),
            ("id}", &[]),
            ("{}", &[]),
            ("{id}", &[]),
            ("{id}", &[("other", ParamKind::Int)]),
            ("users", &[("id", ParamKind::Int)]),
        ];
        for (template, params) in bad {
            let result = RouteTemplate::compile(template, params);
            assert!(
                matches!(result, Err(NavigationError::Template { .. })),
                "template '{}' should be rejected",
                template
            );
        }
    }

    #[test]
    fn test_holes_must_follow_declared_order() {
        let params = [("a", ParamKind::Int), ("b", ParamKind::Int)];
        assert!(RouteTemplate::compile("{a}/{b}", &params).is_ok());
        assert!(RouteTemplate::compile("{b}/{a}", &params).is_err());
    }

    #[test]
    fn test_from_elements_rejects_adjacent_literals() {
        let result = RouteTemplate::from_elements(
            "x",
            vec![
                TemplateElement::Literal("a".into()),
                TemplateElement::Literal("b".into()),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_match_literal_prefix() {
        let t = compile("settings", &[]);
        let m = t.match_path("/settings/profile").unwrap();
        assert!(m.values.is_empty());
        assert_eq!(m.remainder, "profile");

        assert!(t.match_path("/settingsx").is_none());
        assert!(t.match_path("/other").is_none());
        assert_eq!(t.match_path("settings/").unwrap().remainder, "");
    }

    #[test]
    fn test_empty_template_consumes_nothing() {
        let t = compile("", &[]);
        assert_eq!(t.match_path("/Home/Detail").unwrap().remainder, "Home/Detail");
        assert_eq!(t.match_path("/").unwrap().remainder, "");
    }

    #[test]
    fn test_match_rejects_double_slash_and_empty_hole() {
        let t = compile("users/{id}", &[("id", ParamKind::Str)]);
        assert!(t.match_path("/users//x").is_none());
        assert!(t.match_path("//users/1").is_none());
        assert!(t.match_path("/users/").is_none());
        assert!(t.match_path("/users").is_none());
    }

    #[test]
    fn test_type_parse_failure_is_a_non_match() {
        let t = compile("users/{id}", &[("id", ParamKind::Int)]);
        assert!(t.match_path("/users/abc").is_none());
    }

    #[test]
    fn test_hole_with_literal_prefix() {
        let t = compile("item-{id}", &[("id", ParamKind::UInt)]);
        let m = t.match_path("item-12/rest").unwrap();
        assert_eq!(m.values, vec![ParamValue::UInt(12)]);
        assert_eq!(m.remainder, "rest");
    }

    #[test]
    fn test_format_escapes_values() {
        let t = compile("search/{q}", &[("q", ParamKind::Str)]);
        let path = t.format(&[ParamValue::Str("a/b c".into())]).unwrap();
        assert_eq!(path, "search/a%2Fb%20c");

        let m = t.match_path(&path).unwrap();
        assert_eq!(m.values, vec![ParamValue::Str("a/b c".into())]);
        assert_eq!(m.remainder, "");
    }

    #[test]
    fn test_format_errors() {
        let t = compile("search/{q}", &[("q", ParamKind::Str)]);
        assert!(matches!(
            t.format(&[ParamValue::Str(String::new())]),
            Err(NavigationError::Format { .. })
        ));
        assert!(matches!(
            t.format(&[ParamValue::Int(1)]),
            Err(NavigationError::Format { .. })
        ));
        assert!(matches!(t.format(&[]), Err(NavigationError::Format { .. })));
    }

    #[test]
    fn test_format_then_match_round_trip() {
        let t = compile(
            "at/{day}/{n}/{flag}",
            &[
                ("day", ParamKind::Date),
                ("n", ParamKind::Float),
                ("flag", ParamKind::Bool),
            ],
        );
        let values = vec![
            ParamValue::parse(ParamKind::Date, "2023-07-04").unwrap(),
            ParamValue::Float(-3.75),
            ParamValue::Bool(true),
        ];
        let path = t.format(&values).unwrap();
        assert_eq!(t.match_path(&path).unwrap().values, values);
    }
}
