//! Route path parsing.
//!
//! A route path such as `/person/{person_id:uuid}/posts` is normalized and
//! split into literal segments and typed parameter definitions. Every
//! parameter must declare a type:
//!
//! - `/items/{id:int}` - integer parameter (`i64`)
//! - `/values/{val:float}` - floating point parameter (`f64`)
//! - `/objects/{id:uuid}` - UUID parameter
//! - `/users/{name:str}` - string parameter
//! - `/files/{file:path}` - captures the rest of the path, must be last

use std::collections::HashSet;
use std::fmt;

use crate::error::ConfigError;
use crate::params::ParamValue;

/// Path parameter type converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    /// String.
    Str,
    /// Integer (i64).
    Int,
    /// Float (f64).
    Float,
    /// UUID.
    Uuid,
    /// Remainder of the path (can contain /).
    Path,
}

impl Converter {
    /// Look up a converter by its type keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "uuid" => Some(Self::Uuid),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    /// The type keyword used in route paths.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Uuid => "uuid",
            Self::Path => "path",
        }
    }

    /// Convert a raw path token into a typed value.
    ///
    /// Returns `None` when the token does not parse as the declared type.
    #[must_use]
    pub fn convert(self, raw: &str) -> Option<ParamValue> {
        match self {
            Self::Str => Some(ParamValue::Str(raw.to_string())),
            Self::Int => raw.parse::<i64>().ok().map(ParamValue::Int),
            Self::Float => raw.parse::<f64>().ok().map(ParamValue::Float),
            Self::Uuid => uuid::Uuid::parse_str(raw).ok().map(ParamValue::Uuid),
            Self::Path => Some(ParamValue::Path(raw.to_string())),
        }
    }

    /// Check if a raw token converts under this converter.
    #[must_use]
    pub fn matches(self, raw: &str) -> bool {
        self.convert(raw).is_some()
    }
}

/// Path parameter definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDef {
    /// Parameter name.
    pub name: String,
    /// Type converter.
    pub converter: Converter,
}

impl ParamDef {
    /// Create a new parameter definition.
    #[must_use]
    pub fn new(name: impl Into<String>, converter: Converter) -> Self {
        Self {
            name: name.into(),
            converter,
        }
    }

    /// The `name:type` form used inside route paths.
    #[must_use]
    pub fn full(&self) -> String {
        format!("{}:{}", self.name, self.converter.keyword())
    }
}

/// A parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A literal segment (e.g. `users`).
    Literal(String),
    /// A typed parameter segment.
    Param(ParamDef),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Param(def) => write!(f, "{{{}}}", def.full()),
        }
    }
}

/// A normalized, parsed route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// The normalized path, parameters included (`/items/{item_id:int}`).
    pub path: String,
    /// The path format used for documentation (`/items/{item_id}`).
    pub path_format: String,
    /// Ordered segments.
    pub segments: Vec<PathSegment>,
}

impl ParsedPath {
    /// Parse and validate a route path.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let path = normalize_path(raw);
        let mut segments = Vec::new();
        let mut seen = HashSet::new();

        for component in path.split('/').filter(|c| !c.is_empty()) {
            let Some(inner) = component
                .strip_prefix('{')
                .and_then(|c| c.strip_suffix('}'))
            else {
                segments.push(PathSegment::Literal(component.to_string()));
                continue;
            };

            let def = parse_parameter(&path, component, inner)?;
            if !seen.insert(def.name.clone()) {
                return Err(ConfigError::DuplicateParameter {
                    path: path.clone(),
                    name: def.name,
                });
            }
            segments.push(PathSegment::Param(def));
        }

        let last = segments.len().saturating_sub(1);
        for (idx, segment) in segments.iter().enumerate() {
            if let PathSegment::Param(def) = segment {
                if def.converter == Converter::Path && idx != last {
                    return Err(ConfigError::PathParameterNotLast {
                        path: path.clone(),
                        name: def.name.clone(),
                    });
                }
            }
        }

        let path_format = join_paths(segments.iter().map(|s| match s {
            PathSegment::Literal(lit) => lit.clone(),
            PathSegment::Param(def) => format!("{{{}}}", def.name),
        }));

        Ok(Self {
            path,
            path_format,
            segments,
        })
    }

    /// Iterate over the parameter definitions in path order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParamDef> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Param(def) => Some(def),
            PathSegment::Literal(_) => None,
        })
    }

    /// Returns `true` if the path declares no parameters.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.parameters().next().is_none()
    }
}

fn parse_parameter(path: &str, component: &str, inner: &str) -> Result<ParamDef, ConfigError> {
    let mut parts = inner.split(':');
    let (Some(name), Some(type_name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ConfigError::MalformedParameter {
            path: path.to_string(),
            segment: component.to_string(),
        });
    };

    let name = name.trim();
    let type_name = type_name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyParameterName {
            path: path.to_string(),
        });
    }

    let converter =
        Converter::from_keyword(type_name).ok_or_else(|| ConfigError::UnknownParameterType {
            path: path.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
        })?;

    Ok(ParamDef::new(name, converter))
}

/// Normalize a path: leading slash, no trailing slash (except for the root),
/// duplicate slashes collapsed and surrounding whitespace removed.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    join_paths(path.trim().split('/').filter(|c| !c.is_empty()))
}

/// Join path components into a normalized path.
#[must_use]
pub fn join_paths<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for component in components {
        for part in component.as_ref().split('/').filter(|c| !c.is_empty()) {
            out.push('/');
            out.push_str(part);
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
