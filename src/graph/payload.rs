//! Typed view over a loosely structured configuration dump.
//!
//! Navigation is explicit and fallible: a missing key is
//! [`PathError::NotFound`], a node of the wrong shape is
//! [`PathError::TypeMismatch`]. Callers decide which absences are benign.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::Error;

/// Failure to follow a path through a [`Payload`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path '{path}' not found")]
    NotFound { path: String },

    #[error("expected {expected} at '{path}'")]
    TypeMismatch { path: String, expected: &'static str },
}

impl PathError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PathError::NotFound { .. })
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Self {
        Error::serialization("config dump", err)
    }
}

/// Leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

/// Node of a configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Map(BTreeMap<String, Payload>),
    List(Vec<Payload>),
    Scalar(Scalar),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                Payload::Map(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
            Value::Array(items) => Payload::List(items.into_iter().map(Payload::from).collect()),
            Value::Null => Payload::Scalar(Scalar::Null),
            Value::Bool(b) => Payload::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Payload::Scalar(Scalar::Number(n)),
            Value::String(s) => Payload::Scalar(Scalar::String(s)),
        }
    }
}

impl Payload {
    /// Parse a JSON document
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::serialization("config dump", e))?;
        Ok(Payload::from(value))
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Payload::Map(_) => "map",
            Payload::List(_) => "list",
            Payload::Scalar(_) => "scalar",
        }
    }

    /// Child of a map node
    pub fn get(&self, key: &str) -> Result<&Payload, PathError> {
        match self {
            Payload::Map(map) => {
                map.get(key).ok_or_else(|| PathError::NotFound { path: key.to_string() })
            }
            _ => Err(PathError::TypeMismatch { path: key.to_string(), expected: "map" }),
        }
    }

    /// Follow a sequence of map keys
    pub fn get_path(&self, path: &[&str]) -> Result<&Payload, PathError> {
        let mut node = self;
        for (depth, key) in path.iter().enumerate() {
            node = node.get(key).map_err(|err| {
                let full = path[..=depth].join(".");
                match err {
                    PathError::NotFound { .. } => PathError::NotFound { path: full },
                    PathError::TypeMismatch { expected, .. } => {
                        PathError::TypeMismatch { path: full, expected }
                    }
                }
            })?;
        }
        Ok(node)
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Payload>, PathError> {
        match self {
            Payload::Map(map) => Ok(map),
            other => Err(PathError::TypeMismatch {
                path: other.kind_name().to_string(),
                expected: "map",
            }),
        }
    }

    pub fn as_list(&self) -> Result<&[Payload], PathError> {
        match self {
            Payload::List(items) => Ok(items),
            other => Err(PathError::TypeMismatch {
                path: other.kind_name().to_string(),
                expected: "list",
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, PathError> {
        match self {
            Payload::Scalar(Scalar::String(s)) => Ok(s),
            other => Err(PathError::TypeMismatch {
                path: other.kind_name().to_string(),
                expected: "string",
            }),
        }
    }

    /// List at `path`; an absent branch is an empty list
    pub fn list_at(&self, path: &[&str]) -> Result<&[Payload], PathError> {
        match self.get_path(path) {
            Ok(node) => node.as_list().map_err(|_| PathError::TypeMismatch {
                path: path.join("."),
                expected: "list",
            }),
            Err(err) if err.is_not_found() => Ok(&[]),
            Err(err) => Err(err),
        }
    }

    /// String at `path`; `None` when the branch is absent
    pub fn str_at(&self, path: &[&str]) -> Result<Option<&str>, PathError> {
        match self.get_path(path) {
            Ok(node) => node.as_str().map(Some).map_err(|_| PathError::TypeMismatch {
                path: path.join("."),
                expected: "string",
            }),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Node at `path`; `None` when the branch is absent
    pub fn node_at(&self, path: &[&str]) -> Result<Option<&Payload>, PathError> {
        match self.get_path(path) {
            Ok(node) => Ok(Some(node)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
