//! Normalization and resolution of object paths.
//!
//! Namespaced objects are addressed as `/namespace/name`, `namespace/name`,
//! or a bare `name` that is resolved against the session's default namespace.

use std::fmt;

use thiserror::Error;

/// Sequences that may never appear in a path.
const INVALID_SEQUENCES: [&str; 3] = ["..", " ", ";"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path '{path}' contains invalid sequence '{sequence}'")]
    InvalidSequence {
        path: String,
        sequence: &'static str,
    },
    #[error("path '{path}' has {found} segments, expected at most {max}")]
    TooManySegments {
        path: String,
        found: usize,
        max: usize,
    },
    #[error("no namespace given for '{0}' and no default namespace configured")]
    NoNamespace(String),
}

/// Normalize a path.
///
/// Leading, trailing and repeated slashes are dropped and the path is
/// lowercased. With `case_sensitive_uid` the last segment keeps its case,
/// which is used for geography identifiers.
pub fn normalize_path(path: &str, case_sensitive_uid: bool) -> Result<String, PathError> {
    if let Some(sequence) = INVALID_SEQUENCES
        .into_iter()
        .find(|sequence| path.contains(sequence))
    {
        return Err(PathError::InvalidSequence {
            path: path.to_string(),
            sequence,
        });
    }

    let segments = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    let Some((last, parents)) = segments.split_last() else {
        return Err(PathError::Empty);
    };

    let mut normalized = parents
        .iter()
        .map(|segment| format!("{}/", segment.to_lowercase()))
        .collect::<String>();
    if case_sensitive_uid {
        normalized.push_str(last);
    } else {
        normalized.push_str(&last.to_lowercase());
    }
    Ok(normalized)
}

/// Normalize a path that must not have more than `max` segments.
pub fn normalize_path_with_max(
    path: &str,
    case_sensitive_uid: bool,
    max: usize,
) -> Result<String, PathError> {
    let normalized = normalize_path(path, case_sensitive_uid)?;
    let found = normalized.split('/').count();
    if found > max {
        return Err(PathError::TooManySegments {
            path: path.to_string(),
            found,
            max,
        });
    }
    Ok(normalized)
}

/// A namespaced object address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    pub namespace: String,
    pub name: String,
}

impl ObjectPath {
    /// The path below a collection endpoint, e.g. `census/total_pop`.
    pub fn relative(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.name)
    }
}

/// Resolve a possibly namespace-qualified path.
///
/// Bare names use `default_namespace`.
pub fn resolve(path: &str, default_namespace: Option<&str>) -> Result<ObjectPath, PathError> {
    let normalized = normalize_path_with_max(path, false, 2)?;
    match normalized.split_once('/') {
        Some((namespace, name)) => Ok(ObjectPath {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }),
        None => {
            let namespace = default_namespace.ok_or_else(|| PathError::NoNamespace(path.to_string()))?;
            Ok(ObjectPath {
                namespace: normalize_namespace(namespace)?,
                name: normalized,
            })
        },
    }
}

/// Normalize a namespace, which is always a single segment.
pub fn normalize_namespace(namespace: &str) -> Result<String, PathError> {
    normalize_path_with_max(namespace, false, 1)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn normalize_strips_and_lowercases() {
        assert_eq!(normalize_path("/Census//Total_Pop/", false).unwrap(), "census/total_pop");
        assert_eq!(normalize_path("maine\n", false).unwrap(), "maine");
    }

    #[test]
    fn normalize_keeps_case_of_uid() {
        assert_eq!(
            normalize_path("/Census/blocks/25001ABC", true).unwrap(),
            "census/blocks/25001ABC"
        );
    }

    #[test]
    fn normalize_rejects_invalid_sequences() {
        for (path, sequence) in [
            ("/a/../b", ".."),
            ("a b", " "),
            (" ma_bg ", " "),
            ("a;b", ";"),
        ] {
            assert_eq!(
                normalize_path(path, false),
                Err(PathError::InvalidSequence {
                    path: path.to_string(),
                    sequence
                })
            );
        }
    }

    #[test]
    fn normalize_rejects_empty_paths() {
        assert_eq!(normalize_path("///", false), Err(PathError::Empty));
        assert_eq!(normalize_path("", false), Err(PathError::Empty));
    }

    #[test]
    fn qualified_and_bare_paths_resolve_alike() {
        let qualified = resolve("/census.2020/ma_bg_demo", Some("census.2020")).unwrap();
        let bare = resolve("ma_bg_demo", Some("census.2020")).unwrap();
        let relative = resolve("census.2020/ma_bg_demo", None).unwrap();
        assert_eq!(qualified, bare);
        assert_eq!(qualified, relative);
        assert_eq!(qualified.to_string(), "/census.2020/ma_bg_demo");
        assert_eq!(qualified.relative(), "census.2020/ma_bg_demo");
    }

    #[test]
    fn qualified_paths_ignore_default_namespace() {
        let resolved = resolve("/other/total_pop", Some("census.2020")).unwrap();
        assert_eq!(resolved.namespace, "other");
    }

    #[test]
    fn bare_path_without_default_namespace_fails() {
        assert_eq!(
            resolve("total_pop", None),
            Err(PathError::NoNamespace("total_pop".to_string()))
        );
    }

    #[test]
    fn deep_paths_are_rejected() {
        assert!(matches!(
            resolve("/a/b/c", None),
            Err(PathError::TooManySegments { found: 3, max: 2, .. })
        ));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(path in "[/a-zA-Z0-9_.-]{0,24}") {
            if let Ok(normalized) = normalize_path(&path, false) {
                prop_assert_eq!(normalize_path(&normalized, false).unwrap(), normalized.clone());
                prop_assert!(!normalized.contains("//"));
                prop_assert!(!normalized.starts_with('/'));
                prop_assert_eq!(normalized.to_lowercase(), normalized);
            }
        }

        #[test]
        fn bare_names_resolve_to_default_namespace(name in "[a-z0-9_]{1,16}") {
            let bare = resolve(&name, Some("census")).unwrap();
            let qualified = resolve(&format!("/census/{name}"), None).unwrap();
            prop_assert_eq!(bare, qualified);
        }
    }
}
