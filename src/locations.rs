//! Schema location normalization
//!
//! Schema documents are identified by their normalized location. The registry
//! uses that identity to guard against processing the same include/import
//! target twice, so two spellings of the same path must normalize equally.

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Check if a location string looks like a URL rather than a filesystem path
pub fn is_url(location: &str) -> bool {
    match location.split_once("://") {
        Some((scheme, rest)) => !scheme.is_empty() && !rest.is_empty(),
        None => false,
    }
}

/// Normalize a schema location, resolving it against an optional base
///
/// URL locations are parsed and re-serialized through the `url` crate, which
/// collapses dot segments. Filesystem paths are joined with the base's parent
/// directory and lexically normalized (no filesystem access).
pub fn normalize_location(location: &str, base: Option<&str>) -> String {
    if is_url(location) {
        return match Url::parse(location) {
            Ok(url) => url.to_string(),
            Err(_) => location.to_string(),
        };
    }

    if let Some(base) = base {
        if is_url(base) {
            if let Ok(base_url) = Url::parse(base) {
                if let Ok(joined) = base_url.join(location) {
                    return joined.to_string();
                }
            }
            return location.to_string();
        }
        let base_dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
        return normalize_path(&base_dir.join(location));
    }

    normalize_path(Path::new(location))
}

/// Lexically normalize a path: collapse `.` and `..` segments
fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    let mut result = PathBuf::new();
    for part in parts {
        result.push(part.as_os_str());
    }
    result.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com/schema.xsd"));
        assert!(is_url("file:///tmp/schema.xsd"));
        assert!(!is_url("schema.xsd"));
        assert!(!is_url("schemas/common.xsd"));
        assert!(!is_url("://oops"));
    }

    #[test]
    fn test_normalize_plain_path() {
        assert_eq!(normalize_location("a/./b/../c.xsd", None), "a/c.xsd");
        assert_eq!(normalize_location("schema.xsd", None), "schema.xsd");
    }

    #[test]
    fn test_normalize_against_file_base() {
        assert_eq!(
            normalize_location("common.xsd", Some("schemas/main.xsd")),
            "schemas/common.xsd"
        );
        assert_eq!(
            normalize_location("../shared/types.xsd", Some("schemas/main.xsd")),
            "shared/types.xsd"
        );
    }

    #[test]
    fn test_normalize_against_url_base() {
        assert_eq!(
            normalize_location("common.xsd", Some("http://example.com/ns/main.xsd")),
            "http://example.com/ns/common.xsd"
        );
        assert_eq!(
            normalize_location("../common.xsd", Some("http://example.com/ns/main.xsd")),
            "http://example.com/common.xsd"
        );
    }

    #[test]
    fn test_same_document_normalizes_equal() {
        let a = normalize_location("./schemas/a.xsd", None);
        let b = normalize_location("schemas/x/../a.xsd", None);
        assert_eq!(a, b);
    }
}
