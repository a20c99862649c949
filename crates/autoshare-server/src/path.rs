//! Request path containment.

use std::path::{Component, Path, PathBuf};

/// Map a request path onto the filesystem under `root`.
///
/// The path is percent-decoded first, so encoded separators and dots are
/// checked like literal ones. Returns `None` for anything that could leave
/// `root`: `..` segments, backslashes, NUL bytes, and segments that the
/// platform would read as absolute or drive-prefixed.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;

    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => {
                let mut components = Path::new(s).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(part)), None) => resolved.push(part),
                    _ => return None,
                }
            }
        }
    }

    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/share")
    }

    #[test]
    fn plain_paths_stay_under_root() {
        assert_eq!(resolve(&root(), "/"), Some(root()));
        assert_eq!(
            resolve(&root(), "/docs/readme.txt"),
            Some(root().join("docs").join("readme.txt"))
        );
        assert_eq!(
            resolve(&root(), "/./docs//a.txt"),
            Some(root().join("docs").join("a.txt"))
        );
    }

    #[test]
    fn percent_encoding_is_decoded() {
        assert_eq!(
            resolve(&root(), "/my%20file.txt"),
            Some(root().join("my file.txt"))
        );
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(resolve(&root(), "/../etc/passwd"), None);
        assert_eq!(resolve(&root(), "/docs/../../etc/passwd"), None);
        assert_eq!(resolve(&root(), "/..%2f..%2fetc/passwd"), None);
        assert_eq!(resolve(&root(), "/%2e%2e/secret"), None);
        assert_eq!(resolve(&root(), "/docs\\..\\secret"), None);
        assert_eq!(resolve(&root(), "/a%00b"), None);
    }
}
