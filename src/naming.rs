//! Generated-filename pattern and content-hash addressing.
//!
//! Built artifacts live alongside sources under the name
//! `<prefix>-<hash>-<originalName>`. The canonical path of an artifact is
//! its path with the prefix and hash stripped, which is what bundles are
//! keyed by.

use crate::digest::HashAlgorithm;

/// Separator between member hashes in the composite bundle digest.
const HASH_SEPARATOR: &str = ":";

/// Build the on-disk filename for a built artifact.
pub fn generated_filename(prefix: &str, hash: &str, name: &str) -> String {
    format!("{prefix}-{hash}-{name}")
}

/// Check whether a relative path names a generated artifact.
///
/// Matches basenames of the form `<prefix>-<hex>-...` where the hex run is
/// non-empty.
pub fn is_generated(prefix: &str, path: &str) -> bool {
    strip_generated(prefix, basename(path)).is_some()
}

/// Recover the canonical (un-hashed) path of a generated artifact.
///
/// Returns `None` when the basename does not match the generated pattern.
pub fn canonical_path(prefix: &str, path: &str) -> Option<String> {
    let name = basename(path);
    let canonical = strip_generated(prefix, name)?;
    let dir = &path[..path.len() - name.len()];
    Some(format!("{dir}{canonical}"))
}

/// Derive the bundle hash from the ordered member content hashes.
///
/// Content-file hashes come first, dependency hashes after, joined with a
/// fixed separator and digested with the configured algorithm. Truncated to
/// `length` hex characters for the filename.
pub fn bundle_hash(algorithm: HashAlgorithm, hashes: &[String], length: usize) -> String {
    let composite = hashes.join(HASH_SEPARATOR);
    let mut digest = algorithm.hash_bytes(composite.as_bytes());
    digest.truncate(length);
    digest
}

/// Strip `<prefix>-<hex>-` from a basename, returning the canonical name.
fn strip_generated<'a>(prefix: &str, name: &'a str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let hex_len = rest.chars().take_while(|c| c.is_ascii_hexdigit()).count();
    if hex_len == 0 {
        return None;
    }
    rest[hex_len..].strip_prefix('-')
}

/// Final path component of a slash-separated relative path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of a slash-separated relative path (empty for bare names).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Extension of a path including the dot (empty when there is none).
pub fn extname(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_filename() {
        assert_eq!(
            generated_filename("asset", "82470a09", "jquery.js"),
            "asset-82470a09-jquery.js"
        );
    }

    #[test]
    fn test_is_generated() {
        assert!(is_generated("asset", "asset-de4db33f-foo.txt"));
        assert!(is_generated("asset", "js/asset-10abe108-all.js"));
        assert!(!is_generated("asset", "jquery.js"));
        assert!(!is_generated("asset", "asset--foo.txt"));
        assert!(!is_generated("asset", "asset-zz-foo.txt"));
        assert!(!is_generated("static", "asset-de4db33f-foo.txt"));
    }

    #[test]
    fn test_canonical_path() {
        assert_eq!(
            canonical_path("asset", "asset-de4db33f-foo.txt").as_deref(),
            Some("foo.txt")
        );
        assert_eq!(
            canonical_path("asset", "js/asset-10abe108-all.js").as_deref(),
            Some("js/all.js")
        );
        // Dashes in the original name survive
        assert_eq!(
            canonical_path("asset", "asset-abc123-my-lib.js").as_deref(),
            Some("my-lib.js")
        );
        assert_eq!(canonical_path("asset", "js/main.js"), None);
    }

    #[test]
    fn test_bundle_hash_single() {
        // md5 of md5("window.jQuery = {};\n")
        let file_hash = HashAlgorithm::Md5.hash_bytes(b"window.jQuery = {};\n");
        let hash = bundle_hash(HashAlgorithm::Md5, &[file_hash], 32);
        assert_eq!(hash, "82470a0982f62504a81cf60128ff61a2");
    }

    #[test]
    fn test_bundle_hash_truncation() {
        let file_hash = HashAlgorithm::Md5.hash_bytes(b"window.jQuery = {};\n");
        let hash = bundle_hash(HashAlgorithm::Md5, &[file_hash], 8);
        assert_eq!(hash, "82470a09");
    }

    #[test]
    fn test_bundle_hash_pair() {
        let shiv = HashAlgorithm::Md5.hash_bytes(b"window.shiv = {};\n");
        let respond = HashAlgorithm::Md5.hash_bytes(b"window.respond = {};\n");
        let hash = bundle_hash(HashAlgorithm::Md5, &[shiv, respond], 32);
        assert_eq!(hash, "b5d5d67465f661c1a12da394e502b391");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(basename("js/libraries/jquery.js"), "jquery.js");
        assert_eq!(basename("robots.txt"), "robots.txt");
        assert_eq!(dirname("js/libraries/jquery.js"), "js/libraries");
        assert_eq!(dirname("robots.txt"), "");
        assert_eq!(extname("js/main.js"), ".js");
        assert_eq!(extname("js/.hidden"), "");
        assert_eq!(extname("Makefile"), "");
    }
}
