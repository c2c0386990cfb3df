use sha2::{Digest, Sha256};

/// Strong ETag over file identity: name, size and mtime (unix seconds).
///
/// Content is not hashed, so an edit that keeps both size and mtime keeps
/// the old tag.
pub fn compute_etag(name: &str, size: u64, modified_unix: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}-{}-{}", name, size, modified_unix).as_bytes());
    let digest = hasher.finalize();
    format!("\"{}\"", hex::encode(&digest[..16]))
}

/// Exact comparison against `If-None-Match`.
pub fn etag_matches(etag: &str, if_none_match: &str) -> bool {
    if_none_match == etag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_stability() {
        let tag = compute_etag("test.txt", 19, 1_700_000_000);
        assert_eq!(tag.len(), 34);
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert!(tag[1..33].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(tag, compute_etag("test.txt", 19, 1_700_000_000));
    }

    #[test]
    fn test_identity_changes_tag() {
        let tag = compute_etag("test.txt", 19, 1_700_000_000);
        assert_ne!(tag, compute_etag("test.txt", 20, 1_700_000_000));
        assert_ne!(tag, compute_etag("test.txt", 19, 1_700_000_001));
        assert_ne!(tag, compute_etag("other.txt", 19, 1_700_000_000));
    }

    #[test]
    fn test_exact_match_only() {
        let tag = compute_etag("a", 1, 1);
        assert!(etag_matches(&tag, &tag));
        assert!(!etag_matches(&tag, &format!("W/{}", tag)));
        assert!(!etag_matches(&tag, "*"));
    }
}
