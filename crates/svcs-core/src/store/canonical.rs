//! Canonical serialization and content addressing.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::SvcsResult;

/// Compact JSON with object keys in sorted order.
///
/// Going through `serde_json::Value` sorts keys (its map is a `BTreeMap`
/// unless `preserve_order` is enabled), so the output does not depend on
/// struct field order.
pub fn canonical_bytes<T: Serialize>(value: &T) -> SvcsResult<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Lowercase SHA-256 hex digest of `bytes`.
pub fn content_address(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Reference key for a tracked path's history line.
pub fn path_key(path: &str) -> String {
    content_address(path.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unordered {
        zebra: u32,
        apple: &'static str,
        nested: Inner,
    }

    #[derive(Serialize)]
    struct Inner {
        y: bool,
        x: Option<u8>,
    }

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let value = Unordered {
            zebra: 1,
            apple: "a",
            nested: Inner { y: true, x: None },
        };
        let bytes = canonical_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"apple":"a","nested":{"x":null,"y":true},"zebra":1}"#
        );
    }

    #[test]
    fn test_content_address_known_vector() {
        assert_eq!(
            content_address(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_path_key_differs_per_path() {
        assert_ne!(path_key("a.py"), path_key("b.py"));
        assert_eq!(path_key("a.py").len(), 64);
    }
}
