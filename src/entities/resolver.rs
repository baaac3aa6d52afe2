//! Frame asset naming.
//!
//! The asset pipeline writes frame `n` of a product to `<base>/1 (n).gif`.
//! URLs carry the same name percent-encoded: `<base>/1%20(n).gif`.
//! Parentheses stay literal, they are legal in a path segment.

use std::path::PathBuf;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Bytes that may not appear bare inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// On-disk file name of a frame, e.g. `1 (42).gif`.
pub fn frame_file_name(frame: u32) -> String {
    format!("1 ({}).gif", frame)
}

/// URL of frame `frame` under `base_path`.
///
/// Every segment of the base path is encoded on its own, separators are kept.
/// A trailing `/` on the base is not doubled.
pub fn resolve(base_path: &str, frame: u32) -> String {
    let base = base_path.trim_end_matches('/');
    let encoded_base: Vec<String> = base
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect();
    format!(
        "{}/{}",
        encoded_base.join("/"),
        utf8_percent_encode(&frame_file_name(frame), PATH_SEGMENT)
    )
}

/// Relative filesystem path for a resolved URL (`/images/a/1%20(3).gif` -> `images/a/1 (3).gif`).
pub fn decode_path(url: &str) -> PathBuf {
    url.trim_start_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_resolve_encodes_space() {
        assert_eq!(resolve("/images/mango", 1), "/images/mango/1%20(1).gif");
        assert_eq!(resolve("/images/mango", 191), "/images/mango/1%20(191).gif");
    }

    #[test]
    fn test_resolve_trailing_slash() {
        assert_eq!(resolve("/images/mango/", 7), "/images/mango/1%20(7).gif");
    }

    #[test]
    fn test_resolve_encodes_base_segments() {
        assert_eq!(
            resolve("/images/passion fruit", 3),
            "/images/passion%20fruit/1%20(3).gif"
        );
    }

    #[test]
    fn test_decode_path_roundtrip() {
        let url = resolve("/images/passion fruit", 12);
        assert_eq!(
            decode_path(&url),
            PathBuf::from("images").join("passion fruit").join("1 (12).gif")
        );
    }

    #[test]
    fn test_decode_path_drops_parent_segments() {
        assert_eq!(
            decode_path("/../images/./x/1%20(1).gif"),
            PathBuf::from("images").join("x").join("1 (1).gif")
        );
    }

    #[test]
    fn test_urls_unique_across_sequence() {
        let urls: HashSet<String> = (1..=191).map(|n| resolve("/images/chocolate", n)).collect();
        assert_eq!(urls.len(), 191);
    }

    proptest! {
        #[test]
        fn prop_resolve_contains_encoded_token(n in 1u32..10_000) {
            let url = resolve("/images/pomegranate", n);
            let token = format!("1%20({}).gif", n);
            prop_assert!(url.ends_with(&token));
            prop_assert!(!url.contains(' '));
        }
    }
}
