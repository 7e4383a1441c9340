//! Path matching and path-parameter extraction
//!
//! Matching works on normalized paths: exactly one trailing `/` is stripped
//! from each side, but a lone `/` is never stripped. Prefix matching respects
//! segment boundaries (`/products` matches `/products/123`, never
//! `/products123`), and `:name` segments match any single segment.

use crate::flow::types::PathOperator;

/// Strip exactly one trailing `/`, never stripping a lone `/`.
pub fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn segment_matches(pattern: &str, concrete: &str) -> bool {
    pattern.starts_with(':') || pattern == concrete
}

/// Does `request_path` match `flow_path` under the given operator?
pub fn matches(request_path: &str, flow_path: &str, operator: PathOperator) -> bool {
    let request_path = normalize(request_path);
    let flow_path = normalize(flow_path);

    match operator {
        PathOperator::Equals => request_path == flow_path,
        PathOperator::StartsWith => {
            if flow_path == "/" {
                return true;
            }
            let mut request_segments = segments(request_path);
            for pattern in segments(flow_path) {
                match request_segments.next() {
                    Some(concrete) if segment_matches(pattern, concrete) => {}
                    _ => return false,
                }
            }
            true
        }
    }
}

/// Pair each `:name` segment of `flow_path` with the concrete segment at the
/// same position in `path_info`. A flow path without parameter segments
/// yields no pairs.
pub fn extract_parameters(flow_path: &str, path_info: &str) -> Vec<(String, String)> {
    segments(normalize(flow_path))
        .zip(segments(normalize(path_info)))
        .filter_map(|(pattern, concrete)| {
            pattern
                .strip_prefix(':')
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), concrete.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("/products", "/products")]
    #[case("/products/", "/products")]
    #[case("/", "/")]
    #[case("//", "/")]
    fn normalization_strips_one_trailing_slash(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("/products", "/products", true)]
    #[case("/products/", "/products", true)]
    #[case("/products", "/products/", true)]
    #[case("/products/123", "/products", false)]
    #[case("/", "/", true)]
    fn equals_matches_after_normalization(
        #[case] request: &str,
        #[case] flow: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(request, flow, PathOperator::Equals), expected);
    }

    #[rstest]
    #[case("/products/123", "/products", true)]
    #[case("/products", "/products", true)]
    #[case("/products123", "/products", false)] // segment boundary, not substring
    #[case("/anything/at/all", "/", true)]
    #[case("/products/123/items", "/products/:productId", true)]
    #[case("/orders/123", "/products/:productId", false)]
    #[case("/products", "/products/:productId", false)]
    fn starts_with_respects_segments_and_params(
        #[case] request: &str,
        #[case] flow: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(request, flow, PathOperator::StartsWith), expected);
    }

    #[test]
    fn extracts_named_parameters() {
        let params = extract_parameters(
            "/products/:productId/items/:itemId",
            "/products/123/items/item-1234",
        );
        assert_eq!(
            params,
            vec![
                ("productId".to_string(), "123".to_string()),
                ("itemId".to_string(), "item-1234".to_string()),
            ]
        );
    }

    #[test]
    fn plain_flow_path_extracts_nothing() {
        assert!(extract_parameters("/products/items", "/products/items").is_empty());
    }

    proptest! {
        #[test]
        fn normalize_never_empties_a_path(path in "/[a-z/]{0,20}") {
            prop_assert!(!normalize(&path).is_empty());
        }

        #[test]
        fn normalize_strips_at_most_one_character(path in "/[a-z/]{0,20}") {
            let normalized = normalize(&path);
            prop_assert!(path.len() - normalized.len() <= 1);
            prop_assert!(normalized.starts_with('/'));
        }
    }
}
