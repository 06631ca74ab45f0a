//! `/image` query string parsing.

use std::collections::HashMap;

use crate::error::ProxyError;
use crate::resolver::ImageReference;

/// A validated image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub reference: ImageReference,
    /// Only the literal `watermark=true` requests a watermark
    pub watermark: bool,
}

impl ImageQuery {
    /// Parse `path=<key>` or `url=<absolute url>`, plus `watermark`.
    ///
    /// Exactly one of `path` and `url` must be present and non-empty.
    pub fn from_query_string(query: Option<&str>) -> Result<Self, ProxyError> {
        let params = parse_query(query.unwrap_or(""));
        let non_empty = |key: &str| {
            params
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
        };

        let reference = match (non_empty("path"), non_empty("url")) {
            (Some(path), None) => ImageReference::path(path)?,
            (None, Some(url)) => ImageReference::external_url(url)?,
            (Some(_), Some(_)) => {
                return Err(ProxyError::BadRequest(
                    "path and url are mutually exclusive".to_string(),
                ))
            }
            (None, None) => {
                return Err(ProxyError::BadRequest(
                    "one of path or url is required".to_string(),
                ))
            }
        };

        let watermark = params.get("watermark").map(String::as_str) == Some("true");

        Ok(Self {
            reference,
            watermark,
        })
    }
}

/// Decode `application/x-www-form-urlencoded` pairs. The first occurrence of
/// a key wins; pairs without `=` have an empty value.
fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        params.entry(key).or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_path_query() {
        let query = ImageQuery::from_query_string(Some("path=parts%2Fpump%20A.jpg")).unwrap();
        assert_eq!(
            query.reference,
            ImageReference::Path("parts/pump A.jpg".to_string())
        );
        assert!(!query.watermark);
    }

    #[test]
    fn test_url_query_with_watermark() {
        let query = ImageQuery::from_query_string(Some(
            "url=https%3A%2F%2Fcdn.example.com%2Fa.png%3Fv%3D1&watermark=true",
        ))
        .unwrap();
        assert_eq!(
            query.reference,
            ImageReference::ExternalUrl("https://cdn.example.com/a.png?v=1".to_string())
        );
        assert!(query.watermark);
    }

    #[rstest]
    #[case("path=a.jpg&watermark=TRUE", false)]
    #[case("path=a.jpg&watermark=1", false)]
    #[case("path=a.jpg&watermark", false)]
    #[case("path=a.jpg&watermark=true", true)]
    fn test_only_literal_true_requests_watermark(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(
            ImageQuery::from_query_string(Some(raw)).unwrap().watermark,
            expected
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("watermark=true"))]
    #[case(Some("path=&url="))]
    #[case(Some("path=a.jpg&url=https%3A%2F%2Fx.com%2Fa.jpg"))]
    #[case(Some("path=..%2Fsecret"))]
    #[case(Some("url=ftp%3A%2F%2Fx.com%2Fa.jpg"))]
    fn test_bad_requests(#[case] raw: Option<&str>) {
        let err = ImageQuery::from_query_string(raw).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let query = ImageQuery::from_query_string(Some("path=first.jpg&path=second.jpg")).unwrap();
        assert_eq!(query.reference, ImageReference::Path("first.jpg".to_string()));
    }
}
