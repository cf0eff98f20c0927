use crate::core::extent::Extent;
use crate::{MapError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// A bounding-box query against the detail dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Dataset endpoint the predicate is appended to
    pub endpoint: String,
    /// Padded query rectangle, in the query projection
    pub bounds: Extent,
    /// `x > minX and x < maxX and y > minY and y < maxY`
    pub predicate: String,
}

impl QueryDescriptor {
    pub fn new(endpoint: impl Into<String>, bounds: Extent, x_field: &str, y_field: &str) -> Self {
        let predicate = format!(
            "{x} > {} and {x} < {} and {y} > {} and {y} < {}",
            bounds.min.x,
            bounds.max.x,
            bounds.min.y,
            bounds.max.y,
            x = x_field,
            y = y_field,
        );
        Self {
            endpoint: endpoint.into(),
            bounds,
            predicate,
        }
    }

    /// Full request URL: the endpoint followed by a literal `$where=` key and the
    /// percent-encoded predicate
    pub fn url(&self) -> Result<Url> {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        let raw = format!(
            "{}{}$where={}",
            self.endpoint,
            separator,
            urlencoding::encode(&self.predicate)
        );
        Url::parse(&raw)
            .map_err(|e| MapError::Fetch(format!("invalid endpoint '{}': {}", self.endpoint, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_format() {
        let query = QueryDescriptor::new(
            "https://example.com/data.csv?$limit=10",
            Extent::from_coords(-500.0, -500.0, 1500.5, 1500.0),
            "x_coord",
            "y_coord",
        );
        assert_eq!(
            query.predicate,
            "x_coord > -500 and x_coord < 1500.5 and y_coord > -500 and y_coord < 1500"
        );
    }

    #[test]
    fn test_url_escapes_predicate() {
        let query = QueryDescriptor::new(
            "https://example.com/data.csv?$limit=10",
            Extent::from_coords(1.0, 2.0, 3.0, 4.0),
            "x",
            "y",
        );
        let url = query.url().unwrap();
        let text = url.as_str();
        assert!(text.starts_with("https://example.com/data.csv?$limit=10&$where="));
        assert!(text.ends_with("x%20%3E%201%20and%20x%20%3C%203%20and%20y%20%3E%202%20and%20y%20%3C%204"));
        assert!(!text.contains(' '));
        assert!(!text.contains('+'));
        assert!(!text.contains('>'));

        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(decoded.contains(&("$where".to_string(), query.predicate.clone())));
    }

    #[test]
    fn test_invalid_endpoint() {
        let query = QueryDescriptor::new("not a url", Extent::from_coords(0.0, 0.0, 1.0, 1.0), "x", "y");
        assert!(matches!(query.url(), Err(MapError::Fetch(_))));
    }
}
