use crate::core::geo::Point;
use crate::prelude::HashMap;
use serde::{Deserialize, Serialize};

/// Stable identifier of a detail record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An individually located entity shown in Detailed mode.
///
/// Attributes are written once on arrival and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub point: Point,
    pub attributes: HashMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, point: Point) -> Self {
        Self {
            id: id.into(),
            point,
            attributes: HashMap::default(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One aggregation unit (e.g. a community board) of the Aggregated source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationUnit {
    pub code: String,
    pub point: Point,
    pub attributes: HashMap<String, String>,
}

impl AggregationUnit {
    pub fn new(code: impl Into<String>, point: Point) -> Self {
        Self {
            code: code.into(),
            point,
            attributes: HashMap::default(),
        }
    }
}
