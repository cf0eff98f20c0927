//! The two feature stores the controller switches between.
//!
//! The aggregated store is built once and only its per-unit counts change later. The
//! detailed store grows by appending records from fetch results; nothing is ever
//! removed or replaced, so the first fetch that delivers an id decides its attributes.

use crate::core::geo::Point;
use crate::data::csv::PointFormat;
use crate::data::record::{AggregationUnit, Record, RecordId};
use crate::prelude::{HashMap, HashSet};
use crate::{core::projection::Projection, Result};
use serde::{Deserialize, Serialize};

/// Which store is active. Only used for change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceIdentity {
    Aggregated,
    Detailed,
}

impl std::fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceIdentity::Aggregated => write!(f, "aggregated"),
            SourceIdentity::Detailed => write!(f, "detailed"),
        }
    }
}

/// Merges `incoming` into `existing`.
///
/// An empty `existing` is replaced by `incoming` as-is. Otherwise each incoming record
/// is appended, in order, only if its id is not present yet.
pub fn merge(mut existing: Vec<Record>, incoming: Vec<Record>) -> Vec<Record> {
    if existing.is_empty() {
        return incoming;
    }
    let mut seen: HashSet<RecordId> = existing.iter().map(|r| r.id.clone()).collect();
    for record in incoming {
        if seen.insert(record.id.clone()) {
            existing.push(record);
        }
    }
    existing
}

/// A single attribute constraint: the record's `property` must equal one of `values`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub property: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(property: impl Into<String>, values: &[&str]) -> Self {
        Self {
            property: property.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record
            .get(&self.property)
            .map(|value| self.values.iter().any(|v| v == value))
            .unwrap_or(false)
    }
}

/// Conjunction of filters; empty means "everything"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    pub filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }
}

/// Cumulative, id-deduplicated collection of detail records
#[derive(Debug, Default)]
pub struct DetailedStore {
    records: Vec<Record>,
    by_id: HashMap<RecordId, usize>,
    /// Indices into `records` that pass the current filters, in display order
    visible: Vec<usize>,
}

impl DetailedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a fetch result and returns how many records were added.
    ///
    /// Uses the same rules as [`merge`].
    pub fn merge(&mut self, incoming: Vec<Record>) -> usize {
        let before = self.records.len();
        let existing = std::mem::take(&mut self.records);
        self.records = merge(existing, incoming);
        for (index, record) in self.records.iter().enumerate().skip(before) {
            self.by_id.entry(record.id.clone()).or_insert(index);
        }
        self.records.len() - before
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_by_id(&self, id: &RecordId) -> Option<&Record> {
        self.by_id.get(id).map(|&index| &self.records[index])
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recomputes the visible subset from `filters`, in store order
    pub fn apply_filters(&mut self, filters: &FilterSet) -> usize {
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| filters.matches(record))
            .map(|(index, _)| index)
            .collect();
        self.visible.len()
    }

    /// Orders the visible subset by distance to `point`, nearest first
    pub fn sort_by_distance(&mut self, point: Point) {
        let records = &self.records;
        self.visible.sort_by(|&a, &b| {
            let da = records[a].point.distance_to(&point);
            let db = records[b].point.distance_to(&point);
            da.total_cmp(&db)
        });
    }

    pub fn visible(&self) -> impl Iterator<Item = &Record> + '_ {
        self.visible.iter().map(move |&index| &self.records[index])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }
}

/// Precomputed aggregation units plus their out-of-band record counts
#[derive(Debug, Default)]
pub struct AggregatedStore {
    units: Vec<AggregationUnit>,
    by_code: HashMap<String, usize>,
    counts: HashMap<String, u64>,
}

impl AggregatedStore {
    pub fn new(units: Vec<AggregationUnit>) -> Self {
        let by_code = units
            .iter()
            .enumerate()
            .map(|(index, unit)| (unit.code.clone(), index))
            .collect();
        Self {
            units,
            by_code,
            counts: HashMap::default(),
        }
    }

    /// Builds the store from the aggregation-unit CSV, reprojecting points into `target`
    pub fn from_csv(
        csv: &str,
        format: &PointFormat,
        code_field: &str,
        target: Projection,
    ) -> Result<Self> {
        let units = format
            .decode(csv, target)?
            .into_iter()
            .filter_map(|record| {
                let Some(code) = record
                    .get(code_field)
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                else {
                    log::warn!("skipping aggregation unit row {} without '{}'", record.id, code_field);
                    return None;
                };
                Some(AggregationUnit {
                    code,
                    point: record.point,
                    attributes: record.attributes,
                })
            })
            .collect();
        Ok(Self::new(units))
    }

    pub fn units(&self) -> &[AggregationUnit] {
        &self.units
    }

    pub fn unit(&self, code: &str) -> Option<&AggregationUnit> {
        self.by_code.get(code).map(|&index| &self.units[index])
    }

    /// Replaces known counts with `counts`; units without a count read as 0
    pub fn set_counts(&mut self, counts: impl IntoIterator<Item = (String, u64)>) {
        self.counts.extend(counts);
    }

    pub fn count(&self, code: &str) -> u64 {
        self.counts.get(code).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Borrowed view of whichever store is being shown
#[derive(Debug, Clone, Copy)]
pub enum SourceView<'a> {
    Aggregated(&'a AggregatedStore),
    Detailed(&'a DetailedStore),
}

impl SourceView<'_> {
    pub fn identity(&self) -> SourceIdentity {
        match self {
            SourceView::Aggregated(_) => SourceIdentity::Aggregated,
            SourceView::Detailed(_) => SourceIdentity::Detailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, status: &str) -> Record {
        Record::new(id, Point::new(id as f64, 0.0)).with_attribute("status", status)
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_merge_into_empty_takes_incoming_verbatim() {
        let incoming = vec![record(1, "Proposed"), record(2, "Installed")];
        assert_eq!(merge(Vec::new(), incoming.clone()), incoming);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = vec![record(1, "Proposed"), record(2, "Installed"), record(3, "Approved")];
        let once = merge(Vec::new(), a.clone());
        let twice = merge(once.clone(), a);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_merge_appends_new_ids_in_arrival_order() {
        let existing = vec![record(2, "Proposed")];
        let merged = merge(existing, vec![record(5, "Proposed"), record(2, "Installed"), record(1, "Proposed")]);
        assert_eq!(ids(&merged), vec!["2", "5", "1"]);
    }

    #[test]
    fn test_merge_earliest_arrival_wins() {
        let a = vec![record(1, "Proposed")];
        let b = vec![record(1, "Installed"), record(2, "Installed")];

        let ab = merge(merge(Vec::new(), a.clone()), b.clone());
        let ba = merge(merge(Vec::new(), b), a);

        let mut ab_ids = ids(&ab);
        let mut ba_ids = ids(&ba);
        ab_ids.sort();
        ba_ids.sort();
        assert_eq!(ab_ids, ba_ids);

        assert_eq!(ab[0].get("status"), Some("Proposed"));
        assert_eq!(ba[0].get("status"), Some("Installed"));
    }

    #[test]
    fn test_detailed_store_merge_indexes_ids() {
        let mut store = DetailedStore::new();
        assert_eq!(store.merge(vec![record(1, "Proposed")]), 1);
        assert_eq!(store.merge(vec![record(1, "Installed"), record(2, "Approved")]), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.record_by_id(&RecordId::from(1)).and_then(|r| r.get("status")),
            Some("Proposed")
        );
        assert!(store.contains(&RecordId::from(2)));
        assert!(store.record_by_id(&RecordId::from(3)).is_none());
    }

    #[test]
    fn test_filters_and_distance_sort() {
        let mut store = DetailedStore::new();
        store.merge(vec![
            record(1, "Proposed"),
            record(5, "Installed"),
            record(3, "Proposed"),
            record(9, "Approved"),
        ]);

        let filters = FilterSet::new(vec![Filter::new("status", &["Proposed", "Approved"])]);
        assert_eq!(store.apply_filters(&filters), 3);
        let visible: Vec<String> = store.visible().map(|r| r.id.to_string()).collect();
        assert_eq!(visible, vec!["1", "3", "9"]);

        store.sort_by_distance(Point::new(8.0, 0.0));
        let visible: Vec<String> = store.visible().map(|r| r.id.to_string()).collect();
        assert_eq!(visible, vec!["9", "3", "1"]);

        assert_eq!(store.apply_filters(&FilterSet::default()), 4);
    }

    #[test]
    fn test_filter_requires_attribute() {
        let filter = Filter::new("status", &["Proposed"]);
        assert!(!filter.matches(&Record::new(1, Point::default())));
    }

    #[test]
    fn test_aggregated_counts_default_to_zero() {
        let mut store = AggregatedStore::new(vec![
            AggregationUnit::new("205", Point::new(0.0, 0.0)),
            AggregationUnit::new("305", Point::new(1.0, 1.0)),
        ]);
        store.set_counts(vec![("205".to_string(), 100)]);
        assert_eq!(store.count("205"), 100);
        assert_eq!(store.count("305"), 0);
        assert_eq!(store.unit("305").map(|u| u.point), Some(Point::new(1.0, 1.0)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_aggregated_store_from_csv() {
        let format = PointFormat {
            id: None,
            x: "x".to_string(),
            y: "y".to_string(),
            projection: Projection::NewYorkLongIsland,
        };
        let csv = "community_board,name,x,y\n\
                   205,Gravesend,989062,160733\n\
                   ,Unassigned,990000,161000\n\
                   305,East New York,1010000,180000\n";
        let store =
            AggregatedStore::from_csv(csv, &format, "community_board", Projection::Geographic).unwrap();

        assert_eq!(store.len(), 2);
        let codes: Vec<&str> = store.units().iter().map(|u| u.code.as_str()).collect();
        assert_eq!(codes, vec!["205", "305"]);
        assert!(store.unit("").is_none());

        let gravesend = store.unit("205").unwrap();
        assert!((gravesend.point.x - -73.98267).abs() < 1e-5);
        assert!((gravesend.point.y - 40.60785).abs() < 1e-5);
        assert_eq!(
            gravesend.attributes.get("name").map(String::as_str),
            Some("Gravesend")
        );
    }
}
