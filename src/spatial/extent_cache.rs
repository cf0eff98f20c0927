//! Memo of the map regions that were already queried.
//!
//! Every queried viewport is kept in an append-only log in arrival order, with an
//! R-tree over the same rectangles so the containment check stays cheap as the log
//! grows. A new viewport needs a fetch only if no logged rectangle fully contains it.

use crate::core::{config::FinderConfig, extent::Extent, projection::Projection};
use crate::data::query::QueryDescriptor;
use crate::Result;
use rstar::{RTree, RTreeObject, AABB};

impl RTreeObject for Extent {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min.x, self.min.y], [self.max.x, self.max.y])
    }
}

pub struct ExtentFetchCache {
    log: Vec<Extent>,
    index: RTree<Extent>,
    padding: f64,
    display_projection: Projection,
    query_projection: Projection,
    endpoint: String,
    x_field: String,
    y_field: String,
}

impl ExtentFetchCache {
    pub fn new(config: &FinderConfig) -> Self {
        Self {
            log: Vec::new(),
            index: RTree::new(),
            padding: config.query_padding,
            display_projection: config.display_projection,
            query_projection: config.query_projection(),
            endpoint: config.detail_endpoint.clone(),
            x_field: config.detail_format.x.clone(),
            y_field: config.detail_format.y.clone(),
        }
    }

    /// True when some logged rectangle fully contains `viewport`
    pub fn is_covered(&self, viewport: &Extent) -> bool {
        self.index
            .locate_in_envelope_intersecting(&viewport.envelope())
            .any(|fetched| fetched.contains_extent(viewport))
    }

    /// Decides whether `viewport` (display projection) needs a fetch.
    ///
    /// Returns `Ok(None)` when the viewport is already covered. Otherwise the raw
    /// viewport is logged and a query for the padded rectangle, transformed into the
    /// query projection, is returned. A transform failure leaves the log untouched.
    pub fn request_extent(&mut self, viewport: &Extent) -> Result<Option<QueryDescriptor>> {
        if self.is_covered(viewport) {
            log::debug!("viewport {:?} already covered", viewport.to_array());
            return Ok(None);
        }

        let padded = viewport.padded(self.padding);
        let bounds = self
            .display_projection
            .transform_extent(self.query_projection, &padded)?;

        self.log.push(*viewport);
        self.index.insert(*viewport);
        log::debug!(
            "viewport {:?} not covered, querying {:?} ({} extents logged)",
            viewport.to_array(),
            bounds.to_array(),
            self.log.len()
        );

        Ok(Some(QueryDescriptor::new(
            self.endpoint.clone(),
            bounds,
            &self.x_field,
            &self.y_field,
        )))
    }

    /// Drops the most recent log entry equal to `extent` so the region is queried again
    pub fn forget(&mut self, extent: &Extent) -> bool {
        match self.log.iter().rposition(|logged| logged == extent) {
            Some(position) => {
                self.log.remove(position);
                self.index.remove(extent);
                true
            }
            None => false,
        }
    }

    /// Logged viewports, in arrival order
    pub fn extents(&self) -> &[Extent] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapError;

    fn mercator_config() -> FinderConfig {
        let mut config = FinderConfig::default();
        config.detail_format.projection = Projection::WebMercator;
        config.detail_endpoint = "https://example.com/poles.csv?$limit=50000".to_string();
        config
    }

    #[test]
    fn test_same_extent_twice() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let extent = Extent::from_coords(0.0, 0.0, 1000.0, 1000.0);

        assert!(cache.request_extent(&extent).unwrap().is_some());
        assert!(cache.request_extent(&extent).unwrap().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_contained_extent_is_covered() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let outer = Extent::from_coords(0.0, 0.0, 1000.0, 1000.0);
        let inner = Extent::from_coords(100.0, 100.0, 900.0, 900.0);

        assert!(cache.request_extent(&outer).unwrap().is_some());
        assert!(cache.request_extent(&inner).unwrap().is_none());
    }

    #[test]
    fn test_padding_does_not_widen_coverage() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let query = cache
            .request_extent(&Extent::from_coords(0.0, 0.0, 1000.0, 1000.0))
            .unwrap()
            .unwrap();
        assert_eq!(query.bounds.to_array(), [-500.0, -500.0, 1500.0, 1500.0]);
        assert_eq!(cache.extents(), &[Extent::from_coords(0.0, 0.0, 1000.0, 1000.0)]);

        // Inside the padded query but outside the recorded viewport
        let edge = Extent::from_coords(900.0, 900.0, 1100.0, 1000.0);
        assert!(cache.request_extent(&edge).unwrap().is_some());
    }

    #[test]
    fn test_overlap_without_containment_fetches() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        cache
            .request_extent(&Extent::from_coords(0.0, 0.0, 1000.0, 1000.0))
            .unwrap();
        cache
            .request_extent(&Extent::from_coords(1000.0, 0.0, 2000.0, 1000.0))
            .unwrap();

        // Covered only by the union of the two, not by either one
        let spanning = Extent::from_coords(500.0, 0.0, 1500.0, 1000.0);
        assert!(!cache.is_covered(&spanning));
        assert!(cache.request_extent(&spanning).unwrap().is_some());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_degenerate_viewport() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let point = Extent::from_coords(5.0, 5.0, 5.0, 5.0);
        assert!(cache.request_extent(&point).unwrap().is_some());
        assert!(cache.request_extent(&point).unwrap().is_none());
    }

    #[test]
    fn test_query_uses_configured_fields_and_endpoint() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let query = cache
            .request_extent(&Extent::from_coords(0.0, 0.0, 10.0, 10.0))
            .unwrap()
            .unwrap();
        assert_eq!(query.endpoint, "https://example.com/poles.csv?$limit=50000");
        assert_eq!(
            query.predicate,
            "x_coord > -500 and x_coord < 510 and y_coord > -500 and y_coord < 510"
        );
    }

    #[test]
    fn test_state_plane_query_projection() {
        let mut config = mercator_config();
        config.detail_format.projection = Projection::NewYorkLongIsland;
        let mut cache = ExtentFetchCache::new(&config);

        let center = crate::core::geo::Point::new(-8235713.15, 4954670.57);
        let viewport = Extent::from_center_and_size(center, 2000.0, 1000.0);
        let query = cache.request_extent(&viewport).unwrap().unwrap();
        assert!(query.bounds.contains_point(&crate::core::geo::Point::new(989062.0, 160733.0)));
        assert_eq!(cache.extents(), &[viewport]);
    }

    #[test]
    fn test_failed_transform_records_nothing() {
        let mut config = mercator_config();
        config.detail_format.projection = Projection::NewYorkLongIsland;
        let mut cache = ExtentFetchCache::new(&config);

        let broken = Extent::from_coords(f64::NAN, 0.0, 10.0, 10.0);
        assert!(matches!(cache.request_extent(&broken), Err(MapError::Projection(_))));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget_allows_refetch() {
        let mut cache = ExtentFetchCache::new(&mercator_config());
        let extent = Extent::from_coords(0.0, 0.0, 10.0, 10.0);
        cache.request_extent(&extent).unwrap();
        assert!(cache.forget(&extent));
        assert!(!cache.forget(&extent));
        assert!(cache.request_extent(&extent).unwrap().is_some());
    }
}
