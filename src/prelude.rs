//! Prelude module for common mapfinder types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapfinder::prelude::*;`

pub use crate::core::{
    config::{FailedFetchPolicy, FinderConfig},
    controller::{Collaborators, FetchOutcome, LodController},
    extent::Extent,
    geo::{LatLng, Point},
    projection::Projection,
};

pub use crate::data::{
    csv::{PointFormat, UnitCountFormat},
    fetch::{HttpFetcher, RecordFetcher, UnitCountFetcher},
    query::QueryDescriptor,
    record::{AggregationUnit, Record, RecordId},
    store::{merge, AggregatedStore, DetailedStore, Filter, FilterSet, SourceIdentity, SourceView},
};

pub use crate::spatial::{
    extent_cache::ExtentFetchCache,
    lod::{decide, DisplayMode},
};

pub use crate::ui::{
    popup::{DismissGuard, SuppressiblePopup},
    traits::{
        FilterPanel, HighlightLayer, ListPanel, MapView, ModeObserver, PopupController,
        RenderLayer, Tab, TabPanel,
    },
};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
