//! The level-of-detail controller.
//!
//! Every viewport change runs [`LodController::cluster`], which picks a display mode
//! from the zoom level and activates the matching store. In Detailed mode the visible
//! region is looked up in the extent cache first; only uncovered regions cause a
//! fetch. Fetches run concurrently and may complete in any order. The host drives
//! them with [`LodController::settle_next`], and each completion is merged into the
//! detailed store on the controller's own thread of control.
//!
//! There is no cancellation and no coalescing: several fetches can be in flight at
//! once, and each one merges independently when it resolves.

use crate::core::{
    config::{FailedFetchPolicy, FinderConfig},
    extent::Extent,
    geo::Point,
};
use crate::data::{
    fetch::{RecordFetcher, UnitCountFetcher},
    query::QueryDescriptor,
    record::{Record, RecordId},
    store::{AggregatedStore, DetailedStore, SourceIdentity, SourceView},
};
use crate::prelude::Arc;
use crate::spatial::{
    extent_cache::ExtentFetchCache,
    lod::{decide, DisplayMode},
};
use crate::ui::{
    popup::SuppressiblePopup,
    switcher::source_changed,
    traits::{
        FilterPanel, HighlightLayer, ListPanel, MapView, ModeObserver, PopupController,
        RenderLayer, Tab, TabPanel,
    },
};
use crate::{MapError, Result};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};

/// Host widgets the controller drives
pub struct Collaborators {
    pub view: Box<dyn MapView>,
    pub layer: Box<dyn RenderLayer>,
    pub highlight: Box<dyn HighlightLayer>,
    pub tabs: Box<dyn TabPanel>,
    pub filters: Box<dyn FilterPanel>,
    pub list: Box<dyn ListPanel>,
    pub popup: Box<dyn PopupController>,
    pub presentation: Box<dyn ModeObserver>,
}

/// What a settled fetch did
#[derive(Debug)]
pub enum FetchOutcome {
    /// Detail records arrived and were merged. `list_error` is set when the results
    /// list could not be rebuilt afterwards; the store and layer are still updated.
    Merged {
        extent: Extent,
        added: usize,
        total: usize,
        list_error: Option<MapError>,
    },
    /// A detail fetch failed; the detailed store is unchanged
    Failed { extent: Extent, error: MapError },
    /// Per-unit counts arrived and were applied to the aggregated store
    CountsApplied {
        units: usize,
        list_error: Option<MapError>,
    },
    CountsFailed { error: MapError },
}

enum Completion {
    Records {
        extent: Extent,
        previous: Option<SourceIdentity>,
        result: Result<Vec<Record>>,
    },
    Counts(Result<Vec<(String, u64)>>),
}

pub struct LodController {
    config: FinderConfig,
    extents: ExtentFetchCache,
    aggregated: AggregatedStore,
    detailed: DetailedStore,
    active: Option<SourceIdentity>,
    mode: Option<DisplayMode>,
    location: Option<Point>,
    pending_popup: Option<RecordId>,
    record_fetcher: Arc<dyn RecordFetcher>,
    count_fetcher: Option<Arc<dyn UnitCountFetcher>>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    view: Box<dyn MapView>,
    layer: Box<dyn RenderLayer>,
    highlight: Box<dyn HighlightLayer>,
    tabs: Box<dyn TabPanel>,
    filters: Box<dyn FilterPanel>,
    list: Box<dyn ListPanel>,
    popup: SuppressiblePopup,
    presentation: Box<dyn ModeObserver>,
}

impl LodController {
    pub fn new(
        config: FinderConfig,
        aggregated: AggregatedStore,
        record_fetcher: Arc<dyn RecordFetcher>,
        ui: Collaborators,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extents: ExtentFetchCache::new(&config),
            config,
            aggregated,
            detailed: DetailedStore::new(),
            active: None,
            mode: None,
            location: None,
            pending_popup: None,
            record_fetcher,
            count_fetcher: None,
            in_flight: FuturesUnordered::new(),
            view: ui.view,
            layer: ui.layer,
            highlight: ui.highlight,
            tabs: ui.tabs,
            filters: ui.filters,
            list: ui.list,
            popup: SuppressiblePopup::new(ui.popup),
            presentation: ui.presentation,
        })
    }

    pub fn with_count_fetcher(mut self, fetcher: Arc<dyn UnitCountFetcher>) -> Self {
        self.count_fetcher = Some(fetcher);
        self
    }

    /// Reacts to a viewport change (pan, zoom or resize).
    ///
    /// A query that cannot be built (projection failure) is returned as an error after
    /// the existing detailed store has been activated; nothing is logged as covered.
    pub fn cluster(&mut self) -> Result<()> {
        let previous = self.active;
        let zoom = self.view.current_zoom();
        let mode = decide(zoom, self.config.cluster_cutoff_zoom);
        log::debug!("zoom {} -> {} mode", zoom, mode);

        self.mode = Some(mode);
        self.presentation.display_mode_decided(mode);

        match mode {
            DisplayMode::Aggregated => self.activate_aggregated(previous),
            DisplayMode::Detailed => {
                let viewport = self.view.calculate_extent(self.view.size());
                match self.extents.request_extent(&viewport) {
                    Ok(None) => self.activate_detailed(previous),
                    Ok(Some(query)) => {
                        self.spawn_record_fetch(viewport, query, previous);
                        Ok(())
                    }
                    Err(error) => {
                        log::error!("cannot query {:?}: {}", viewport.to_array(), error);
                        self.activate_detailed(previous)?;
                        Err(error)
                    }
                }
            }
        }
    }

    fn activate_aggregated(&mut self, previous: Option<SourceIdentity>) -> Result<()> {
        self.active = Some(SourceIdentity::Aggregated);
        self.layer.set_active_source(SourceView::Aggregated(&self.aggregated));
        if self.tabs.active_tab() == Tab::Filters {
            self.tabs.open(Tab::Results);
        }
        self.filters.set_enabled(false);
        self.notify(previous)
    }

    /// Activates the detailed store. A failed list rebuild does not stop the layer
    /// switch or the change notification; the first error is returned afterwards.
    fn activate_detailed(&mut self, previous: Option<SourceIdentity>) -> Result<()> {
        self.active = Some(SourceIdentity::Detailed);
        self.filters.set_enabled(true);
        let visible = self.detailed.apply_filters(&self.filters.current_filters());
        let sorted = match self.location {
            Some(location) => {
                self.detailed.sort_by_distance(location);
                self.reset_list()
            }
            None => Ok(()),
        };
        self.filters.set_active_source(SourceIdentity::Detailed);
        self.layer.set_active_source(SourceView::Detailed(&self.detailed));
        log::info!(
            "detailed source active, {} of {} records visible",
            visible,
            self.detailed.len()
        );
        let notified = self.notify(previous);
        sorted.and(notified)
    }

    /// Resynchronizes the list and the highlight when the active store changed
    fn notify(&mut self, previous: Option<SourceIdentity>) -> Result<()> {
        let Some(current) = self.active else {
            return Ok(());
        };
        if !source_changed(previous, current) {
            return Ok(());
        }
        log::debug!("active source changed {:?} -> {}", previous, current);
        let reset = self.reset_list();
        self.highlight.clear();
        reset
    }

    /// Rebuilds the results list from the active store.
    ///
    /// Outside Aggregated mode the popup cannot be dismissed during the rebuild, so an
    /// open record popup survives list refreshes.
    pub fn reset_list(&mut self) -> Result<()> {
        let source = match self.active {
            Some(SourceIdentity::Aggregated) => SourceView::Aggregated(&self.aggregated),
            Some(SourceIdentity::Detailed) => SourceView::Detailed(&self.detailed),
            None => return Ok(()),
        };
        let _guard = (source.identity() != SourceIdentity::Aggregated)
            .then(|| self.popup.suppress_dismiss());
        self.list.reset(source, &mut self.popup)
    }

    fn spawn_record_fetch(
        &mut self,
        extent: Extent,
        query: QueryDescriptor,
        previous: Option<SourceIdentity>,
    ) {
        log::info!("fetching detail records in {:?}", query.bounds.to_array());
        let fetcher = Arc::clone(&self.record_fetcher);
        self.in_flight.push(
            async move {
                let result = fetcher.fetch_records(&query).await;
                Completion::Records {
                    extent,
                    previous,
                    result,
                }
            }
            .boxed(),
        );
    }

    /// Schedules the per-unit count fetch. Returns false when no count fetcher is set.
    pub fn load_unit_counts(&mut self) -> bool {
        let Some(fetcher) = self.count_fetcher.clone() else {
            return false;
        };
        let endpoint = self.config.unit_count_endpoint.clone();
        self.in_flight.push(
            async move { Completion::Counts(fetcher.fetch_counts(&endpoint).await) }.boxed(),
        );
        true
    }

    /// Waits for the next in-flight fetch, in completion order, and applies it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn settle_next(&mut self) -> Option<FetchOutcome> {
        let completion = self.in_flight.next().await?;
        Some(self.complete(completion))
    }

    /// Settles every in-flight fetch, including ones scheduled while settling
    pub async fn settle_all(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.settle_next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    fn complete(&mut self, completion: Completion) -> FetchOutcome {
        match completion {
            Completion::Records {
                extent,
                previous,
                result: Ok(records),
            } => {
                let added = self.detailed.merge(records);
                log::info!(
                    "merged {} new records ({} total)",
                    added,
                    self.detailed.len()
                );
                let list_error = if self.mode == Some(DisplayMode::Detailed) {
                    self.activate_detailed(previous).err()
                } else {
                    log::debug!("records arrived after leaving detailed mode, not activating");
                    None
                };
                if let Some(error) = &list_error {
                    log::error!("detailed source activated with a list error: {}", error);
                }
                FetchOutcome::Merged {
                    extent,
                    added,
                    total: self.detailed.len(),
                    list_error,
                }
            }
            Completion::Records {
                extent,
                result: Err(error),
                ..
            } => {
                log::error!("fetch for {:?} failed: {}", extent.to_array(), error);
                if self.config.failed_fetch_policy == FailedFetchPolicy::RetryOnNextVisit {
                    self.extents.forget(&extent);
                }
                FetchOutcome::Failed { extent, error }
            }
            Completion::Counts(Ok(counts)) => {
                let units = counts.len();
                let list_error = self.apply_unit_counts(counts).err();
                if let Some(error) = &list_error {
                    log::error!("failed to refresh list after counts: {}", error);
                }
                FetchOutcome::CountsApplied { units, list_error }
            }
            Completion::Counts(Err(error)) => {
                log::error!("unit count fetch failed: {}", error);
                FetchOutcome::CountsFailed { error }
            }
        }
    }

    /// Stores per-unit counts and redraws; the active source does not change
    pub fn apply_unit_counts(&mut self, counts: Vec<(String, u64)>) -> Result<()> {
        log::info!("applying counts for {} units", counts.len());
        self.aggregated.set_counts(counts);
        self.layer.refresh();
        self.reset_list()
    }

    /// Sets or clears the reference location used for proximity sorting
    pub fn set_location(&mut self, location: Option<Point>) -> Result<()> {
        self.location = location;
        self.refresh_detailed_list()
    }

    /// Re-applies the filter panel's current filters
    pub fn filters_changed(&mut self) -> Result<()> {
        self.refresh_detailed_list()
    }

    fn refresh_detailed_list(&mut self) -> Result<()> {
        if self.active != Some(SourceIdentity::Detailed) {
            return Ok(());
        }
        self.detailed.apply_filters(&self.filters.current_filters());
        if let Some(location) = self.location {
            self.detailed.sort_by_distance(location);
        }
        self.reset_list()
    }

    /// Flies to an aggregation unit at the cutoff zoom, which switches to Detailed mode
    pub fn zoom_to_unit(&mut self, code: &str) -> Result<()> {
        let center = self
            .aggregated
            .unit(code)
            .map(|unit| unit.point)
            .ok_or_else(|| MapError::UnknownFeature(format!("aggregation unit {}", code)))?;
        self.popup.dismiss();
        if self.tabs.is_condensed() {
            self.tabs.open(Tab::Map);
        }
        self.view.animate_to(center, self.config.cluster_cutoff_zoom);
        Ok(())
    }

    /// Flies to a detail record. Its popup opens once the view reports the move has
    /// ended (see [`LodController::move_ended`]).
    pub fn zoom_to_record(&mut self, id: &RecordId) -> Result<()> {
        let record = self
            .detailed
            .record_by_id(id)
            .ok_or_else(|| MapError::UnknownFeature(format!("record {}", id)))?;
        if self.tabs.is_condensed() {
            self.tabs.open(Tab::Map);
        }
        self.view.animate_to(record.point, self.config.detail_zoom);
        self.pending_popup = Some(record.id.clone());
        Ok(())
    }

    /// Called by the host when a view animation has finished. Opens the popup queued
    /// by [`LodController::zoom_to_record`] without panning it into view, so the
    /// record stays centered.
    pub fn move_ended(&mut self) {
        let Some(id) = self.pending_popup.take() else {
            return;
        };
        match self.detailed.record_by_id(&id) {
            Some(record) => self.popup.show_record(record, false),
            None => log::warn!("record {} left the store before its popup opened", id),
        }
    }

    pub fn mode(&self) -> Option<DisplayMode> {
        self.mode
    }

    pub fn active_source(&self) -> Option<SourceIdentity> {
        self.active
    }

    pub fn detailed(&self) -> &DetailedStore {
        &self.detailed
    }

    pub fn aggregated(&self) -> &AggregatedStore {
        &self.aggregated
    }

    pub fn extent_cache(&self) -> &ExtentFetchCache {
        &self.extents
    }

    pub fn location(&self) -> Option<Point> {
        self.location
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Number of fetches that have not been settled yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
