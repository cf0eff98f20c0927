//! Interfaces of the host widgets the controller drives.
//!
//! The controller never draws anything itself. It holds one implementation of each
//! trait and calls through them when the display mode or the active source changes.

use crate::core::{extent::Extent, geo::Point};
use crate::data::{
    record::Record,
    store::{FilterSet, SourceIdentity, SourceView},
};
use crate::spatial::lod::DisplayMode;
use crate::Result;

/// The map view: zoom level and visible rectangle
pub trait MapView {
    fn current_zoom(&self) -> f64;

    /// Viewport size in pixels
    fn size(&self) -> Point;

    /// Visible rectangle in the display projection for a viewport of `size` pixels
    fn calculate_extent(&self, size: Point) -> Extent;

    /// Starts an animated move to `center` at `zoom`
    fn animate_to(&mut self, center: Point, zoom: f64);
}

/// The layer that draws whichever store is active
pub trait RenderLayer {
    fn set_active_source(&mut self, source: SourceView<'_>);

    /// Redraws the current source, e.g. after aggregated counts arrive
    fn refresh(&mut self);
}

/// The layer holding the selection highlight
pub trait HighlightLayer {
    fn clear(&mut self);
}

/// Tabs of the side panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Map,
    Results,
    Filters,
}

pub trait TabPanel {
    fn active_tab(&self) -> Tab;

    fn open(&mut self, tab: Tab);

    /// True when the panel shows one tab at a time (small screens), so the map
    /// itself is a tab
    fn is_condensed(&self) -> bool {
        false
    }
}

pub trait FilterPanel {
    fn current_filters(&self) -> FilterSet;

    fn set_active_source(&mut self, source: SourceIdentity);

    fn set_enabled(&mut self, enabled: bool);
}

/// The results list
pub trait ListPanel {
    /// Rebuilds the list from `source`. The list may dismiss `popup` while doing so.
    fn reset(&mut self, source: SourceView<'_>, popup: &mut dyn PopupController) -> Result<()>;
}

/// Presentation hook told about every mode decision
pub trait ModeObserver {
    fn display_mode_decided(&mut self, mode: DisplayMode);
}

pub trait PopupController {
    fn dismiss(&mut self);

    /// Opens the popup on `record`. With `pan_into_view` false the view must not move
    /// to fit the popup.
    fn show_record(&mut self, record: &Record, pan_into_view: bool);
}
