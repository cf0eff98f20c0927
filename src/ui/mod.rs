pub mod popup;
pub mod switcher;
pub mod traits;

pub use popup::{DismissGuard, SuppressiblePopup};
pub use traits::{
    FilterPanel, HighlightLayer, ListPanel, MapView, ModeObserver, PopupController, RenderLayer,
    Tab, TabPanel,
};
