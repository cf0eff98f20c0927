use serde::{Deserialize, Serialize};

/// Granularity of what the map shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    /// One symbol per aggregation unit, with a record count
    Aggregated,
    /// Individual records
    Detailed,
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayMode::Aggregated => write!(f, "aggregated"),
            DisplayMode::Detailed => write!(f, "detailed"),
        }
    }
}

/// Picks the display mode for `zoom`. The cutoff itself is already Detailed.
///
/// There is no hysteresis: zooming back and forth across the cutoff flips the mode
/// every time.
pub fn decide(zoom: f64, cutoff: f64) -> DisplayMode {
    if zoom < cutoff {
        DisplayMode::Aggregated
    } else {
        DisplayMode::Detailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CLUSTER_CUTOFF_ZOOM;

    #[test]
    fn test_decide_boundary() {
        assert_eq!(decide(CLUSTER_CUTOFF_ZOOM - 1.0, CLUSTER_CUTOFF_ZOOM), DisplayMode::Aggregated);
        assert_eq!(decide(CLUSTER_CUTOFF_ZOOM, CLUSTER_CUTOFF_ZOOM), DisplayMode::Detailed);
        assert_eq!(decide(13.999, CLUSTER_CUTOFF_ZOOM), DisplayMode::Aggregated);
        assert_eq!(decide(18.0, CLUSTER_CUTOFF_ZOOM), DisplayMode::Detailed);
    }
}
