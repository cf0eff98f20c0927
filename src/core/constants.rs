//! Finder-wide defaults. Every one of them can be overridden through `FinderConfig`.

/// Zoom levels below this show the aggregated source; at or above it, individual records.
pub const CLUSTER_CUTOFF_ZOOM: f64 = 14.0;

/// Margin added to each side of the viewport before querying, in display projection units.
pub const QUERY_PADDING: f64 = 500.0;

/// Zoom used when flying to an individual record.
pub const DETAIL_ZOOM: f64 = 17.0;

/// Socrata export of the detail records.
pub const DETAIL_DATA_URL: &str =
    "https://data.cityofnewyork.us/resource/tbgj-tdd6.csv?&$limit=50000";

/// Per-unit record counts, grouped server side.
pub const UNIT_COUNT_URL: &str = "https://data.cityofnewyork.us/resource/tbgj-tdd6.csv?$select=community_board,count(community_board)%20as%20count&$group=community_board&$limit=50000";
