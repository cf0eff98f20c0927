use anyhow::Context;
use mapfinder::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Meters per pixel at zoom 0 in Web Mercator
const BASE_RESOLUTION: f64 = 156_543.033_928_040_97;
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A viewport that the script moves around
struct Camera {
    center: Point,
    zoom: f64,
    size: Point,
    tab: Tab,
}

impl Camera {
    fn extent(&self) -> Extent {
        let resolution = BASE_RESOLUTION / 2f64.powf(self.zoom);
        Extent::from_center_and_size(
            self.center,
            self.size.x * resolution,
            self.size.y * resolution,
        )
    }
}

type SharedCamera = Rc<RefCell<Camera>>;

struct ScriptedView(SharedCamera);

impl MapView for ScriptedView {
    fn current_zoom(&self) -> f64 {
        self.0.borrow().zoom
    }

    fn size(&self) -> Point {
        self.0.borrow().size
    }

    fn calculate_extent(&self, _size: Point) -> Extent {
        self.0.borrow().extent()
    }

    fn animate_to(&mut self, center: Point, zoom: f64) {
        log::info!("view: animate to ({:.0}, {:.0}) at zoom {}", center.x, center.y, zoom);
        let mut camera = self.0.borrow_mut();
        camera.center = center;
        camera.zoom = zoom;
    }
}

struct LoggingTabs(SharedCamera);

impl TabPanel for LoggingTabs {
    fn active_tab(&self) -> Tab {
        self.0.borrow().tab
    }

    fn open(&mut self, tab: Tab) {
        log::info!("tabs: open {:?}", tab);
        self.0.borrow_mut().tab = tab;
    }
}

struct LoggingLayer;

impl RenderLayer for LoggingLayer {
    fn set_active_source(&mut self, source: SourceView<'_>) {
        match source {
            SourceView::Aggregated(store) => log::info!("layer: {} aggregation units", store.len()),
            SourceView::Detailed(store) => log::info!("layer: {} detail records", store.len()),
        }
    }

    fn refresh(&mut self) {
        log::info!("layer: refresh");
    }
}

struct LoggingHighlight;

impl HighlightLayer for LoggingHighlight {
    fn clear(&mut self) {
        log::debug!("highlight: clear");
    }
}

struct LoggingFilters;

impl FilterPanel for LoggingFilters {
    fn current_filters(&self) -> FilterSet {
        FilterSet::default()
    }

    fn set_active_source(&mut self, source: SourceIdentity) {
        log::debug!("filters: source {}", source);
    }

    fn set_enabled(&mut self, enabled: bool) {
        log::info!("filters: enabled={}", enabled);
    }
}

struct LoggingList;

impl ListPanel for LoggingList {
    fn reset(&mut self, source: SourceView<'_>, popup: &mut dyn PopupController) -> Result<()> {
        popup.dismiss();
        match source {
            SourceView::Aggregated(store) => {
                for unit in store.units().iter().take(5) {
                    log::info!("list: {} ({} records)", unit.code, store.count(&unit.code));
                }
            }
            SourceView::Detailed(store) => {
                log::info!("list: {} of {} records", store.visible_len(), store.len());
                for record in store.visible().take(5) {
                    log::info!("list: record {}", record.id);
                }
            }
        }
        Ok(())
    }
}

struct LoggingPopup;

impl PopupController for LoggingPopup {
    fn dismiss(&mut self) {
        log::info!("popup: dismiss");
    }

    fn show_record(&mut self, record: &Record, _pan_into_view: bool) {
        log::info!("popup: record {}", record.id);
    }
}

struct LoggingPresentation;

impl ModeObserver for LoggingPresentation {
    fn display_mode_decided(&mut self, mode: DisplayMode) {
        log::info!("presentation: {} mode", mode);
    }
}

fn load_units(path: Option<&str>, config: &FinderConfig) -> anyhow::Result<AggregatedStore> {
    let Some(path) = path else {
        log::warn!("no aggregation unit file given, Aggregated mode will be empty");
        return Ok(AggregatedStore::default());
    };
    let csv = std::fs::read_to_string(path)
        .with_context(|| format!("reading aggregation units from {}", path))?;
    let store = AggregatedStore::from_csv(
        &csv,
        &config.unit_format,
        &config.unit_code_field,
        config.display_projection,
    )?;
    log::info!("loaded {} aggregation units", store.len());
    Ok(store)
}

async fn settle(controller: &mut LodController) {
    let settled = tokio::time::timeout(FETCH_TIMEOUT, controller.settle_all()).await;
    match settled {
        Ok(outcomes) => {
            for outcome in outcomes {
                log::info!("settled: {:?}", outcome);
            }
        }
        Err(_) => log::warn!(
            "{} fetches still pending after {:?}",
            controller.in_flight(),
            FETCH_TIMEOUT
        ),
    }
}

/// Usage: `mapfinder-app [config.json] [units.csv]`
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    mapfinder::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => FinderConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => FinderConfig::default(),
    };
    let units = load_units(args.get(1).map(String::as_str), &config)?;

    // Gravesend, Brooklyn
    let home = LatLng::new(40.60785, -73.98267);
    let center = config.display_projection.from_lat_lng(home)?;
    let camera = Rc::new(RefCell::new(Camera {
        center,
        zoom: 12.0,
        size: Point::new(1024.0, 768.0),
        tab: Tab::Map,
    }));

    let fetcher = Arc::new(HttpFetcher::from_config(&config));
    let ui = Collaborators {
        view: Box::new(ScriptedView(Rc::clone(&camera))),
        layer: Box::new(LoggingLayer),
        highlight: Box::new(LoggingHighlight),
        tabs: Box::new(LoggingTabs(Rc::clone(&camera))),
        filters: Box::new(LoggingFilters),
        list: Box::new(LoggingList),
        popup: Box::new(LoggingPopup),
        presentation: Box::new(LoggingPresentation),
    };
    let mut controller =
        LodController::new(config, units, fetcher.clone(), ui)?.with_count_fetcher(fetcher);

    controller.load_unit_counts();
    controller.cluster()?;
    settle(&mut controller).await;

    // zoom in past the cutoff, pan, then step back inside the first region
    let script = [(15.0, 0.0, 0.0), (15.0, 600.0, 0.0), (16.0, 0.0, 0.0), (13.0, 0.0, 0.0)];
    for (zoom, dx, dy) in script {
        {
            let mut camera = camera.borrow_mut();
            camera.zoom = zoom;
            camera.center = Point::new(center.x + dx, center.y + dy);
        }
        if let Err(e) = controller.cluster() {
            log::error!("cluster failed: {}", e);
        }
        settle(&mut controller).await;
    }

    // open the nearest record the way a list click would
    let first_id = controller.detailed().visible().next().map(|r| r.id.clone());
    if let Some(id) = first_id {
        controller.zoom_to_record(&id)?;
        if let Err(e) = controller.cluster() {
            log::error!("cluster failed: {}", e);
        }
        settle(&mut controller).await;
        controller.move_ended();
    }

    log::info!(
        "done: {} detail records, {} regions fetched",
        controller.detailed().len(),
        controller.extent_cache().len()
    );
    Ok(())
}
