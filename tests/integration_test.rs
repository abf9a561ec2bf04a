use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tile_loader::file_source::HttpTransport;
use tile_loader::{
    Config, LoaderSystem, Necessity, Reason, Resource, Response, ResponseError, TileData,
    TileObserver,
};
use tokio::sync::mpsc;

/// Serves `payload:<url>` for every URL except `tile://missing/...`.
#[derive(Default)]
struct CountingTransport {
    fetches: AtomicUsize,
}

#[async_trait]
impl HttpTransport for CountingTransport {
    async fn fetch(&self, resource: &Resource) -> Response {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if resource.url.starts_with("tile://missing/") {
            return Response::error(Reason::NotFound, "HTTP status code 404");
        }
        Response::with_data(format!("payload:{}", resource.url))
            .expires_at(SystemTime::now() + Duration::from_secs(60))
    }
}

struct Tile {
    results: mpsc::UnboundedSender<Result<TileData, ResponseError>>,
}

impl TileObserver for Tile {
    fn on_tile_loaded(&mut self, tile: TileData) {
        let _ = self.results.send(Ok(tile));
    }

    fn on_tile_error(&mut self, error: ResponseError) {
        let _ = self.results.send(Err(error));
    }
}

async fn load_once(system: &LoaderSystem, url: &str) -> Result<TileData, ResponseError> {
    let (results, mut received) = mpsc::unbounded_channel();
    let tile = system.actor(Tile { results });
    let mut loader = system.tile_loader(Resource::tile(url), tile.actor_ref());
    loader.set_necessity(Necessity::Required);

    tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("Timed out waiting for tile")
        .expect("Tile dropped")
}

/// Full end-to-end test through the real online file source.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loader_system_fetches_then_serves_from_cache() {
    let transport = Arc::new(CountingTransport::default());
    let system = LoaderSystem::new(&Config::default(), transport.clone()).unwrap();

    let tile = load_once(&system, "tile://1/2/3").await.unwrap();
    assert_eq!(tile.data.unwrap(), "payload:tile://1/2/3");
    assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(system.cache().size(), 1);

    let tile = load_once(&system, "tile://1/2/3").await.unwrap();
    assert_eq!(tile.data.unwrap(), "payload:tile://1/2/3");
    assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);

    let stats = system.file_source().stats().await;
    assert_eq!(stats.active, 0);
    assert_eq!(stats.pending, 0);

    system.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loader_system_reports_missing_tiles() {
    let transport = Arc::new(CountingTransport::default());
    let system = LoaderSystem::new(&Config::default(), transport.clone()).unwrap();

    let error = load_once(&system, "tile://missing/0/0").await.unwrap_err();
    assert_eq!(error.reason, Reason::NotFound);
    assert_eq!(system.cache().size(), 0);

    system.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_persistent_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        "runtime:\n  worker_threads: 2\ncache:\n  path: {}\n",
        dir.path().display()
    );
    let config = Config::from_yaml_str(&yaml).unwrap();

    let transport = Arc::new(CountingTransport::default());
    let system = LoaderSystem::new(&config, transport.clone()).unwrap();
    load_once(&system, "tile://4/5/6").await.unwrap();
    system.shutdown();

    let system = LoaderSystem::new(&config, transport.clone()).unwrap();
    let tile = load_once(&system, "tile://4/5/6").await.unwrap();
    assert_eq!(tile.data.unwrap(), "payload:tile://4/5/6");
    assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
    system.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_schemes_bypass_the_network() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("tiles")).unwrap();
    std::fs::write(dir.path().join("tiles/0.pbf"), b"bundled").unwrap();
    std::fs::write(dir.path().join("loose.pbf"), b"loose").unwrap();
    let yaml = format!("assets:\n  path: {}\n", dir.path().display());
    let config = Config::from_yaml_str(&yaml).unwrap();

    let transport = Arc::new(CountingTransport::default());
    let system = LoaderSystem::new(&config, transport.clone()).unwrap();

    let tile = load_once(&system, "asset://tiles/0.pbf").await.unwrap();
    assert_eq!(tile.data.unwrap(), "bundled");

    let url = url::Url::from_file_path(dir.path().join("loose.pbf")).unwrap();
    let tile = load_once(&system, url.as_str()).await.unwrap();
    assert_eq!(tile.data.unwrap(), "loose");

    let error = load_once(&system, "asset://tiles/missing.pbf").await.unwrap_err();
    assert_eq!(error.reason, Reason::NotFound);
    assert_eq!(transport.fetches.load(Ordering::SeqCst), 0);
    system.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_assets_without_root_are_unsupported() {
    let transport = Arc::new(CountingTransport::default());
    let system = LoaderSystem::new(&Config::default(), transport.clone()).unwrap();

    let error = load_once(&system, "asset://tiles/0.pbf").await.unwrap_err();
    assert_eq!(error.reason, Reason::Other);
    assert_eq!(error.message, "Unsupported resource request.");
    assert_eq!(transport.fetches.load(Ordering::SeqCst), 0);
    system.shutdown();
}
