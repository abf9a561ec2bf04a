//! # Tile Loader Demo
//!
//! Loads a handful of tiles through a [`LoaderSystem`] backed by a synthetic
//! transport, then loads them again to show cache hits.
//!
//! ```bash
//! RUST_LOG=tile_loader=debug cargo run -- [config.yml]
//! ```

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tile_loader::file_source::HttpTransport;
use tile_loader::lifecycle::tracing::setup_tracing;
use tile_loader::{
    Config, LoaderSystem, Necessity, Reason, Resource, Response, ResponseError, TileData,
    TileObserver,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Instrument};

/// Serves every tile except those under `tile://missing/`.
struct SyntheticTransport;

#[async_trait]
impl HttpTransport for SyntheticTransport {
    async fn fetch(&self, resource: &Resource) -> Response {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if resource.url.starts_with("tile://missing/") {
            return Response::error(Reason::NotFound, "Tile not found");
        }
        Response::with_data(format!("tile data for {}", resource.url))
            .expires_at(SystemTime::now() + Duration::from_secs(60))
    }
}

enum Event {
    Loaded(String, usize),
    Failed(String, ResponseError),
}

struct DemoTile {
    url: String,
    events: mpsc::UnboundedSender<Event>,
}

impl TileObserver for DemoTile {
    fn on_tile_loaded(&mut self, tile: TileData) {
        let size = tile.data.map_or(0, |data| data.len());
        let _ = self.events.send(Event::Loaded(self.url.clone(), size));
    }

    fn on_tile_error(&mut self, error: ResponseError) {
        let _ = self.events.send(Event::Failed(self.url.clone(), error));
    }
}

const TILES: [&str; 4] = [
    "tile://0/0/0",
    "tile://1/0/1",
    "tile://1/1/1",
    "tile://missing/9/9",
];

async fn load_all(system: &LoaderSystem) {
    let (events, mut received) = mpsc::unbounded_channel();
    let tiles: Vec<_> = TILES
        .iter()
        .map(|url| {
            system.actor(DemoTile {
                url: url.to_string(),
                events: events.clone(),
            })
        })
        .collect();

    let mut loaders: Vec<_> = TILES
        .iter()
        .zip(&tiles)
        .map(|(url, tile)| system.tile_loader(Resource::tile(*url), tile.actor_ref()))
        .collect();
    for loader in &mut loaders {
        loader.set_necessity(Necessity::Required);
    }

    for _ in 0..TILES.len() {
        match tokio::time::timeout(Duration::from_secs(5), received.recv()).await {
            Ok(Some(Event::Loaded(url, size))) => info!(%url, size, "Tile loaded"),
            Ok(Some(Event::Failed(url, error))) => warn!(%url, %error, "Tile failed"),
            Ok(None) | Err(_) => {
                error!("Timed out waiting for tiles");
                break;
            }
        }
    }

    // Loaders first: no callback may reach a dropped tile.
    drop(loaders);
    drop(tiles);
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config_path = std::env::args().nth(1);
    let config = Config::get(config_path.as_deref().map(Path::new)).map_err(|e| e.to_string())?;

    // Setup tracing once for the entire application
    setup_tracing(&config.logging);

    info!("Starting tile loader demo");
    let system =
        LoaderSystem::new(&config, Arc::new(SyntheticTransport)).map_err(|e| e.to_string())?;

    load_all(&system)
        .instrument(tracing::info_span!("cold_load"))
        .await;
    info!(cached = system.cache().size(), "First pass complete");

    // Served from the cache this time, without touching the transport.
    load_all(&system)
        .instrument(tracing::info_span!("warm_load"))
        .await;

    let stats = system.file_source().stats().await;
    info!(active = stats.active, pending = stats.pending, "Request queue drained");

    system.shutdown();
    Ok(())
}
