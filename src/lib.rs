//! # Tile Loader
//!
//! > **Asynchronous resource loading for tiled maps.**
//!
//! This crate loads map resources (styles, sources, tiles, glyphs, sprites)
//! from the network and a local cache, keeps them fresh, and reports results
//! back to their owners. All mutable state lives in actors from the
//! [`actor_runtime`] crate, so nothing here needs a lock at the call site.
//!
//! ## 🚀 Core Components
//!
//! - **[`tile_loader`]**: the per-resource state machine. A [`TileLoader`]
//!   follows its owner's [`Necessity`], consults the cache, fetches, retries and
//!   revalidates.
//! - **[`file_source`]**: where data comes from. [`OnlineFileSource`](file_source::OnlineFileSource)
//!   queues requests by priority under a concurrency limit, and
//!   [`CompositeFileSource`](file_source::CompositeFileSource) routes `asset://`
//!   and `file://` URLs to the local filesystem instead.
//! - **[`cache`]**: bounded response caches (memory, disk, layered).
//! - **[`retry`]**: backoff and expiration math.
//! - **[`lifecycle`]**: wires everything into a [`LoaderSystem`].
//!
//! ## 📚 Quick Start
//!
//! ```rust,ignore
//! let config = Config::get(None)?;
//! let system = LoaderSystem::new(&config, transport)?;
//!
//! let tile = system.actor(MyTile::default());
//! let mut loader = system.tile_loader(Resource::tile("https://example.com/1/2/3.pbf"), tile.actor_ref());
//! loader.set_necessity(Necessity::Required);
//! ```
//!
//! ## 🧪 Testing
//!
//! [`file_source::mock::MockFileSource`] answers requests from canned
//! expectations, and [`actor_runtime::mock::ManualScheduler`] drains mailboxes
//! on demand.

pub mod cache;
pub mod config;
pub mod error;
pub mod file_source;
pub mod lifecycle;
pub mod resource;
pub mod response;
pub mod retry;
pub mod tile_loader;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::LoaderSystem;
pub use resource::{Priority, Resource, ResourceKind};
pub use response::{Reason, Response, ResponseError, Timestamp};
pub use retry::RetryPolicy;
pub use tile_loader::{LoaderContext, Necessity, TileData, TileLoader, TileObserver};
