//! # System Lifecycle & Orchestration
//!
//! Loaders, caches and the network source are simple on their own; wiring
//! them together is where the complexity lives. [`LoaderSystem`] is the
//! conductor:
//!
//! 1. **Runtime** - starts the worker pool all actors and network I/O run on
//! 2. **Caches** - builds the memory cache, layered over a persistent one when
//!    a cache directory is configured
//! 3. **Network** - starts the [`OnlineFileSource`](crate::file_source::OnlineFileSource)
//!    over the platform transport and publishes network status
//! 4. **Loaders** - hands out [`TileLoader`](crate::tile_loader::TileLoader)s
//!    sharing all of the above
//! 5. **Shutdown** - drops the network actor, then the pool
//!
//! ```rust,ignore
//! let system = LoaderSystem::new(&config, transport)?;
//! let tile = system.actor(MyTile::default());
//! let mut loader = system.tile_loader(Resource::tile(url), tile.actor_ref());
//! loader.set_necessity(Necessity::Required);
//! // ...
//! drop(loader);
//! system.shutdown();
//! ```

mod loader_system;
pub mod tracing;

pub use loader_system::LoaderSystem;
