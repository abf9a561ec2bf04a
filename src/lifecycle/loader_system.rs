use crate::cache::{Cache, FileCache, LayeredCache, ResourceCache};
use crate::config::Config;
use crate::error::Result;
use crate::file_source::{
    CompositeFileSource, FileSource, HttpTransport, LocalFileSource, NetworkStatus,
    OnlineFileSource,
};
use crate::resource::Resource;
use crate::tile_loader::{LoaderContext, TileLoader, TileObserver};
use actor_runtime::{Actor, ActorRef, ThreadPool};
use std::sync::Arc;
use tracing::info;

/// The running loader system.
///
/// `LoaderSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the worker pool and the
///   network actor
/// - **Dependency Wiring**: every loader shares one cache, one file source and
///   one network status. The file source routes `asset://` and `file://` URLs
///   to the local filesystem and everything else to the network.
///
/// Loaders handed out by the system keep the pool alive through their
/// context, so drop them before (or soon after) calling [`shutdown`](Self::shutdown).
pub struct LoaderSystem {
    pool: Arc<ThreadPool>,
    file_source: Arc<OnlineFileSource>,
    context: LoaderContext,
}

impl LoaderSystem {
    /// Builds and starts the system described by `config`.
    pub fn new(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let pool = ThreadPool::with_name("tile-worker", config.runtime.worker_threads)?;
        let execution = pool.context();

        let memory = ResourceCache::new(config.cache.max_entries);
        let cache: Arc<dyn Cache> = match &config.cache.path {
            Some(path) => {
                let disk = FileCache::open(path, config.cache.max_entries)?;
                Arc::new(LayeredCache::new(Arc::new(memory), Arc::new(disk)))
            }
            None => Arc::new(memory),
        };
        cache.set_maximum_entry_size(config.cache.max_entry_size);

        let network = NetworkStatus::new(config.network.online);
        let file_source = Arc::new(OnlineFileSource::new(
            &execution,
            transport,
            network.clone(),
            config.network.max_concurrent_requests,
        ));

        let mut sources = CompositeFileSource::new();
        if let Some(path) = &config.assets.path {
            sources = sources.with_source(Arc::new(LocalFileSource::assets(
                execution.runtime().clone(),
                path,
            )));
        }
        let sources = sources
            .with_source(Arc::new(LocalFileSource::new(execution.runtime().clone())))
            .with_source(file_source.clone() as Arc<dyn FileSource>);

        let context = LoaderContext {
            execution,
            cache,
            file_source: Arc::new(sources),
            network,
            policy: config.network.retry_policy(),
        };

        info!(
            workers = pool.threads(),
            cache_entries = config.cache.max_entries,
            persistent = config.cache.path.is_some(),
            assets = config.assets.path.is_some(),
            "Loader system started"
        );
        Ok(Self {
            pool,
            file_source,
            context,
        })
    }

    pub fn context(&self) -> &LoaderContext {
        &self.context
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.context.cache
    }

    pub fn file_source(&self) -> &Arc<OnlineFileSource> {
        &self.file_source
    }

    pub fn network_status(&self) -> &NetworkStatus {
        &self.context.network
    }

    /// Starts an actor on the system's worker pool.
    pub fn actor<T: Send + 'static>(&self, object: T) -> Actor<T> {
        Actor::new(self.context.execution.scheduler(), object)
    }

    /// Creates an idle loader reporting to `observer`.
    pub fn tile_loader<O: TileObserver>(
        &self,
        resource: Resource,
        observer: ActorRef<O>,
    ) -> TileLoader<O> {
        TileLoader::new(resource, observer, self.context.clone())
    }

    /// Stops the network actor, then the worker pool.
    pub fn shutdown(self) {
        info!("Shutting down loader system...");
        let Self {
            pool,
            file_source,
            context,
        } = self;

        drop(context);
        drop(file_source);

        let outstanding = Arc::strong_count(&pool) - 1;
        if outstanding > 0 {
            info!(outstanding, "Worker pool stays up until remaining loaders drop");
        }
        drop(pool);
        info!("Loader system shutdown complete.");
    }
}
