//! Wiring of the reader's collaborators from configuration.

use std::sync::Arc;
#[cfg(test)]
use storyteller_core::StaticFlags;
use storyteller_core::{
    FlagProvider, GroqGenerator, JsonFileStore, MemoryStore, Notifier, ProgressStore,
    ReaderConfig, StoredProgress, StoryCatalog, StoryInterface, Storyteller,
};

/// Everything a front end needs to open stories.
pub struct Services {
    pub config: ReaderConfig,
    pub catalog: Arc<StoryCatalog>,
    pub progress: Arc<dyn ProgressStore>,
    pub flags: Box<dyn FlagProvider>,
    pub storyteller: Option<Storyteller<GroqGenerator>>,
}

impl Services {
    /// Load the catalog, open the progress file and resolve flags.
    ///
    /// Only a broken catalog is fatal. Unreadable progress falls back to an
    /// in-memory store and an unreachable flag service to local flags.
    pub async fn load(config: ReaderConfig) -> Result<Self, storyteller_core::CatalogError> {
        let mut catalog = StoryCatalog::builtin()?;
        if let Some(path) = &config.catalog_path {
            catalog.merge(StoryCatalog::load_json(path).await?)?;
        }
        tracing::info!(stories = catalog.len(), "catalog ready");

        let progress: Arc<dyn ProgressStore> =
            match JsonFileStore::open(config.progress_path()).await {
                Ok(store) => Arc::new(StoredProgress::new(store)),
                Err(e) => {
                    tracing::warn!(
                        path = %config.progress_path().display(),
                        error = %e,
                        "progress file unusable, progress will not be kept"
                    );
                    Arc::new(StoredProgress::new(MemoryStore::new()))
                }
            };

        let flags = resolve_flags(&config).await;

        let storyteller = match config.generator() {
            Ok(generator) => Some(Storyteller::new(generator)),
            Err(e) => {
                tracing::info!(reason = %e, "AI storyteller disabled");
                None
            }
        };

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            progress,
            flags,
            storyteller,
        })
    }

    /// Open the reading screen for a story.
    pub fn open(&self, story_id: &str, notifier: Arc<dyn Notifier>) -> StoryInterface {
        StoryInterface::open(
            self.catalog.clone(),
            self.progress.clone(),
            self.flags.as_ref(),
            notifier,
            story_id,
        )
        .with_share_base_url(self.config.share_base_url.clone())
    }
}

async fn resolve_flags(config: &ReaderConfig) -> Box<dyn FlagProvider> {
    let local = config.static_flags();
    let Some(client) = config.flagsmith() else {
        return Box::new(local);
    };

    match client.fetch().await {
        Ok(snapshot) => {
            tracing::info!(flags = snapshot.len(), "fetched remote flags");
            Box::new(snapshot)
        }
        Err(e) => {
            tracing::warn!(error = %e, "flag service unavailable, using local flags");
            Box::new(local)
        }
    }
}

#[cfg(test)]
impl Services {
    /// Built-in stories, volatile progress and the given flags.
    pub fn in_memory(flags: StaticFlags) -> Self {
        Self {
            config: ReaderConfig::new(),
            catalog: Arc::new(StoryCatalog::builtin().unwrap()),
            progress: Arc::new(StoredProgress::new(MemoryStore::new())),
            flags: Box::new(flags),
            storyteller: None,
        }
    }
}
