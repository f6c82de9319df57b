use std::{fs, future::Future, path::PathBuf, sync::Arc, sync::Mutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::{LinearClassifier, ModelHandle};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model artifact: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    Invalid(String),
    #[error("model loader worker failed: {0}")]
    Worker(String),
}

/// Where a classifier artifact comes from.
#[derive(Debug, Clone)]
pub enum ArtifactHandle {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum ModelStatus {
    Unloaded,
    Ready,
    Unavailable(String),
}

/// Holds at most one loaded model.
///
/// The first successful load is kept for the lifetime of the cache and every
/// later call returns the same handle. A failed load leaves the cache empty so
/// the caller can try again.
pub struct ModelCache {
    cell: OnceCell<ModelHandle>,
    last_error: Mutex<Option<String>>,
}

static GLOBAL_MODEL_CACHE: ModelCache = ModelCache::new();

impl ModelCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
            last_error: Mutex::new(None),
        }
    }

    pub fn preloaded(model: ModelHandle) -> Self {
        Self {
            cell: OnceCell::new_with(Some(model)),
            last_error: Mutex::new(None),
        }
    }

    /// Process-wide cache; lives until the process exits.
    pub fn global() -> &'static ModelCache {
        &GLOBAL_MODEL_CACHE
    }

    pub async fn load_model(&self, artifact: &ArtifactHandle) -> Result<ModelHandle, LoadError> {
        let artifact = artifact.clone();
        self.load_with(move || load_artifact(artifact)).await
    }

    /// Load through a custom runtime. `loader` only runs when nothing is cached.
    pub async fn load_with<F, Fut>(&self, loader: F) -> Result<ModelHandle, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ModelHandle, LoadError>>,
    {
        match self.cell.get_or_try_init(loader).await {
            Ok(model) => {
                self.set_last_error(None);
                Ok(model.clone())
            }
            Err(err) => {
                log::warn!("model load failed: {err}");
                self.set_last_error(Some(err.to_string()));
                Err(err)
            }
        }
    }

    pub fn get(&self) -> Option<ModelHandle> {
        self.cell.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub fn status(&self) -> ModelStatus {
        if self.is_ready() {
            return ModelStatus::Ready;
        }
        let last_error = match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        match last_error {
            Some(reason) => ModelStatus::Unavailable(reason),
            None => ModelStatus::Unloaded,
        }
    }

    fn set_last_error(&self, value: Option<String>) {
        let mut guard = match self.last_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = value;
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

async fn load_artifact(artifact: ArtifactHandle) -> Result<ModelHandle, LoadError> {
    tokio::task::spawn_blocking(move || {
        let bytes = match artifact {
            ArtifactHandle::Path(path) => {
                fs::read(&path).map_err(|source| LoadError::Io { path: path.clone(), source })?
            }
            ArtifactHandle::Bytes(bytes) => bytes,
        };
        let model = LinearClassifier::from_json(&bytes)?;
        log::info!("classifier loaded with {} classes", model.labels.len());
        Ok::<_, LoadError>(Arc::new(model) as ModelHandle)
    })
    .await
    .map_err(|err| LoadError::Worker(err.to_string()))?
}
