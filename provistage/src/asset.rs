//! Asset store collaborator.
//!
//! Assets are named, regenerable artifacts (e.g. the bootstrap ignition
//! config) cached on disk. The store exclusively owns the on-disk
//! representation; hooks only request fetch/destroy and never mutate asset
//! files directly.

use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A reference to a named asset within the state directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef {
    name: String,
    filename: String,
}

impl AssetRef {
    /// Creates an asset reference.
    #[must_use]
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
        }
    }

    /// The bootstrap ignition config asset.
    #[must_use]
    pub fn bootstrap_ignition() -> Self {
        Self::new("Bootstrap Ignition Config", "bootstrap.ign")
    }

    /// Returns the human-readable asset name, used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the filename the asset is cached under.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Trait for asset stores.
///
/// Implementations must serialize conflicting requests internally; callers
/// assume single-writer semantics per pipeline run.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Returns the asset's content, regenerating it if it is not cached.
    async fn fetch(&self, asset: &AssetRef) -> anyhow::Result<Vec<u8>>;

    /// Removes the cached asset so the next fetch regenerates it.
    ///
    /// Destroying an asset that is not cached is a success.
    async fn destroy(&self, asset: &AssetRef) -> anyhow::Result<()>;
}

/// Generator function producing an asset's content from the state directory.
pub type AssetGenerator = Arc<dyn Fn(&Path) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// A directory-backed asset store.
///
/// Fetch returns the cached file when present; otherwise the registered
/// generator for the asset is run against the state directory (where it may
/// read other inputs, such as the load-balancer config document) and the
/// result is cached before being returned.
pub struct DiskAssetStore {
    dir: PathBuf,
    generators: HashMap<String, AssetGenerator>,
}

impl DiskAssetStore {
    /// Creates a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            generators: HashMap::new(),
        }
    }

    /// Registers the generator used to (re)produce `asset`.
    #[must_use]
    pub fn with_generator(mut self, asset: &AssetRef, generator: AssetGenerator) -> Self {
        self.generators.insert(asset.name().to_string(), generator);
        self
    }

    fn cache_path(&self, asset: &AssetRef) -> PathBuf {
        self.dir.join(asset.filename())
    }
}

impl std::fmt::Debug for DiskAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskAssetStore")
            .field("dir", &self.dir)
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl AssetStore for DiskAssetStore {
    async fn fetch(&self, asset: &AssetRef) -> anyhow::Result<Vec<u8>> {
        let path = self.cache_path(asset);
        match tokio::fs::read(&path).await {
            Ok(data) => return Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("reading cached {}", asset.name()))
            }
        }

        let generator = self
            .generators
            .get(asset.name())
            .with_context(|| format!("no generator registered for {}", asset.name()))?;
        let data = generator(&self.dir)?;
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("caching {}", asset.name()))?;
        debug!(asset = asset.name(), path = %path.display(), "regenerated asset");
        Ok(data)
    }

    async fn destroy(&self, asset: &AssetRef) -> anyhow::Result<()> {
        let path = self.cache_path(asset);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(asset = asset.name(), "destroyed cached asset");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing cached {}", asset.name())),
        }
    }
}
