//! Filesystem-backed asset loader
//!
//! Used when no renderer is attached: it validates that the model file
//! exists and has a supported extension, then exposes the standard VRM
//! expression set plus the head rotation attributes.

use std::path::Path;

use super::rig::{AssetError, AssetHandle, AssetLoader, AttributeSet, LoadedAsset};
use super::{HEAD_PITCH, HEAD_YAW, STANDARD_EXPRESSIONS};

/// Accepted model file extensions (lowercase)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["vrm", "glb"];

/// Loader that only checks the file and reports the standard rig
#[derive(Debug, Default)]
pub struct FsAssetLoader {
    next_id: u64,
    loaded: Option<AssetHandle>,
}

impl FsAssetLoader {
    /// Create a loader with nothing loaded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently loaded asset
    #[must_use]
    pub fn loaded(&self) -> Option<&AssetHandle> {
        self.loaded.as_ref()
    }

    fn standard_rig() -> AttributeSet {
        AttributeSet::from_names(
            STANDARD_EXPRESSIONS
                .iter()
                .copied()
                .chain([HEAD_YAW, HEAD_PITCH]),
        )
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&mut self, path: &Path) -> Result<LoadedAsset, AssetError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.to_path_buf()),
            _ => AssetError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        if !metadata.is_file() {
            return Err(AssetError::LoadFailed {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !supported {
            return Err(AssetError::UnsupportedFormat(path.to_path_buf()));
        }

        self.next_id += 1;
        let handle = AssetHandle::new(self.next_id, path);
        tracing::info!(asset = %handle, bytes = metadata.len(), "Model loaded");
        self.loaded = Some(handle.clone());

        Ok(LoadedAsset {
            handle,
            registry: Box::new(Self::standard_rig()),
        })
    }

    fn unload(&mut self, handle: &AssetHandle) -> Result<(), AssetError> {
        match &self.loaded {
            Some(current) if current == handle => {
                tracing::info!(asset = %handle, "Model unloaded");
                self.loaded = None;
                Ok(())
            }
            _ => Err(AssetError::NotLoaded),
        }
    }
}
