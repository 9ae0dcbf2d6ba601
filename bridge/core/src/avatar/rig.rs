//! Asset collaborator seams
//!
//! Loading, instantiating and traversing a character model happen outside
//! this crate. The bridge only needs to ask for an asset by path, get back
//! an opaque handle, and learn which attributes the asset exposes.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::AttributeKey;

/// Errors from asset collaborators
#[derive(Debug, Error)]
pub enum AssetError {
    /// Path does not exist
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but is not a supported model format
    #[error("Unsupported model format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Loader failed for another reason
    #[error("Failed to load {}: {reason}", path.display())]
    LoadFailed {
        /// Requested path
        path: PathBuf,
        /// Loader-specific detail
        reason: String,
    },

    /// Unload requested with nothing loaded
    #[error("No model loaded")]
    NotLoaded,

    /// No loader was configured for this bridge
    #[error("No asset loader configured")]
    NoLoader,
}

/// Opaque handle to a loaded asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetHandle {
    id: u64,
    path: PathBuf,
}

impl AssetHandle {
    /// Create a handle (loaders assign their own ids)
    #[must_use]
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// Loader-assigned id
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path the asset was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for messages
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{} ({})", self.id, self.path.display())
    }
}

/// Locates named controllable attributes on a loaded asset
pub trait AttributeRegistry: Send {
    /// Whether the asset exposes this attribute
    fn locate(&self, key: &AttributeKey) -> bool;

    /// Every attribute the asset exposes
    fn attributes(&self) -> Vec<AttributeKey>;
}

/// A fixed set of attribute names
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    keys: HashSet<AttributeKey>,
}

impl AttributeSet {
    /// Build from names (resolved through the preset table)
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: names
                .into_iter()
                .map(|n| AttributeKey::resolve(n.as_ref()))
                .collect(),
        }
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl AttributeRegistry for AttributeSet {
    fn locate(&self, key: &AttributeKey) -> bool {
        self.keys.contains(key)
    }

    fn attributes(&self) -> Vec<AttributeKey> {
        let mut keys: Vec<_> = self.keys.iter().cloned().collect();
        keys.sort();
        keys
    }
}

/// Result of a successful load
pub struct LoadedAsset {
    /// Handle to pass back on unload
    pub handle: AssetHandle,
    /// Attributes the asset exposes
    pub registry: Box<dyn AttributeRegistry>,
}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("handle", &self.handle)
            .field("attributes", &self.registry.attributes().len())
            .finish()
    }
}

/// Loads and unloads character assets
///
/// Called only from the render thread.
pub trait AssetLoader: Send {
    /// Load the asset at `path`
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`] when the asset cannot be loaded.
    fn load(&mut self, path: &Path) -> Result<LoadedAsset, AssetError>;

    /// Release a previously loaded asset
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`] when the handle is unknown.
    fn unload(&mut self, handle: &AssetHandle) -> Result<(), AssetError>;
}
