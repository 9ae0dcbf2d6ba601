//! Avatar Attributes and Asset Seams
//!
//! An attribute is one named, range-bounded scalar the character exposes:
//! an expression weight (`Joy`, `Blink`) or a bone rotation (`HeadYaw`).
//!
//! # Module Structure
//!
//! - [`rig`]: collaborator traits for loading assets and locating attributes
//! - [`fs`]: filesystem-backed loader used by the daemon
//! - Attribute naming ([`AttributeKey`]) and value ranges ([`AttributeRange`])
//!
//! # Naming
//!
//! Names arriving from the controller are lowercase (`joy`, `blink_l`).
//! They resolve through a fixed preset table to the canonical names; names
//! outside the table fall back to their capitalized form (`surprised` →
//! `Surprised`). Keys compare case-insensitively.

pub mod fs;
pub mod rig;

pub use fs::FsAssetLoader;
pub use rig::{AssetError, AssetHandle, AssetLoader, AttributeRegistry, AttributeSet, LoadedAsset};

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Canonical name of the neutral expression
pub const NEUTRAL: &str = "Neutral";

/// Canonical name of the blink expression
pub const BLINK: &str = "Blink";

/// Canonical name of the head yaw rotation (degrees)
pub const HEAD_YAW: &str = "HeadYaw";

/// Canonical name of the head pitch rotation (degrees)
pub const HEAD_PITCH: &str = "HeadPitch";

/// Alias → canonical name
const PRESETS: &[(&str, &str)] = &[
    ("joy", "Joy"),
    ("angry", "Angry"),
    ("sorrow", "Sorrow"),
    ("fun", "Fun"),
    ("neutral", NEUTRAL),
    ("blink", BLINK),
    ("blink_l", "Blink_L"),
    ("blink_r", "Blink_R"),
    ("a", "A"),
    ("i", "I"),
    ("u", "U"),
    ("e", "E"),
    ("o", "O"),
    ("lookup", "LookUp"),
    ("lookdown", "LookDown"),
    ("lookleft", "LookLeft"),
    ("lookright", "LookRight"),
    ("headyaw", HEAD_YAW),
    ("headpitch", HEAD_PITCH),
];

/// Expressions the standard VRM rig exposes
pub const STANDARD_EXPRESSIONS: &[&str] = &[
    "Neutral", "Joy", "Angry", "Sorrow", "Fun", "Surprised", "Blink", "Blink_L", "Blink_R", "A",
    "I", "U", "E", "O", "LookUp", "LookDown", "LookLeft", "LookRight",
];

/// Case-insensitive attribute name
///
/// Holds the canonical spelling for display and a folded copy for
/// comparison and hashing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AttributeKey {
    name: String,
    folded: String,
}

impl AttributeKey {
    /// Resolve a wire name to its canonical key
    #[must_use]
    pub fn resolve(raw: &str) -> Self {
        let raw = raw.trim();
        let folded = raw.to_lowercase();
        let name = PRESETS
            .iter()
            .find(|(alias, _)| *alias == folded)
            .map_or_else(|| capitalize(raw), |(_, canonical)| (*canonical).to_string());
        Self::from_canonical(name)
    }

    fn from_canonical(name: String) -> Self {
        let folded = name.to_lowercase();
        Self { name, folded }
    }

    /// Canonical spelling
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether this names a bone rotation rather than an expression
    #[must_use]
    pub fn is_rotation(&self) -> bool {
        self.folded == "headyaw" || self.folded == "headpitch"
    }
}

impl PartialEq for AttributeKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for AttributeKey {}

impl Hash for AttributeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl PartialOrd for AttributeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for AttributeKey {
    fn from(raw: &str) -> Self {
        Self::resolve(raw)
    }
}

impl From<String> for AttributeKey {
    fn from(raw: String) -> Self {
        Self::resolve(&raw)
    }
}

impl From<AttributeKey> for String {
    fn from(key: AttributeKey) -> Self {
        key.name
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}

/// Legal value interval for an attribute
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeRange {
    /// Lower bound (inclusive)
    pub min: f32,
    /// Upper bound (inclusive)
    pub max: f32,
    /// Rest value: initial `current` and the idle-motion return point
    pub baseline: f32,
}

impl AttributeRange {
    /// Expression weights
    pub const EXPRESSION: Self = Self {
        min: 0.0,
        max: 1.0,
        baseline: 0.0,
    };

    /// Bone rotations in degrees
    pub const ROTATION_DEGREES: Self = Self {
        min: -90.0,
        max: 90.0,
        baseline: 0.0,
    };

    /// Range that applies to a key
    #[must_use]
    pub fn for_key(key: &AttributeKey) -> Self {
        if key.is_rotation() {
            Self::ROTATION_DEGREES
        } else {
            Self::EXPRESSION
        }
    }

    /// Clamp a value into range; non-finite values map to the baseline
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.baseline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_preset_resolution() {
        assert_eq!(AttributeKey::resolve("joy").as_str(), "Joy");
        assert_eq!(AttributeKey::resolve("angry").as_str(), "Angry");
        assert_eq!(AttributeKey::resolve("sorrow").as_str(), "Sorrow");
        assert_eq!(AttributeKey::resolve("fun").as_str(), "Fun");
        assert_eq!(AttributeKey::resolve("blink_l").as_str(), "Blink_L");
        assert_eq!(AttributeKey::resolve("lookup").as_str(), "LookUp");
    }

    #[test]
    fn test_unmapped_name_is_capitalized() {
        assert_eq!(AttributeKey::resolve("surprised").as_str(), "Surprised");
        assert_eq!(AttributeKey::resolve("ébahi").as_str(), "Ébahi");
        assert_eq!(AttributeKey::resolve("").as_str(), "");
    }

    #[test]
    fn test_unmapped_name_spelling_ignores_client_case() {
        assert_eq!(AttributeKey::resolve("SURPRISED").as_str(), "Surprised");
        assert_eq!(AttributeKey::resolve("sURPRISED").as_str(), "Surprised");
        assert_eq!(AttributeKey::resolve("ÉBAHI").as_str(), "Ébahi");
    }

    #[test]
    fn test_case_insensitive_equality() {
        let a = AttributeKey::resolve("JOY");
        let b = AttributeKey::resolve("joy");
        let c = AttributeKey::resolve("SURPRISED");
        let d = AttributeKey::resolve("surprised");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Joy");
        assert_eq!(c, d);

        let set: HashSet<AttributeKey> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ranges() {
        let joy = AttributeKey::resolve("joy");
        let yaw = AttributeKey::resolve(HEAD_YAW);
        assert_eq!(AttributeRange::for_key(&joy), AttributeRange::EXPRESSION);
        assert_eq!(AttributeRange::for_key(&yaw), AttributeRange::ROTATION_DEGREES);

        assert!((AttributeRange::EXPRESSION.clamp(1.5) - 1.0).abs() < f32::EPSILON);
        assert!((AttributeRange::EXPRESSION.clamp(-0.5)).abs() < f32::EPSILON);
        assert!((AttributeRange::ROTATION_DEGREES.clamp(-120.0) + 90.0).abs() < f32::EPSILON);
        assert!((AttributeRange::EXPRESSION.clamp(f32::NAN)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let key = AttributeKey::resolve("joy");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"Joy\"");
        let back: AttributeKey = serde_json::from_str("\"blink\"").unwrap();
        assert_eq!(back.as_str(), "Blink");
    }
}
