//! Inbound Bridge Commands
//!
//! Maps one decoded line onto a typed [`BridgeCommand`]. Argument fields go
//! through the lenient [`FlatObject`] wrappers, so a malformed argument
//! produces a default value (and a warning), never a rejected command.

use std::fmt;
use std::path::PathBuf;

use super::fields::FlatObject;

/// Wire-level command literals
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `load_model`
    LoadModel,
    /// `unload_model`
    UnloadModel,
    /// `set_expression`
    SetExpression,
    /// `reset_expressions`
    ResetExpressions,
    /// `set_transition_speed`
    SetTransitionSpeed,
    /// `set_auto_blink`
    SetAutoBlink,
    /// `set_auto_head_movement`
    SetAutoHeadMovement,
    /// `set_blendshape` (reserved, answered with an error)
    SetBlendshape,
}

impl CommandKind {
    /// Substring match order
    ///
    /// Literals that contain another literal come first (`unload_model`
    /// before `load_model`, `reset_expressions` before `set_expression`).
    const MATCH_ORDER: [Self; 8] = [
        Self::UnloadModel,
        Self::LoadModel,
        Self::ResetExpressions,
        Self::SetExpression,
        Self::SetTransitionSpeed,
        Self::SetAutoBlink,
        Self::SetAutoHeadMovement,
        Self::SetBlendshape,
    ];

    /// The literal as it appears on the wire
    #[must_use]
    pub const fn literal(self) -> &'static str {
        match self {
            Self::LoadModel => "load_model",
            Self::UnloadModel => "unload_model",
            Self::SetExpression => "set_expression",
            Self::ResetExpressions => "reset_expressions",
            Self::SetTransitionSpeed => "set_transition_speed",
            Self::SetAutoBlink => "set_auto_blink",
            Self::SetAutoHeadMovement => "set_auto_head_movement",
            Self::SetBlendshape => "set_blendshape",
        }
    }

    /// Classify a `command` field value
    ///
    /// Exact match first, then substring match in [`Self::MATCH_ORDER`].
    #[must_use]
    pub fn from_field(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::MATCH_ORDER
            .iter()
            .copied()
            .find(|kind| kind.literal() == value)
            .or_else(|| {
                Self::MATCH_ORDER
                    .iter()
                    .copied()
                    .find(|kind| value.contains(kind.literal()))
            })
    }

    /// Presence-based fallback: look for a quoted literal anywhere in the line
    ///
    /// Only used when the `command` field could not be extracted. Quoting the
    /// literal keeps `"load_model"` from matching inside `"unload_model"`, but
    /// a string value that happens to equal another literal can still win.
    #[must_use]
    pub fn scan(raw: &str) -> Option<Self> {
        Self::MATCH_ORDER
            .iter()
            .copied()
            .find(|kind| raw.contains(&format!("\"{}\"", kind.literal())))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// A decoded inbound command with its (defaulted) arguments
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeCommand {
    /// Load a character asset
    LoadModel {
        /// Asset path, separators normalized to the host's
        path: PathBuf,
    },
    /// Unload the current asset
    UnloadModel,
    /// Set an expression target
    SetExpression {
        /// Expression name as sent (resolved later)
        name: String,
        /// Target weight (clamped later)
        value: f32,
    },
    /// Soft reset of all expression targets
    ResetExpressions,
    /// Change the blend speed
    SetTransitionSpeed {
        /// Requested speed (clamped later)
        speed: f32,
    },
    /// Toggle auto-blink
    SetAutoBlink {
        /// Whether the behavior runs
        enabled: bool,
    },
    /// Toggle and tune head sway
    SetAutoHeadMovement {
        /// Whether the behavior runs
        enabled: bool,
        /// Shortest wait between excursions (seconds)
        min_interval: f32,
        /// Longest wait between excursions (seconds)
        max_interval: f32,
        /// Yaw amplitude in degrees; pitch uses half of it
        max_angle: f32,
    },
    /// Reserved; never executed
    SetBlendshape,
}

impl BridgeCommand {
    /// Decode one line
    ///
    /// Returns `None` when no known command literal can be found.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let fields = FlatObject::parse(line);

        let kind = match fields.string("command") {
            Some(value) => CommandKind::from_field(value),
            None if line.contains("\"command\"") => CommandKind::scan(line),
            None => None,
        }?;

        Some(Self::from_fields(kind, &fields))
    }

    /// Build a command of a known kind from extracted fields
    #[must_use]
    pub fn from_fields(kind: CommandKind, fields: &FlatObject) -> Self {
        match kind {
            CommandKind::LoadModel => Self::LoadModel {
                path: normalize_path(&fields.string_or_default("path")),
            },
            CommandKind::UnloadModel => Self::UnloadModel,
            CommandKind::SetExpression => Self::SetExpression {
                name: fields.string_or_default("name"),
                value: fields.float_or_default("value"),
            },
            CommandKind::ResetExpressions => Self::ResetExpressions,
            CommandKind::SetTransitionSpeed => Self::SetTransitionSpeed {
                speed: fields.float_or_default("speed"),
            },
            CommandKind::SetAutoBlink => Self::SetAutoBlink {
                enabled: fields.bool_or_default("enabled"),
            },
            CommandKind::SetAutoHeadMovement => Self::SetAutoHeadMovement {
                enabled: fields.bool_or_default("enabled"),
                min_interval: fields.float_or_default("min_interval"),
                max_interval: fields.float_or_default("max_interval"),
                max_angle: fields.float_or_default("max_angle"),
            },
            CommandKind::SetBlendshape => Self::SetBlendshape,
        }
    }

    /// The wire literal this command was decoded from
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::LoadModel { .. } => CommandKind::LoadModel,
            Self::UnloadModel => CommandKind::UnloadModel,
            Self::SetExpression { .. } => CommandKind::SetExpression,
            Self::ResetExpressions => CommandKind::ResetExpressions,
            Self::SetTransitionSpeed { .. } => CommandKind::SetTransitionSpeed,
            Self::SetAutoBlink { .. } => CommandKind::SetAutoBlink,
            Self::SetAutoHeadMovement { .. } => CommandKind::SetAutoHeadMovement,
            Self::SetBlendshape => CommandKind::SetBlendshape,
        }
    }
}

/// Rewrite both `/` and `\` to the host separator
#[must_use]
pub fn normalize_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.replace(['/', '\\'], std::path::MAIN_SEPARATOR_STR))
}
