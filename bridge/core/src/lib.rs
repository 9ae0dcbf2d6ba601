//! Bridge Core - Avatar Command Bridge and Procedural Animation
//!
//! An external controller process drives an animated character by sending
//! newline-delimited commands over one TCP loopback connection. This crate
//! receives those commands on an I/O thread, marshals them onto a single
//! render thread, and blends the character's attributes smoothly there.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │   Controller   │  {"command":"set_expression","name":"joy","value":0.8}\n
//! └───────┬────────┘
//!         │ TCP 127.0.0.1:5555
//! ┌───────┼─────────────────────────── I/O thread ──────────────────────┐
//! │  ConnectionManager → LineDecoder → FlatObject → BridgeCommand       │
//! └───────┼─────────────────────────────────────────────────────────────┘
//!         │ enqueue
//! ┌───────▼────────┐
//! │  CommandQueue  │
//! └───────┬────────┘
//!         │ drain once per tick
//! ┌───────┼─────────────────────────── render thread ───────────────────┐
//! │  AvatarController                                                    │
//! │   ├─ BlendEngine          (current/target per attribute)            │
//! │   ├─ IdleMotionScheduler  (auto-blink, head sway)                   │
//! │   └─ AssetLoader          (external collaborator)                   │
//! │                                   │ publish                          │
//! │                             RenderTarget                             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridge_core::{
//!     AvatarController, CommandQueue, ConnectionManager, ControllerSettings, TransportConfig,
//! };
//!
//! let queue = Arc::new(CommandQueue::new());
//! let manager = ConnectionManager::start(
//!     &TransportConfig::default(),
//!     AvatarController::command_handler(queue.sender()),
//! )?;
//! let mut controller =
//!     AvatarController::new(ControllerSettings::default(), queue, Arc::new(manager.handle()));
//!
//! loop {
//!     controller.tick(1.0 / 60.0, &mut my_render_target);
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`transport`]: TCP listener, line framing, connection lifecycle
//! - [`protocol`]: field extraction, command classification, responses
//! - [`queue`]: cross-thread command queue
//! - [`animation`]: blend engine, idle motion, easing
//! - [`avatar`]: attribute naming and asset collaborator traits
//! - [`controller`]: render-thread owner of animation state
//! - [`config`]: TOML/environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod avatar;
pub mod config;
pub mod controller;
pub mod protocol;
pub mod queue;
pub mod transport;

// Animation exports
pub use animation::{
    BlendEngine, EasingFunction, FrameSnapshot, IdleBehaviorConfig, IdleMotionScheduler,
    PhaseKind, RenderTarget, TargetRequest, TargetRequester, TickClock,
};

// Avatar exports
pub use avatar::{
    AssetError, AssetHandle, AssetLoader, AttributeKey, AttributeRange, AttributeRegistry,
    AttributeSet, FsAssetLoader, LoadedAsset,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env, BridgeConfig,
    BridgeToml, ConfigError, ConfigSource, IdleSettings,
};

// Controller exports
pub use controller::{AvatarController, CommandError, ControllerSettings, IdleBehavior};

// Protocol exports
pub use protocol::{
    BridgeCommand, BridgeMessage, CommandKind, FlatObject, NullSink, ResponseSink, ResponseStatus,
};

// Queue exports
pub use queue::{CommandQueue, CommandSender, DrainStats};

// Transport exports
pub use transport::{
    ConnectionHandle, ConnectionId, ConnectionManager, ConnectionState, LineDecoder,
    TransportConfig, TransportError,
};
