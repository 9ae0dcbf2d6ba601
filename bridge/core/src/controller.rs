//! Avatar Controller - The Render-Thread Context
//!
//! The controller owns every piece of animation state: the blend engine,
//! both idle schedulers and the loaded asset. It is only ever touched from
//! the render thread, through two doors:
//!
//! - actions drained from the [`CommandQueue`] (network commands, idle
//!   motion requests)
//! - [`AvatarController::tick`], called once per frame
//!
//! # Frame order
//!
//! ```text
//! tick(dt):
//!   1. drain command queue       (commands + last frame's idle requests)
//!   2. advance idle schedulers   (new requests are enqueued, not applied)
//!   3. advance blend engine and publish to the render target
//! ```
//!
//! Every decoded network command produces exactly one response through the
//! configured [`ResponseSink`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::animation::{
    BlendEngine, IdleBehaviorConfig, IdleMotionScheduler, RenderTarget, TargetRequest,
    TargetRequester,
};
use crate::avatar::{AssetError, AssetHandle, AssetLoader, AttributeKey};
use crate::config::BridgeConfig;
use crate::protocol::{BridgeCommand, BridgeMessage, CommandKind, ResponseSink};
use crate::queue::{CommandQueue, CommandSender, DrainStats};

/// Excursion length used by `set_auto_head_movement`
pub const HEAD_MOVEMENT_DURATION: f32 = 2.0;

/// Application-level command failures (reported, never propagated)
#[derive(Debug, Error)]
pub enum CommandError {
    /// Asset collaborator failed
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// `set_expression` without a usable name
    #[error("Expression name is empty")]
    EmptyExpressionName,

    /// Reserved command
    #[error("{0} is not implemented")]
    NotImplemented(CommandKind),
}

/// Which autonomous behavior
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleBehavior {
    /// Periodic blinking
    Blink,
    /// Random head sway
    HeadMovement,
}

/// Startup parameters for a controller
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Blend speed
    pub transition_speed: f32,
    /// Auto-blink parameters
    pub auto_blink: IdleBehaviorConfig,
    /// Start with auto-blink running
    pub auto_blink_enabled: bool,
    /// Head sway parameters
    pub head_movement: IdleBehaviorConfig,
    /// Start with head sway running
    pub head_movement_enabled: bool,
    /// Fixed RNG seed for the schedulers (`None` = OS entropy)
    pub seed: Option<u64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for ControllerSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            transition_speed: config.transition_speed,
            auto_blink: config.auto_blink.behavior.clone(),
            auto_blink_enabled: config.auto_blink.enabled,
            head_movement: config.head_movement.behavior.clone(),
            head_movement_enabled: config.head_movement.enabled,
            seed: None,
        }
    }
}

/// Render-thread owner of animation state
pub struct AvatarController {
    engine: BlendEngine,
    blink: IdleMotionScheduler,
    head: IdleMotionScheduler,
    loader: Option<Box<dyn AssetLoader>>,
    asset: Option<AssetHandle>,
    queue: Arc<CommandQueue<AvatarController>>,
    requester: CommandSender<AvatarController>,
    outbox: Arc<dyn ResponseSink>,
    commands_handled: u64,
}

impl std::fmt::Debug for AvatarController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarController")
            .field("engine", &self.engine)
            .field("blink", &self.blink.phase())
            .field("head", &self.head.phase())
            .field("asset", &self.asset)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl AvatarController {
    /// Create a controller draining `queue` and replying through `outbox`
    #[must_use]
    pub fn new(
        settings: ControllerSettings,
        queue: Arc<CommandQueue<AvatarController>>,
        outbox: Arc<dyn ResponseSink>,
    ) -> Self {
        let (blink, head) = match settings.seed {
            Some(seed) => (
                IdleMotionScheduler::with_seed(settings.auto_blink, seed),
                IdleMotionScheduler::with_seed(settings.head_movement, seed.wrapping_add(1)),
            ),
            None => (
                IdleMotionScheduler::new(settings.auto_blink),
                IdleMotionScheduler::new(settings.head_movement),
            ),
        };

        let mut controller = Self {
            engine: BlendEngine::new(settings.transition_speed),
            blink,
            head,
            loader: None,
            asset: None,
            requester: queue.sender(),
            queue,
            outbox,
            commands_handled: 0,
        };

        if settings.auto_blink_enabled {
            controller.blink.enable();
        }
        if settings.head_movement_enabled {
            controller.head.enable();
        }
        controller
    }

    /// Attach the asset collaborator
    #[must_use]
    pub fn with_asset_loader(mut self, loader: Box<dyn AssetLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Producer handle for this controller's queue
    #[must_use]
    pub fn sender(&self) -> CommandSender<AvatarController> {
        self.queue.sender()
    }

    /// Callback for the transport: enqueue each decoded command
    ///
    /// Runs on the I/O thread; it never touches controller state directly.
    pub fn command_handler(
        sender: CommandSender<AvatarController>,
    ) -> impl Fn(BridgeCommand) + Send + Sync + 'static {
        move |command| {
            sender.enqueue(move |ctrl: &mut AvatarController| {
                ctrl.handle_command(command);
                Ok(())
            });
        }
    }

    /// Run one frame
    pub fn tick(&mut self, dt: f32, target: &mut dyn RenderTarget) -> DrainStats {
        let queue = Arc::clone(&self.queue);
        let stats = queue.drain_and_execute_all(self);

        self.blink.tick(dt, &mut self.requester);
        self.head.tick(dt, &mut self.requester);

        self.engine.tick(dt, target);
        stats
    }

    /// Execute a command and send its response
    pub fn handle_command(&mut self, command: BridgeCommand) -> BridgeMessage {
        let kind = command.kind();
        let response = match self.execute(command) {
            Ok(message) => {
                tracing::debug!(command = %kind, %message, "Command applied");
                BridgeMessage::success(kind, message)
            }
            Err(e) => {
                tracing::warn!(command = %kind, error = %e, "Command failed");
                BridgeMessage::error(kind, e.to_string())
            }
        };
        self.commands_handled += 1;
        self.outbox.send(response.clone());
        response
    }

    fn execute(&mut self, command: BridgeCommand) -> Result<String, CommandError> {
        match command {
            BridgeCommand::LoadModel { path } => self.load_model(&path),
            BridgeCommand::UnloadModel => self.unload_model(),
            BridgeCommand::SetExpression { name, value } => {
                if name.trim().is_empty() {
                    return Err(CommandError::EmptyExpressionName);
                }
                let key = AttributeKey::resolve(&name);
                let applied = self.engine.set_target(&key, value);
                Ok(format!("Expression {key} set to {applied:.2}"))
            }
            BridgeCommand::ResetExpressions => {
                self.engine.reset_all();
                Ok("Expressions reset".to_string())
            }
            BridgeCommand::SetTransitionSpeed { speed } => {
                let applied = self.engine.set_speed(speed);
                Ok(format!("Transition speed set to {applied:.2}"))
            }
            BridgeCommand::SetAutoBlink { enabled } => {
                self.blink.set_enabled(enabled, &mut self.requester);
                Ok(format!("Auto-blink {}", on_off(enabled)))
            }
            BridgeCommand::SetAutoHeadMovement {
                enabled,
                min_interval,
                max_interval,
                max_angle,
            } => {
                self.head
                    .update_timing_parameters(min_interval, max_interval, HEAD_MOVEMENT_DURATION);
                self.head
                    .update_amplitude_parameters(&[max_angle, max_angle / 2.0]);
                self.head.set_enabled(enabled, &mut self.requester);
                Ok(format!("Head movement {}", on_off(enabled)))
            }
            BridgeCommand::SetBlendshape => {
                Err(CommandError::NotImplemented(CommandKind::SetBlendshape))
            }
        }
    }

    fn load_model(&mut self, path: &Path) -> Result<String, CommandError> {
        let loader = self.loader.as_mut().ok_or(AssetError::NoLoader)?;

        if let Some(previous) = self.asset.take() {
            if let Err(e) = loader.unload(&previous) {
                tracing::warn!(asset = %previous, error = %e, "Failed to unload previous model");
            }
            self.engine.unbind();
        }

        let loaded = loader.load(path)?;
        let name = loaded.handle.display_name();
        self.engine.bind(loaded.registry);
        self.asset = Some(loaded.handle);
        Ok(format!("Model loaded: {name}"))
    }

    fn unload_model(&mut self) -> Result<String, CommandError> {
        let loader = self.loader.as_mut().ok_or(AssetError::NoLoader)?;
        let handle = self.asset.take().ok_or(AssetError::NotLoaded)?;

        let result = loader.unload(&handle);
        self.engine.unbind();
        result?;
        Ok(format!("Model unloaded: {}", handle.display_name()))
    }

    /// Start one excursion of an idle behavior right now
    pub fn trigger_idle(&mut self, behavior: IdleBehavior) -> bool {
        match behavior {
            IdleBehavior::Blink => self.blink.trigger_once(),
            IdleBehavior::HeadMovement => self.head.trigger_once(),
        }
    }

    /// Blend state
    #[must_use]
    pub fn engine(&self) -> &BlendEngine {
        &self.engine
    }

    /// Scheduler for a behavior
    #[must_use]
    pub fn idle(&self, behavior: IdleBehavior) -> &IdleMotionScheduler {
        match behavior {
            IdleBehavior::Blink => &self.blink,
            IdleBehavior::HeadMovement => &self.head,
        }
    }

    /// Currently loaded asset
    #[must_use]
    pub fn loaded_asset(&self) -> Option<&AssetHandle> {
        self.asset.as_ref()
    }

    /// Path of the currently loaded asset
    #[must_use]
    pub fn loaded_path(&self) -> Option<PathBuf> {
        self.asset.as_ref().map(|h| h.path().to_path_buf())
    }

    /// Commands executed so far
    #[must_use]
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }
}

impl TargetRequester for CommandSender<AvatarController> {
    fn request(&mut self, requests: Vec<TargetRequest>) {
        if requests.is_empty() {
            return;
        }
        self.enqueue(move |ctrl: &mut AvatarController| {
            for TargetRequest { key, value } in requests {
                ctrl.engine.set_immediate(&key, value);
            }
            Ok(())
        });
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{FrameSnapshot, PhaseKind};
    use crate::avatar::{AttributeSet, LoadedAsset, BLINK, HEAD_YAW};
    use crate::protocol::ResponseStatus;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const DT: f32 = 1.0 / 60.0;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<BridgeMessage>>);

    impl ResponseSink for Outbox {
        fn send(&self, message: BridgeMessage) {
            self.0.lock().push(message);
        }
    }

    struct NoopTarget;

    impl RenderTarget for NoopTarget {
        fn publish(&mut self, _frame: &FrameSnapshot<'_>) {}
    }

    #[derive(Default)]
    struct FakeLoader {
        loads: usize,
        unloads: usize,
    }

    impl AssetLoader for FakeLoader {
        fn load(&mut self, path: &Path) -> Result<LoadedAsset, AssetError> {
            if path.to_string_lossy().contains("missing") {
                return Err(AssetError::NotFound(path.to_path_buf()));
            }
            self.loads += 1;
            Ok(LoadedAsset {
                handle: AssetHandle::new(self.loads as u64, path),
                registry: Box::new(AttributeSet::from_names(["Joy", "Blink"])),
            })
        }

        fn unload(&mut self, _handle: &AssetHandle) -> Result<(), AssetError> {
            self.unloads += 1;
            Ok(())
        }
    }

    fn quiet_settings() -> ControllerSettings {
        ControllerSettings {
            auto_blink_enabled: false,
            head_movement_enabled: false,
            seed: Some(1),
            ..ControllerSettings::default()
        }
    }

    fn controller() -> (AvatarController, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::default());
        let queue = Arc::new(CommandQueue::new());
        let ctrl = AvatarController::new(quiet_settings(), queue, outbox.clone());
        (ctrl, outbox)
    }

    fn key(name: &str) -> AttributeKey {
        AttributeKey::resolve(name)
    }

    #[test]
    fn test_set_expression_clamps_and_replies() {
        let (mut ctrl, outbox) = controller();
        let reply = ctrl.handle_command(BridgeCommand::SetExpression {
            name: "joy".to_string(),
            value: 1.5,
        });
        assert!(reply.is_success());
        assert_eq!(ctrl.engine().target(&key("joy")), Some(1.0));
        assert_eq!(outbox.0.lock().len(), 1);
        assert_eq!(outbox.0.lock()[0].command.as_deref(), Some("set_expression"));
    }

    #[test]
    fn test_empty_expression_name_is_error() {
        let (mut ctrl, _) = controller();
        let reply = ctrl.handle_command(BridgeCommand::SetExpression {
            name: String::new(),
            value: 0.5,
        });
        assert_eq!(reply.status, ResponseStatus::Error);
        assert!(ctrl.engine().is_empty());
    }

    #[test]
    fn test_transition_speed_clamped() {
        let (mut ctrl, _) = controller();
        ctrl.handle_command(BridgeCommand::SetTransitionSpeed { speed: 20.0 });
        assert!((ctrl.engine().speed() - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_set_blendshape_is_error() {
        let (mut ctrl, outbox) = controller();
        ctrl.handle_command(BridgeCommand::SetBlendshape);
        let sent = outbox.0.lock();
        assert_eq!(sent[0].status, ResponseStatus::Error);
        assert_eq!(sent[0].message, "set_blendshape is not implemented");
    }

    #[test]
    fn test_load_without_loader_is_error() {
        let (mut ctrl, _) = controller();
        let reply = ctrl.handle_command(BridgeCommand::LoadModel {
            path: PathBuf::from("a.vrm"),
        });
        assert_eq!(reply.status, ResponseStatus::Error);
        assert_eq!(reply.message, "No asset loader configured");
    }

    #[test]
    fn test_load_and_unload_model() {
        let (ctrl, _) = controller();
        let mut ctrl = ctrl.with_asset_loader(Box::new(FakeLoader::default()));

        ctrl.handle_command(BridgeCommand::SetExpression {
            name: "joy".to_string(),
            value: 0.4,
        });
        let reply = ctrl.handle_command(BridgeCommand::LoadModel {
            path: PathBuf::from("alice.vrm"),
        });
        assert!(reply.is_success(), "{}", reply.message);
        assert_eq!(reply.message, "Model loaded: alice.vrm");
        assert!(ctrl.engine().is_bound());

        let reply = ctrl.handle_command(BridgeCommand::UnloadModel);
        assert!(reply.is_success());
        assert!(!ctrl.engine().is_bound());
        assert!(ctrl.loaded_asset().is_none());
        // Attribute values survive unload
        assert_eq!(ctrl.engine().target(&key("joy")), Some(0.4));

        let reply = ctrl.handle_command(BridgeCommand::UnloadModel);
        assert_eq!(reply.status, ResponseStatus::Error);
        assert_eq!(reply.message, "No model loaded");
    }

    #[test]
    fn test_load_failure_keeps_previous_state_clean() {
        let (ctrl, _) = controller();
        let mut ctrl = ctrl.with_asset_loader(Box::new(FakeLoader::default()));
        let reply = ctrl.handle_command(BridgeCommand::LoadModel {
            path: PathBuf::from("missing.vrm"),
        });
        assert_eq!(reply.status, ResponseStatus::Error);
        assert!(ctrl.loaded_asset().is_none());
    }

    #[test]
    fn test_queued_commands_apply_on_tick() {
        let (mut ctrl, outbox) = controller();
        let handler = AvatarController::command_handler(ctrl.sender());
        handler(BridgeCommand::SetExpression {
            name: "joy".to_string(),
            value: 0.8,
        });
        assert!(ctrl.engine().is_empty());
        assert!(outbox.0.lock().is_empty());

        let stats = ctrl.tick(DT, &mut NoopTarget);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(ctrl.engine().target(&key("joy")), Some(0.8));
        assert_eq!(outbox.0.lock().len(), 1);

        for _ in 0..600 {
            ctrl.tick(DT, &mut NoopTarget);
        }
        let current = ctrl.engine().current(&key("joy")).unwrap();
        assert!((current - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_disable_blink_twice_returns_to_baseline() {
        let (mut ctrl, outbox) = controller();
        ctrl.handle_command(BridgeCommand::SetAutoBlink { enabled: true });
        assert!(ctrl.trigger_idle(IdleBehavior::Blink));
        for _ in 0..3 {
            ctrl.tick(DT, &mut NoopTarget);
        }
        assert!(ctrl.engine().current(&key(BLINK)).unwrap() > 0.0);

        ctrl.handle_command(BridgeCommand::SetAutoBlink { enabled: false });
        ctrl.handle_command(BridgeCommand::SetAutoBlink { enabled: false });
        ctrl.tick(DT, &mut NoopTarget);

        assert_eq!(ctrl.idle(IdleBehavior::Blink).phase(), PhaseKind::Idle);
        assert_eq!(ctrl.engine().current(&key(BLINK)), Some(0.0));
        assert!(outbox.0.lock().iter().all(BridgeMessage::is_success));
    }

    #[test]
    fn test_head_movement_parameters() {
        let (mut ctrl, _) = controller();
        ctrl.handle_command(BridgeCommand::SetAutoHeadMovement {
            enabled: true,
            min_interval: 0.0,
            max_interval: 0.0,
            max_angle: 12.0,
        });
        let head = ctrl.idle(IdleBehavior::HeadMovement);
        assert!(head.is_enabled());
        let config = head.config();
        assert_eq!(config.min_interval, 2.0);
        assert_eq!(config.max_interval, 3.0);
        assert_eq!(config.duration, 2.0);
        assert_eq!(config.channels[0].amplitude, 12.0);
        assert_eq!(config.channels[1].amplitude, 6.0);
    }

    #[test]
    fn test_head_sway_stays_within_amplitude() {
        let (mut ctrl, _) = controller();
        ctrl.handle_command(BridgeCommand::SetAutoHeadMovement {
            enabled: true,
            min_interval: 2.0,
            max_interval: 3.0,
            max_angle: 5.0,
        });
        let mut moved = false;
        for _ in 0..(60 * 20) {
            ctrl.tick(DT, &mut NoopTarget);
            if let Some(yaw) = ctrl.engine().current(&key(HEAD_YAW)) {
                assert!(yaw.abs() <= 5.0 + 1e-4);
                moved |= yaw.abs() > 0.0;
            }
        }
        assert!(moved);
    }

    #[test]
    fn test_every_command_gets_one_response() {
        let (mut ctrl, outbox) = controller();
        let commands = vec![
            BridgeCommand::UnloadModel,
            BridgeCommand::ResetExpressions,
            BridgeCommand::SetTransitionSpeed { speed: 1.0 },
            BridgeCommand::SetAutoBlink { enabled: true },
            BridgeCommand::SetBlendshape,
        ];
        let count = commands.len();
        for command in commands {
            ctrl.handle_command(command);
        }
        assert_eq!(outbox.0.lock().len(), count);
        assert_eq!(ctrl.commands_handled(), count as u64);
    }
}
