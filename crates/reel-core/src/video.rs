//! Video embed - lifecycle of one embedded player
//!
//! Coordinates:
//! - Attach/detach against the host page
//! - Shared script bootstrap and player construction
//! - Plugin application and overlay setup
//! - Deferred play/pause/toggle requests made before the player exists
//! - Player events driving playback state
//! - Publishing state on the video context channel
//!
//! No borrow of the embed is held while the player, listeners or page
//! callbacks run, so any of them may call back into the embed.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::bootstrap::{ScriptSource, Waiter};
use crate::config::VideoConfig;
use crate::context::{ChannelId, ContextParticipant, ContextScope};
use crate::events::{EventBus, ListenerId, Notification};
use crate::host::HostElement;
use crate::overlay::OverlaySync;
use crate::player::{seconds_to_ms, PlayerEvent, PlayerEventSink, PlayerHandle, PlayerRequest};
use crate::plugins;
use crate::render::{format_duration, MetaDisplay, Renderable, VideoView};
use crate::services::EmbedServices;
use crate::types::{ClassList, ErrorRecord, LifecyclePhase, VideoContextState, VideoState};
use crate::{Error, Result};

pub const CLASS_PLAYING: &str = "is-playing";
pub const CLASS_PAUSED: &str = "is-paused";
pub const CLASS_FINISHED: &str = "is-finished";

/// Requests recorded before a player exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredIntents {
    pub toggle: bool,
    pub play: bool,
    pub pause: bool,
}

/// A deferred request, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Toggle,
    Play,
    Pause,
}

impl DeferredIntents {
    /// Take the highest-priority pending intent: toggle, then play, then pause
    pub fn take_next(&mut self) -> Option<Intent> {
        if std::mem::take(&mut self.toggle) {
            Some(Intent::Toggle)
        } else if std::mem::take(&mut self.play) {
            Some(Intent::Play)
        } else if std::mem::take(&mut self.pause) {
            Some(Intent::Pause)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.toggle || self.play || self.pause)
    }
}

struct EmbedInner {
    config: VideoConfig,
    index: u64,
    phase: LifecyclePhase,
    state: VideoState,
    player: Option<PlayerHandle>,
    intents: DeferredIntents,
    overlay: OverlaySync,
    meta: MetaDisplay,
    source_dimensions: Option<(u32, u32)>,
    expanded_height: Option<f64>,
    resize_listener: Option<ListenerId>,
    construction_error: Option<String>,
    metadata_loaded: bool,
    applied_plugins: Vec<String>,
}

impl EmbedInner {
    /// Move to `to` if the lifecycle allows it
    fn transition(&mut self, to: LifecyclePhase) -> bool {
        let from = self.phase;
        if from == to {
            return from.can_transition_to(to);
        }
        if !from.can_transition_to(to) {
            warn!(id = %self.state.id, %from, %to, "Ignoring invalid lifecycle transition");
            return false;
        }
        self.phase = to;
        info!(id = %self.state.id, %from, %to, "Lifecycle transition");
        true
    }
}

struct Shared {
    services: EmbedServices,
    element: Rc<dyn HostElement>,
    contexts: ContextScope,
    events: EventBus,
    host_classes: ClassList,
    inner: RefCell<EmbedInner>,
}

/// One embedded video player
#[derive(Clone)]
pub struct VideoEmbed {
    shared: Rc<Shared>,
}

/// Non-owning handle used by callbacks that may outlive the embed
#[derive(Clone)]
struct WeakEmbed(Weak<Shared>);

impl WeakEmbed {
    fn upgrade(&self) -> Option<VideoEmbed> {
        self.0.upgrade().map(|shared| VideoEmbed { shared })
    }
}

impl VideoEmbed {
    /// Create an embed; it does nothing until connected
    pub fn new(
        services: &EmbedServices,
        config: VideoConfig,
        element: Rc<dyn HostElement>,
    ) -> Result<Self> {
        config.validate()?;

        let index = services.next_instance_index();
        let contexts = ContextScope::new();
        contexts.provide(services.video_channel());

        let (hide_delay, show_delay) = services.overlay_delays();
        let overlay = OverlaySync::new(services.scheduler().clone(), hide_delay, show_delay);

        debug!(index, player_id = %config.player_id, "Video embed created");

        Ok(Self {
            shared: Rc::new(Shared {
                services: services.clone(),
                element,
                contexts,
                events: EventBus::new(),
                host_classes: ClassList::new(),
                inner: RefCell::new(EmbedInner {
                    config,
                    index,
                    phase: LifecyclePhase::Created,
                    state: VideoState::default(),
                    player: None,
                    intents: DeferredIntents::default(),
                    overlay,
                    meta: MetaDisplay::default(),
                    source_dimensions: None,
                    expanded_height: None,
                    resize_listener: None,
                    construction_error: None,
                    metadata_loaded: false,
                    applied_plugins: Vec::new(),
                }),
            }),
        })
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Element id of the video element (empty before connect)
    pub fn id(&self) -> String {
        self.shared.inner.borrow().state.id.clone()
    }

    /// Per-session index of this embed
    pub fn index(&self) -> u64 {
        self.shared.inner.borrow().index
    }

    pub fn config(&self) -> VideoConfig {
        self.shared.inner.borrow().config.clone()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.shared.inner.borrow().phase
    }

    pub fn state(&self) -> VideoState {
        self.shared.inner.borrow().state.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.phase() != LifecyclePhase::Disposed
    }

    pub fn player(&self) -> Option<PlayerHandle> {
        self.shared.inner.borrow().player.clone()
    }

    pub fn intents(&self) -> DeferredIntents {
        self.shared.inner.borrow().intents
    }

    pub fn meta(&self) -> MetaDisplay {
        self.shared.inner.borrow().meta.clone()
    }

    /// Width and height of the playing source
    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.shared.inner.borrow().source_dimensions
    }

    pub fn expanded_height(&self) -> Option<f64> {
        self.shared.inner.borrow().expanded_height
    }

    /// Reason the player could not be constructed, if it failed
    pub fn construction_error(&self) -> Option<String> {
        self.shared.inner.borrow().construction_error.clone()
    }

    pub fn applied_plugins(&self) -> Vec<String> {
        self.shared.inner.borrow().applied_plugins.clone()
    }

    /// Classes on the host element
    pub fn host_classes(&self) -> ClassList {
        self.shared.host_classes.clone()
    }

    /// Class list of the player overlay, once set up
    pub fn overlay(&self) -> Option<ClassList> {
        self.shared.inner.borrow().overlay.element().cloned()
    }

    /// Listen to this embed's notifications
    pub fn subscribe(&self, listener: impl Fn(&Notification) + 'static) -> ListenerId {
        self.shared.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    /// Current object on the video context channel
    pub fn read_context(&self) -> Option<Rc<VideoContextState>> {
        self.shared.contexts.read(self.shared.services.video_channel())
    }

    fn downgrade(&self) -> WeakEmbed {
        WeakEmbed(Rc::downgrade(&self.shared))
    }

    // ---------------------------------------------------------------------
    // Attach / detach
    // ---------------------------------------------------------------------

    /// Attach the embed: initialise state and request the player script
    #[instrument(skip(self), fields(index = self.index()))]
    pub fn connect(&self) -> Result<()> {
        let (source, background) = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase != LifecyclePhase::Created {
                return Err(Error::InvalidStateTransition {
                    from: inner.phase.to_string(),
                    to: LifecyclePhase::Connecting.to_string(),
                });
            }

            let config = &inner.config;
            let id = format!("v{}-{}-{}", config.video_id, config.account_id, inner.index);
            let source = ScriptSource::new(
                self.shared.services.settings().script_host.clone(),
                config.account_id.clone(),
                config.player_id.clone(),
            );
            let background = config.is_background_video;

            inner.state = VideoState {
                id,
                errors: self.shared.services.errors().snapshot(),
                ..Default::default()
            };
            inner.transition(LifecyclePhase::Connecting);
            (source, background)
        };

        if background {
            self.calculate_ideal_size();
        }

        {
            let mut inner = self.shared.inner.borrow_mut();
            if !inner.state.errors.is_empty() {
                warn!(
                    id = %inner.state.id,
                    errors = inner.state.errors.len(),
                    "Session has script errors; embed stays inert"
                );
                inner.transition(LifecyclePhase::ErrorHalt);
                return Ok(());
            }
            inner.transition(LifecyclePhase::ScriptPending);
        }

        self.assign_uuid_class();

        if background {
            let weak = self.downgrade();
            let listener = self.shared.services.document().add_resize_listener(Rc::new(move || {
                if let Some(embed) = weak.upgrade() {
                    embed.calculate_ideal_size();
                }
            }));
            self.shared.inner.borrow_mut().resize_listener = Some(listener);
        }

        let waiter = self.script_waiter();
        self.shared.services.bootstrap().request_script(&source, waiter)
    }

    /// Detach the embed: drop listeners and dispose the player
    pub fn disconnect(&self) {
        let (player, listener) = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase == LifecyclePhase::Disposed {
                return;
            }
            inner.transition(LifecyclePhase::Disposed);
            (inner.player.take(), inner.resize_listener.take())
        };

        if let Some(listener) = listener {
            self.shared.services.document().remove_resize_listener(listener);
        }
        if let Some(player) = player {
            player.dispose();
        }
    }

    fn script_waiter(&self) -> Waiter {
        let on_ready = self.downgrade();
        let on_error = self.downgrade();
        Waiter::new(
            self.id(),
            move || match on_ready.upgrade() {
                Some(embed) => embed.init_player(),
                None => Ok(()),
            },
            move |record| {
                if let Some(embed) = on_error.upgrade() {
                    embed.script_failed(record);
                }
            },
        )
    }

    fn script_failed(&self, record: &ErrorRecord) {
        let (callback, state) = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase == LifecyclePhase::Disposed {
                debug!(id = %inner.state.id, "Script failure for disposed embed ignored");
                return;
            }
            inner.state.errors.push(record.clone());
            inner.transition(LifecyclePhase::ErrorHalt);
            (inner.config.on_error.clone(), inner.state.clone())
        };

        self.publish(state);

        if let Some(name) = callback {
            match self.shared.services.callbacks().error(&name) {
                Some(callback) => callback(record),
                None => warn!(callback = %name, "Error callback is not registered"),
            }
        }
    }

    fn assign_uuid_class(&self) {
        let (explicit, namespace) = {
            let inner = self.shared.inner.borrow();
            (
                inner.config.video_uuid.clone(),
                self.shared.services.settings().namespace.clone(),
            )
        };

        let marker = format!("js-{}-video-uuid", namespace);
        if self.shared.host_classes.any_contains(&marker) {
            return;
        }

        let class = explicit.unwrap_or_else(|| {
            let uuid = self
                .shared
                .services
                .settings()
                .fixed_uuid
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            format!("{}--{}", marker, uuid)
        });
        self.shared.host_classes.add(&class);
    }

    fn calculate_ideal_size(&self) {
        let height = self.shared.element.bounding_height();
        let expanded = (height > 0.0).then_some(height);
        {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase == LifecyclePhase::Disposed {
                return;
            }
            inner.expanded_height = expanded;
        }
        self.shared.events.emit(Notification::ExpandedHeightSet {
            expanded_height: expanded,
        });
    }

    // ---------------------------------------------------------------------
    // Player construction
    // ---------------------------------------------------------------------

    fn init_player(&self) -> Result<()> {
        let request = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase == LifecyclePhase::Disposed {
                debug!(id = %inner.state.id, "Script ready for disposed embed ignored");
                return Ok(());
            }
            if !inner.transition(LifecyclePhase::PlayerPending) {
                return Ok(());
            }
            PlayerRequest::new(inner.state.id.clone(), &inner.config)
        };

        let player = match self.shared.services.factory().create(&request, self.event_sink()) {
            Ok(player) => player,
            Err(err) => {
                error!(id = %request.element_id, error = %err, "Player construction failed");
                self.shared.inner.borrow_mut().construction_error = Some(err.to_string());
                return Ok(());
            }
        };

        if !self.is_alive() {
            player.dispose();
            return Ok(());
        }

        self.handle_player_ready(player)?;
        self.run_init_callback();
        Ok(())
    }

    fn handle_player_ready(&self, player: PlayerHandle) -> Result<()> {
        if self.shared.inner.borrow().state.is_setup {
            return Ok(());
        }

        let overlay = player.overlay();
        let config = {
            let mut inner = self.shared.inner.borrow_mut();
            let config = inner.config.clone();
            inner.overlay.setup(overlay, &config);
            config
        };

        let names = plugins::resolve_for(&config);
        let applied = match self.shared.services.plugins().apply(&names, player.as_ref(), self) {
            Ok(applied) => applied,
            Err(err) => {
                error!(id = %self.id(), error = %err, "Plugin setup aborted player setup");
                self.shared.inner.borrow_mut().overlay.setup(None, &config);
                player.dispose();
                return Err(err);
            }
        };

        {
            let mut inner = self.shared.inner.borrow_mut();
            inner.applied_plugins = applied;
            inner.player = Some(Rc::clone(&player));
        }

        if config.no_controls {
            player.set_muted(true);
        }

        self.shared.inner.borrow_mut().state.is_setup = true;
        info!(id = %self.id(), plugins = ?names, "Player ready");
        Ok(())
    }

    fn run_init_callback(&self) {
        let name = self.shared.inner.borrow().config.on_init.clone();
        if let Some(name) = name {
            match self.shared.services.callbacks().init(&name) {
                Some(callback) => callback(self),
                None => debug!(callback = %name, "Init callback is not registered"),
            }
        }
    }

    fn event_sink(&self) -> PlayerEventSink {
        let weak = self.downgrade();
        PlayerEventSink::new(move |event| {
            if let Some(embed) = weak.upgrade() {
                embed.handle_player_event(event);
            }
        })
    }

    // ---------------------------------------------------------------------
    // Player events
    // ---------------------------------------------------------------------

    /// Apply a player event to the embed
    ///
    /// Events are ignored until player setup has completed and after detach.
    pub fn handle_player_event(&self, event: PlayerEvent) {
        let player = {
            let inner = self.shared.inner.borrow();
            if !inner.state.is_setup || inner.phase == LifecyclePhase::Disposed {
                debug!(id = %inner.state.id, %event, "Player event ignored");
                return;
            }
            debug_assert!(inner.phase.has_player(), "set up embed in phase {}", inner.phase);
            inner.player.clone()
        };
        let Some(player) = player else {
            return;
        };

        debug!(id = %self.id(), %event, "Player event");
        match event {
            PlayerEvent::LoadedMetadata => self.on_loaded_metadata(&player),
            PlayerEvent::Play => self.on_play(&player),
            PlayerEvent::Pause => self.on_pause(&player),
            PlayerEvent::Seeked => self.on_seeked(&player),
            PlayerEvent::DurationChange => self.on_duration_change(&player),
            PlayerEvent::Ended => self.on_ended(),
        }
    }

    fn on_loaded_metadata(&self, player: &PlayerHandle) {
        let info = player.media_info();
        let intent = {
            let mut inner = self.shared.inner.borrow_mut();
            if !inner.config.no_meta {
                if !inner.config.no_meta_title {
                    inner.meta.title = info.name.clone();
                }
                inner.meta.duration = Some(format_duration(info.duration));
            }
            if let (Some(width), Some(height)) = (info.width, info.height) {
                inner.source_dimensions = Some((width, height));
            }
            if inner.phase == LifecyclePhase::PlayerPending {
                inner.transition(LifecyclePhase::Ready);
            }
            if inner.metadata_loaded {
                None
            } else {
                inner.metadata_loaded = true;
                inner.intents.take_next()
            }
        };

        if let Some(intent) = intent {
            debug!(id = %self.id(), ?intent, "Applying deferred intent");
            match intent {
                Intent::Toggle => self.toggle(),
                Intent::Play => self.play(),
                Intent::Pause => self.pause(),
            }
        }
    }

    fn on_play(&self, player: &PlayerHandle) {
        let progress = seconds_to_ms(player.current_time());
        let (state, background) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.state.is_playing = true;
            inner.state.is_finished = false;
            inner.state.progress = progress;
            inner.transition(LifecyclePhase::Playing);
            (inner.state.clone(), inner.config.is_background_video)
        };

        let classes = &self.shared.host_classes;
        classes.add(CLASS_PLAYING);
        classes.remove(CLASS_FINISHED);
        classes.remove(CLASS_PAUSED);

        self.publish(state);
        self.shared.events.emit(Notification::Playing {
            is_background_video: background,
        });
    }

    fn on_pause(&self, player: &PlayerHandle) {
        let progress = seconds_to_ms(player.current_time());
        let (state, background) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.state.is_playing = false;
            inner.state.progress = progress;
            if !inner.state.is_finished {
                inner.transition(LifecyclePhase::Paused);
            }
            (inner.state.clone(), inner.config.is_background_video)
        };

        let classes = &self.shared.host_classes;
        classes.add(CLASS_PAUSED);
        classes.remove(CLASS_PLAYING);

        self.publish(state);
        self.shared.events.emit(Notification::Pause {
            is_background_video: background,
        });
    }

    fn on_seeked(&self, player: &PlayerHandle) {
        let progress = seconds_to_ms(player.current_time());
        let state = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.state.is_finished = false;
            inner.state.progress = progress;
            if inner.phase == LifecyclePhase::Finished {
                let next = if inner.state.is_playing {
                    LifecyclePhase::Playing
                } else {
                    LifecyclePhase::Paused
                };
                inner.transition(next);
            }
            inner.state.clone()
        };
        self.publish(state);
    }

    fn on_duration_change(&self, player: &PlayerHandle) {
        let duration = seconds_to_ms(player.duration());
        self.shared.inner.borrow_mut().state.duration = Some(duration);
    }

    fn on_ended(&self) {
        // mutating the player inside its own dispatch breaks it; finish next turn
        let weak = self.downgrade();
        self.shared.services.scheduler().defer(move || {
            if let Some(embed) = weak.upgrade() {
                embed.finish();
            }
        });
    }

    fn finish(&self) {
        let (state, background) = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.phase == LifecyclePhase::Disposed {
                return;
            }
            inner.state.is_finished = true;
            inner.state.is_playing = false;
            inner.transition(LifecyclePhase::Finished);
            (inner.state.clone(), inner.config.is_background_video)
        };

        let classes = &self.shared.host_classes;
        classes.add(CLASS_FINISHED);
        classes.remove(CLASS_PAUSED);
        classes.remove(CLASS_PLAYING);

        self.publish(state);
        self.shared.events.emit(Notification::Ended {
            is_background_video: background,
        });
    }

    fn publish(&self, state: VideoState) {
        self.shared.contexts.publish(
            self.shared.services.video_channel(),
            VideoContextState { state },
        );
    }

    // ---------------------------------------------------------------------
    // Public controls
    // ---------------------------------------------------------------------

    /// Start playback, or remember the request until the player exists
    pub fn play(&self) {
        let Some((player, background)) = self.control_target() else {
            return;
        };
        match player {
            Some(player) => player.play(),
            None => {
                self.shared.inner.borrow_mut().intents.play = true;
                self.shared.events.emit(Notification::Playing {
                    is_background_video: background,
                });
            }
        }
    }

    /// Pause playback, or remember the request until the player exists
    pub fn pause(&self) {
        let Some((player, _)) = self.control_target() else {
            return;
        };
        match player {
            Some(player) => player.pause(),
            None => self.shared.inner.borrow_mut().intents.pause = true,
        }
    }

    /// Flip between playing and paused
    pub fn toggle(&self) {
        let Some((player, background)) = self.control_target() else {
            return;
        };
        match player {
            Some(_) => {
                if self.shared.inner.borrow().state.is_playing {
                    self.pause();
                } else {
                    self.play();
                }
            }
            None => {
                self.shared.inner.borrow_mut().intents.toggle = true;
                self.shared.events.emit(Notification::Playing {
                    is_background_video: background,
                });
            }
        }
    }

    /// Pause and announce the close
    pub fn close(&self) {
        if !self.is_alive() {
            return;
        }
        self.pause();
        let background = self.shared.inner.borrow().config.is_background_video;
        self.shared.events.emit(Notification::Close {
            is_background_video: background,
        });
    }

    /// Keyboard handling for background videos; returns true if handled
    pub fn handle_key(&self, key: &str) -> bool {
        let background = self.shared.inner.borrow().config.is_background_video;
        if background && matches!(key, "Escape" | "Esc") {
            self.close();
            return true;
        }
        false
    }

    pub fn hide_overlay(&self) {
        self.shared.inner.borrow().overlay.hide();
    }

    pub fn show_overlay(&self) {
        self.shared.inner.borrow().overlay.show();
    }

    /// Player handle and background flag, `None` once detached
    fn control_target(&self) -> Option<(Option<PlayerHandle>, bool)> {
        let inner = self.shared.inner.borrow();
        if inner.phase == LifecyclePhase::Disposed {
            warn!(id = %inner.state.id, "Control on a detached embed ignored");
            return None;
        }
        Some((inner.player.clone(), inner.config.is_background_video))
    }
}

impl ContextParticipant for VideoEmbed {
    fn provides(&self) -> Vec<ChannelId> {
        vec![self.shared.services.video_channel().id()]
    }

    fn contexts(&self) -> &ContextScope {
        &self.shared.contexts
    }
}

impl Renderable for VideoEmbed {
    type View = VideoView;

    /// Describe the embed and republish its state for readers
    fn render(&self) -> Result<VideoView> {
        let (view, state) = {
            let inner = self.shared.inner.borrow();
            let view = VideoView::build(
                &self.shared.services.settings().namespace,
                &inner.config,
                &inner.state,
                &inner.meta,
            )?;
            (view, inner.state.clone())
        };
        self.publish(state);
        Ok(view)
    }
}

impl std::fmt::Debug for VideoEmbed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.borrow();
        f.debug_struct("VideoEmbed")
            .field("index", &inner.index)
            .field("id", &inner.state.id)
            .field("phase", &inner.phase)
            .finish()
    }
}
