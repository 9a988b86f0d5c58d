//! Headless host
//!
//! In-memory implementations of the host traits. They record what the
//! embeds ask of the page and let callers drive script loads and player
//! events by hand, which is what the CLI simulator and the tests need.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

use crate::bootstrap::{ErrorLog, ScriptElement};
use crate::config::{EmbedSettings, VideoConfig};
use crate::events::ListenerId;
use crate::host::{Document, HostElement};
use crate::player::{Player, PlayerEvent, PlayerEventSink, PlayerFactory, PlayerHandle, PlayerRequest};
use crate::services::EmbedServices;
use crate::types::{ClassList, ErrorRecord, MediaInfo};
use crate::video::VideoEmbed;
use crate::{Error, Result};

/// Class list the scripted player's overlay starts with
pub const DEFAULT_OVERLAY_CLASSES: &str = "vjs-overlay vjs-overlay-no-background";

/// Document that records appended scripts and resize listeners
#[derive(Default)]
pub struct RecordingDocument {
    scripts: RefCell<Vec<ScriptElement>>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
    next_listener: Cell<u64>,
}

impl RecordingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts appended so far, in order
    pub fn scripts(&self) -> Vec<ScriptElement> {
        self.scripts.borrow().clone()
    }

    pub fn resize_listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Run every resize listener
    pub fn fire_resize(&self) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl Document for RecordingDocument {
    fn append_script(&self, script: &ScriptElement) {
        debug!(src = %script.src, "Script appended");
        self.scripts.borrow_mut().push(script.clone());
    }

    fn add_resize_listener(&self, listener: Rc<dyn Fn()>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(listener, _)| *listener != id);
    }
}

/// Host element with a settable height
#[derive(Debug, Default)]
pub struct StaticElement {
    height: Cell<f64>,
}

impl StaticElement {
    pub fn new(height: f64) -> Self {
        Self {
            height: Cell::new(height),
        }
    }

    pub fn set_height(&self, height: f64) {
        self.height.set(height);
    }
}

impl HostElement for StaticElement {
    fn bounding_height(&self) -> f64 {
        self.height.get()
    }
}

/// Player driven by hand
///
/// `play` and `pause` report the matching event synchronously when the
/// paused state actually changes; other events are sent with [`fire`].
///
/// [`fire`]: ScriptedPlayer::fire
pub struct ScriptedPlayer {
    request: PlayerRequest,
    events: PlayerEventSink,
    current_time: Cell<f64>,
    media: RefCell<MediaInfo>,
    paused: Cell<bool>,
    muted: Cell<bool>,
    overlay: ClassList,
    plugins: RefCell<Vec<(String, serde_json::Value)>>,
    failing_plugin: Option<String>,
    calls: RefCell<Vec<String>>,
    disposed: Cell<bool>,
}

impl ScriptedPlayer {
    pub fn request(&self) -> &PlayerRequest {
        &self.request
    }

    /// Send an event to the embed
    pub fn fire(&self, event: PlayerEvent) {
        if self.disposed.get() {
            return;
        }
        if event == PlayerEvent::Ended {
            self.paused.set(true);
        }
        self.events.emit(event);
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.current_time.set(seconds);
    }

    pub fn set_media(&self, media: MediaInfo) {
        *self.media.borrow_mut() = media;
    }

    /// Names passed to `play`/`pause`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Player-side plugins enabled with their options
    pub fn enabled_plugins(&self) -> Vec<(String, serde_json::Value)> {
        self.plugins.borrow().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn set_paused(&self, paused: bool, event: PlayerEvent) {
        if self.disposed.get() {
            return;
        }
        let changed = self.paused.replace(paused) != paused;
        if changed {
            self.events.emit(event);
        }
    }
}

impl Player for ScriptedPlayer {
    fn play(&self) {
        self.calls.borrow_mut().push("play".to_string());
        self.set_paused(false, PlayerEvent::Play);
    }

    fn pause(&self) {
        self.calls.borrow_mut().push("pause".to_string());
        self.set_paused(true, PlayerEvent::Pause);
    }

    fn current_time(&self) -> f64 {
        self.current_time.get()
    }

    fn duration(&self) -> f64 {
        self.media.borrow().duration
    }

    fn media_info(&self) -> MediaInfo {
        self.media.borrow().clone()
    }

    fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
    }

    fn overlay(&self) -> Option<ClassList> {
        Some(self.overlay.clone())
    }

    fn enable_plugin(&self, name: &str, options: serde_json::Value) -> Result<()> {
        if self.failing_plugin.as_deref() == Some(name) {
            return Err(Error::plugin(name, "rejected by player"));
        }
        self.plugins.borrow_mut().push((name.to_string(), options));
        Ok(())
    }

    fn dispose(&self) {
        debug!(element_id = %self.request.element_id, "Player disposed");
        self.disposed.set(true);
    }
}

/// Factory producing [`ScriptedPlayer`]s
#[derive(Default)]
pub struct ScriptedPlayerFactory {
    players: RefCell<Vec<Rc<ScriptedPlayer>>>,
    failure: RefCell<Option<String>>,
    failing_plugin: RefCell<Option<String>>,
    media: RefCell<MediaInfo>,
}

impl ScriptedPlayerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later construction fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.borrow_mut() = Some(reason.into());
    }

    /// Make later players reject the named player-side plugin
    pub fn fail_plugin(&self, name: impl Into<String>) {
        *self.failing_plugin.borrow_mut() = Some(name.into());
    }

    /// Media later players report
    pub fn set_media(&self, media: MediaInfo) {
        *self.media.borrow_mut() = media;
    }

    /// Element ids of constructed players, in construction order
    pub fn created(&self) -> Vec<String> {
        self.players
            .borrow()
            .iter()
            .map(|p| p.request.element_id.clone())
            .collect()
    }

    /// Most recent player built for an element id
    pub fn player(&self, element_id: &str) -> Option<Rc<ScriptedPlayer>> {
        self.players
            .borrow()
            .iter()
            .rev()
            .find(|p| p.request.element_id == element_id)
            .cloned()
    }
}

impl PlayerFactory for ScriptedPlayerFactory {
    fn create(&self, request: &PlayerRequest, events: PlayerEventSink) -> Result<PlayerHandle> {
        if let Some(reason) = self.failure.borrow().clone() {
            return Err(Error::PlayerConstruction(reason));
        }

        let player = Rc::new(ScriptedPlayer {
            request: request.clone(),
            events,
            current_time: Cell::new(0.0),
            media: RefCell::new(self.media.borrow().clone()),
            paused: Cell::new(!request.options.autoplay),
            muted: Cell::new(request.options.muted),
            overlay: ClassList::parse(DEFAULT_OVERLAY_CLASSES),
            plugins: RefCell::new(Vec::new()),
            failing_plugin: self.failing_plugin.borrow().clone(),
            calls: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        });
        debug!(element_id = %request.element_id, "Scripted player created");
        self.players.borrow_mut().push(Rc::clone(&player));
        Ok(player)
    }
}

/// Services wired to the headless document and factory
pub struct HeadlessHost {
    pub document: Rc<RecordingDocument>,
    pub factory: Rc<ScriptedPlayerFactory>,
    pub services: EmbedServices,
}

impl HeadlessHost {
    pub fn new(settings: EmbedSettings) -> Self {
        let document = Rc::new(RecordingDocument::new());
        let factory = Rc::new(ScriptedPlayerFactory::new());
        let services = EmbedServices::new(
            settings,
            Rc::clone(&document) as Rc<dyn Document>,
            Rc::clone(&factory) as Rc<dyn PlayerFactory>,
        );
        Self {
            document,
            factory,
            services,
        }
    }

    /// Create an embed on an element of the given height
    pub fn embed(&self, config: VideoConfig, height: f64) -> Result<VideoEmbed> {
        VideoEmbed::new(&self.services, config, Rc::new(StaticElement::new(height)))
    }

    /// Report the script for `player_id` as loaded
    pub fn load_script(&self, player_id: &str) -> Result<()> {
        self.services.bootstrap().script_loaded(player_id)
    }

    /// Report the script for `player_id` as failed
    pub fn fail_script(&self, player_id: &str) -> Result<ErrorRecord> {
        self.services.bootstrap().script_failed(player_id)
    }

    pub fn errors(&self) -> &ErrorLog {
        self.services.errors()
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(EmbedSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_listeners() {
        let document = RecordingDocument::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = document.add_resize_listener(Rc::new(move || counter.set(counter.get() + 1)));

        document.fire_resize();
        document.remove_resize_listener(id);
        document.fire_resize();

        assert_eq!(hits.get(), 1);
        assert_eq!(document.resize_listener_count(), 0);
    }

    #[test]
    fn test_scripted_player_reports_changes_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let factory = ScriptedPlayerFactory::new();
        let request = PlayerRequest::new("v1", &VideoConfig::new("1", "xyz", "abc123"));

        let player = factory
            .create(&request, PlayerEventSink::new(move |e| log.borrow_mut().push(e)))
            .unwrap();
        player.pause();
        player.play();
        player.play();

        assert_eq!(*seen.borrow(), vec![PlayerEvent::Play]);
        assert_eq!(factory.player("v1").unwrap().calls(), vec!["pause", "play", "play"]);
    }

    #[test]
    fn test_factory_failure() {
        let factory = ScriptedPlayerFactory::new();
        factory.fail_with("no such element");
        let request = PlayerRequest::new("v1", &VideoConfig::new("1", "xyz", "abc123"));

        let result = factory.create(&request, PlayerEventSink::new(|_| {}));
        assert!(matches!(result, Err(Error::PlayerConstruction(_))));
        assert!(factory.created().is_empty());
    }
}
