//! Session services shared by every embed on a page
//!
//! Everything that outlives a single embed lives here: the script bootstrap
//! registry, the session error log, the plugin registry, the task queue and
//! the named callbacks a page exposes. Embeds receive the services at
//! construction; `reset` returns them to a fresh session.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

use crate::bootstrap::{BootstrapRegistry, ErrorLog};
use crate::config::EmbedSettings;
use crate::context::Channel;
use crate::host::Document;
use crate::player::{Player, PlayerFactory};
use crate::plugins::PluginRegistry;
use crate::scheduler::TaskQueue;
use crate::types::{ErrorRecord, VideoContextState};
use crate::video::VideoEmbed;
use crate::Result;

/// Callback invoked once an embed's player is constructed
pub type InitCallback = Rc<dyn Fn(&VideoEmbed)>;

/// Callback receiving script load failures
pub type ErrorCallback = Rc<dyn Fn(&ErrorRecord)>;

/// Named callbacks a page exposes to embeds
#[derive(Clone, Default)]
pub struct GlobalCallbacks {
    init: Rc<RefCell<HashMap<String, InitCallback>>>,
    error: Rc<RefCell<HashMap<String, ErrorCallback>>>,
}

impl GlobalCallbacks {
    pub fn register_init(&self, name: impl Into<String>, callback: impl Fn(&VideoEmbed) + 'static) {
        self.init.borrow_mut().insert(name.into(), Rc::new(callback));
    }

    pub fn register_error(
        &self,
        name: impl Into<String>,
        callback: impl Fn(&ErrorRecord) + 'static,
    ) {
        self.error.borrow_mut().insert(name.into(), Rc::new(callback));
    }

    pub fn init(&self, name: &str) -> Option<InitCallback> {
        self.init.borrow().get(name).cloned()
    }

    pub fn error(&self, name: &str) -> Option<ErrorCallback> {
        self.error.borrow().get(name).cloned()
    }

    fn clear(&self) {
        self.init.borrow_mut().clear();
        self.error.borrow_mut().clear();
    }
}

struct ServicesInner {
    settings: EmbedSettings,
    document: Rc<dyn Document>,
    factory: Rc<dyn PlayerFactory>,
    bootstrap: BootstrapRegistry,
    errors: ErrorLog,
    plugins: RefCell<PluginRegistry>,
    scheduler: TaskQueue,
    callbacks: GlobalCallbacks,
    video_channel: Channel<VideoContextState>,
    instances: Cell<u64>,
}

/// Handle to the session services
#[derive(Clone)]
pub struct EmbedServices {
    inner: Rc<ServicesInner>,
}

impl EmbedServices {
    /// Create services for a page session
    pub fn new(
        settings: EmbedSettings,
        document: Rc<dyn Document>,
        factory: Rc<dyn PlayerFactory>,
    ) -> Self {
        let errors = ErrorLog::new();
        let bootstrap = BootstrapRegistry::new(Rc::clone(&document), errors.clone());

        info!(script_host = %settings.script_host, "Embed services initialized");

        Self {
            inner: Rc::new(ServicesInner {
                settings,
                document,
                factory,
                bootstrap,
                errors,
                plugins: RefCell::new(PluginRegistry::with_builtins()),
                scheduler: TaskQueue::new(),
                callbacks: GlobalCallbacks::default(),
                video_channel: Channel::define(VideoContextState::default()),
                instances: Cell::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &EmbedSettings {
        &self.inner.settings
    }

    pub fn document(&self) -> Rc<dyn Document> {
        Rc::clone(&self.inner.document)
    }

    pub fn factory(&self) -> Rc<dyn PlayerFactory> {
        Rc::clone(&self.inner.factory)
    }

    pub fn bootstrap(&self) -> &BootstrapRegistry {
        &self.inner.bootstrap
    }

    /// Session error log
    pub fn errors(&self) -> &ErrorLog {
        &self.inner.errors
    }

    pub fn scheduler(&self) -> &TaskQueue {
        &self.inner.scheduler
    }

    pub fn callbacks(&self) -> &GlobalCallbacks {
        &self.inner.callbacks
    }

    /// Channel every video embed provides its state on
    pub fn video_channel(&self) -> &Channel<VideoContextState> {
        &self.inner.video_channel
    }

    /// Snapshot of the plugin registry
    pub fn plugins(&self) -> PluginRegistry {
        self.inner.plugins.borrow().clone()
    }

    /// Register or replace a plugin for embeds set up from now on
    pub fn register_plugin(
        &self,
        name: impl Into<String>,
        plugin: impl Fn(&dyn Player, &VideoEmbed) -> Result<()> + 'static,
    ) {
        self.inner.plugins.borrow_mut().register(name, plugin);
    }

    /// Overlay transition delays (hide, show)
    pub fn overlay_delays(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.inner.settings.overlay_hide_delay_ms),
            Duration::from_millis(self.inner.settings.overlay_show_delay_ms),
        )
    }

    /// Allocate the next per-session instance index (starting at 1)
    pub(crate) fn next_instance_index(&self) -> u64 {
        let next = self.inner.instances.get() + 1;
        self.inner.instances.set(next);
        next
    }

    /// Return to a fresh session: scripts, errors, tasks, callbacks,
    /// plugins and the instance counter
    pub fn reset(&self) {
        self.inner.bootstrap.clear();
        self.inner.errors.clear();
        self.inner.scheduler.clear();
        self.inner.callbacks.clear();
        *self.inner.plugins.borrow_mut() = PluginRegistry::with_builtins();
        self.inner.instances.set(0);
        info!("Embed services reset");
    }
}

impl std::fmt::Debug for EmbedServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedServices")
            .field("settings", &self.inner.settings)
            .field("bootstrap", &self.inner.bootstrap)
            .field("errors", &self.inner.errors.len())
            .finish()
    }
}
