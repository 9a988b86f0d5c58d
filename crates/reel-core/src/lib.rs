//! Reel Core - Embeddable Video Player Components
//!
//! This crate provides the lifecycle of video embeds that wrap a third-party
//! player library loaded on demand:
//! - Deduplicated player script bootstrap, one load per player id
//! - Player construction and plugin resolution
//! - Deferred play/pause/toggle requests until the player exists
//! - Playback state published on a context channel
//! - Bubbling notifications for page-level listeners
//! - Overlay presentation and background-video sizing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Reel Core                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Bootstrap   │  │   Plugin     │  │    Task      │          │
//! │  │  Registry    │  │  Registry    │  │    Queue     │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Embed     │                              │
//! │                    │  Services   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │   Context    │  │   Video     │  │    Event     │           │
//! │  │   Channel    │  │   Embed     │  │     Bus      │           │
//! │  └──────────────┘  └──────┬──────┘  └──────────────┘           │
//! │                           │                                     │
//! │                 ┌─────────┴─────────┐                           │
//! │                 │ Document / Player │  (host traits)            │
//! │                 └───────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread. Shared state lives behind `Rc`/`RefCell`
//! and callbacks hold weak handles, so a detached embed is never revived by
//! a late script load or player event.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod host;
pub mod overlay;
pub mod player;
pub mod plugins;
pub mod render;
pub mod scheduler;
pub mod services;
pub mod types;
pub mod video;

#[cfg(feature = "headless")]
pub mod headless;

pub use bootstrap::{BootstrapRegistry, ErrorLog, ScriptElement, ScriptSource, ScriptStatus, Waiter};
pub use config::{EmbedSettings, Poster, VideoConfig};
pub use context::{Channel, ChannelId, ContextParticipant, ContextScope};
pub use error::{Error, Result};
pub use events::{EventBus, ListenerId, Notification};
pub use host::{Document, HostElement};
pub use overlay::OverlaySync;
pub use player::{
    Player, PlayerEvent, PlayerEventSink, PlayerFactory, PlayerHandle, PlayerOptions, PlayerRequest,
};
pub use plugins::PluginRegistry;
pub use render::{MetaDisplay, Renderable, VideoView};
pub use scheduler::TaskQueue;
pub use services::{EmbedServices, GlobalCallbacks};
pub use types::*;
pub use video::{DeferredIntents, Intent, VideoEmbed};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Reel Core initialized");
}
