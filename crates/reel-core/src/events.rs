//! Notifications emitted by video embeds
//!
//! Embeds announce playback changes to whoever listens on them, the way a
//! bubbling DOM event would reach page-level handlers.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Notification types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notification {
    /// Playback started, or was requested before the player existed
    #[serde(rename_all = "camelCase")]
    Playing { is_background_video: bool },

    /// Playback paused
    #[serde(rename_all = "camelCase")]
    Pause { is_background_video: bool },

    /// Playback reached the end
    #[serde(rename_all = "camelCase")]
    Ended { is_background_video: bool },

    /// Close affordance used
    #[serde(rename_all = "camelCase")]
    Close { is_background_video: bool },

    /// Background video measured its ideal height
    #[serde(rename = "videoExpandedHeightSet", rename_all = "camelCase")]
    ExpandedHeightSet { expanded_height: Option<f64> },
}

impl Notification {
    /// Event name as seen by listeners
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Playing { .. } => "playing",
            Notification::Pause { .. } => "pause",
            Notification::Ended { .. } => "ended",
            Notification::Close { .. } => "close",
            Notification::ExpandedHeightSet { .. } => "videoExpandedHeightSet",
        }
    }
}

/// Handle returned when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

type Listener = Rc<dyn Fn(&Notification)>;

/// Synchronous notification fan-out
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<Vec<(ListenerId, Listener)>>>,
    next_id: Rc<Cell<u64>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every notification
    pub fn subscribe(&self, listener: impl Fn(&Notification) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver a notification to every listener in registration order
    pub fn emit(&self, notification: Notification) {
        // snapshot so listeners can subscribe or unsubscribe while handling
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        debug!(event = notification.name(), listeners = listeners.len(), "Notification");

        for listener in listeners {
            listener(&notification);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}
