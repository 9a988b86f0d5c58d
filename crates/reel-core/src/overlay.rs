//! Overlay presentation classes

use std::time::Duration;
use tracing::debug;

use crate::config::VideoConfig;
use crate::scheduler::TaskQueue;
use crate::types::ClassList;

pub const OVERLAY_BACKGROUND: &str = "vjs-overlay-background";
pub const OVERLAY_NO_BACKGROUND: &str = "vjs-overlay-no-background";
pub const OVERLAY_HIDDEN: &str = "vjs-overlay--hidden";
pub const HIDDEN: &str = "vjs-hidden";

/// Keeps the player overlay's classes in line with the embed configuration
#[derive(Debug, Clone)]
pub struct OverlaySync {
    element: Option<ClassList>,
    scheduler: TaskQueue,
    hide_delay: Duration,
    show_delay: Duration,
}

impl OverlaySync {
    pub fn new(scheduler: TaskQueue, hide_delay: Duration, show_delay: Duration) -> Self {
        Self {
            element: None,
            scheduler,
            hide_delay,
            show_delay,
        }
    }

    /// Adopt the overlay element and apply the configured classes
    pub fn setup(&mut self, element: Option<ClassList>, config: &VideoConfig) {
        self.element = element;
        let Some(element) = &self.element else {
            debug!("Player has no overlay element");
            return;
        };

        element.remove(OVERLAY_NO_BACKGROUND);
        element.remove(OVERLAY_BACKGROUND);
        for class in overlay_classes(config) {
            element.add(&class);
        }
    }

    pub fn element(&self) -> Option<&ClassList> {
        self.element.as_ref()
    }

    /// Start the hide transition, then hide fully after the delay
    pub fn hide(&self) {
        if let Some(element) = &self.element {
            element.add(OVERLAY_HIDDEN);
            let element = element.clone();
            self.scheduler
                .schedule(self.hide_delay, move || element.add(HIDDEN));
        }
    }

    /// Unhide, then drop the hidden-state class after the delay
    pub fn show(&self) {
        if let Some(element) = &self.element {
            element.remove(HIDDEN);
            let element = element.clone();
            self.scheduler
                .schedule(self.show_delay, move || element.remove(OVERLAY_HIDDEN));
        }
    }
}

/// Classes the overlay gets for a configuration
pub fn overlay_classes(config: &VideoConfig) -> Vec<String> {
    let mut classes = Vec::new();
    if let Some(alignment) = config.overlay_alignment.as_deref().filter(|a| !a.is_empty()) {
        classes.push(format!("vjs-overlay-{}", alignment));
    }
    classes.push(if config.overlay_background {
        OVERLAY_BACKGROUND.to_string()
    } else {
        OVERLAY_NO_BACKGROUND.to_string()
    });
    classes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync() -> (OverlaySync, TaskQueue) {
        let queue = TaskQueue::new();
        let overlay = OverlaySync::new(
            queue.clone(),
            Duration::from_millis(200),
            Duration::from_millis(50),
        );
        (overlay, queue)
    }

    #[test]
    fn test_setup_replaces_background_classes() {
        let (mut overlay, _) = sync();
        let element = ClassList::parse("vjs-overlay vjs-overlay-no-background");
        let mut config = VideoConfig::new("v1", "xyz", "abc123");
        config.overlay_background = true;

        overlay.setup(Some(element.clone()), &config);

        assert_eq!(
            element.to_string(),
            "vjs-overlay vjs-overlay-bottom vjs-overlay-background"
        );
    }

    #[test]
    fn test_hide_is_staggered() {
        let (mut overlay, queue) = sync();
        let element = ClassList::parse("vjs-overlay");
        overlay.setup(Some(element.clone()), &VideoConfig::default());

        overlay.hide();
        assert!(element.contains(OVERLAY_HIDDEN));
        assert!(!element.contains(HIDDEN));

        queue.advance(Duration::from_millis(199));
        assert!(!element.contains(HIDDEN));
        queue.advance(Duration::from_millis(1));
        assert!(element.contains(HIDDEN));

        overlay.show();
        assert!(!element.contains(HIDDEN));
        assert!(element.contains(OVERLAY_HIDDEN));
        queue.advance(Duration::from_millis(50));
        assert!(!element.contains(OVERLAY_HIDDEN));
    }

    #[test]
    fn test_without_overlay_element() {
        let (mut overlay, queue) = sync();
        overlay.setup(None, &VideoConfig::default());
        overlay.hide();
        overlay.show();
        assert_eq!(queue.pending(), 0);
    }
}
