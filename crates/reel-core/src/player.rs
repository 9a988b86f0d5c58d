//! Third-party player abstraction
//!
//! The embed never talks to the vendor library directly. A [`PlayerFactory`]
//! turns a [`PlayerRequest`] into a [`Player`] handle and wires the player's
//! event stream into a [`PlayerEventSink`].

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::config::VideoConfig;
use crate::types::{ClassList, MediaInfo};
use crate::Result;

/// Owned handle to a constructed player
pub type PlayerHandle = Rc<dyn Player>;

/// Operations the embed needs from a constructed player
pub trait Player {
    fn play(&self);

    fn pause(&self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Content duration in seconds
    fn duration(&self) -> f64;

    /// Metadata of the loaded media
    fn media_info(&self) -> MediaInfo;

    fn set_muted(&self, muted: bool);

    /// Class list of the player's overlay element, if it has one
    fn overlay(&self) -> Option<ClassList>;

    /// Enable a player-side plugin with its options
    fn enable_plugin(&self, name: &str, options: serde_json::Value) -> Result<()>;

    /// Tear the player down
    fn dispose(&self);
}

/// Events the player reports back to its embed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEvent {
    LoadedMetadata,
    Play,
    Pause,
    Seeked,
    DurationChange,
    Ended,
}

impl std::fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerEvent::LoadedMetadata => write!(f, "loadedmetadata"),
            PlayerEvent::Play => write!(f, "play"),
            PlayerEvent::Pause => write!(f, "pause"),
            PlayerEvent::Seeked => write!(f, "seeked"),
            PlayerEvent::DurationChange => write!(f, "durationchange"),
            PlayerEvent::Ended => write!(f, "ended"),
        }
    }
}

/// Channel from a player back into its embed
#[derive(Clone)]
pub struct PlayerEventSink {
    dispatch: Rc<dyn Fn(PlayerEvent)>,
}

impl PlayerEventSink {
    pub fn new(dispatch: impl Fn(PlayerEvent) + 'static) -> Self {
        Self {
            dispatch: Rc::new(dispatch),
        }
    }

    /// Deliver an event; events for a detached embed are dropped
    pub fn emit(&self, event: PlayerEvent) {
        (self.dispatch)(event)
    }
}

impl std::fmt::Debug for PlayerEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlayerEventSink")
    }
}

/// Control bar options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlBarOptions {
    pub fullscreen_toggle: bool,
}

/// Options passed to the vendor player constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    pub tech_order: Vec<String>,
    pub resize_manager: bool,
    pub control_bar: ControlBarOptions,
    pub controls: bool,
    pub muted: bool,
    pub autoplay: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
}

impl PlayerOptions {
    /// Options for an embed's configuration
    ///
    /// HTML5-only rendering with the resize manager off keeps overlapping
    /// elements clickable on iOS.
    pub fn for_config(config: &VideoConfig) -> Self {
        Self {
            tech_order: vec!["Html5".to_string()],
            resize_manager: false,
            control_bar: ControlBarOptions {
                fullscreen_toggle: !config.hide_full_screen_button,
            },
            controls: !config.no_controls,
            muted: config.effective_muted(),
            autoplay: config.autoplay,
            loop_playback: config.loop_playback,
        }
    }
}

/// Everything a factory needs to construct one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    /// Id of the video element the player takes over
    pub element_id: String,
    pub account_id: String,
    pub player_id: String,
    pub video_id: String,
    pub options: PlayerOptions,
}

impl PlayerRequest {
    pub fn new(element_id: impl Into<String>, config: &VideoConfig) -> Self {
        Self {
            element_id: element_id.into(),
            account_id: config.account_id.clone(),
            player_id: config.player_id.clone(),
            video_id: config.video_id.clone(),
            options: PlayerOptions::for_config(config),
        }
    }

    /// Data attributes set on the video element right before construction
    pub fn data_attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data-account", self.account_id.clone()),
            ("data-player", self.player_id.clone()),
            ("data-video-id", self.video_id.clone()),
        ]
    }
}

/// Constructs vendor players once their script is available
pub trait PlayerFactory {
    /// Build a player for the request, reporting events through `events`
    fn create(&self, request: &PlayerRequest, events: PlayerEventSink) -> Result<PlayerHandle>;
}

/// Round a time in seconds to whole milliseconds
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_ms() {
        assert_eq!(seconds_to_ms(12.344), 12344);
        assert_eq!(seconds_to_ms(0.0005), 1);
        assert_eq!(seconds_to_ms(-1.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
    }

    #[test]
    fn test_options_for_config() {
        let mut config = VideoConfig::new("v1", "xyz", "abc123");
        config.no_controls = true;
        config.hide_full_screen_button = true;

        let options = PlayerOptions::for_config(&config);
        assert_eq!(options.tech_order, vec!["Html5"]);
        assert!(!options.resize_manager);
        assert!(!options.control_bar.fullscreen_toggle);
        assert!(!options.controls);
        assert!(options.muted);

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["controlBar"]["fullscreenToggle"], false);
        assert_eq!(json["techOrder"][0], "Html5");
    }

    #[test]
    fn test_request_data_attributes() {
        let config = VideoConfig::new("v1", "xyz", "abc123");
        let request = PlayerRequest::new("vv1-xyz-1", &config);
        assert_eq!(
            request.data_attributes(),
            vec![
                ("data-account", "xyz".to_string()),
                ("data-player", "abc123".to_string()),
                ("data-video-id", "v1".to_string()),
            ]
        );
    }
}
