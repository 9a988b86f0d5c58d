//! Embed configuration
//!
//! `VideoConfig` carries the per-instance properties a host page sets on the
//! element, `EmbedSettings` the session-wide knobs shared by every instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::AspectRatio;
use crate::{Error, Result};

/// Plugins applied to every player before the enabled list
pub const DEFAULT_PLUGINS: &[&str] = &["playback"];

/// Properties parsed as booleans when read from element attributes
const BOOLEAN_PROPS: &[&str] = &[
    "isBackgroundVideo",
    "noMeta",
    "noMetaTitle",
    "loop",
    "muted",
    "noControls",
    "autoplay",
    "hideFullScreenButton",
    "overlayBackground",
];

/// Properties parsed as JSON objects when read from element attributes
const OBJECT_PROPS: &[&str] = &["poster"];

/// Poster image shown before playback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Poster {
    pub uri: Option<String>,
}

/// Per-instance embed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoConfig {
    pub video_id: String,
    pub account_id: String,
    pub player_id: String,
    /// Explicit UUID class; generated when absent
    pub video_uuid: Option<String>,
    pub poster: Poster,
    /// `none`, `auto` or `W/H`
    pub ratio: String,
    pub is_background_video: bool,
    /// Name of a global callback invoked once after player construction
    pub on_init: Option<String>,
    /// Name of a global callback receiving script load failures
    pub on_error: Option<String>,
    pub no_meta: bool,
    pub no_meta_title: bool,
    pub close_button_text: Option<String>,
    pub share_description: Option<String>,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub muted: bool,
    pub no_controls: bool,
    pub autoplay: bool,
    pub hide_full_screen_button: bool,
    pub overlay_alignment: Option<String>,
    pub overlay_background: bool,
    /// Space-separated plugin names
    pub enabled_plugins: String,
    /// Space-separated plugin names
    pub disabled_plugins: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            video_id: String::new(),
            account_id: String::new(),
            player_id: String::new(),
            video_uuid: None,
            poster: Poster::default(),
            ratio: "auto".to_string(),
            is_background_video: false,
            on_init: None,
            on_error: None,
            no_meta: false,
            no_meta_title: false,
            close_button_text: None,
            share_description: None,
            loop_playback: false,
            muted: false,
            no_controls: false,
            autoplay: false,
            hide_full_screen_button: false,
            overlay_alignment: Some("bottom".to_string()),
            overlay_background: false,
            enabled_plugins: "playback".to_string(),
            disabled_plugins: String::new(),
        }
    }
}

impl VideoConfig {
    /// Create a config for a video/account/player triple
    pub fn new(
        video_id: impl Into<String>,
        account_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            account_id: account_id.into(),
            player_id: player_id.into(),
            ..Default::default()
        }
    }

    /// Parse from a camelCase JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        let config: VideoConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from element attributes (`video-id="..."`, `muted`, ...)
    ///
    /// Boolean attributes are true when present unless their value is `false`.
    pub fn from_attributes<I, K, V>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut props = Map::new();
        for (name, value) in attributes {
            let key = kebab_to_camel(name.as_ref());
            let value = value.as_ref();
            let parsed = if BOOLEAN_PROPS.contains(&key.as_str()) {
                Value::Bool(value != "false")
            } else if OBJECT_PROPS.contains(&key.as_str()) {
                serde_json::from_str(value)?
            } else {
                Value::String(value.to_string())
            };
            props.insert(key, parsed);
        }

        let config: VideoConfig = serde_json::from_value(Value::Object(props))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail later during render
    pub fn validate(&self) -> Result<()> {
        if self.player_id.trim().is_empty() {
            return Err(Error::InvalidConfig("playerId is required".to_string()));
        }
        if self.account_id.trim().is_empty() {
            return Err(Error::InvalidConfig("accountId is required".to_string()));
        }
        self.aspect_ratio()?;
        Ok(())
    }

    /// Aspect ratio of the wrapping ratio box, `None` when disabled
    pub fn aspect_ratio(&self) -> Result<Option<AspectRatio>> {
        AspectRatio::parse(&self.ratio)
    }

    /// Muted is forced on when controls are hidden
    pub fn effective_muted(&self) -> bool {
        self.muted || self.no_controls
    }

    pub fn enabled_plugin_names(&self) -> Vec<String> {
        split_names(&self.enabled_plugins)
    }

    pub fn disabled_plugin_names(&self) -> Vec<String> {
        split_names(&self.disabled_plugins)
    }
}

/// Session-wide settings shared by every embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedSettings {
    /// Host serving the player scripts
    pub script_host: String,
    /// Prefix used in generated class names
    pub namespace: String,
    /// Delay before the overlay is fully hidden
    pub overlay_hide_delay_ms: u64,
    /// Delay before the overlay hidden-state class is dropped
    pub overlay_show_delay_ms: u64,
    /// Deterministic UUID for generated classes (test pages)
    pub fixed_uuid: Option<String>,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            script_host: "players.brightcove.net".to_string(),
            namespace: "reel".to_string(),
            overlay_hide_delay_ms: 200,
            overlay_show_delay_ms: 50,
            fixed_uuid: None,
        }
    }
}

impl EmbedSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings with a fixed UUID, for reproducible output
    pub fn deterministic() -> Self {
        Self {
            fixed_uuid: Some("12345".to_string()),
            ..Default::default()
        }
    }
}

/// Split a space-separated name list, ignoring empty entries
pub fn split_names(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VideoConfig::default();
        assert_eq!(config.ratio, "auto");
        assert_eq!(config.enabled_plugins, "playback");
        assert_eq!(config.overlay_alignment.as_deref(), Some("bottom"));
        assert!(config.disabled_plugin_names().is_empty());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let config = VideoConfig::from_json(
            r#"{"videoId":"v1","accountId":"xyz","playerId":"abc123","loop":true}"#,
        )
        .unwrap();
        assert_eq!(config.player_id, "abc123");
        assert!(config.loop_playback);
        assert_eq!(config.enabled_plugins, "playback");
    }

    #[test]
    fn test_from_attributes() {
        let config = VideoConfig::from_attributes([
            ("video-id", "v1"),
            ("account-id", "xyz"),
            ("player-id", "abc123"),
            ("no-controls", ""),
            ("muted", "false"),
            ("enabled-plugins", "cue social"),
            ("poster", r#"{"uri":"/poster.jpg"}"#),
        ])
        .unwrap();

        assert!(config.no_controls);
        assert!(!config.muted);
        assert!(config.effective_muted());
        assert_eq!(config.enabled_plugin_names(), vec!["cue", "social"]);
        assert_eq!(config.poster.uri.as_deref(), Some("/poster.jpg"));
    }

    #[test]
    fn test_validation() {
        assert!(VideoConfig::from_json(r#"{"accountId":"xyz"}"#).is_err());

        let mut config = VideoConfig::new("v1", "xyz", "abc123");
        config.ratio = "wide".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_settings_from_json() {
        let settings = EmbedSettings::from_json(r#"{"scriptHost":"cdn.example.com"}"#).unwrap();
        assert_eq!(settings.script_host, "cdn.example.com");
        assert_eq!(settings.overlay_hide_delay_ms, 200);
        assert_eq!(settings.namespace, "reel");
    }

    #[test]
    fn test_kebab_to_camel() {
        assert_eq!(kebab_to_camel("hide-full-screen-button"), "hideFullScreenButton");
        assert_eq!(kebab_to_camel("loop"), "loop");
    }
}
