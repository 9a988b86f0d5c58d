//! Player plugins
//!
//! Which plugins an embed gets is list algebra over three inputs: the default
//! plugins, the embed's enabled list and its disabled list. Resolution is
//! deterministic; unknown names are skipped without error.

use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::config::{VideoConfig, DEFAULT_PLUGINS};
use crate::player::Player;
use crate::video::VideoEmbed;
use crate::Result;

/// Function applying a plugin to a player on behalf of an embed
///
/// Plugins run after the player is built and before it is stored on the
/// embed, so `embed.player()` is still `None` while they run.
pub type PluginFn = Rc<dyn Fn(&dyn Player, &VideoEmbed) -> Result<()>>;

/// Share text used when the embed sets none
pub const DEFAULT_SHARE_DESCRIPTION: &str = "Share This Video";

/// Resolve the ordered, deduplicated plugin names for an embed
///
/// Defaults come before enabled names, the first occurrence wins, and any name
/// in `disabled` is dropped.
pub fn resolve<S: AsRef<str>>(defaults: &[S], enabled: &[S], disabled: &[S]) -> Vec<String> {
    let disabled: HashSet<&str> = disabled.iter().map(AsRef::as_ref).collect();
    let mut seen = HashSet::new();

    defaults
        .iter()
        .chain(enabled.iter())
        .map(AsRef::as_ref)
        .filter(|name| seen.insert(*name))
        .filter(|name| !disabled.contains(name))
        .map(str::to_string)
        .collect()
}

/// Plugin names an embed's configuration resolves to
pub fn resolve_for(config: &VideoConfig) -> Vec<String> {
    let defaults: Vec<String> = DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect();
    let enabled = config.enabled_plugin_names();
    let disabled = config.disabled_plugin_names();
    resolve(defaults.as_slice(), enabled.as_slice(), disabled.as_slice())
}

/// Name → plugin mapping
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginFn>,
}

impl PluginRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("playback", |player, _| {
            player.enable_plugin("playback", json!({}))
        });
        registry.register("cue", |player, _| player.enable_plugin("cuePoints", json!({})));
        registry.register("social", |player, embed| {
            let description = embed
                .config()
                .share_description
                .unwrap_or_else(|| DEFAULT_SHARE_DESCRIPTION.to_string());
            player.enable_plugin("social", json!({ "description": description }))
        });
        registry.register("email", |player, _| player.enable_plugin("email", json!({})));
        registry
    }

    /// Register or replace a plugin
    pub fn register(
        &mut self,
        name: impl Into<String>,
        plugin: impl Fn(&dyn Player, &VideoEmbed) -> Result<()> + 'static,
    ) {
        self.plugins.insert(name.into(), Rc::new(plugin));
    }

    pub fn get(&self, name: &str) -> Option<PluginFn> {
        self.plugins.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Sorted plugin names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply resolved plugins in order; returns the names applied
    ///
    /// The first failing plugin stops the remaining ones.
    pub fn apply(
        &self,
        names: &[String],
        player: &dyn Player,
        embed: &VideoEmbed,
    ) -> Result<Vec<String>> {
        let mut applied = Vec::with_capacity(names.len());
        for name in names {
            let Some(plugin) = self.get(name) else {
                debug!(plugin = %name, "Unknown plugin skipped");
                continue;
            };
            if let Err(err) = plugin(player, embed) {
                warn!(plugin = %name, error = %err, "Plugin failed");
                return Err(err);
            }
            applied.push(name.clone());
        }
        Ok(applied)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassList, MediaInfo};
    use crate::Error;
    use std::cell::RefCell;

    #[derive(Default)]
    struct PluginLog {
        enabled: RefCell<Vec<(String, serde_json::Value)>>,
    }

    impl Player for PluginLog {
        fn play(&self) {}
        fn pause(&self) {}
        fn current_time(&self) -> f64 {
            0.0
        }
        fn duration(&self) -> f64 {
            0.0
        }
        fn media_info(&self) -> MediaInfo {
            MediaInfo::default()
        }
        fn set_muted(&self, _muted: bool) {}
        fn overlay(&self) -> Option<ClassList> {
            None
        }
        fn enable_plugin(&self, name: &str, options: serde_json::Value) -> Result<()> {
            self.enabled.borrow_mut().push((name.to_string(), options));
            Ok(())
        }
        fn dispose(&self) {}
    }

    #[test]
    fn test_resolution_order_and_disable() {
        assert_eq!(
            resolve(&["playback"], &["cue", "social"], &["social"]),
            vec!["playback", "cue"]
        );
        assert_eq!(resolve(&["playback"], &["playback"], &["playback"]), Vec::<String>::new());
        assert_eq!(
            resolve(&["playback"], &["email", "playback", "email", "cue"], &[]),
            vec!["playback", "email", "cue"]
        );
    }

    #[test]
    fn test_resolve_for_config() {
        let mut config = VideoConfig::new("v1", "xyz", "abc123");
        config.enabled_plugins = "cue  social".to_string();
        config.disabled_plugins = "social".to_string();
        assert_eq!(resolve_for(&config), vec!["playback", "cue"]);
    }

    #[cfg(feature = "headless")]
    fn embed(config: VideoConfig) -> (crate::headless::HeadlessHost, VideoEmbed) {
        let host = crate::headless::HeadlessHost::default();
        let embed = host.embed(config, 360.0).unwrap();
        (host, embed)
    }

    #[test]
    #[cfg(feature = "headless")]
    fn test_apply_skips_unknown() {
        let registry = PluginRegistry::with_builtins();
        let player = PluginLog::default();
        let (_host, embed) = embed(VideoConfig::new("v1", "xyz", "abc123"));

        let names = vec!["playback".to_string(), "nope".to_string(), "cue".to_string()];
        let applied = registry.apply(&names, &player, &embed).unwrap();

        assert_eq!(applied, vec!["playback", "cue"]);
        let enabled = player.enabled.borrow();
        assert_eq!(enabled[0].0, "playback");
        assert_eq!(enabled[1].0, "cuePoints");
    }

    #[test]
    #[cfg(feature = "headless")]
    fn test_social_share_description() {
        let registry = PluginRegistry::with_builtins();
        let player = PluginLog::default();
        let mut config = VideoConfig::new("v1", "xyz", "abc123");
        let (_host, plain) = embed(config.clone());
        config.share_description = Some("Watch this".to_string());
        let (_other, described) = embed(config);

        registry.apply(&["social".to_string()], &player, &plain).unwrap();
        registry.apply(&["social".to_string()], &player, &described).unwrap();

        let enabled = player.enabled.borrow();
        assert_eq!(enabled[0].1["description"], DEFAULT_SHARE_DESCRIPTION);
        assert_eq!(enabled[1].1["description"], "Watch this");
    }

    #[test]
    #[cfg(feature = "headless")]
    fn test_failure_stops_remaining_plugins() {
        let mut registry = PluginRegistry::with_builtins();
        registry.register("broken", |_, _| Err(Error::plugin("broken", "exploded")));
        let player = PluginLog::default();
        let (_host, embed) = embed(VideoConfig::new("v1", "xyz", "abc123"));

        let names = vec!["broken".to_string(), "playback".to_string()];
        let result = registry.apply(&names, &player, &embed);

        assert!(matches!(result, Err(Error::PluginApply { .. })));
        assert!(player.enabled.borrow().is_empty());
    }
}
