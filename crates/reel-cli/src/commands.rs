//! CLI command implementations

use anyhow::{anyhow, Context};
use serde::Serialize;
use std::path::Path;

use reel_core::config::DEFAULT_PLUGINS;
use reel_core::render::VideoView;
use reel_core::plugins::resolve_for;
use reel_core::{EmbedSettings, MetaDisplay, ScriptSource, VideoConfig, VideoState};

use crate::output::emit;
use crate::scenario::Scenario;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptUrlReport {
    player_id: String,
    url: String,
    src: String,
}

/// Print the script URL for an account/player pair
pub fn script_url(host: &str, account: &str, player: &str, format: &str) -> anyhow::Result<()> {
    let source = ScriptSource::new(host, account, player);
    let report = ScriptUrlReport {
        player_id: player.to_string(),
        url: source.url()?.to_string(),
        src: source.src()?,
    };

    emit(&report, format, |r| {
        println!("Player:  {}", r.player_id);
        println!("URL:     {}", r.url);
        println!("Src:     {}", r.src);
    })
}

#[derive(Serialize)]
struct PluginReport {
    defaults: Vec<String>,
    enabled: Vec<String>,
    disabled: Vec<String>,
    resolved: Vec<String>,
    unknown: Vec<String>,
}

/// Resolve the plugin list for enabled/disabled names
pub fn plugins(enabled: &str, disabled: &str, format: &str) -> anyhow::Result<()> {
    let config = VideoConfig {
        enabled_plugins: enabled.to_string(),
        disabled_plugins: disabled.to_string(),
        ..Default::default()
    };
    let registry = reel_core::PluginRegistry::with_builtins();
    let resolved = resolve_for(&config);
    let unknown = resolved
        .iter()
        .filter(|name| !registry.contains(name))
        .cloned()
        .collect();

    let report = PluginReport {
        defaults: DEFAULT_PLUGINS.iter().map(|s| s.to_string()).collect(),
        enabled: config.enabled_plugin_names(),
        disabled: config.disabled_plugin_names(),
        resolved,
        unknown,
    };

    emit(&report, format, |r| {
        println!("Resolved plugins:");
        for (i, name) in r.resolved.iter().enumerate() {
            let note = if r.unknown.contains(name) { " (unknown, skipped)" } else { "" };
            println!("  {}. {}{}", i + 1, name, note);
        }
        if r.resolved.is_empty() {
            println!("  (none)");
        }
    })
}

#[derive(Serialize)]
struct InspectReport {
    config: VideoConfig,
    view: VideoView,
}

/// Parse `name=value` attributes into a configuration and describe the embed
pub fn inspect(attrs: &[String], format: &str) -> anyhow::Result<()> {
    let pairs = attrs
        .iter()
        .map(|attr| match attr.split_once('=') {
            Some((name, value)) => Ok((name.to_string(), value.to_string())),
            // bare attributes are boolean flags
            None if !attr.is_empty() => Ok((attr.to_string(), String::new())),
            None => Err(anyhow!("empty attribute")),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = VideoConfig::from_attributes(pairs)?;
    let settings = EmbedSettings::default();
    let state = VideoState {
        id: format!("v{}-{}-1", config.video_id, config.account_id),
        ..Default::default()
    };
    let view = VideoView::build(&settings.namespace, &config, &state, &MetaDisplay::default())?;
    let report = InspectReport { config, view };

    emit(&report, format, |r| {
        println!("Video:    {}", r.config.video_id);
        println!("Account:  {}", r.config.account_id);
        println!("Player:   {}", r.config.player_id);
        println!("Element:  {}", r.view.video.id);
        println!("Classes:  {}", r.view.classes.join(" "));
        match &r.view.ratio {
            Some(ratio) => println!("Ratio:    {}", ratio),
            None => println!("Ratio:    none"),
        }
        println!("Controls: {}", r.view.video.controls);
        println!("Muted:    {}", r.config.effective_muted());
        println!("Plugins:  {}", resolve_for(&r.config).join(" "));
    })
}

/// Run a scenario file against the headless host
pub async fn simulate(path: &Path, format: &str) -> anyhow::Result<()> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let scenario = Scenario::from_json(&json)?;
    let report = scenario.run()?;

    emit(&report, format, |r| {
        println!("Scripts appended: {}", r.scripts.len());
        for src in &r.scripts {
            println!("  {}", src);
        }

        println!("\nPlayers constructed: {}", r.players.len());
        for id in &r.players {
            println!("  {}", id);
        }

        println!("\nNotifications:");
        for n in &r.notifications {
            println!("  [{}] {}", n.video, n.notification.name());
        }

        if !r.errors.is_empty() {
            println!("\nSession errors:");
            for e in &r.errors {
                println!("  - {}", e.message);
            }
        }

        if !r.step_failures.is_empty() {
            println!("\nFailed steps:");
            for f in &r.step_failures {
                println!("  - {}", f);
            }
        }

        println!("\nVideos:");
        for v in &r.videos {
            println!(
                "  {} ({}): {} playing={} finished={} progress={}ms",
                v.name, v.state.id, v.phase, v.state.is_playing, v.state.is_finished, v.state.progress
            );
            if let Some(err) = &v.construction_error {
                println!("    construction error: {}", err);
            }
        }
    })?;

    if !report.step_failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
