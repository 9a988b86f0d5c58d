//! Scripted page scenarios
//!
//! A scenario declares the embeds on a page and a list of steps: attaching
//! and detaching embeds, script load outcomes, user controls and player
//! events. Running it against the headless host yields every notification
//! and the final state of each embed.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

use reel_core::headless::{HeadlessHost, StaticElement};
use reel_core::{
    EmbedSettings, ErrorRecord, LifecyclePhase, MediaInfo, Notification, PlayerEvent, VideoConfig,
    VideoEmbed, VideoState,
};

/// Scenario file contents
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default = "EmbedSettings::deterministic")]
    pub settings: EmbedSettings,
    /// Media the scripted players report
    #[serde(default)]
    pub media: Option<MediaInfo>,
    pub videos: Vec<VideoEntry>,
    pub steps: Vec<Step>,
}

/// One embed on the simulated page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub name: String,
    #[serde(default = "default_height")]
    pub height: f64,
    pub config: VideoConfig,
}

fn default_height() -> f64 {
    360.0
}

/// Scenario steps
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    Connect { video: String },
    Disconnect { video: String },
    #[serde(rename_all = "camelCase")]
    ScriptLoad { player_id: String },
    #[serde(rename_all = "camelCase")]
    ScriptError { player_id: String },
    FailConstruction { reason: String },
    Play { video: String },
    Pause { video: String },
    Toggle { video: String },
    Close { video: String },
    Key { video: String, key: String },
    HideOverlay { video: String },
    ShowOverlay { video: String },
    #[serde(rename_all = "camelCase")]
    PlayerEvent {
        video: String,
        event: PlayerEvent,
        #[serde(default)]
        current_time: Option<f64>,
    },
    Resize { video: String, height: f64 },
    RunTasks,
    Advance { ms: u64 },
}

/// A notification together with the embed that emitted it
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub video: String,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Final view of one embed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoReport {
    pub name: String,
    pub phase: LifecyclePhase,
    pub state: VideoState,
    pub classes: Vec<String>,
    pub overlay: Option<String>,
    pub applied_plugins: Vec<String>,
    pub construction_error: Option<String>,
}

/// Outcome of a scenario run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub scripts: Vec<String>,
    pub players: Vec<String>,
    pub notifications: Vec<NotificationRecord>,
    pub errors: Vec<ErrorRecord>,
    pub step_failures: Vec<String>,
    pub videos: Vec<VideoReport>,
}

struct PageVideo {
    embed: VideoEmbed,
    element: Rc<StaticElement>,
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid scenario")
    }

    /// Run every step; failing steps are recorded and the run continues
    pub fn run(&self) -> anyhow::Result<ScenarioReport> {
        let host = HeadlessHost::new(self.settings.clone());
        if let Some(media) = &self.media {
            host.factory.set_media(media.clone());
        }

        let notifications = Rc::new(RefCell::new(Vec::new()));
        let mut page: BTreeMap<String, PageVideo> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.videos.len());

        for entry in &self.videos {
            let element = Rc::new(StaticElement::new(entry.height));
            let embed = VideoEmbed::new(&host.services, entry.config.clone(), element.clone())
                .with_context(|| format!("video `{}`", entry.name))?;

            let log = Rc::clone(&notifications);
            let name = entry.name.clone();
            embed.subscribe(move |notification| {
                log.borrow_mut().push(NotificationRecord {
                    video: name.clone(),
                    notification: notification.clone(),
                })
            });

            order.push(entry.name.clone());
            page.insert(entry.name.clone(), PageVideo { embed, element });
        }

        let mut step_failures = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            if let Err(err) = apply_step(&host, &page, step) {
                warn!(step = index, error = %err, "Scenario step failed");
                step_failures.push(format!("step {}: {:#}", index, err));
            }
        }

        let videos = order
            .iter()
            .filter_map(|name| page.get(name).map(|video| (name, &video.embed)))
            .map(|(name, embed)| VideoReport {
                name: name.clone(),
                phase: embed.phase(),
                state: embed.state(),
                classes: embed.host_classes().to_vec(),
                overlay: embed.overlay().map(|o| o.to_string()),
                applied_plugins: embed.applied_plugins(),
                construction_error: embed.construction_error(),
            })
            .collect();

        info!(steps = self.steps.len(), "Scenario finished");

        let notifications = notifications.borrow().clone();
        Ok(ScenarioReport {
            scripts: host.document.scripts().into_iter().map(|s| s.src).collect(),
            players: host.factory.created(),
            notifications,
            errors: host.errors().snapshot(),
            step_failures,
            videos,
        })
    }
}

fn video<'a>(page: &'a BTreeMap<String, PageVideo>, name: &str) -> anyhow::Result<&'a PageVideo> {
    page.get(name).ok_or_else(|| anyhow!("unknown video `{}`", name))
}

fn apply_step(
    host: &HeadlessHost,
    page: &BTreeMap<String, PageVideo>,
    step: &Step,
) -> anyhow::Result<()> {
    match step {
        Step::Connect { video: name } => video(page, name)?.embed.connect()?,
        Step::Disconnect { video: name } => video(page, name)?.embed.disconnect(),
        Step::ScriptLoad { player_id } => host.load_script(player_id)?,
        Step::ScriptError { player_id } => {
            host.fail_script(player_id)?;
        }
        Step::FailConstruction { reason } => host.factory.fail_with(reason.clone()),
        Step::Play { video: name } => video(page, name)?.embed.play(),
        Step::Pause { video: name } => video(page, name)?.embed.pause(),
        Step::Toggle { video: name } => video(page, name)?.embed.toggle(),
        Step::Close { video: name } => video(page, name)?.embed.close(),
        Step::Key { video: name, key } => {
            video(page, name)?.embed.handle_key(key);
        }
        Step::HideOverlay { video: name } => video(page, name)?.embed.hide_overlay(),
        Step::ShowOverlay { video: name } => video(page, name)?.embed.show_overlay(),
        Step::PlayerEvent {
            video: name,
            event,
            current_time,
        } => {
            let embed = &video(page, name)?.embed;
            let player = host
                .factory
                .player(&embed.id())
                .ok_or_else(|| anyhow!("video `{}` has no player", name))?;
            if let Some(seconds) = current_time {
                player.set_current_time(*seconds);
            }
            player.fire(*event);
        }
        Step::Resize { video: name, height } => {
            video(page, name)?.element.set_height(*height);
            host.document.fire_resize();
        }
        Step::RunTasks => {
            host.services.scheduler().run_until_idle();
        }
        Step::Advance { ms } => {
            host.services.scheduler().advance(Duration::from_millis(*ms));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "videos": [
            { "name": "hero", "config": { "videoId": "1", "accountId": "xyz", "playerId": "abc123", "isBackgroundVideo": true } },
            { "name": "inline", "config": { "videoId": "2", "accountId": "xyz", "playerId": "abc123", "enabledPlugins": "cue" } }
        ],
        "steps": [
            { "action": "connect", "video": "hero" },
            { "action": "connect", "video": "inline" },
            { "action": "toggle", "video": "inline" },
            { "action": "scriptLoad", "playerId": "abc123" },
            { "action": "playerEvent", "video": "inline", "event": "loadedmetadata" },
            { "action": "playerEvent", "video": "inline", "event": "ended", "currentTime": 30.0 },
            { "action": "runTasks" },
            { "action": "play", "video": "missing" }
        ]
    }"#;

    #[test]
    fn test_scenario_run() {
        let report = Scenario::from_json(SCENARIO).unwrap().run().unwrap();

        assert_eq!(
            report.scripts,
            vec!["//players.brightcove.net/xyz/abc123_default/index.min.js"]
        );
        assert_eq!(report.players, vec!["v1-xyz-1", "v2-xyz-2"]);
        assert_eq!(report.step_failures.len(), 1);

        let inline = &report.videos[1];
        assert_eq!(inline.phase, LifecyclePhase::Finished);
        assert!(inline.state.is_finished);
        assert!(!inline.state.is_playing);
        assert_eq!(inline.applied_plugins, vec!["playback", "cue"]);

        let events: Vec<_> = report
            .notifications
            .iter()
            .filter(|n| n.video == "inline")
            .map(|n| n.notification.name())
            .collect();
        assert_eq!(events, vec!["playing", "playing", "ended"]);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let json = r#"{ "videos": [], "steps": [{ "action": "rewind" }] }"#;
        assert!(Scenario::from_json(json).is_err());
    }
}
