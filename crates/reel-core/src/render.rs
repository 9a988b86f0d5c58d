//! Render descriptions
//!
//! The rendering engine is external. Components hand it a tree description
//! built from their current props and state; how it is turned into markup is
//! not this crate's concern.

use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;
use crate::types::{AspectRatio, VideoState};
use crate::Result;

/// Props + state → tree description
pub trait Renderable {
    type View;

    fn render(&self) -> Result<Self::View>;
}

/// Meta line shown under the player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaDisplay {
    pub title: Option<String>,
    /// Formatted duration (`m:ss` or `h:mm:ss`)
    pub duration: Option<String>,
}

/// The `<video-js>` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoElementView {
    pub id: String,
    pub controls: bool,
    pub muted: bool,
    pub autoplay: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub preload: String,
    pub poster: Option<String>,
}

/// Close affordance of background videos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseButtonView {
    pub text: String,
    pub icon: String,
}

/// Full description of a video embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub classes: Vec<String>,
    /// Ratio box around the player, `None` when disabled
    pub ratio: Option<AspectRatio>,
    pub video: VideoElementView,
    pub meta: Option<MetaDisplay>,
    pub close_button: Option<CloseButtonView>,
}

impl VideoView {
    /// Describe an embed from its configuration and state
    pub fn build(
        namespace: &str,
        config: &VideoConfig,
        state: &VideoState,
        meta: &MetaDisplay,
    ) -> Result<Self> {
        let mut classes = vec![
            format!("t-{}-xdark", namespace),
            format!("c-{}-video", namespace),
        ];
        if config.no_controls {
            classes.push(format!("c-{}-video--hide-controls", namespace));
        }
        if config.is_background_video {
            classes.push(format!("c-{}-video--background", namespace));
        }

        let close_button = config.is_background_video.then(|| CloseButtonView {
            text: config
                .close_button_text
                .clone()
                .unwrap_or_else(|| "Close".to_string()),
            icon: "close".to_string(),
        });

        Ok(Self {
            classes,
            ratio: config.aspect_ratio()?,
            video: VideoElementView {
                id: state.id.clone(),
                controls: !config.no_controls,
                muted: config.muted,
                autoplay: config.autoplay,
                loop_playback: config.loop_playback,
                preload: "none".to_string(),
                poster: config.poster.uri.clone(),
            },
            meta: (!config.no_meta).then(|| meta.clone()),
            close_button,
        })
    }
}

/// Format a duration in seconds for the meta line
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
