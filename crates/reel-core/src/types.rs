//! Core types for Reel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::{Error, Result};

/// Lifecycle phases of a video embed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Constructed, not yet attached
    Created,
    /// Attach in progress
    Connecting,
    /// Errors were recorded before setup; the embed stays inert
    ErrorHalt,
    /// Waiting for the shared player script
    ScriptPending,
    /// Script loaded, player not ready yet
    PlayerPending,
    /// Player reported its metadata
    Ready,
    /// Playback running
    Playing,
    /// Playback paused
    Paused,
    /// Playback reached the end
    Finished,
    /// Detached
    Disposed,
}

impl LifecyclePhase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        if target == Disposed {
            return *self != Disposed;
        }
        matches!(
            (self, target),
            (Created, Connecting) |
            (Connecting, ErrorHalt) | (Connecting, ScriptPending) |
            (ScriptPending, PlayerPending) | (ScriptPending, ErrorHalt) |
            (PlayerPending, Ready) | (PlayerPending, Playing) | (PlayerPending, Paused) | (PlayerPending, Finished) |
            (Ready, Playing) | (Ready, Paused) | (Ready, Finished) |
            (Playing, Playing) | (Playing, Paused) | (Playing, Finished) |
            (Paused, Playing) | (Paused, Paused) | (Paused, Finished) |
            (Finished, Playing) | (Finished, Paused) | (Finished, Finished)
        )
    }

    /// Whether the player handle may exist in this phase
    pub fn has_player(&self) -> bool {
        use LifecyclePhase::*;
        matches!(self, PlayerPending | Ready | Playing | Paused | Finished)
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Created => write!(f, "created"),
            LifecyclePhase::Connecting => write!(f, "connecting"),
            LifecyclePhase::ErrorHalt => write!(f, "error_halt"),
            LifecyclePhase::ScriptPending => write!(f, "script_pending"),
            LifecyclePhase::PlayerPending => write!(f, "player_pending"),
            LifecyclePhase::Ready => write!(f, "ready"),
            LifecyclePhase::Playing => write!(f, "playing"),
            LifecyclePhase::Paused => write!(f, "paused"),
            LifecyclePhase::Finished => write!(f, "finished"),
            LifecyclePhase::Disposed => write!(f, "disposed"),
        }
    }
}

/// A recorded script failure, as delivered to error callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }
}

impl From<&Error> for ErrorRecord {
    fn from(err: &Error) -> Self {
        // script failures carry no vendor code
        let code = match err {
            Error::ScriptLoad { .. } => "",
            other => other.error_code(),
        };
        ErrorRecord::new(code, err.to_string())
    }
}

/// Observable playback state of one embed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoState {
    /// Element id of the video element
    pub id: String,
    pub is_playing: bool,
    pub is_finished: bool,
    pub is_setup: bool,
    /// Current position in milliseconds
    pub progress: u64,
    /// Content duration in milliseconds (once known)
    pub duration: Option<u64>,
    pub errors: Vec<ErrorRecord>,
}

/// Shared state published on the video context channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContextState {
    pub state: VideoState,
}

/// Aspect ratio of the ratio box wrapping the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const WIDESCREEN: AspectRatio = AspectRatio { width: 16, height: 9 };

    /// Parse a ratio setting: `none`, `auto` or `W/H`
    pub fn parse(value: &str) -> Result<Option<AspectRatio>> {
        let value = value.trim();
        match value {
            "none" => Ok(None),
            "auto" | "" => Ok(Some(Self::WIDESCREEN)),
            _ => {
                let (w, h) = value
                    .split_once('/')
                    .ok_or_else(|| Error::InvalidConfig(format!("ratio `{}` is not W/H", value)))?;
                let parse = |part: &str| {
                    part.trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| Error::InvalidConfig(format!("ratio `{}` is not W/H", value)))
                };
                Ok(Some(AspectRatio {
                    width: parse(w)?,
                    height: parse(h)?,
                }))
            }
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.width, self.height)
    }
}

/// Media information reported by the player once metadata is loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub name: Option<String>,
    /// Duration in seconds
    pub duration: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Shared, ordered set of CSS classes on a host-side element
#[derive(Debug, Clone, Default)]
pub struct ClassList(Rc<RefCell<Vec<String>>>);

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a space-separated class attribute
    pub fn parse(classes: &str) -> Self {
        let list = Self::new();
        for class in classes.split_whitespace() {
            list.add(class);
        }
        list
    }

    pub fn add(&self, class: &str) {
        let mut classes = self.0.borrow_mut();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove(&self, class: &str) {
        self.0.borrow_mut().retain(|c| c != class);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.borrow().iter().any(|c| c == class)
    }

    /// True if any class contains the fragment
    pub fn any_contains(&self, fragment: &str) -> bool {
        self.0.borrow().iter().any(|c| c.contains(fragment))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl std::fmt::Display for ClassList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.borrow().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_parsing() {
        assert_eq!(AspectRatio::parse("none").unwrap(), None);
        assert_eq!(AspectRatio::parse("auto").unwrap(), Some(AspectRatio::WIDESCREEN));
        assert_eq!(
            AspectRatio::parse("4/3").unwrap(),
            Some(AspectRatio { width: 4, height: 3 })
        );
        assert!(AspectRatio::parse("wide").is_err());
        assert!(AspectRatio::parse("4/0").is_err());
    }

    #[test]
    fn test_phase_transitions() {
        use LifecyclePhase::*;
        assert!(Created.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(ErrorHalt));
        assert!(ScriptPending.can_transition_to(PlayerPending));
        assert!(Playing.can_transition_to(Finished));
        assert!(ErrorHalt.can_transition_to(Disposed));

        assert!(!Created.can_transition_to(Playing));
        assert!(!ErrorHalt.can_transition_to(ScriptPending));
        assert!(!Disposed.can_transition_to(Disposed));
        assert!(!Ready.can_transition_to(PlayerPending));
    }

    #[test]
    fn test_phases_with_player() {
        use LifecyclePhase::*;
        assert!(PlayerPending.has_player());
        assert!(Finished.has_player());
        assert!(!ScriptPending.has_player());
        assert!(!ErrorHalt.has_player());
        assert!(!Disposed.has_player());
    }

    #[test]
    fn test_class_list_dedupes() {
        let classes = ClassList::parse("a b a");
        classes.add("c");
        classes.add("b");
        assert_eq!(classes.to_string(), "a b c");
        classes.remove("a");
        assert!(!classes.contains("a"));
        assert!(classes.any_contains("c"));
    }

    #[test]
    fn test_error_record_from_script_error() {
        let err = Error::ScriptLoad { src: "//x/y_default/index.min.js".into() };
        let record = ErrorRecord::from(&err);
        assert_eq!(record.code, "");
        assert_eq!(record.message, "The script //x/y_default/index.min.js is not accessible.");
    }
}
