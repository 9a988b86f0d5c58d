//! Error types for Reel Core

use thiserror::Error;

/// Result type alias for embed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Embed error types
#[derive(Error, Debug)]
pub enum Error {
    // Bootstrap errors
    #[error("The script {src} is not accessible.")]
    ScriptLoad { src: String },

    #[error("No pending script request for player `{0}`")]
    UnknownScript(String),

    // Player errors
    #[error("Player construction failed: {0}")]
    PlayerConstruction(String),

    #[error("Plugin `{plugin}` failed: {reason}")]
    PluginApply { plugin: String, reason: String },

    // Lifecycle errors
    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a plugin error
    pub fn plugin(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PluginApply {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error is reported to the instance's error callback
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Error::ScriptLoad { .. })
    }

    /// Returns the error code used in logs and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ScriptLoad { .. } => "SCRIPT_LOAD",
            Error::UnknownScript(_) => "UNKNOWN_SCRIPT",
            Error::PlayerConstruction(_) => "PLAYER_CONSTRUCTION",
            Error::PluginApply { .. } => "PLUGIN_APPLY",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Url(_) => "URL",
        }
    }
}
