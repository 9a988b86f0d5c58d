//! Player script bootstrap
//!
//! Every embed needs the vendor script for its player id before a player can
//! be constructed. The registry appends at most one script element per player
//! id for the session and fans the load outcome out to every embed that asked
//! for it, in the order they asked. A failed load is final: it is recorded in
//! the session error log and never retried.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, warn};
use url::Url;

use crate::host::Document;
use crate::types::ErrorRecord;
use crate::{Error, Result};

/// Location of a vendor player script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub host: String,
    pub account_id: String,
    pub player_id: String,
}

impl ScriptSource {
    pub fn new(
        host: impl Into<String>,
        account_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            account_id: account_id.into(),
            player_id: player_id.into(),
        }
    }

    /// Absolute URL of the script
    pub fn url(&self) -> Result<Url> {
        let base = Url::parse(&format!("https://{}/", self.host))?;
        Ok(base.join(&format!(
            "{}/{}_default/index.min.js",
            self.account_id, self.player_id
        ))?)
    }

    /// Scheme-relative `src` attribute value
    pub fn src(&self) -> Result<String> {
        let url = self.url()?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidConfig(format!("script host `{}` has no host", self.host)))?;
        Ok(match url.port() {
            Some(port) => format!("//{}:{}{}", host, port, url.path()),
            None => format!("//{}{}", host, url.path()),
        })
    }
}

/// Script element handed to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub player_id: String,
    pub src: String,
    pub is_async: bool,
}

/// Load status of a player script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStatus {
    Pending,
    Loaded,
    Failed(ErrorRecord),
}

type ReadyFn = Box<dyn FnOnce() -> Result<()>>;
type ErrorFn = Box<dyn FnOnce(&ErrorRecord)>;

/// Callbacks registered by one embed waiting on a script
pub struct Waiter {
    label: String,
    on_ready: ReadyFn,
    on_error: ErrorFn,
}

impl Waiter {
    pub fn new(
        label: impl Into<String>,
        on_ready: impl FnOnce() -> Result<()> + 'static,
        on_error: impl FnOnce(&ErrorRecord) + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            on_ready: Box::new(on_ready),
            on_error: Box::new(on_error),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter").field("label", &self.label).finish()
    }
}

/// Session-wide, append-only log of script failures
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    records: Rc<RefCell<Vec<ErrorRecord>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ErrorRecord) {
        self.records.borrow_mut().push(record);
    }

    /// Copy of every record, oldest first
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub(crate) fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

struct Entry {
    src: String,
    status: ScriptStatus,
    waiters: Vec<Waiter>,
}

/// Deduplicating script loader keyed by player id
#[derive(Clone)]
pub struct BootstrapRegistry {
    entries: Rc<RefCell<HashMap<String, Entry>>>,
    document: Rc<dyn Document>,
    errors: ErrorLog,
}

impl BootstrapRegistry {
    pub fn new(document: Rc<dyn Document>, errors: ErrorLog) -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            document,
            errors,
        }
    }

    /// Ask for the script of `source.player_id`
    ///
    /// The first request for a player id appends the script; later requests
    /// queue behind it or complete immediately if the outcome is known.
    pub fn request_script(&self, source: &ScriptSource, waiter: Waiter) -> Result<()> {
        let status = self
            .entries
            .borrow()
            .get(&source.player_id)
            .map(|entry| entry.status.clone());

        match status {
            None => {
                let script = ScriptElement {
                    player_id: source.player_id.clone(),
                    src: source.src()?,
                    is_async: true,
                };
                info!(
                    player_id = %script.player_id,
                    src = %script.src,
                    waiter = waiter.label(),
                    "Appending player script"
                );
                self.entries.borrow_mut().insert(
                    source.player_id.clone(),
                    Entry {
                        src: script.src.clone(),
                        status: ScriptStatus::Pending,
                        waiters: vec![waiter],
                    },
                );
                self.document.append_script(&script);
                Ok(())
            }
            Some(ScriptStatus::Pending) => {
                debug!(player_id = %source.player_id, waiter = waiter.label(), "Queued behind pending script");
                if let Some(entry) = self.entries.borrow_mut().get_mut(&source.player_id) {
                    entry.waiters.push(waiter);
                }
                Ok(())
            }
            Some(ScriptStatus::Loaded) => {
                debug!(player_id = %source.player_id, waiter = waiter.label(), "Script already loaded");
                (waiter.on_ready)()
            }
            Some(ScriptStatus::Failed(record)) => {
                debug!(player_id = %source.player_id, waiter = waiter.label(), "Script already failed");
                (waiter.on_error)(&record);
                Ok(())
            }
        }
    }

    /// Report a successful load; every waiter is completed in order
    ///
    /// A failing waiter does not stop later ones. The first failure is
    /// returned once all waiters ran.
    pub fn script_loaded(&self, player_id: &str) -> Result<()> {
        let waiters = self.settle(player_id, |_| ScriptStatus::Loaded)?;
        info!(player_id, waiters = waiters.len(), "Player script loaded");

        let mut first_error = None;
        for waiter in waiters {
            let label = waiter.label;
            if let Err(err) = (waiter.on_ready)() {
                warn!(player_id, waiter = %label, error = %err, "Script waiter failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Report a failed load; the failure is logged for the session and
    /// delivered to every waiter in order
    pub fn script_failed(&self, player_id: &str) -> Result<ErrorRecord> {
        let mut record = None;
        let waiters = self.settle(player_id, |src| {
            let failure = ErrorRecord::from(&Error::ScriptLoad { src: src.to_string() });
            record = Some(failure.clone());
            ScriptStatus::Failed(failure)
        })?;
        let record = record.ok_or_else(|| Error::UnknownScript(player_id.to_string()))?;

        warn!(player_id, message = %record.message, waiters = waiters.len(), "Player script failed");
        self.errors.push(record.clone());

        for waiter in waiters {
            (waiter.on_error)(&record);
        }
        Ok(record)
    }

    /// Status of the script for a player id
    pub fn status(&self, player_id: &str) -> Option<ScriptStatus> {
        self.entries.borrow().get(player_id).map(|e| e.status.clone())
    }

    /// Number of embeds still waiting on a player id
    pub fn waiting(&self, player_id: &str) -> usize {
        self.entries
            .borrow()
            .get(player_id)
            .map(|e| e.waiters.len())
            .unwrap_or(0)
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Move a pending entry to its final status and take its waiters
    fn settle(
        &self,
        player_id: &str,
        status: impl FnOnce(&str) -> ScriptStatus,
    ) -> Result<Vec<Waiter>> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(player_id)
            .filter(|e| e.status == ScriptStatus::Pending)
            .ok_or_else(|| Error::UnknownScript(player_id.to_string()))?;
        entry.status = status(&entry.src);
        Ok(std::mem::take(&mut entry.waiters))
    }
}

impl std::fmt::Debug for BootstrapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.borrow();
        let mut ids: Vec<_> = entries.keys().cloned().collect();
        ids.sort();
        f.debug_struct("BootstrapRegistry").field("players", &ids).finish()
    }
}
