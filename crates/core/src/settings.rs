//! User preferences for AI super resolution and the change feed the state
//! machine listens to.
//!
//! Only the *preference* is persisted here. Whether the feature is actually
//! available is recomputed every session.

use crate::GateError;
use anyhow::{Context, Result};
use futures_channel::mpsc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const MIN_SCALE: u32 = 1;
pub const MAX_SCALE: u32 = 8;
pub const DEFAULT_SCALE: u32 = 2;

/// Snap a requested scale into `[MIN_SCALE, MAX_SCALE]`; anything outside
/// falls back to [`DEFAULT_SCALE`] rather than the nearest bound.
pub fn clamp_scale(scale: u32) -> u32 {
    if (MIN_SCALE..=MAX_SCALE).contains(&scale) {
        scale
    } else {
        DEFAULT_SCALE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub use_ai_super_resolution: bool,
    /// `None` until the user (or the first enable) picks a scale.
    pub ai_super_resolution_scale: Option<u32>,
}

impl Settings {
    pub fn scale(&self) -> u32 {
        self.ai_super_resolution_scale
            .map(clamp_scale)
            .unwrap_or(DEFAULT_SCALE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    UseAiSuperResolution(bool),
    Scale(u32),
}

pub type SubscriptionId = u64;

/// Receiving end of a settings subscription. Hand the id back to
/// [`SettingsStore::unsubscribe`] on teardown.
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<SettingsChange>,
}

pub trait SettingsStore: Send + Sync {
    fn snapshot(&self) -> Settings;

    /// Persists `enabled`. Enabling with an unset or out-of-range scale also
    /// writes [`DEFAULT_SCALE`].
    fn set_use_ai_super_resolution(&self, enabled: bool) -> Result<(), GateError>;

    /// Persists `clamp_scale(scale)` and returns the stored value.
    fn set_scale(&self, scale: u32) -> Result<u32, GateError>;

    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: SubscriptionId);

    fn use_ai_super_resolution(&self) -> bool {
        self.snapshot().use_ai_super_resolution
    }

    fn scale(&self) -> u32 {
        self.snapshot().scale()
    }

    /// Rewrite the stored scale if it is unset or out of range.
    fn normalize_scale(&self) -> Result<u32, GateError> {
        let stored = self.snapshot().ai_super_resolution_scale;
        match stored {
            Some(scale) if clamp_scale(scale) == scale => Ok(scale),
            _ => self.set_scale(DEFAULT_SCALE),
        }
    }
}

struct Inner {
    settings: Settings,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<SettingsChange>)>,
    next_id: SubscriptionId,
}

/// Settings kept in memory and, when opened from a path, written to a TOML
/// file synchronously on every mutation.
pub struct FileSettingsStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl FileSettingsStore {
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            inner: Mutex::new(Inner {
                settings,
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Load `path` if it exists, otherwise start from defaults. The file is
    /// created on the first mutation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse settings file {:?}", path))?
        } else {
            Settings::default()
        };

        let mut store = Self::in_memory(settings);
        store.path = Some(path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked writer cannot leave `Settings` half-updated, so a
        // poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, settings: &Settings) -> Result<(), GateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GateError::Settings(e.to_string()))?;
        }
        let content = toml::to_string(settings).map_err(|e| GateError::Settings(e.to_string()))?;
        fs::write(path, content).map_err(|e| GateError::Settings(e.to_string()))?;
        debug!("Persisted settings to {:?}", path);
        Ok(())
    }

    fn broadcast(inner: &mut Inner, change: SettingsChange) {
        inner
            .subscribers
            .retain(|(_, tx)| tx.unbounded_send(change).is_ok());
    }

    /// Apply `update`, persist, then notify. The in-memory value is kept even
    /// if the write fails.
    fn mutate<F>(&self, update: F) -> Result<(), GateError>
    where
        F: FnOnce(&mut Settings) -> Vec<SettingsChange>,
    {
        let mut inner = self.lock();
        let changes = update(&mut inner.settings);
        if changes.is_empty() {
            return Ok(());
        }
        let persisted = self.persist(&inner.settings);
        if let Err(e) = &persisted {
            warn!("{}", e);
        }
        for change in changes {
            Self::broadcast(&mut inner, change);
        }
        persisted
    }
}

impl SettingsStore for FileSettingsStore {
    fn snapshot(&self) -> Settings {
        self.lock().settings.clone()
    }

    fn set_use_ai_super_resolution(&self, enabled: bool) -> Result<(), GateError> {
        self.mutate(|settings| {
            let mut changes = Vec::new();
            if enabled {
                match settings.ai_super_resolution_scale {
                    Some(scale) if clamp_scale(scale) == scale => {}
                    _ => {
                        settings.ai_super_resolution_scale = Some(DEFAULT_SCALE);
                        changes.push(SettingsChange::Scale(DEFAULT_SCALE));
                    }
                }
            }
            if settings.use_ai_super_resolution != enabled {
                settings.use_ai_super_resolution = enabled;
                changes.push(SettingsChange::UseAiSuperResolution(enabled));
            }
            changes
        })
    }

    fn set_scale(&self, scale: u32) -> Result<u32, GateError> {
        let scale = clamp_scale(scale);
        self.mutate(|settings| {
            if settings.ai_super_resolution_scale == Some(scale) {
                return Vec::new();
            }
            settings.ai_super_resolution_scale = Some(scale);
            vec![SettingsChange::Scale(scale)]
        })?;
        Ok(scale)
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, tx));
        Subscription { id, events: rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.retain(|(sub, _)| *sub != id);
    }
}
