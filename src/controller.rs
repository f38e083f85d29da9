//! Composes the profile store and the layout tool
//!
//! Owns the only in-memory copy of the collection and the "currently active
//! profile" highlight. The file on disk is the source of truth, so every
//! operation reloads before it reads or mutates.

use chrono::{DateTime, Local};
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::tray;
use crate::error::{LayoutError, LayoutResult};
use crate::placer::{ApplyOutcome, LayoutTool};
use crate::profiles::{LayoutProfile, ProfileStore, find_active};

pub struct LayoutController<T: LayoutTool> {
    store: ProfileStore,
    tool: T,
    active: Option<Uuid>,
}

impl<T: LayoutTool> LayoutController<T> {
    pub fn new(store: ProfileStore, tool: T) -> Self {
        Self {
            store,
            tool,
            active: None,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Id of the profile matching the live layout as of the last refresh
    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active_profile(&self) -> Option<&LayoutProfile> {
        self.active.and_then(|id| self.store.get(id))
    }

    /// Reload profiles and recompute which one matches the live layout
    pub fn refresh(&mut self) -> Option<Uuid> {
        self.store.load();
        self.active = match self.tool.capture_current_args() {
            Ok(live) => find_active(self.store.profiles(), &live).map(|p| p.id),
            Err(e) => {
                debug!(error = %e, "Cannot read live layout, no active profile");
                None
            }
        };
        self.active
    }

    /// Capture the live layout and store it under `name` (or a timestamped default)
    pub fn save_current(&mut self, name: Option<&str>) -> LayoutResult<LayoutProfile> {
        let args = self.tool.capture_current_args()?;
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_profile_name(Local::now()),
        };

        self.store.load();
        let profile = self.store.add(&name, args)?;
        self.active = Some(profile.id);
        Ok(profile)
    }

    /// Apply a stored profile and refresh the highlight unless the apply failed
    pub fn apply_profile(&mut self, id: Uuid) -> LayoutResult<ApplyOutcome> {
        self.store.load();
        let profile = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| LayoutError::ProfileNotFound(id.to_string()))?;

        info!(id = %profile.id, name = %profile.name, "Applying layout");
        let outcome = self.tool.apply(&profile.args);
        if !outcome.is_failure() {
            self.refresh();
        }
        Ok(outcome)
    }

    /// Find a profile by id, 1-based menu position, or case-insensitive name
    pub fn resolve(&self, selector: &str) -> LayoutResult<&LayoutProfile> {
        let selector = selector.trim();
        let profiles = self.store.profiles();

        let by_id = Uuid::parse_str(selector).ok().and_then(|id| self.store.get(id));
        let by_position = || {
            selector
                .parse::<usize>()
                .ok()
                .filter(|&n| n >= 1)
                .and_then(|n| profiles.get(n - 1))
        };

        by_id
            .or_else(by_position)
            .or_else(|| self.store.find_by_name(selector))
            .ok_or_else(|| LayoutError::ProfileNotFound(selector.to_string()))
    }

    /// Replace a profile's arguments with the live layout, keeping its id and name
    pub fn recapture(&mut self, selector: &str) -> LayoutResult<LayoutProfile> {
        let args = self.tool.capture_current_args()?;
        self.store.load();
        let mut profile = self.resolve(selector)?.clone();
        profile.args = args;
        profile.updated_at = chrono::Utc::now();
        self.store.update(profile.clone())?;
        self.active = Some(profile.id);
        Ok(profile)
    }

    pub fn rename(&mut self, selector: &str, new_name: &str) -> LayoutResult<LayoutProfile> {
        self.store.load();
        let id = self.resolve(selector)?.id;
        self.store.rename(id, new_name.trim())?;
        self.store
            .get(id)
            .cloned()
            .ok_or_else(|| LayoutError::ProfileNotFound(id.to_string()))
    }

    pub fn remove(&mut self, selector: &str) -> LayoutResult<LayoutProfile> {
        self.store.load();
        let profile = self.resolve(selector)?.clone();
        self.store.remove(profile.id)?;
        if self.active == Some(profile.id) {
            self.active = None;
        }
        Ok(profile)
    }

    /// Reorder using 0-based indices
    pub fn move_profiles(&mut self, from: &[usize], to: usize) -> LayoutResult<()> {
        self.store.load();
        self.store.move_profiles(from, to)
    }
}

pub fn default_profile_name(now: DateTime<Local>) -> String {
    now.format(tray::DEFAULT_NAME_FORMAT).to_string()
}

/// One-line, user-facing summary of an apply
pub fn describe_outcome(outcome: &ApplyOutcome) -> String {
    match outcome {
        ApplyOutcome::Success => "Layout applied".to_string(),
        ApplyOutcome::PartialSuccess { missing } => {
            let count = missing.len();
            let plural = if count == 1 { "" } else { "s" };
            format!(
                "Applied partially. Missing {count} display{plural}: {}",
                missing.join(", ")
            )
        }
        ApplyOutcome::Failure(text) => format!("Failed to apply layout: {text}"),
    }
}
