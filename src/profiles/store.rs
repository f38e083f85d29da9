use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::LayoutProfile;
use crate::constants::store;
use crate::error::{LayoutError, LayoutResult};

/// Published after every successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Changed,
}

/// Owns the profile collection and its JSON file.
///
/// Every mutator persists the whole collection and only updates memory once
/// the write succeeded. Assumes a single owning process: concurrent writers
/// are last-write-wins.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<LayoutProfile>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl ProfileStore {
    /// `<data dir>/DisplayLayouts/profiles.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(store::APP_DIR);
        path.push(store::FILENAME);
        path
    }

    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open the collection at `path`, creating its directory and loading it
    pub fn open(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "Failed to create profile directory");
            }
        }

        let mut store = Self {
            path,
            profiles: Vec::new(),
            subscribers: Vec::new(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profiles(&self) -> &[LayoutProfile] {
        &self.profiles
    }

    pub fn get(&self, id: Uuid) -> Option<&LayoutProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Case-insensitive name lookup, first match in collection order
    pub fn find_by_name(&self, name: &str) -> Option<&LayoutProfile> {
        let needle = name.trim().to_lowercase();
        self.profiles.iter().find(|p| p.name.trim().to_lowercase() == needle)
    }

    /// Receive a [`StoreEvent::Changed`] after each successful save
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Reload from disk. Any read or parse error leaves an empty collection.
    pub fn load(&mut self) -> &[LayoutProfile] {
        self.profiles = match read_profiles(&self.path) {
            Ok(profiles) => {
                debug!(count = profiles.len(), path = %self.path.display(), "Loaded profiles");
                profiles
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No profile file yet, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load profiles, starting empty");
                Vec::new()
            }
        };
        &self.profiles
    }

    /// Write the in-memory collection to disk and notify subscribers
    pub fn save(&mut self) -> LayoutResult<()> {
        write_profiles_atomic(&self.path, &self.profiles)?;
        self.notify();
        Ok(())
    }

    pub fn add(&mut self, name: &str, args: Vec<String>) -> LayoutResult<LayoutProfile> {
        if args.is_empty() {
            return Err(LayoutError::EmptyArgs);
        }

        let mut profile = LayoutProfile::new(name, args);
        while self.get(profile.id).is_some() {
            profile.id = Uuid::new_v4();
        }

        let mut next = self.profiles.clone();
        next.push(profile.clone());
        self.commit(next)?;
        info!(id = %profile.id, name = %profile.name, displays = profile.args.len(), "Added profile");
        Ok(profile)
    }

    /// Replace the profile with the same id. Unknown ids are ignored.
    pub fn update(&mut self, profile: LayoutProfile) -> LayoutResult<()> {
        let Some(idx) = self.index_of(profile.id) else {
            debug!(id = %profile.id, "Update for unknown profile ignored");
            return Ok(());
        };

        let mut next = self.profiles.clone();
        next[idx] = profile;
        self.commit(next)
    }

    /// Remove every profile with `id`; persists even when nothing matched
    pub fn remove(&mut self, id: Uuid) -> LayoutResult<()> {
        let next: Vec<LayoutProfile> = self.profiles.iter().filter(|p| p.id != id).cloned().collect();
        let removed = self.profiles.len() - next.len();
        self.commit(next)?;
        info!(id = %id, removed, "Removed profile");
        Ok(())
    }

    /// Rename and bump `updated_at`. Unknown ids are ignored.
    pub fn rename(&mut self, id: Uuid, new_name: &str) -> LayoutResult<()> {
        let Some(idx) = self.index_of(id) else {
            debug!(id = %id, "Rename for unknown profile ignored");
            return Ok(());
        };

        let mut next = self.profiles.clone();
        next[idx].name = new_name.to_string();
        next[idx].updated_at = chrono::Utc::now();
        self.commit(next)?;
        info!(id = %id, name = %new_name, "Renamed profile");
        Ok(())
    }

    /// Move the profiles at `from` so they sit before the profile originally
    /// at `to`. Timestamps are not touched.
    pub fn move_profiles(&mut self, from: &[usize], to: usize) -> LayoutResult<()> {
        let mut next = self.profiles.clone();
        move_indices(&mut next, from, to);
        self.commit(next)
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }

    /// Swap in `next` and save it; the previous collection comes back if the write fails
    fn commit(&mut self, next: Vec<LayoutProfile>) -> LayoutResult<()> {
        let previous = std::mem::replace(&mut self.profiles, next);
        if let Err(e) = self.save() {
            self.profiles = previous;
            return Err(e);
        }
        Ok(())
    }

    fn notify(&mut self) {
        self.subscribers.retain(|tx| tx.send(StoreEvent::Changed).is_ok());
    }
}

fn read_profiles(path: &Path) -> std::io::Result<Vec<LayoutProfile>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write to a sibling temp file, fsync, then rename over `path`
fn write_profiles_atomic(path: &Path, profiles: &[LayoutProfile]) -> LayoutResult<()> {
    let json = serde_json::to_string_pretty(profiles).map_err(|e| LayoutError::persistence(path, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| LayoutError::persistence(path, e))?;
    }

    let temp_path = path.with_extension(store::TEMP_EXTENSION);
    let written = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        warn!(path = %path.display(), error = %e, "Failed to save profiles");
        return Err(LayoutError::persistence(path, e));
    }

    info!(count = profiles.len(), path = %path.display(), "Saved profiles");
    Ok(())
}

/// List "move from offsets to offset": the selected items keep their
/// relative order and land before the item originally at `to`.
fn move_indices<T>(items: &mut Vec<T>, from: &[usize], to: usize) {
    let len = items.len();
    let mut selected: Vec<usize> = from.iter().copied().filter(|&i| i < len).collect();
    selected.sort_unstable();
    selected.dedup();
    if selected.is_empty() {
        return;
    }

    let to = to.min(len);
    let shift = selected.iter().filter(|&&i| i < to).count();

    let mut moved: Vec<T> = selected.iter().rev().map(|&i| items.remove(i)).collect();
    moved.reverse();

    let at = to - shift;
    items.splice(at..at, moved);
}
