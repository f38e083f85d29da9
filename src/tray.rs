//! System tray agent (StatusNotifierItem over D-Bus via ksni)
//!
//! The tray owns the controller. Menu callbacks run on the ksni service task
//! and block while displayplacer runs, which is fine for a single-user menu.

use anyhow::{Context, Result};
use ksni::TrayMethods;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::tray;
use crate::controller::{LayoutController, describe_outcome};
use crate::placer::{ApplyOutcome, LayoutTool};
use crate::profiles::StoreEvent;

/// How often the agent loop checks for quit requests and store changes
const POLL_INTERVAL_MS: u64 = 250;

/// One row of the "Apply Layout" submenu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: Uuid,
    pub label: String,
    pub active: bool,
}

pub struct LayoutTray<T: LayoutTool> {
    controller: LayoutController<T>,
    quit_requested: bool,
    /// Last user-facing result, shown in the tooltip
    status: Option<String>,
}

impl<T: LayoutTool> LayoutTray<T> {
    pub fn new(controller: LayoutController<T>) -> Self {
        Self {
            controller,
            quit_requested: false,
            status: None,
        }
    }

    pub fn refresh(&mut self) {
        let active = self.controller.refresh();
        debug!(active = ?active, profiles = self.controller.store().profiles().len(), "Tray refreshed");
    }

    /// Profiles in menu order with the active one flagged
    pub fn entries(&self) -> Vec<MenuEntry> {
        let active = self.controller.active_id();
        self.controller
            .store()
            .profiles()
            .iter()
            .map(|p| MenuEntry {
                id: p.id,
                label: p.name.clone(),
                active: Some(p.id) == active,
            })
            .collect()
    }

    pub fn apply(&mut self, id: Uuid) {
        match self.controller.apply_profile(id) {
            Ok(outcome) => {
                let summary = describe_outcome(&outcome);
                match &outcome {
                    ApplyOutcome::Success => info!(id = %id, "{summary}"),
                    ApplyOutcome::PartialSuccess { missing } => {
                        warn!(id = %id, missing = ?missing, "{summary}")
                    }
                    ApplyOutcome::Failure(_) => error!(id = %id, "{summary}"),
                }
                self.status = Some(summary);
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to apply layout");
                self.status = Some(format!("Failed to apply layout: {e}"));
            }
        }
    }

    pub fn save_current(&mut self) {
        match self.controller.save_current(None) {
            Ok(profile) => {
                info!(id = %profile.id, name = %profile.name, "Saved current layout from tray");
                self.status = Some(format!("Saved '{}'", profile.name));
            }
            Err(e) => {
                error!(error = %e, "Failed to save current layout");
                self.status = Some(format!("Failed to save layout: {e}"));
            }
        }
    }

    fn tooltip_text(&self) -> String {
        let active = self
            .controller
            .active_profile()
            .map(|p| format!("Active: {}", p.name))
            .unwrap_or_else(|| "No saved layout is active".to_string());
        match &self.status {
            Some(status) => format!("{active}\n{status}"),
            None => active,
        }
    }
}

impl<T: LayoutTool + Send + 'static> ksni::Tray for LayoutTray<T> {
    fn id(&self) -> String {
        tray::ID.into()
    }

    fn title(&self) -> String {
        match self.controller.active_profile() {
            Some(profile) => format!("{} ({})", tray::TITLE, profile.name),
            None => tray::TITLE.into(),
        }
    }

    fn icon_name(&self) -> String {
        tray::ICON_NAME.into()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            title: tray::TITLE.into(),
            description: self.tooltip_text(),
            ..Default::default()
        }
    }

    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        use ksni::menu::*;

        let entries = self.entries();
        let submenu: Vec<MenuItem<Self>> = if entries.is_empty() {
            vec![
                StandardItem {
                    label: "No layouts saved".into(),
                    enabled: false,
                    ..Default::default()
                }
                .into(),
            ]
        } else {
            entries
                .into_iter()
                .map(|entry| {
                    let id = entry.id;
                    CheckmarkItem {
                        label: entry.label,
                        checked: entry.active,
                        activate: Box::new(move |this: &mut Self| this.apply(id)),
                        ..Default::default()
                    }
                    .into()
                })
                .collect()
        };

        vec![
            SubMenu {
                label: "Apply Layout".into(),
                submenu,
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            StandardItem {
                label: "Save Current Layout".into(),
                icon_name: "document-save".into(),
                activate: Box::new(|this: &mut Self| this.save_current()),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Reload".into(),
                icon_name: "view-refresh".into(),
                activate: Box::new(|this: &mut Self| this.refresh()),
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            StandardItem {
                label: "Quit".into(),
                icon_name: "application-exit".into(),
                activate: Box::new(|this: &mut Self| {
                    info!("Quit requested from tray menu");
                    this.quit_requested = true;
                }),
                ..Default::default()
            }
            .into(),
        ]
    }
}

/// Set on SIGINT/SIGTERM
fn register_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&flag)).context("Failed to register SIGINT handler")?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&flag)).context("Failed to register SIGTERM handler")?;
    }
    Ok(flag)
}

/// True when at least one change event is pending; drains the channel
fn drain_changes(events: &Receiver<StoreEvent>) -> bool {
    let mut changed = false;
    loop {
        match events.try_recv() {
            Ok(StoreEvent::Changed) => changed = true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return changed,
        }
    }
}

/// Run the tray until Quit or a termination signal
pub fn run_agent<T: LayoutTool + Send + 'static>(
    mut controller: LayoutController<T>,
    refresh_interval: Duration,
) -> Result<()> {
    let shutdown = register_shutdown_flag()?;
    let events = controller.store_mut().subscribe();

    let mut layout_tray = LayoutTray::new(controller);
    layout_tray.refresh();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tray runtime")?;

    runtime.block_on(async move {
        let handle = layout_tray
            .spawn()
            .await
            .context("Failed to register tray icon (is a StatusNotifier host running?)")?;
        info!(refresh_secs = refresh_interval.as_secs(), "Tray agent running");

        let mut last_refresh = Instant::now();
        let mut ticker = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));

        loop {
            ticker.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Termination signal received");
                break;
            }

            let changed = drain_changes(&events);
            let due = last_refresh.elapsed() >= refresh_interval;
            let quit = handle
                .update(move |t: &mut LayoutTray<T>| {
                    if changed || due {
                        t.refresh();
                    }
                    t.quit_requested
                })
                .await;

            if changed || due {
                last_refresh = Instant::now();
            }

            match quit {
                Some(true) => break,
                Some(false) => {}
                None => {
                    warn!("Tray service stopped");
                    break;
                }
            }
        }

        handle.shutdown().await;
        info!("Tray agent exiting");
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{FakeTool, controller_with};
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn test_entries_flag_active_profile() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(&dir, FakeTool::with_live(&["id:A"]));
        let desk = controller.save_current(Some("Desk")).unwrap();
        controller.store_mut().add("Laptop", vec!["id:B".to_string()]).unwrap();

        let mut layout_tray = LayoutTray::new(controller);
        layout_tray.refresh();
        let entries = layout_tray.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], MenuEntry { id: desk.id, label: "Desk".into(), active: true });
        assert!(!entries[1].active);
    }

    #[test]
    fn test_apply_updates_active_and_status() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(&dir, FakeTool::with_live(&["id:A"]));
        controller.store_mut().add("Laptop", vec!["id:B".to_string()]).unwrap();
        let laptop_id = controller.store().profiles()[0].id;

        let mut layout_tray = LayoutTray::new(controller);
        layout_tray.refresh();
        assert!(layout_tray.entries().iter().all(|e| !e.active));

        layout_tray.apply(laptop_id);
        assert!(layout_tray.entries()[0].active);
        assert_eq!(layout_tray.tooltip_text(), "Active: Laptop\nLayout applied");
    }

    #[test]
    fn test_save_current_failure_sets_status() {
        let dir = TempDir::new().unwrap();
        let mut layout_tray = LayoutTray::new(controller_with(&dir, FakeTool::unavailable()));
        layout_tray.save_current();
        assert!(layout_tray.entries().is_empty());
        assert_eq!(
            layout_tray.tooltip_text(),
            "No saved layout is active\nFailed to save layout: displayplacer tool not found"
        );
    }

    #[test]
    fn test_drain_changes() {
        let (tx, rx) = mpsc::channel();
        assert!(!drain_changes(&rx));
        tx.send(StoreEvent::Changed).unwrap();
        tx.send(StoreEvent::Changed).unwrap();
        assert!(drain_changes(&rx));
        assert!(!drain_changes(&rx));
        drop(tx);
        assert!(!drain_changes(&rx));
    }
}
