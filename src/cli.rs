//! Command-line interface
//!
//! Every store and placer operation is reachable from here so layouts can be
//! scripted without the tray.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::controller::{LayoutController, describe_outcome};
use crate::placer::{ApplyOutcome, DisplayPlacer, LayoutTool};

#[derive(Parser, Debug)]
#[command(name = "display-layouts", version, about = "Save and reapply multi-monitor layouts")]
pub struct Cli {
    /// Profile collection file (overrides settings and DISPLAY_LAYOUTS_PROFILES)
    #[arg(long, global = true, value_name = "PATH")]
    pub profiles: Option<PathBuf>,

    /// displayplacer executable (overrides settings and DISPLAY_LAYOUTS_TOOL)
    #[arg(long, global = true, value_name = "PATH")]
    pub tool: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Run the tray agent (default)
    Agent,
    /// List saved layouts; `*` marks the one matching the live layout
    List,
    /// Print the live per-display arguments
    Current,
    /// Save the live layout as a new profile
    Save {
        /// Profile name; defaults to a timestamp
        name: Option<String>,
    },
    /// Apply a saved layout
    Apply {
        /// Profile id, 1-based position or name
        profile: String,
    },
    /// Overwrite a saved layout with the live layout
    Update { profile: String },
    /// Rename a saved layout
    Rename { profile: String, name: String },
    /// Delete a saved layout
    Remove { profile: String },
    /// Reorder saved layouts
    Move {
        /// 1-based positions to move
        #[arg(required = true)]
        from: Vec<usize>,
        /// 1-based position to insert before (one past the end appends)
        #[arg(long)]
        to: usize,
    },
    /// Print the resolved displayplacer path
    Locate,
}

/// Whether a command achieved what was asked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    Failed,
}

/// Run a non-agent command against `controller`, writing user output to `out`
pub fn run<T: LayoutTool>(
    command: &CliCommand,
    controller: &mut LayoutController<T>,
    out: &mut impl Write,
) -> Result<CommandStatus> {
    match command {
        CliCommand::Agent => anyhow::bail!("the agent is started by main, not as a CLI command"),
        CliCommand::Locate => anyhow::bail!("locate needs the concrete displayplacer adapter"),
        CliCommand::List => {
            let active = controller.refresh();
            let profiles = controller.store().profiles();
            if profiles.is_empty() {
                writeln!(out, "No layouts saved")?;
            }
            for (idx, profile) in profiles.iter().enumerate() {
                let marker = if Some(profile.id) == active { '*' } else { ' ' };
                writeln!(
                    out,
                    "{marker} {:>2}. {}  ({} display{}, {})",
                    idx + 1,
                    profile.name,
                    profile.args.len(),
                    if profile.args.len() == 1 { "" } else { "s" },
                    profile.id
                )?;
            }
        }
        CliCommand::Current => {
            let args = controller
                .tool()
                .capture_current_args()
                .context("Failed to read current layout")?;
            for arg in args {
                writeln!(out, "{arg}")?;
            }
        }
        CliCommand::Save { name } => {
            let profile = controller
                .save_current(name.as_deref())
                .context("Failed to save layout")?;
            writeln!(out, "Saved '{}' ({})", profile.name, profile.id)?;
        }
        CliCommand::Apply { profile } => {
            controller.store_mut().load();
            let id = controller.resolve(profile)?.id;
            let outcome = controller.apply_profile(id)?;
            writeln!(out, "{}", describe_outcome(&outcome))?;
            if let ApplyOutcome::Failure(_) = outcome {
                return Ok(CommandStatus::Failed);
            }
        }
        CliCommand::Update { profile } => {
            let updated = controller.recapture(profile).context("Failed to update layout")?;
            writeln!(
                out,
                "Updated '{}' ({} display{})",
                updated.name,
                updated.args.len(),
                if updated.args.len() == 1 { "" } else { "s" }
            )?;
        }
        CliCommand::Rename { profile, name } => {
            let renamed = controller.rename(profile, name).context("Failed to rename layout")?;
            writeln!(out, "Renamed to '{}'", renamed.name)?;
        }
        CliCommand::Remove { profile } => {
            let removed = controller.remove(profile).context("Failed to remove layout")?;
            writeln!(out, "Removed '{}'", removed.name)?;
        }
        CliCommand::Move { from, to } => {
            if from.contains(&0) || *to == 0 {
                anyhow::bail!("positions are 1-based");
            }
            let from: Vec<usize> = from.iter().map(|n| n - 1).collect();
            controller
                .move_profiles(&from, to - 1)
                .context("Failed to reorder layouts")?;
            for (idx, profile) in controller.store().profiles().iter().enumerate() {
                writeln!(out, "{:>2}. {}", idx + 1, profile.name)?;
            }
        }
    }
    Ok(CommandStatus::Ok)
}

pub fn run_locate(placer: &DisplayPlacer, out: &mut impl Write) -> Result<CommandStatus> {
    let path = placer.locate()?;
    writeln!(out, "{}", path.display())?;
    Ok(CommandStatus::Ok)
}
