//! Configuration management for display-layouts
//!
//! - **settings**: agent behaviour (tool location, profile file, refresh cadence, log level)
//!
//! Layout profiles themselves are data, not configuration, and live in
//! [`crate::profiles`].

pub mod settings;

pub use settings::AgentSettings;
