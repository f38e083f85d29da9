//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// External display configuration tool
pub mod tool {
    /// Subcommand that prints the current configuration
    pub const LIST_COMMAND: &str = "list";

    /// Prefix of the output line that reproduces the current layout
    pub const COMMAND_LINE_PREFIX: &str = "displayplacer ";

    /// Bundle-relative search locations, resolved against the running executable's directory.
    /// Searched in order; the first existing file wins.
    pub const BUNDLE_LOCATIONS: &[&str] = &[
        "../Resources/Tools/displayplacer",
        "../Resources/displayplacer",
        "tools/displayplacer",
        "displayplacer",
    ];

    /// Failure text used when the tool exits non-zero without printing anything
    pub const GENERIC_FAILURE: &str = "displayplacer failed";

    /// Failure text used when apply cannot find the tool
    pub const NOT_FOUND_FAILURE: &str = "displayplacer tool not found";
}

/// Profile storage locations
pub mod store {
    /// Subdirectory of the per-user data dir holding the profile collection
    pub const APP_DIR: &str = "DisplayLayouts";

    /// Profile collection file name
    pub const FILENAME: &str = "profiles.json";

    /// Extension appended to the profile file while an atomic write is in progress
    pub const TEMP_EXTENSION: &str = "json.tmp";
}

/// Agent settings locations and defaults
pub mod config {
    /// Subdirectory of the per-user config dir
    pub const APP_DIR: &str = "display-layouts";

    /// Settings file name
    pub const FILENAME: &str = "settings.json";

    /// Default interval between background refreshes of the active profile
    pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5;

    pub const MIN_REFRESH_INTERVAL_SECS: u64 = 1;
    pub const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;
}

/// Environment variable names
pub mod env {
    /// Log level for the tracing subscriber
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Explicit path to the display placer executable
    pub const TOOL_PATH: &str = "DISPLAY_LAYOUTS_TOOL";

    /// Explicit path to the profile collection file
    pub const PROFILES_PATH: &str = "DISPLAY_LAYOUTS_PROFILES";

    /// Refresh interval override in seconds
    pub const REFRESH_SECS: &str = "DISPLAY_LAYOUTS_REFRESH_SECS";
}

/// Tray presentation
pub mod tray {
    pub const ID: &str = "display-layouts";
    pub const TITLE: &str = "Display Layouts";
    pub const ICON_NAME: &str = "video-display";

    /// strftime pattern for the default name of a freshly saved layout
    pub const DEFAULT_NAME_FORMAT: &str = "Layout %Y-%m-%d %H:%M";
}
