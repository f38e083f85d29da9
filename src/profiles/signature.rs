//! Order-insensitive comparison of layouts
//!
//! displayplacer does not list displays in a stable order, and argument
//! strings may carry stray whitespace, so layouts are compared as sets of
//! trimmed arguments.

use std::collections::BTreeSet;

use super::LayoutProfile;

pub type Signature = BTreeSet<String>;

pub fn signature<S: AsRef<str>>(args: &[S]) -> Signature {
    args.iter().map(|arg| arg.as_ref().trim().to_string()).collect()
}

/// First profile (in collection order) matching the live arguments
pub fn find_active<'a>(profiles: &'a [LayoutProfile], live_args: &[String]) -> Option<&'a LayoutProfile> {
    let live = signature(live_args);
    profiles.iter().find(|profile| profile.signature() == live)
}
