//! Adapter for the external displayplacer executable
//!
//! Each operation spawns a fresh subprocess and blocks until it exits.
//! There is no timeout: a hung tool hangs the caller.

mod output;

pub use output::{ApplyOutcome, classify_apply, parse_list_output};

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::tool;
use crate::error::{LayoutError, LayoutResult};

/// Something that can read and set the live display arrangement.
///
/// The controller only talks to this trait, so the text-scraping adapter
/// below can be replaced without touching callers.
pub trait LayoutTool {
    /// Per-display arguments describing the live arrangement (never empty on success)
    fn capture_current_args(&self) -> LayoutResult<Vec<String>>;

    /// Apply a saved arrangement
    fn apply(&self, args: &[String]) -> ApplyOutcome;
}

/// Raw result of one tool invocation
#[derive(Debug)]
struct ToolRun {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Locates and drives `displayplacer`
pub struct DisplayPlacer {
    /// Explicit path from settings, env or the command line; checked first
    override_path: Option<PathBuf>,
    /// Directory bundle locations are resolved against.
    /// `None` means the running executable's directory, looked up per call.
    base_dir: Option<PathBuf>,
    /// The tool is not reentrant with respect to display state
    in_flight: Mutex<()>,
}

impl DisplayPlacer {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            base_dir: None,
            in_flight: Mutex::new(()),
        }
    }

    /// Resolve bundle locations against `base_dir` instead of the executable's directory
    #[cfg(test)]
    fn with_base_dir(override_path: Option<PathBuf>, base_dir: PathBuf) -> Self {
        Self {
            override_path,
            base_dir: Some(base_dir),
            in_flight: Mutex::new(()),
        }
    }

    /// Candidate paths in search order
    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.override_path {
            candidates.push(path.clone());
        }

        let base = self.base_dir.clone().or_else(|| {
            std::env::current_exe()
                .inspect_err(|e| warn!(error = %e, "Cannot resolve current executable"))
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        });
        if let Some(base) = base {
            candidates.extend(tool::BUNDLE_LOCATIONS.iter().map(|rel| base.join(rel)));
        }
        candidates
    }

    /// Find the executable. Not cached: packaging can change between calls.
    pub fn locate(&self) -> LayoutResult<PathBuf> {
        let found = self.candidates().into_iter().find(|path| path.is_file());
        match found {
            Some(path) => {
                debug!(path = %path.display(), "Located displayplacer");
                Ok(path)
            }
            None => Err(LayoutError::ToolNotFound),
        }
    }

    fn run(&self, tool_path: &Path, args: &[String]) -> std::io::Result<ToolRun> {
        let _guard = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        debug!(tool = %tool_path.display(), argc = args.len(), "Running displayplacer");
        let output = Command::new(tool_path)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(ToolRun {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl LayoutTool for DisplayPlacer {
    fn capture_current_args(&self) -> LayoutResult<Vec<String>> {
        let tool_path = self.locate()?;
        let run = self
            .run(&tool_path, &[tool::LIST_COMMAND.to_string()])
            .map_err(|e| LayoutError::RunFailed(e.to_string()))?;

        if run.code != Some(0) {
            let diagnostic = output::run_failure_diagnostic(&run.stdout, &run.stderr);
            warn!(exit = ?run.code, diagnostic = %diagnostic, "displayplacer list failed");
            return Err(LayoutError::RunFailed(diagnostic));
        }

        let args = parse_list_output(&run.stdout)
            .inspect_err(|_| warn!(bytes = run.stdout.len(), "Unrecognized displayplacer list output"))?;
        info!(displays = args.len(), "Captured current layout");
        Ok(args)
    }

    fn apply(&self, args: &[String]) -> ApplyOutcome {
        let tool_path = match self.locate() {
            Ok(path) => path,
            Err(_) => return ApplyOutcome::Failure(tool::NOT_FOUND_FAILURE.to_string()),
        };

        let run = self.run(&tool_path, args).unwrap_or_else(|e| ToolRun {
            code: Some(1),
            stdout: String::new(),
            stderr: e.to_string(),
        });

        let combined = format!("{}\n{}", run.stdout, run.stderr);
        let outcome = classify_apply(run.code, &combined);
        match &outcome {
            ApplyOutcome::Success => info!(displays = args.len(), "Applied layout"),
            ApplyOutcome::PartialSuccess { missing } => {
                warn!(exit = ?run.code, missing = ?missing, "Applied layout with missing displays")
            }
            ApplyOutcome::Failure(text) => warn!(exit = ?run.code, output = %text, "displayplacer apply failed"),
        }
        outcome
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::MutexGuard;
    use tempfile::TempDir;

    /// Writing an executable while another test thread forks can leave the
    /// file busy at exec time, so script creation and spawning are serialized.
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn spawn_lock() -> MutexGuard<'static, ()> {
        SPAWN_LOCK.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Write an executable shell script at `dir/rel`
    fn write_script(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn placer_in(dir: &TempDir) -> DisplayPlacer {
        DisplayPlacer::with_base_dir(None, dir.path().join("bin"))
    }

    #[test]
    fn test_locate_not_found() {
        let dir = TempDir::new().unwrap();
        let placer = placer_in(&dir);
        assert!(matches!(placer.locate(), Err(LayoutError::ToolNotFound)));
        assert!(matches!(placer.capture_current_args(), Err(LayoutError::ToolNotFound)));
        assert_eq!(
            placer.apply(&["id:A".to_string()]),
            ApplyOutcome::Failure(tool::NOT_FOUND_FAILURE.to_string())
        );
    }

    #[test]
    fn test_locate_prefers_resources_tools() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        let fallback = write_script(dir.path(), "bin/displayplacer", "exit 0");
        let preferred = write_script(dir.path(), "Resources/Tools/displayplacer", "exit 0");
        let placer = placer_in(&dir);

        assert_eq!(placer.locate().unwrap(), dir.path().join("bin/../Resources/Tools/displayplacer"));
        assert!(preferred.is_file());

        // Re-evaluated per call
        std::fs::remove_file(&preferred).unwrap();
        assert_eq!(placer.locate().unwrap(), fallback);
    }

    #[test]
    fn test_locate_override_wins() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "Resources/Tools/displayplacer", "exit 0");
        let custom = write_script(dir.path(), "custom/placer", "exit 0");
        let placer = DisplayPlacer::with_base_dir(Some(custom.clone()), dir.path().join("bin"));
        assert_eq!(placer.locate().unwrap(), custom);
    }

    #[test]
    fn test_locate_missing_override_falls_back() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        let bundled = write_script(dir.path(), "bin/tools/displayplacer", "exit 0");
        let placer =
            DisplayPlacer::with_base_dir(Some(dir.path().join("nope")), dir.path().join("bin"));
        assert_eq!(placer.locate().unwrap(), bundled);
    }

    #[test]
    fn test_capture_parses_list_output() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(
            dir.path(),
            "bin/displayplacer",
            r#"[ "$1" = "list" ] || exit 3
echo 'Persistent screen id: AAAA-1111'
echo 'displayplacer "id:AAAA-1111 res:1920x1080 origin:(0,0) degree:0" "id:BBBB-2222 res:1280x800 origin:(1920,0) degree:0"'"#,
        );
        let args = placer_in(&dir).capture_current_args().unwrap();
        assert_eq!(
            args,
            vec![
                "id:AAAA-1111 res:1920x1080 origin:(0,0) degree:0".to_string(),
                "id:BBBB-2222 res:1280x800 origin:(1920,0) degree:0".to_string(),
            ]
        );
    }

    #[test]
    fn test_capture_nonzero_exit_reports_stderr() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "bin/displayplacer", "echo partial\necho 'no access' >&2\nexit 1");
        match placer_in(&dir).capture_current_args() {
            Err(LayoutError::RunFailed(text)) => assert_eq!(text, "no access"),
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_nonzero_exit_falls_back_to_stdout() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "bin/displayplacer", "echo 'bad things'\nexit 4");
        match placer_in(&dir).capture_current_args() {
            Err(LayoutError::RunFailed(text)) => assert_eq!(text, "bad things"),
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_unexpected_output_is_parse_failure() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "bin/displayplacer", "echo 'Resolution: 1920x1080'");
        assert!(matches!(
            placer_in(&dir).capture_current_args(),
            Err(LayoutError::ParseFailed)
        ));
    }

    /// A located file without execute permission fails at spawn time
    fn write_non_executable(dir: &Path) {
        let path = dir.join("bin/displayplacer");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_capture_spawn_failure_is_run_failed() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_non_executable(dir.path());
        match placer_in(&dir).capture_current_args() {
            Err(LayoutError::RunFailed(text)) => assert!(text.contains("Permission denied"), "{text}"),
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_spawn_failure_surfaces_io_error() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_non_executable(dir.path());
        match placer_in(&dir).apply(&["id:A".to_string()]) {
            ApplyOutcome::Failure(text) => assert!(text.contains("Permission denied"), "{text}"),
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_passes_args_verbatim() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("applied.txt");
        write_script(
            dir.path(),
            "bin/displayplacer",
            &format!(
                "for a in \"$@\"; do echo \"$a\" >> '{}'; done\nexit 0",
                log.display()
            ),
        );
        let args = vec![
            "id:AAAA-1111 res:1920x1080 origin:(0,0)".to_string(),
            "id:BBBB-2222 res:1280x800 origin:(1920,0)".to_string(),
        ];
        assert_eq!(placer_in(&dir).apply(&args), ApplyOutcome::Success);
        let written = std::fs::read_to_string(&log).unwrap();
        assert_eq!(written.lines().collect::<Vec<_>>(), args);
    }

    #[test]
    fn test_apply_missing_displays_on_stderr_is_partial() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(
            dir.path(),
            "bin/displayplacer",
            "echo 'Unable to find screen BBBB-2222' >&2\necho 'Unable to find screen AAAA-1111'\necho 'Unable to find screen BBBB-2222' >&2\nexit 1",
        );
        assert_eq!(
            placer_in(&dir).apply(&["id:AAAA-1111".to_string()]),
            ApplyOutcome::PartialSuccess {
                missing: vec!["AAAA-1111".to_string(), "BBBB-2222".to_string()]
            }
        );
    }

    #[test]
    fn test_apply_failure_surfaces_output() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "bin/displayplacer", "echo 'invalid mode' >&2\nexit 1");
        assert_eq!(
            placer_in(&dir).apply(&["id:A res:1x1".to_string()]),
            ApplyOutcome::Failure("invalid mode".to_string())
        );
    }

    #[test]
    fn test_apply_silent_failure_is_generic() {
        let _lock = spawn_lock();
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "bin/displayplacer", "exit 7");
        assert_eq!(
            placer_in(&dir).apply(&["id:A".to_string()]),
            ApplyOutcome::Failure(tool::GENERIC_FAILURE.to_string())
        );
    }
}
