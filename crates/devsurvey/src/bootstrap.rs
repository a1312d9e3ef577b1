use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use survey_data::loader::find_survey_files;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// `~/.devsurvey/`, falling back to `./.devsurvey/` without a home directory.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".devsurvey")
}

/// Ensure `~/.devsurvey/` and `~/.devsurvey/data/` exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(dir.join("data"))
        .with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(())
}

/// Create `dir` (and parents) if needed so exported tables can be written.
pub fn ensure_output_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("output directory {} is not writable", dir.display()))
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` accepts the CLI level names and is mapped to an
/// [`EnvFilter`] directive, falling back to `"info"`. With `log_file` set,
/// output is appended to that file instead of stderr.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    Ok(())
}

fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

// ── Data-directory discovery ───────────────────────────────────────────────────

/// Locate the directory holding the `survey_results_<year>.csv` exports.
///
/// An explicit directory is returned as-is. Otherwise the first of these
/// containing at least one export wins:
/// 1. the current directory
/// 2. `./data/`
/// 3. `~/.devsurvey/data/`
pub fn discover_data_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    let candidates = [cwd.clone(), cwd.join("data"), app_dir().join("data")];
    candidates
        .into_iter()
        .find(|dir| !find_survey_files(dir).is_empty())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_home<T>(home: &Path, f: impl FnOnce() -> T) -> T {
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", home);

        let result = f();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }
        result
    }

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive_maps_cli_names() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("trace"), "trace");
    }

    // ── ensure_directories ────────────────────────────────────────────────────

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        with_home(tmp.path(), ensure_directories).expect("ensure_directories should succeed");

        let dir = tmp.path().join(".devsurvey");
        assert!(dir.is_dir(), ".devsurvey dir must exist");
        assert!(dir.join("data").is_dir(), "data subdir must exist");
    }

    #[test]
    fn test_ensure_output_dir_creates_parents() {
        let tmp = TempDir::new().expect("tempdir");
        let out = tmp.path().join("reports").join("2022");
        ensure_output_dir(&out).expect("create");
        assert!(out.is_dir());
    }

    // ── discover_data_dir ─────────────────────────────────────────────────────

    #[test]
    fn test_discover_data_dir_explicit_wins() {
        let tmp = TempDir::new().expect("tempdir");
        assert_eq!(
            discover_data_dir(Some(tmp.path())),
            Some(tmp.path().to_path_buf())
        );
    }

    #[test]
    fn test_discover_data_dir_finds_home_data() {
        let tmp = TempDir::new().expect("tempdir");
        let data = tmp.path().join(".devsurvey").join("data");
        std::fs::create_dir_all(&data).expect("create data dir");
        std::fs::write(data.join("survey_results_2022.csv"), "A\n1\n").expect("write");

        let path = with_home(tmp.path(), || discover_data_dir(None));

        // The working directory may itself hold exports when tests run from a
        // data checkout; otherwise the home candidate is found.
        let path = path.expect("some data dir");
        assert!(!find_survey_files(&path).is_empty());
    }
}
