use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Survey years covered by the OS-adoption report when none are given or
/// discovered.
pub const DEFAULT_FIRST_YEAR: u16 = 2011;
pub const DEFAULT_LAST_YEAR: u16 = 2022;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Normalise multi-year developer-survey exports into comparable tables
#[derive(Parser, Debug, Clone)]
#[command(
    name = "devsurvey",
    about = "Normalise multi-year developer-survey exports into comparable tables",
    version
)]
pub struct Settings {
    /// Report to run
    #[arg(long, default_value = "os-adoption", value_parser = [
        "os-adoption",
        "languages-by-age",
        "compensation-by-country",
        "experience-vs-compensation",
    ])]
    pub report: String,

    /// Stage to run: build and export the table, render an exported table, or both
    #[arg(long, default_value = "all", value_parser = ["collect", "render", "all"])]
    pub stage: String,

    /// Directory holding survey_results_<year>.csv files
    #[arg(long, env = "DEVSURVEY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving the exported tables
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Survey years to include in multi-year reports (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub years: Vec<u16>,

    /// Survey year used by single-year reports (defaults to the newest year)
    #[arg(long)]
    pub latest_year: Option<u16>,

    /// JSON file overriding the OS reconciliation rules
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.devsurvey/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_year: Option<u16>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".devsurvey").join("last_used.json")
    }

    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Takes the arguments and config path explicitly so tests can redirect
    /// both to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_flags(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; clap stores arg ids under the field name.
        if !is_arg_explicitly_set(&matches, "data_dir") && settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "output_dir") && settings.output_dir.is_none() {
            settings.output_dir = last.output_dir;
        }
        if !is_arg_explicitly_set(&matches, "years") && settings.years.is_empty() {
            if let Some(years) = last.years {
                settings.years = years;
            }
        }
        if !is_arg_explicitly_set(&matches, "latest_year") && settings.latest_year.is_none() {
            settings.latest_year = last.latest_year;
        }

        settings = Self::resolve_flags(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Apply the `--debug` flag.
    fn resolve_flags(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Years for multi-year reports: the explicit list, else `discovered`,
    /// else the default range. Always sorted and deduplicated.
    pub fn effective_years(&self, discovered: &[u16]) -> Vec<u16> {
        let mut years = if !self.years.is_empty() {
            self.years.clone()
        } else if !discovered.is_empty() {
            discovered.to_vec()
        } else {
            (DEFAULT_FIRST_YEAR..=DEFAULT_LAST_YEAR).collect()
        };
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Year for single-year reports: `--latest-year`, else the newest year.
    pub fn effective_latest_year(&self, discovered: &[u16]) -> u16 {
        self.latest_year
            .or_else(|| self.effective_years(discovered).last().copied())
            .unwrap_or(DEFAULT_LAST_YEAR)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            output_dir: s.output_dir.clone(),
            years: if s.years.is_empty() {
                None
            } else {
                Some(s.years.clone())
            },
            latest_year: s.latest_year,
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
