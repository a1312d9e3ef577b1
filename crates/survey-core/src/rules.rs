//! Declarative tables: semantic-field vocabularies, category reconciliation
//! rules and the fixed row/column orderings handed to the renderer.
//!
//! The canonical category set is a product decision; the defaults below
//! reproduce the rule set the published charts were built with.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

// ── Semantic fields ───────────────────────────────────────────────────────────

/// How the positive vocabulary of a [`SemanticField`] must be covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one positive value appears among the column's distinct values.
    Any,
    /// Every positive value appears among the column's distinct values.
    All,
}

/// A logical survey question recognised by the answers it admits rather than
/// by its column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticField {
    /// Name used in logs and diagnostics, e.g. `"OperatingSystem"`.
    pub name: String,
    /// Whole-cell values that identify the field.
    pub positive: Vec<String>,
    /// Whole-cell values that rule a column out (e.g. mobile platforms).
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default = "default_match_mode")]
    pub mode: MatchMode,
}

fn default_match_mode() -> MatchMode {
    MatchMode::Any
}

impl SemanticField {
    pub fn new(name: &str, positive: &[&str], negative: &[&str], mode: MatchMode) -> Self {
        Self {
            name: name.to_string(),
            positive: positive.iter().map(|s| s.to_string()).collect(),
            negative: negative.iter().map(|s| s.to_string()).collect(),
            mode,
        }
    }

    /// The desktop operating-system question.
    pub fn operating_system() -> Self {
        Self::new(
            "OperatingSystem",
            &["Windows", "macOS", "Linux", "Ubuntu"],
            &["iOS", "Unix"],
            MatchMode::Any,
        )
    }
}

// ── Reconciliation rules ──────────────────────────────────────────────────────

/// Merge every alias column into `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub canonical: String,
    pub aliases: Vec<String>,
}

/// A derived column equal to the sum of declared canonical columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeRule {
    pub name: String,
    pub constituents: Vec<String>,
}

/// A derived column equal to the sum of every category column except the
/// excluded ones and the derived columns themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalRule {
    pub name: String,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// The full rule table applied by the category reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconciliationRules {
    /// Raw labels removed outright (export artifacts, not answers).
    #[serde(default)]
    pub drop: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<AliasRule>,
    #[serde(default)]
    pub total: Option<TotalRule>,
    #[serde(default)]
    pub cumulative: Vec<CumulativeRule>,
}

/// Column holding the per-year response rate in the OS table.
pub const RESPONSE_RATE_COLUMN: &str = "Percent";
pub const OS_TOTAL: &str = "Total";
pub const CUMULATIVE_WINDOWS: &str = "cumulWindows";
pub const CUMULATIVE_LINUX: &str = "cumulLinux";

pub const WINDOWS_VERSIONS: &[&str] = &[
    "Windows",
    "Windows 10",
    "Windows 8",
    "Windows 7",
    "Windows XP",
    "Windows Vista",
];

pub const LINUX_DISTRIBUTIONS: &[&str] = &[
    "Windows Subsystem for Linux (WSL)",
    "Linux-based",
    "Other Linux",
    "Ubuntu",
    "Fedora",
    "Mint",
    "Debian",
    "Linux",
];

/// OS categories plotted as a share of all answers.
pub const OS_HEADLINE_COLUMNS: &[&str] = &["macOS", CUMULATIVE_WINDOWS, CUMULATIVE_LINUX, "BSD", "Other"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl ReconciliationRules {
    /// The operating-system rule set.
    pub fn operating_systems() -> Self {
        Self {
            drop: strings(&["Response"]),
            aliases: vec![
                AliasRule {
                    canonical: "BSD".to_string(),
                    aliases: strings(&["BSD/Unix"]),
                },
                AliasRule {
                    canonical: "Other".to_string(),
                    aliases: strings(&["Other (please specify):"]),
                },
                AliasRule {
                    canonical: "macOS".to_string(),
                    aliases: strings(&["MacOS", "Mac OS X"]),
                },
            ],
            total: Some(TotalRule {
                name: OS_TOTAL.to_string(),
                exclude: strings(&[RESPONSE_RATE_COLUMN]),
            }),
            cumulative: vec![
                CumulativeRule {
                    name: CUMULATIVE_WINDOWS.to_string(),
                    constituents: strings(WINDOWS_VERSIONS),
                },
                CumulativeRule {
                    name: CUMULATIVE_LINUX.to_string(),
                    constituents: strings(LINUX_DISTRIBUTIONS),
                },
            ],
        }
    }

    /// Load a rule table from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SurveyError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: Self = serde_json::from_str(&content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject tables whose reconciliation would not be idempotent.
    ///
    /// An alias must not be the canonical name (or another alias) of a
    /// different rule, and a derived column must not share its name with a
    /// category it could be summed from.
    pub fn validate(&self) -> Result<()> {
        let canonical: HashSet<&str> = self.aliases.iter().map(|a| a.canonical.as_str()).collect();
        let mut seen_aliases: HashSet<&str> = HashSet::new();
        for rule in &self.aliases {
            for alias in rule.aliases.iter().filter(|a| **a != rule.canonical) {
                if canonical.contains(alias.as_str()) {
                    return Err(SurveyError::Config(format!(
                        "alias '{}' of '{}' is itself a canonical category",
                        alias, rule.canonical
                    )));
                }
                if !seen_aliases.insert(alias.as_str()) {
                    return Err(SurveyError::Config(format!(
                        "alias '{}' maps to more than one canonical category",
                        alias
                    )));
                }
            }
        }

        let constituents: HashSet<&str> = self
            .cumulative
            .iter()
            .flat_map(|c| c.constituents.iter().map(String::as_str))
            .collect();
        if let Some(alias) = constituents.iter().find(|c| seen_aliases.contains(**c)) {
            return Err(SurveyError::Config(format!(
                "cumulative constituent '{}' is an alias, not a canonical category",
                alias
            )));
        }

        let mut derived: HashSet<&str> = HashSet::new();
        for name in self.derived_columns() {
            if canonical.contains(name) || seen_aliases.contains(name) || constituents.contains(name)
            {
                return Err(SurveyError::Config(format!(
                    "derived column '{}' collides with a category it would be summed from",
                    name
                )));
            }
            if !derived.insert(name) {
                return Err(SurveyError::Config(format!(
                    "derived column '{}' is declared twice",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Names of the derived (total and cumulative) columns.
    pub fn derived_columns(&self) -> Vec<&str> {
        self.total
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.cumulative.iter().map(|c| c.name.as_str()))
            .collect()
    }
}

// ── Cohort cross-tabulation ───────────────────────────────────────────────────

/// Sentinel label for a record with no answer on an axis.
pub const NO_RESPONSE: &str = "NotRespond";

/// The instrument's explicit decline option on the age question.
pub const PREFER_NOT_TO_SAY: &str = "Prefer not to say";

pub const AGE_FIELD: &str = "Age";
pub const LANGUAGE_FIELD: &str = "LanguageHaveWorkedWith";

/// Age brackets in display order.
pub const AGE_BRACKETS: &[&str] = &[
    "Under 18 years old",
    "18-24 years old",
    "25-34 years old",
    "35-44 years old",
    "45-54 years old",
    "55-64 years old",
    "65 years or older",
];

/// Languages in display order.
pub const LANGUAGE_COLUMNS: &[&str] = &[
    "Swift", "Solidity", "TypeScript", "Elixir", "Julia", "Dart", "Crystal", "Kotlin", "Go",
    "Groovy", "Clojure", "PowerShell", "Rust", "Scala", "C#", "F#", "HTML/CSS", "OCaml", "Java",
    "Delphi", "JavaScript", "Ruby", "R", "PHP", "Lua", "VBA", "Python", "Haskell", "Bash/Shell",
    "Perl", "Erlang", "MATLAB", "C++", "Objective-C", "SAS", "C", "SQL", "APL", "LISP", "COBOL",
    "Fortran", "Assembly",
];

// ── Compensation / experience ─────────────────────────────────────────────────

pub const COUNTRY_FIELD: &str = "Country";
pub const COMPENSATION_FIELD: &str = "ConvertedCompYearly";
pub const YEARS_CODE_FIELD: &str = "YearsCode";

/// Countries are kept only above this mean compensation...
pub const COUNTRY_MIN_MEAN_COMPENSATION: f64 = 200_000.0;
/// ...and with more than this many data points.
pub const COUNTRY_MIN_RESPONDENTS: usize = 10;

/// Columns that must all be answered for a record to enter the
/// experience-vs-compensation report.
pub const EXPERIENCE_REQUIRED_FIELDS: &[&str] = &[
    "YearsCode",
    "YearsCodePro",
    "WorkExp",
    "ConvertedCompYearly",
    "EdLevel",
    "LearnCode",
    "OrgSize",
    "OpSysProfessional use",
    "Gender",
    "Trans",
    "Sexuality",
];

/// Text answers on the years-of-coding question and their numeric stand-ins.
pub const YEARS_CODE_SUBSTITUTIONS: &[(&str, f64)] =
    &[("Less than 1 year", 1.0), ("More than 50 years", 51.0)];

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_operating_system_field_vocabulary() {
        let field = SemanticField::operating_system();
        assert_eq!(field.mode, MatchMode::Any);
        assert!(field.positive.contains(&"Ubuntu".to_string()));
        assert!(field.negative.contains(&"iOS".to_string()));
    }

    #[test]
    fn test_os_rules_derived_columns() {
        let rules = ReconciliationRules::operating_systems();
        assert_eq!(
            rules.derived_columns(),
            vec![OS_TOTAL, CUMULATIVE_WINDOWS, CUMULATIVE_LINUX]
        );
    }

    #[test]
    fn test_os_rules_cumulative_constituents_are_canonical() {
        let rules = ReconciliationRules::operating_systems();
        let aliases: Vec<&String> = rules.aliases.iter().flat_map(|a| &a.aliases).collect();
        for rule in &rules.cumulative {
            for constituent in &rule.constituents {
                assert!(
                    !aliases.contains(&constituent),
                    "{constituent} is an alias, not a canonical category"
                );
            }
        }
    }

    #[test]
    fn test_rules_json_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("rules.json");
        let rules = ReconciliationRules::operating_systems();
        std::fs::write(&path, serde_json::to_string_pretty(&rules).unwrap()).unwrap();

        let loaded = ReconciliationRules::from_json_file(&path).expect("load");
        assert_eq!(loaded, rules);
    }

    #[test]
    fn test_rules_json_defaults_optional_sections() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"aliases": [{"canonical": "macOS", "aliases": ["MacOS"]}]}"#,
        )
        .unwrap();

        let loaded = ReconciliationRules::from_json_file(&path).expect("load");
        assert!(loaded.drop.is_empty());
        assert!(loaded.total.is_none());
        assert_eq!(loaded.aliases.len(), 1);
    }

    #[test]
    fn test_rules_from_missing_file_is_file_read_error() {
        let err = ReconciliationRules::from_json_file(Path::new("/nonexistent/rules.json"))
            .unwrap_err();
        assert!(matches!(err, SurveyError::FileRead { .. }));
    }

    // ── validate ──────────────────────────────────────────────────────────────

    fn write_rules(json: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("rules.json");
        std::fs::write(&path, json).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_os_rules_validate() {
        ReconciliationRules::operating_systems()
            .validate()
            .expect("default rules are valid");
    }

    #[test]
    fn test_chained_aliases_rejected() {
        let (_tmp, path) = write_rules(
            r#"{"aliases": [
                {"canonical": "macOS", "aliases": ["MacOS"]},
                {"canonical": "MacOS", "aliases": ["Mac OS X"]}
            ]}"#,
        );
        let err = ReconciliationRules::from_json_file(&path).unwrap_err();
        assert!(matches!(err, SurveyError::Config(ref msg) if msg.contains("MacOS")));
    }

    #[test]
    fn test_alias_claimed_twice_rejected() {
        let rules = ReconciliationRules {
            aliases: vec![
                AliasRule {
                    canonical: "BSD".to_string(),
                    aliases: strings(&["BSD/Unix"]),
                },
                AliasRule {
                    canonical: "Other".to_string(),
                    aliases: strings(&["BSD/Unix"]),
                },
            ],
            ..Default::default()
        };
        assert!(matches!(rules.validate(), Err(SurveyError::Config(_))));
    }

    #[test]
    fn test_cumulative_named_after_constituent_rejected() {
        let (_tmp, path) = write_rules(
            r#"{"cumulative": [{"name": "Linux", "constituents": ["Linux", "Ubuntu"]}]}"#,
        );
        let err = ReconciliationRules::from_json_file(&path).unwrap_err();
        assert!(matches!(err, SurveyError::Config(ref msg) if msg.contains("Linux")));
    }

    #[test]
    fn test_total_named_after_canonical_rejected() {
        let rules = ReconciliationRules {
            aliases: vec![AliasRule {
                canonical: "Other".to_string(),
                aliases: strings(&["Other (please specify):"]),
            }],
            total: Some(TotalRule {
                name: "Other".to_string(),
                exclude: Vec::new(),
            }),
            ..Default::default()
        };
        assert!(matches!(rules.validate(), Err(SurveyError::Config(_))));
    }

    #[test]
    fn test_cumulative_constituent_alias_rejected() {
        let rules = ReconciliationRules {
            aliases: vec![AliasRule {
                canonical: "macOS".to_string(),
                aliases: strings(&["MacOS"]),
            }],
            cumulative: vec![CumulativeRule {
                name: "cumulApple".to_string(),
                constituents: strings(&["MacOS"]),
            }],
            ..Default::default()
        };
        assert!(matches!(rules.validate(), Err(SurveyError::Config(_))));
    }

    #[test]
    fn test_cumul_linux_built_from_distribution_list() {
        let rules = ReconciliationRules::operating_systems();
        let linux = rules
            .cumulative
            .iter()
            .find(|c| c.name == CUMULATIVE_LINUX)
            .expect("cumulLinux rule");
        assert_eq!(linux.constituents, strings(LINUX_DISTRIBUTIONS));
    }

    #[test]
    fn test_semantic_field_json_default_mode() {
        let field: SemanticField =
            serde_json::from_str(r#"{"name": "Editor", "positive": ["Vim"]}"#).unwrap();
        assert_eq!(field.mode, MatchMode::Any);
        assert!(field.negative.is_empty());
    }
}
