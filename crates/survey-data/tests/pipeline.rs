//! End-to-end collection runs over mock survey exports.

use std::fs;
use std::path::Path;

use survey_data::analysis::{collect, read_report, write_report, Report, ReportRequest};
use survey_data::core::rules::{
    ReconciliationRules, CUMULATIVE_LINUX, CUMULATIVE_WINDOWS, OS_TOTAL, RESPONSE_RATE_COLUMN,
};
use survey_data::loader::find_survey_files;
use survey_data::reconciler::CategoryReconciler;
use tempfile::TempDir;

fn write_survey(dir: &Path, year: u16, content: &[u8]) {
    fs::write(dir.join(format!("survey_results_{year}.csv")), content).unwrap();
}

fn two_year_fixture() -> TempDir {
    let tmp = TempDir::new().expect("tempdir");
    // Year A: the OS question is called "OS" and one respondent skipped it.
    write_survey(
        tmp.path(),
        2020,
        b",Age,OS\n0,18-24,Windows;Linux\n1,25-34,macOS\n2,35-44,\n",
    );
    // Year B: renamed to "Platform".
    write_survey(
        tmp.path(),
        2021,
        b"Platform,Country\nWindows,Utopia\nWindows;macOS,Lowland\n",
    );
    tmp
}

fn os_request(data_dir: &Path, years: Vec<u16>) -> ReportRequest {
    ReportRequest {
        data_dir: data_dir.to_path_buf(),
        latest_year: *years.iter().max().unwrap(),
        years,
        rules: ReconciliationRules::operating_systems(),
    }
}

// ── OS adoption ───────────────────────────────────────────────────────────────

#[test]
fn test_two_year_scenario_counts() {
    let tmp = two_year_fixture();
    let output = collect(Report::OsAdoption, &os_request(tmp.path(), vec![2020, 2021])).unwrap();
    let table = &output.table;

    assert_eq!(table.get("2020", "Windows"), Some(1.0));
    assert_eq!(table.get("2021", "Windows"), Some(2.0));
    assert_eq!(table.get("2020", "macOS"), Some(1.0));
    assert_eq!(table.get("2021", "macOS"), Some(1.0));
    assert_eq!(table.get("2020", "Linux"), Some(1.0));
    assert_eq!(table.get("2021", "Linux"), Some(0.0));

    assert_eq!(table.get("2020", RESPONSE_RATE_COLUMN), Some(1.0 - 1.0 / 3.0));
    assert_eq!(table.get("2021", RESPONSE_RATE_COLUMN), Some(1.0));
}

#[test]
fn test_two_year_scenario_derived_columns() {
    let tmp = two_year_fixture();
    let output = collect(Report::OsAdoption, &os_request(tmp.path(), vec![2020, 2021])).unwrap();
    let table = &output.table;

    assert_eq!(table.get("2020", OS_TOTAL), Some(3.0));
    assert_eq!(table.get("2021", OS_TOTAL), Some(3.0));
    assert_eq!(table.get("2021", CUMULATIVE_WINDOWS), Some(2.0));
    assert_eq!(table.get("2020", CUMULATIVE_LINUX), Some(1.0));
    assert!(table.missing_cells().is_empty());
}

#[test]
fn test_missing_year_degrades_without_failing() {
    let tmp = two_year_fixture();
    let output = collect(
        Report::OsAdoption,
        &os_request(tmp.path(), vec![2019, 2020, 2021]),
    )
    .unwrap();

    assert_eq!(output.metadata.years_loaded, vec![2020, 2021]);
    assert_eq!(output.metadata.years_failed.len(), 1);
    assert_eq!(output.metadata.years_failed[0].year, 2019);
    assert_eq!(output.table.rows(), ["2020".to_string(), "2021".to_string()]);
}

#[test]
fn test_year_without_os_question_is_skipped() {
    let tmp = two_year_fixture();
    write_survey(tmp.path(), 2022, b"Age,Country\n18-24,Utopia\n");

    let output = collect(
        Report::OsAdoption,
        &os_request(tmp.path(), vec![2020, 2021, 2022]),
    )
    .unwrap();

    assert_eq!(output.metadata.years_loaded, vec![2020, 2021, 2022]);
    assert!(output.table.row_position("2022").is_none());
    assert!(output
        .metadata
        .warnings
        .iter()
        .any(|w| w.starts_with("2022")));
}

#[test]
fn test_exported_table_reloads_and_stays_reconciled() {
    let tmp = two_year_fixture();
    let out_dir = TempDir::new().expect("tempdir");
    let output = collect(Report::OsAdoption, &os_request(tmp.path(), vec![2020, 2021])).unwrap();

    let path = write_report(out_dir.path(), &output).unwrap();
    assert!(path.ends_with("OpSys.csv"));

    let reloaded = read_report(out_dir.path(), Report::OsAdoption).unwrap();
    assert_eq!(reloaded, output.table);

    let (again, _) =
        CategoryReconciler::new(ReconciliationRules::operating_systems()).reconcile(&reloaded);
    assert_eq!(again, reloaded);
}

// ── Loader quirks ─────────────────────────────────────────────────────────────

#[test]
fn test_2015_header_offset_and_latin1() {
    let tmp = TempDir::new().expect("tempdir");
    let mut content = b"Survey 2015,,\nId,Desktop Operating System,City\n1,Windows 7,Z".to_vec();
    content.push(0xFC); // 'ü' in Latin-1
    content.extend_from_slice(b"rich\n2,Mac OS X,Paris\n3,Linux,Berlin\n");
    write_survey(tmp.path(), 2015, &content);

    let output = collect(Report::OsAdoption, &os_request(tmp.path(), vec![2015])).unwrap();

    assert_eq!(output.table.get("2015", "macOS"), Some(1.0));
    assert_eq!(output.table.get("2015", CUMULATIVE_WINDOWS), Some(1.0));
    assert_eq!(output.table.get("2015", CUMULATIVE_LINUX), Some(1.0));
}

#[test]
fn test_discovery_feeds_year_list() {
    let tmp = two_year_fixture();
    fs::write(tmp.path().join("notes.csv"), "x\n").unwrap();

    let years: Vec<u16> = find_survey_files(tmp.path()).into_keys().collect();
    assert_eq!(years, vec![2020, 2021]);
}

// ── Single-year reports ───────────────────────────────────────────────────────

#[test]
fn test_languages_by_age_report() {
    let tmp = TempDir::new().expect("tempdir");
    write_survey(
        tmp.path(),
        2022,
        b"ResponseId,Age,LanguageHaveWorkedWith\n\
          1,18-24 years old,Rust;Go\n\
          2,,Rust\n\
          3,Prefer not to say,Go\n\
          4,18-24 years old,\n",
    );
    let request = os_request(tmp.path(), vec![2022]);

    let output = collect(Report::LanguagesByAge, &request).unwrap();
    let table = &output.table;

    assert_eq!(table.get("18-24 years old", "Rust"), Some(1.0));
    assert_eq!(table.get("18-24 years old", "NotRespond"), Some(1.0));
    assert_eq!(table.get("Prefer not to say", "Rust"), Some(1.0));
    assert_eq!(table.get("Prefer not to say", "Go"), Some(1.0));
    assert!(table.row_position("NotRespond").is_none());
}

#[test]
fn test_compensation_report_missing_column_is_fatal() {
    let tmp = TempDir::new().expect("tempdir");
    write_survey(tmp.path(), 2022, b"Country\nUtopia\n");
    let request = os_request(tmp.path(), vec![2022]);

    assert!(collect(Report::CompensationByCountry, &request).is_err());
}
