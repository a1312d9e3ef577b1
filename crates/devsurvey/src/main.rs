mod bootstrap;
mod render;

use anyhow::{Context, Result};
use survey_core::rules::ReconciliationRules;
use survey_core::settings::Settings;
use survey_data::analysis::{
    collect, presentation_tables, read_report, read_report_metadata, write_report, Report,
    ReportRequest,
};
use survey_data::loader::find_survey_files;

use crate::render::{CellFormat, Renderer, TextRenderer};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("devsurvey v{} starting", env!("CARGO_PKG_VERSION"));

    let report: Report = settings.report.parse()?;
    let data_dir = bootstrap::discover_data_dir(settings.data_dir.as_deref()).context(
        "no directory containing survey_results_<year>.csv found; pass --data-dir",
    )?;
    let output_dir = settings
        .output_dir
        .clone()
        .unwrap_or_else(|| data_dir.clone());

    tracing::info!(
        "Report: {}, Stage: {}, Data: {}, Output: {}",
        report,
        settings.stage,
        data_dir.display(),
        output_dir.display()
    );

    if matches!(settings.stage.as_str(), "collect" | "all") {
        let rules = match &settings.rules {
            Some(path) => ReconciliationRules::from_json_file(path)
                .with_context(|| format!("loading rules from {}", path.display()))?,
            None => ReconciliationRules::operating_systems(),
        };
        let discovered: Vec<u16> = find_survey_files(&data_dir).into_keys().collect();
        let request = ReportRequest {
            years: settings.effective_years(&discovered),
            latest_year: settings.effective_latest_year(&discovered),
            data_dir: data_dir.clone(),
            rules,
        };

        let output = collect(report, &request)
            .with_context(|| format!("collecting {} from {}", report, data_dir.display()))?;
        for failed in &output.metadata.years_failed {
            eprintln!("warning: {} survey skipped: {}", failed.year, failed.reason);
        }

        bootstrap::ensure_output_dir(&output_dir)?;
        let path = write_report(&output_dir, &output)
            .with_context(|| format!("writing {} table", report))?;
        println!("done collecting {} data ({})", report, path.display());
    }

    if matches!(settings.stage.as_str(), "render" | "all") {
        let table = read_report(&output_dir, report).with_context(|| {
            format!(
                "reading exported {} table; run with --stage collect first",
                report
            )
        })?;
        match read_report_metadata(&output_dir, report) {
            Ok(metadata) => {
                tracing::info!(
                    "Rendering {} collected at {} from years {:?}",
                    report,
                    metadata.generated_at,
                    metadata.years_loaded
                );
                for warning in &metadata.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
            Err(e) => tracing::warn!("No metadata for {}: {}", report, e),
        }

        {
            let mut renderer = TextRenderer::new(std::io::stdout().lock());
            for (title, view) in presentation_tables(report, &table) {
                renderer.render(&view, &title, CellFormat::for_report(report))?;
            }
        }
        println!("done rendering {} data", report);
    }

    Ok(())
}
