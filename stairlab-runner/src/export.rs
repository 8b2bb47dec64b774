//! Reporting and export — JSON, CSV, and Markdown artifacts.
//!
//! - **JSON**: full `SessionResult` / `ExperimentResult` with schema versioning
//! - **CSV**: per-session trial logs and the interleaved presentation order
//! - **Markdown**: a human-readable experiment report
//!
//! Persisted results carry a `schema_version`; newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stairlab_core::TrialRecord;

use crate::batch::BatchSummary;
use crate::config::is_valid_condition_name;
use crate::experiment::ExperimentResult;
use crate::interleave::InterleavedTrial;
use crate::session::{SessionResult, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &SessionResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize SessionResult to JSON")
}

/// Deserialize a `SessionResult`, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<SessionResult> {
    let result: SessionResult =
        serde_json::from_str(json).context("failed to deserialize SessionResult from JSON")?;
    check_schema(result.schema_version)?;
    Ok(result)
}

pub fn export_experiment_json(result: &ExperimentResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize ExperimentResult to JSON")
}

pub fn import_experiment_json(json: &str) -> Result<ExperimentResult> {
    let result: ExperimentResult =
        serde_json::from_str(json).context("failed to deserialize ExperimentResult from JSON")?;
    check_schema(result.schema_version)?;
    Ok(result)
}

fn check_schema(version: u32) -> Result<()> {
    if version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Trial log as CSV.
///
/// Columns: trial_number, level, response (+1 / -1), reversal
pub fn export_trials_csv(records: &[TrialRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)
            .with_context(|| format!("failed to write trial {}", record.trial_number))?;
    }
    // An empty log still gets a header row.
    if records.is_empty() {
        wtr.write_record(["trial_number", "level", "response", "reversal"])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn import_trials_csv(csv_text: &str) -> Result<Vec<TrialRecord>> {
    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("invalid trial row {}", i + 1)))
        .collect()
}

/// Interleaved presentation order as CSV.
///
/// Columns: sequence, condition, trial_number, level, response, reversal
pub fn export_sequence_csv(sequence: &[InterleavedTrial]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "sequence",
        "condition",
        "trial_number",
        "level",
        "response",
        "reversal",
    ])?;
    for t in sequence {
        wtr.write_record([
            &t.sequence.to_string(),
            &t.condition,
            &t.record.trial_number.to_string(),
            &t.record.level.to_string(),
            &t.record.response.score().to_string(),
            &t.record.reversal.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Save one session under `output_dir/{condition}_{repetition}/`:
/// - `session.json`: the full `SessionResult`
/// - `trials.csv`: the trial log
///
/// Returns the created directory.
pub fn save_session_artifacts(result: &SessionResult, output_dir: &Path) -> Result<PathBuf> {
    if !is_valid_condition_name(&result.condition) {
        bail!(
            "condition name '{}' is not usable as a directory name",
            result.condition
        );
    }
    let dir = output_dir.join(format!("{}_{}", result.condition, result.repetition));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    std::fs::write(dir.join("session.json"), export_json(result)?)
        .with_context(|| format!("failed to write {}", dir.join("session.json").display()))?;
    std::fs::write(dir.join("trials.csv"), export_trials_csv(&result.records)?)
        .with_context(|| format!("failed to write {}", dir.join("trials.csv").display()))?;

    tracing::debug!(dir = %dir.display(), "session artifacts written");
    Ok(dir)
}

/// Load a session from a directory written by `save_session_artifacts`.
pub fn load_session_artifacts(dir: &Path) -> Result<SessionResult> {
    let path = dir.join("session.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Save a whole experiment under `output_dir/experiment_{id prefix}/`:
/// - `experiment.json`
/// - `report.md`
/// - `sequence_{repetition}.csv` for each repetition
/// - one session directory per condition and repetition
pub fn save_experiment_artifacts(result: &ExperimentResult, output_dir: &Path) -> Result<PathBuf> {
    let id_prefix: String = result.experiment_id.chars().take(12).collect();
    let dir = output_dir.join(format!("experiment_{id_prefix}"));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    std::fs::write(dir.join("experiment.json"), export_experiment_json(result)?)
        .context("failed to write experiment.json")?;
    std::fs::write(dir.join("report.md"), generate_report(result))
        .context("failed to write report.md")?;

    for (rep, run) in result.repetitions.iter().enumerate() {
        let name = format!("sequence_{rep}.csv");
        std::fs::write(dir.join(&name), export_sequence_csv(&run.sequence)?)
            .with_context(|| format!("failed to write {name}"))?;
        for session in &run.sessions {
            save_session_artifacts(session, &dir)?;
        }
    }

    tracing::info!(dir = %dir.display(), "experiment artifacts written");
    Ok(dir)
}

// ─── Markdown ───────────────────────────────────────────────────────

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

/// Markdown report: one row per session.
pub fn generate_report(result: &ExperimentResult) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Staircase Experiment Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Experiment | {} |\n", result.experiment_id));
    md.push_str(&format!("| Created | {} |\n", result.created_at.to_rfc3339()));
    md.push_str(&format!("| Seed | {} |\n", result.seed));
    md.push_str(&format!("| Repetitions | {} |\n", result.repetitions.len()));
    md.push('\n');

    md.push_str("## Sessions\n\n");
    md.push_str("| Condition | Rep | Trials | Reversals | Final Level | Threshold | SD | Stop |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: | --- |\n");
    for s in result.sessions() {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {:.2} | {} | {} | {:?} |\n",
            s.condition,
            s.repetition,
            s.trial_count,
            s.reversal_count,
            s.final_level,
            fmt_opt(s.threshold.map(|t| t.mean), 2),
            fmt_opt(s.threshold.map(|t| t.std_dev), 2),
            s.stop_reason,
        ));
    }
    md.push('\n');
    md
}

/// Markdown table for batch summaries.
pub fn generate_batch_report(summaries: &[BatchSummary]) -> String {
    let mut md = String::with_capacity(512);
    md.push_str("# Batch Summary\n\n");
    md.push_str("| Condition | Runs | Finished | Mean Trials | Threshold | SD | Target | Bias |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for s in summaries {
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {:.1} | {} | {} | {} | {} |\n",
            s.condition,
            s.runs,
            s.finished_fraction * 100.0,
            s.mean_trials,
            fmt_opt(s.threshold_mean, 2),
            fmt_opt(s.threshold_std, 2),
            fmt_opt(s.target_level, 2),
            fmt_opt(s.bias, 2),
        ));
    }
    md
}
