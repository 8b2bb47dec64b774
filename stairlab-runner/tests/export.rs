use stairlab_runner::export::{
    export_trials_csv, import_experiment_json, load_session_artifacts, save_experiment_artifacts,
    save_session_artifacts,
};
use stairlab_runner::{run_condition, run_experiment, ExperimentConfig};

const CONFIG: &str = r#"
[run]
seed = 5
max_trials = 300
repetitions = 2

[[condition]]
name = "tone_1k"
[condition.staircase]
start_level = 60.0
step_sizes = [8.0, 4.0, 2.0]
n_up = 1
n_down = 2
n_trials = 20
n_reversals = 6
rapid_descend = true
min_level = 0.0
max_level = 80.0
[condition.listener]
threshold = 35.0
slope = 0.5

[[condition]]
name = "noise"
[condition.staircase]
start_level = 70.0
step_sizes = [4.0, 2.0]
n_up = 1
n_down = 3
n_trials = 20
n_reversals = 6
min_level = 0.0
max_level = 80.0
[condition.listener]
threshold = 50.0
slope = 0.4
"#;

#[test]
fn session_artifacts_roundtrip() {
    let config = ExperimentConfig::from_toml(CONFIG).unwrap();
    let session = run_condition(&config, "tone_1k", 0).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let dir = save_session_artifacts(&session, temp_dir.path()).unwrap();
    assert_eq!(dir, temp_dir.path().join("tone_1k_0"));
    assert!(dir.join("session.json").exists());
    assert!(dir.join("trials.csv").exists());

    let csv = std::fs::read_to_string(dir.join("trials.csv")).unwrap();
    assert_eq!(csv, export_trials_csv(&session.records).unwrap());
    assert_eq!(csv.lines().count(), session.trial_count + 1);

    let loaded = load_session_artifacts(&dir).unwrap();
    assert_eq!(loaded.records, session.records);
    assert_eq!(loaded.stop_reason, session.stop_reason);
    assert_eq!(loaded.seed, session.seed);
    assert_eq!(loaded.config, session.config);
    let (a, b) = (loaded.threshold.unwrap(), session.threshold.unwrap());
    assert!((a.mean - b.mean).abs() < 1e-9);
}

#[test]
fn loading_missing_dir_fails_with_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = load_session_artifacts(&temp_dir.path().join("nope")).unwrap_err();
    assert!(err.to_string().contains("session.json"));
}

#[test]
fn experiment_artifacts_layout() {
    let config = ExperimentConfig::from_toml(CONFIG).unwrap();
    let result = run_experiment(&config).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let dir = save_experiment_artifacts(&result, temp_dir.path()).unwrap();

    assert!(dir.join("experiment.json").exists());
    assert!(dir.join("report.md").exists());
    assert!(dir.join("sequence_0.csv").exists());
    assert!(dir.join("sequence_1.csv").exists());
    for name in ["tone_1k_0", "tone_1k_1", "noise_0", "noise_1"] {
        assert!(dir.join(name).join("session.json").exists(), "{name}");
    }

    let report = std::fs::read_to_string(dir.join("report.md")).unwrap();
    assert!(report.contains(&result.experiment_id));
    assert!(report.contains("| tone_1k | 1 |"));

    let json = std::fs::read_to_string(dir.join("experiment.json")).unwrap();
    let loaded = import_experiment_json(&json).unwrap();
    assert_eq!(loaded.repetitions.len(), result.repetitions.len());
    for (l, r) in loaded.repetitions.iter().zip(&result.repetitions) {
        assert_eq!(l.sequence, r.sequence);
    }
    assert_eq!(loaded.created_at, result.created_at);
}

#[test]
fn sequence_csv_lists_every_trial() {
    let config = ExperimentConfig::from_toml(CONFIG).unwrap();
    let result = run_experiment(&config).unwrap();
    let run = &result.repetitions[0];

    let csv = stairlab_runner::export::export_sequence_csv(&run.sequence).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("sequence,condition,trial_number,level,response,reversal")
    );
    assert_eq!(lines.count(), run.sequence.len());
    // First two presentations alternate between conditions.
    assert_eq!(run.sequence[0].condition, "tone_1k");
    assert_eq!(run.sequence[1].condition, "noise");
}

#[test]
fn condition_names_cannot_leave_output_dir() {
    let text = CONFIG.replace("name = \"noise\"", "name = \"../escaped\"");
    let err = ExperimentConfig::from_toml(&text).unwrap_err();
    assert!(matches!(
        err,
        stairlab_runner::ConfigError::InvalidConditionName(ref n) if n == "../escaped"
    ));
}
