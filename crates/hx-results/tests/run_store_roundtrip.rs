use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hx_results::{RunOptions, RunStore, ensure_run, load_run};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn decay_demo() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/cases/02_decay_constant_volume.yaml")
}

#[test]
fn run_is_saved_then_served_from_cache() {
    let case = hx_case::load_yaml(&decay_demo()).expect("failed to load demo case");
    let root = unique_temp_dir("hx_results_cache");
    let store = RunStore::new(root.clone()).expect("failed to create run store");
    let options = RunOptions::default();

    let first = ensure_run(&case, None, &store, &options).expect("run failed");
    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.case_name, "closed-vessel decay");
    assert_eq!(first.manifest.summary.steps, 50);
    assert_eq!(first.manifest.summary.writes, 5);

    let (manifest, records) = load_run(&store, &first.run_id).expect("failed to load run");
    assert_eq!(manifest, first.manifest);
    assert_eq!(records.len(), 5);
    assert_eq!(records.last().map(|r| r.step), Some(50));
    let y_a = records[4].mass_fractions["A"];
    assert!((y_a + records[4].mass_fractions["B"] - 1.0).abs() < 1e-9);
    assert!(records.windows(2).all(|w| w[1].t_k > w[0].t_k));

    let post = fs::read_to_string(store.run_dir(&first.run_id).join("post.dat")).unwrap();
    assert!(post.starts_with("# Time\tT\tp\tQdot\tA\tB\n"));
    assert_eq!(post.lines().count(), 6);

    let second = ensure_run(&case, None, &store, &options).expect("cached run failed");
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);

    let forced = ensure_run(
        &case,
        None,
        &store,
        &RunOptions {
            use_cache: false,
            ..options
        },
    )
    .expect("forced run failed");
    assert!(!forced.loaded_from_cache);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn runs_are_listed_per_case_and_deleted() {
    let case_dir = unique_temp_dir("hx_results_case");
    fs::create_dir_all(&case_dir).unwrap();
    let case_path = case_dir.join("decay.yaml");
    fs::copy(decay_demo(), &case_path).unwrap();

    let store = RunStore::for_case(&case_path).expect("failed to create run store");
    assert!(store.root_dir().ends_with(".helyx/runs"));

    let mut case = hx_case::load_yaml(&case_path).unwrap();
    case.control.end_time = 0.1;
    let short = ensure_run(&case, Some(&case_path), &store, &RunOptions::default()).unwrap();
    case.name = "other".to_string();
    ensure_run(&case, Some(&case_path), &store, &RunOptions::default()).unwrap();

    let runs = store.list_runs("closed-vessel decay").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, short.run_id);

    store.delete_run(&short.run_id).unwrap();
    assert!(!store.has_run(&short.run_id));
    assert!(matches!(
        store.load_manifest(&short.run_id),
        Err(hx_results::ResultsError::RunNotFound { .. })
    ));

    let _ = fs::remove_dir_all(case_dir);
}
