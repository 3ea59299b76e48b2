use pathtrees::{tree, Filesystem, LocalFilesystem, PathtreesError, Tree};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup() -> (TempDir, Tree) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("logs");
    for (step, plot) in [("s1", "loss"), ("s1", "acc"), ("s2", "loss")] {
        let plots = root.join("a").join("plots").join(step);
        fs::create_dir_all(&plots).unwrap();
        fs::write(plots.join(format!("{plot}.png")), "png").unwrap();
    }
    fs::write(root.join("a/plots/s1/.hidden.png"), "png").unwrap();
    fs::write(root.join("a/plots/s1/notes.txt"), "txt").unwrap();

    let paths = tree(
        root.to_str().unwrap(),
        json!({
            "": "root",
            "{log_id}": {
                "plots": {"{step_name}": {"{plot_name}.png": "plot"}},
                "model.h5": "model",
            },
        }),
    )
    .unwrap();
    (dir, paths)
}

fn relative(dir: &TempDir, found: &[String]) -> Vec<String> {
    let prefix = format!("{}/", dir.path().display());
    found.iter().map(|f| f.strip_prefix(&prefix).unwrap().to_string()).collect()
}

#[test_log::test]
fn test_glob_lists_sorted_matches() {
    let (dir, paths) = setup();
    let plot = paths.get_path("plot").unwrap().specify([("log_id", "a")]);
    let found = plot.glob().unwrap();
    assert_eq!(
        relative(&dir, &found),
        vec!["logs/a/plots/s1/acc.png", "logs/a/plots/s1/loss.png", "logs/a/plots/s2/loss.png"]
    );

    let mut lazy = plot.iglob().unwrap().collect::<pathtrees::PathtreesResult<Vec<_>>>().unwrap();
    lazy.sort();
    assert_eq!(lazy, found);

    let loss = plot.specify([("plot_name", "loss")]);
    assert_eq!(loss.glob().unwrap().len(), 2);
}

#[test_log::test]
fn test_glob_without_matches() {
    let (_dir, paths) = setup();
    let plot = paths.get_path("plot").unwrap().specify([("log_id", "missing")]);
    assert!(plot.glob().unwrap().is_empty());

    let model = paths.get_path("model").unwrap().specify([("log_id", "a")]);
    assert!(model.glob().unwrap().is_empty());
    assert!(!model.exists());
}

#[test_log::test]
fn test_rm_and_rmglob() {
    let (dir, paths) = setup();
    let plot = paths.get_path("plot").unwrap().specify([("log_id", "a")]);

    let single = plot.specify([("step_name", "s2"), ("plot_name", "loss")]);
    assert!(single.exists());
    single.rm().unwrap();
    assert!(!single.exists());
    assert!(matches!(single.rm(), Err(PathtreesError::IoError(_))));
    assert!(matches!(plot.rm(), Err(PathtreesError::MissingKey { .. })));

    let removed = plot.rmglob().unwrap();
    assert_eq!(relative(&dir, &removed), vec!["logs/a/plots/s1/acc.png", "logs/a/plots/s1/loss.png"]);
    assert!(plot.glob().unwrap().is_empty());
    assert!(dir.path().join("logs/a/plots/s1/.hidden.png").exists());
    assert!(dir.path().join("logs/a/plots/s1/notes.txt").exists());
}

#[test_log::test]
fn test_rmglob_skips_directories() {
    let (dir, paths) = setup();
    let steps = paths.get_path("plot").unwrap().parent().unwrap().specify([("log_id", "a")]);
    assert_eq!(steps.glob().unwrap().len(), 2);
    assert!(steps.rmglob().unwrap().is_empty());
    assert!(dir.path().join("logs/a/plots/s1").is_dir());
}

#[test]
fn test_local_filesystem_hidden_entries() {
    let (dir, _paths) = setup();
    let base = dir.path().join("logs/a/plots/s1");
    let pattern = format!("{}/.*", base.display());
    let hidden = LocalFilesystem.iglob(&pattern).unwrap().collect::<pathtrees::PathtreesResult<Vec<_>>>().unwrap();
    assert_eq!(hidden.len(), 1);
    assert!(hidden[0].ends_with(".hidden.png"));
}

#[test_log::test]
fn test_glob_with_overrides() {
    let (dir, paths) = setup();
    let plot = paths.get_path("plot").unwrap();
    let found = plot.glob_with([("log_id", "a"), ("step_name", "s1")]).unwrap();
    assert_eq!(relative(&dir, &found), vec!["logs/a/plots/s1/acc.png", "logs/a/plots/s1/loss.png"]);

    let lazy = plot.iglob_with([("log_id", "a")]).unwrap().count();
    assert_eq!(lazy, 3);
    assert_eq!(plot.glob().unwrap().len(), 3);
}

#[test_log::test]
fn test_tree_glob_every_name() {
    let (dir, paths) = setup();
    let found = paths.specify([("log_id", "a")]).glob().unwrap();
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["root", "plot", "model"]);
    assert_eq!(relative(&dir, &found["root"]), vec!["logs"]);
    assert_eq!(found["plot"].len(), 3);
    assert!(found["model"].is_empty());
}
