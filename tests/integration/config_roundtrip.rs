use taskminder::TaskminderConfig;

#[test]
fn config_file_round_trips_and_drives_store_path() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config_path = dir.path().join("taskminder").join("config.toml");
    let db_path = dir.path().join("db").join("tasks.db");

    let mut config = TaskminderConfig::default();
    config.store.db_path = Some(db_path.clone());
    config.scheduler.shutdown_grace_secs = 3;
    config.logging.filter = "taskminder=debug".to_owned();
    config.save_to_file(&config_path).expect("save config");

    let loaded = TaskminderConfig::from_file(&config_path).expect("load config");
    assert_eq!(loaded, config);
    assert_eq!(loaded.store.resolved_db_path(), db_path);
    assert_eq!(loaded.scheduler.shutdown_grace().as_secs(), 3);
}

#[test]
fn empty_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").expect("write empty config");

    let loaded = TaskminderConfig::from_file(&path).expect("load config");
    assert_eq!(loaded, TaskminderConfig::default());
}
