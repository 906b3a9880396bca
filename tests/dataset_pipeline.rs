mod common;

use rusty_mdf::config::ReaderConfig;
use rusty_mdf::core::{Closed, CoreError, Missing, TimeSeriesLike};
use rusty_mdf::io::{load_dataset, load_dataset_with, LoadMode, IMPORT_KIND};

use common::{bench_parquet_rows, write, write_parquet, BENCH_CSV, BENCH_JSON};

#[test]
fn load_dataset_names_segment_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "run42.json", BENCH_JSON);
    let ds = load_dataset(&path).unwrap();

    assert_eq!(ds.keys().collect::<Vec<_>>(), vec!["run42"]);
    let source = path.display().to_string();
    assert_eq!(ds.meta().source.as_deref(), Some(source.as_str()));

    let seg = ds.segment("run42").unwrap();
    assert_eq!(seg.meta().kind.as_deref(), Some(IMPORT_KIND));
    assert_eq!(seg.meta().source.as_deref(), Some(source.as_str()));
    assert_eq!(seg.keys().collect::<Vec<_>>(), vec!["eng_spd", "torque"]);

    let spd = seg.channel("eng_spd").unwrap();
    assert_eq!(spd.unit(), Some("rpm"));
    assert_eq!(spd.meta().source.as_deref(), Some("MDF:RecResult"));
    assert_eq!(spd.time().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(ds.t_start().unwrap(), Some(0.0));
    assert_eq!(ds.t_end().unwrap(), Some(3.0));
}

#[test]
fn lazy_dataset_matches_eager() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "run.csv", BENCH_CSV);

    let eager = load_dataset_with(&path, ReaderConfig::default(), LoadMode::Eager).unwrap();
    let lazy = load_dataset_with(&path, ReaderConfig::default(), LoadMode::Lazy).unwrap();

    let e = eager.segment("run").unwrap();
    let l = lazy.segment("run").unwrap();
    for name in ["eng_spd", "torque"] {
        let lc = l.channel(name).unwrap();
        assert!(!lc.is_loaded());
        assert_eq!(lc.values().unwrap(), e.channel(name).unwrap().values().unwrap());
        assert!(lc.is_loaded());
    }
}

#[test]
fn slicing_and_selection_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "run.json", BENCH_JSON);
    let ds = load_dataset(&path).unwrap();

    let late = ds.slice_time(Some(2.0), None, Closed::Both, false, false).unwrap();
    let spd = late.segment("run").unwrap().channel("eng_spd").unwrap();
    assert_eq!(spd.values().unwrap(), &[820.0, 830.0]);
    assert_eq!(spd.meta(), ds.segment("run").unwrap().channel("eng_spd").unwrap().meta());

    let none = ds.slice_time(Some(10.0), None, Closed::Both, true, true).unwrap();
    assert!(none.is_empty());

    let seg = ds.segment("run").unwrap();
    let torque_only = seg.select("torque", Missing::Raise).unwrap();
    assert_eq!(torque_only.keys().collect::<Vec<_>>(), vec!["torque"]);

    let err = seg.select(["torque", "nope"], Missing::Raise).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.missing_key(), Some("nope"));
}

#[test]
fn merging_two_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let a = load_dataset(&write(dir.path(), "morning.json", BENCH_JSON)).unwrap();
    let b = load_dataset(&write_parquet(dir.path(), "evening.parquet", &bench_parquet_rows())).unwrap();

    let merged = a.merge(&b, false).unwrap();
    assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["morning", "evening"]);

    let err = merged.merge(&b, false).unwrap_err();
    assert!(matches!(err, CoreError::InvalidDataset(_)));

    let renamed = merged.rename_segment("evening", "night").unwrap();
    assert_eq!(renamed.segment("night").unwrap().name(), "night");
    assert!(renamed.segment("evening").is_err());
}

#[test]
fn stats_on_loaded_channel() {
    let dir = tempfile::tempdir().unwrap();
    let ds = load_dataset(&write(dir.path(), "run.json", BENCH_JSON)).unwrap();
    let torque = ds.segment("run").unwrap().channel("torque").unwrap();

    let series = torque.series();
    assert_eq!(series.mean(true).unwrap(), Some(11.5));
    let std = series.std(0, true).unwrap().unwrap();
    assert!((std - 1.25f64.sqrt()).abs() < 1e-12);
}
