use ndarray::Array2;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use hdf5_io::fixture::{FixtureSpec, FEATURES_KEY, TARGETS_KEY};
use hdf5_io::scan::{count_pairs, scan_eager, ScanOptions};
use hdf5_io::{list_files, zip, DatasetOptions, Hdf5Dataset};

#[macro_use]
mod common;

use self::common::util::{init_tracing, with_fixtures};

#[test]
fn test_hdf5() {
    with_fixtures(&FixtureSpec::default(), 841, |dir, fixtures| {
        let total_rows: usize = fixtures.iter().map(|f| f.rows).sum();
        let report = scan_eager(dir, &ScanOptions::default()).unwrap();

        assert_eq!(report.passes.len(), 2);
        for pass in 0..2 {
            let paths: Vec<_> = report.passes[pass].iter().map(|c| c.path.clone()).collect();
            assert_eq!(paths, list_files(dir, "h5").unwrap());
            for count in &report.passes[pass] {
                let fixture = fixtures.iter().find(|f| f.path == count.path).unwrap();
                assert_eq!(count.pairs, fixture.rows);
                assert_eq!(count.elements, fixture.rows * 60);
            }
            assert_eq!(report.pairs_in_pass(pass), total_rows);
        }
        assert!(report.is_consistent());
        assert_eq!(report.total_elements(), 2 * 60 * total_rows);
    })
}

#[test]
fn test_fixture_datasets_share_row_count() {
    let spec = FixtureSpec::default().count(3).rows(100..500);
    with_fixtures(&spec, 1, |_, fixtures| {
        for fixture in fixtures {
            let features = Hdf5Dataset::<f64>::from_hdf5(&fixture.path, FEATURES_KEY).unwrap();
            let targets = Hdf5Dataset::<f64>::from_hdf5(&fixture.path, TARGETS_KEY).unwrap();
            assert_eq!(features.shape(), &[fixture.rows, 60]);
            assert_eq!(targets.shape(), &[fixture.rows, 3]);
        }
    })
}

#[test]
fn test_zip_stops_at_shorter_dataset() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("uneven.h5");
    {
        let file = hdf5::File::create(&path).unwrap();
        let features = Array2::from_shape_fn((10, 4), |(i, _)| i as f64);
        let targets = Array2::from_shape_fn((7, 1), |(i, _)| -(i as f64));
        file.new_dataset_builder().with_data(&features).create("features").unwrap();
        file.new_dataset_builder().with_data(&targets).create("targets").unwrap();
    }

    let options = DatasetOptions::new().capacity(3);
    let features = options.open::<f64, _>(&path, "features").unwrap();
    let targets = options.open::<f64, _>(&path, "targets").unwrap();
    let pairs: Vec<_> = zip(&features, &targets).collect::<Result<_, _>>().unwrap();
    assert_eq!(pairs.len(), 7);
    for (i, (x, y)) in pairs.iter().enumerate() {
        assert_eq!(x.as_slice().unwrap(), &[i as f64; 4]);
        assert_eq!(y.as_slice().unwrap(), &[-(i as f64)]);
    }
    assert_eq!(count_pairs(&path, &options).unwrap().pairs, 7);
}

#[test]
fn test_eager_passes_are_idempotent() {
    let spec = FixtureSpec::default().count(5).rows(1000..3000);
    with_fixtures(&spec, 2, |dir, _| {
        let options = ScanOptions::default().passes(3).capacity(512);
        let report = scan_eager(dir, &options).unwrap();
        assert_eq!(report.passes.len(), 3);
        assert!(report.is_consistent());
    })
}

#[test]
fn test_eager_failure_is_fatal() {
    let spec = FixtureSpec::default().count(2).rows(10..20);
    with_fixtures(&spec, 3, |dir, fixtures| {
        {
            let file = hdf5::File::append(&fixtures[1].path).unwrap();
            file.unlink(TARGETS_KEY).unwrap();
        }
        assert_err!(scan_eager(dir, &ScanOptions::default()), "file_1.h5");
        assert!(count_pairs(&fixtures[0].path, &DatasetOptions::new()).is_ok());
    })
}

#[test]
fn test_empty_directory() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let report = scan_eager(dir.path(), &ScanOptions::default()).unwrap();
    assert_eq!(report.total_pairs(), 0);
    assert_eq!(report.passes.len(), 2);
    assert!(report.passes.iter().all(Vec::is_empty));
}
