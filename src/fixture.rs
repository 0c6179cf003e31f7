//! Synthetic HDF5 files with paired "features"/"targets" datasets.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use rand::Rng;
use tracing::debug;

use crate::error::Result;

pub const FEATURES_KEY: &str = "/features";
pub const TARGETS_KEY: &str = "/targets";

/// Layout of a batch of generated fixture files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixtureSpec {
    /// Number of files to create.
    pub count: usize,
    /// Range the per-file row count is drawn from (half-open).
    pub rows: Range<usize>,
    pub features_cols: usize,
    pub targets_cols: usize,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self { count: 10, rows: 50_000..100_000, features_cols: 60, targets_cols: 3 }
    }
}

impl FixtureSpec {
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn rows(mut self, rows: Range<usize>) -> Self {
        self.rows = rows;
        self
    }

    pub fn columns(mut self, features_cols: usize, targets_cols: usize) -> Self {
        self.features_cols = features_cols;
        self.targets_cols = targets_cols;
        self
    }

    /// Path of the `index`-th fixture file inside `dir`.
    pub fn filename<P: AsRef<Path>>(dir: P, index: usize) -> PathBuf {
        dir.as_ref().join(format!("file_{index}.h5"))
    }
}

/// A generated fixture file and the number of rows in each of its datasets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fixture {
    pub path: PathBuf,
    pub rows: usize,
}

/// Creates `spec.count` fixture files named `file_{i}.h5` in `dir`, one after another.
///
/// The directory is created if needed. Each file holds a `rows x features_cols`
/// "features" dataset and a `rows x targets_cols` "targets" dataset of uniform
/// random `f64` values in `[0, 1)`, both sharing one row count drawn from `spec.rows`.
pub fn create_fixtures<P, R>(dir: P, spec: &FixtureSpec, rng: &mut R) -> Result<Vec<Fixture>>
where
    P: AsRef<Path>,
    R: Rng + ?Sized,
{
    ensure!(!spec.rows.is_empty(), "empty fixture row range: {:?}", spec.rows);
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut fixtures = Vec::with_capacity(spec.count);
    for index in 0..spec.count {
        let path = FixtureSpec::filename(dir, index);
        let rows = rng.gen_range(spec.rows.clone());
        write_fixture(&path, rows, spec, rng).map_err(|err| err.in_file(&path))?;
        fixtures.push(Fixture { path, rows });
    }
    Ok(fixtures)
}

fn write_fixture<R>(path: &Path, rows: usize, spec: &FixtureSpec, rng: &mut R) -> Result<()>
where
    R: Rng + ?Sized,
{
    let features = Array2::from_shape_fn((rows, spec.features_cols), |_| rng.gen::<f64>());
    let targets = Array2::from_shape_fn((rows, spec.targets_cols), |_| rng.gen::<f64>());
    let file = hdf5::File::create(path)?;
    file.new_dataset_builder().with_data(&features).create(FEATURES_KEY)?;
    file.new_dataset_builder().with_data(&targets).create(TARGETS_KEY)?;
    debug!(path = %path.display(), rows, "created fixture");
    Ok(())
}
