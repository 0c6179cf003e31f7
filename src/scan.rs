//! End-to-end passes over directories of fixture files.
//!
//! [`scan_eager`] walks every file sequentially through
//! [`Hdf5Dataset`](crate::Hdf5Dataset) row iterators, while [`scan_parallel`]
//! probes files concurrently through [`Hdf5Tensor`]s.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::dataset::{DatasetOptions, DEFAULT_CAPACITY};
use crate::error::Result;
use crate::fixture::{FEATURES_KEY, TARGETS_KEY};
use crate::pipeline::{zip, ParallelMap, DEFAULT_PARALLEL_CALLS};
use crate::schema::{Dtype, Schema};
use crate::tensor::Hdf5Tensor;
use crate::util::list_files;

/// Extension of the files picked up by [`scan_eager`].
pub const EXTENSION: &str = "h5";

/// Settings shared by the eager and parallel scans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Number of full passes over the directory in [`scan_eager`].
    pub passes: usize,
    /// Rows read from a file at once by the row iterators.
    pub capacity: usize,
    /// Worker threads used by [`scan_parallel`].
    pub num_parallel_calls: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { passes: 2, capacity: DEFAULT_CAPACITY, num_parallel_calls: DEFAULT_PARALLEL_CALLS }
    }
}

impl ScanOptions {
    pub fn passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn num_parallel_calls(mut self, num_parallel_calls: usize) -> Self {
        self.num_parallel_calls = num_parallel_calls;
        self
    }
}

/// Counts gathered for one file during one eager pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileCount {
    pub path: PathBuf,
    /// Number of (features, targets) pairs yielded.
    pub pairs: usize,
    /// Sum of the leading dimension of every yielded features element.
    pub elements: usize,
}

/// Result of [`scan_eager`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EagerReport {
    /// Per-pass, per-file counts, files in sorted path order.
    pub passes: Vec<Vec<FileCount>>,
}

impl EagerReport {
    /// Total number of pairs in the given pass.
    pub fn pairs_in_pass(&self, pass: usize) -> usize {
        self.passes.get(pass).map_or(0, |files| files.iter().map(|f| f.pairs).sum())
    }

    /// Total number of pairs across all passes.
    pub fn total_pairs(&self) -> usize {
        (0..self.passes.len()).map(|pass| self.pairs_in_pass(pass)).sum()
    }

    /// Total of the features' leading dimensions across all passes.
    pub fn total_elements(&self) -> usize {
        self.passes.iter().flatten().map(|f| f.elements).sum()
    }

    /// Whether all passes observed the same per-file counts.
    pub fn is_consistent(&self) -> bool {
        self.passes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Zips the features and targets of one file and iterates over all pairs.
pub fn count_pairs<P: AsRef<Path>>(path: P, options: &DatasetOptions) -> Result<FileCount> {
    let path = path.as_ref();
    let features = options.open::<f64, _>(path, FEATURES_KEY)?;
    let targets = options.open::<f64, _>(path, TARGETS_KEY)?;
    let (mut pairs, mut elements) = (0, 0);
    for pair in zip(&features, &targets) {
        let (row, _) = pair?;
        pairs += 1;
        elements += row.shape().first().copied().unwrap_or(1);
    }
    Ok(FileCount { path: path.to_path_buf(), pairs, elements })
}

/// Runs `options.passes` sequential passes over all `.h5` files in `dir`.
///
/// Every file's features and targets are zipped and iterated to exhaustion. The
/// first failure aborts the scan and is returned with the offending path attached.
pub fn scan_eager<P: AsRef<Path>>(dir: P, options: &ScanOptions) -> Result<EagerReport> {
    let dir = dir.as_ref();
    let dataset_options = DatasetOptions::new().capacity(options.capacity);
    let mut report = EagerReport::default();
    for pass in 0..options.passes {
        let mut counts = vec![];
        for path in list_files(dir, EXTENSION)? {
            match count_pairs(&path, &dataset_options) {
                Ok(count) => {
                    info!(
                        pass,
                        path = %path.display(),
                        pairs = count.pairs,
                        "success going through file"
                    );
                    counts.push(count);
                }
                Err(err) => {
                    error!(
                        pass,
                        path = %path.display(),
                        error = %err,
                        "failed going through file"
                    );
                    return Err(err.in_file(&path));
                }
            }
        }
        let pairs: usize = counts.iter().map(|c| c.pairs).sum();
        info!(pass, files = counts.len(), pairs, "finished pass");
        report.passes.push(counts);
    }
    Ok(report)
}

/// Schema of a fixture file: both datasets as `f64`.
pub fn fixture_schema() -> Result<Schema> {
    Schema::from_entries(vec![(FEATURES_KEY, Dtype::Float64), (TARGETS_KEY, Dtype::Float64)])
}

/// Opens `path` as a tensor with `schema` and returns the row count of its
/// materialized features dataset.
pub fn feature_rows<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<usize> {
    let tensor = Hdf5Tensor::from_hdf5(path, Some(schema))?;
    let features = tensor.column(FEATURES_KEY)?.to_array::<f64>()?;
    Ok(features.shape()[0])
}

/// Maps [`feature_rows`] over `paths` with `num_parallel_calls` workers.
///
/// The returned counts are in the same order as `paths`.
pub fn scan_parallel<P>(
    paths: &[P], schema: &Schema, num_parallel_calls: usize,
) -> Result<Vec<usize>>
where
    P: AsRef<Path> + Sync,
{
    let map = ParallelMap::new(num_parallel_calls)?;
    let rows = map.run(paths, |path| feature_rows(path, schema))?;
    info!(files = rows.len(), "finished parallel scan");
    Ok(rows)
}
