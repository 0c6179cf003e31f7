//! Lazy, row-iterable views over a single HDF5 dataset.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ops::Range;
use std::path::{Path, PathBuf};

use hdf5::{H5Type, Hyperslab, SliceOrIndex};
use ndarray::{ArrayD, Axis, IxDyn};
use tracing::{debug, trace};

use crate::error::Result;
use crate::schema::{check_dtype, Dtype};
use crate::util::normalize_key;

/// Number of rows fetched from the file per read when iterating.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Options for opening an [`Hdf5Dataset`].
#[derive(Clone, Debug)]
pub struct DatasetOptions {
    capacity: usize,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

impl DatasetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of rows read from the file at once (must be positive).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Opens dataset `key` in file `path` as a lazy row view of `T` elements.
    pub fn open<T: H5Type, P: AsRef<Path>>(&self, path: P, key: &str) -> Result<Hdf5Dataset<T>> {
        let path = path.as_ref();
        self.open_impl(path, key).map_err(|err| err.in_file(path))
    }

    fn open_impl<T: H5Type>(&self, path: &Path, key: &str) -> Result<Hdf5Dataset<T>> {
        ensure!(self.capacity > 0, "dataset capacity must be positive");
        let key = normalize_key(key)?;
        let file = hdf5::File::open(path)?;
        let ds = file.dataset(&key)?;
        let dtype = Dtype::of_dataset(&ds)?;
        check_dtype::<T>(dtype, &key)?;
        let shape = ds.shape();
        ensure!(!shape.is_empty(), "dataset {} is scalar and has no rows", key);
        debug!(path = %path.display(), key = %key, ?shape, %dtype, "opened dataset");
        Ok(Hdf5Dataset {
            path: path.to_path_buf(),
            key,
            _file: file,
            ds,
            shape,
            dtype,
            capacity: self.capacity,
            _marker: PhantomData,
        })
    }
}

/// Reads rows `range` of a dataset with the given `shape` (leading dimension first).
pub(crate) fn read_row_range<T: H5Type>(
    ds: &hdf5::Dataset, key: &str, shape: &[usize], range: Range<usize>,
) -> Result<ArrayD<T>> {
    ensure!(!shape.is_empty(), "dataset {} is scalar and has no rows", key);
    let rows = shape[0];
    ensure!(
        range.start <= range.end && range.end <= rows,
        "row range {}..{} out of bounds for {} with {} rows",
        range.start,
        range.end,
        key,
        rows
    );
    trace!(key, start = range.start, end = range.end, "reading rows");
    let mut dims = vec![SliceOrIndex::from(range)];
    dims.extend(shape[1..].iter().map(|_| SliceOrIndex::from(..)));
    Ok(ds.read_slice::<T, _, IxDyn>(Hyperslab::from(dims))?)
}

/// A lazy view over one named dataset inside one HDF5 file.
///
/// Elements are the dataset's rows: for a dataset of shape `[n, d1, .., dk]`,
/// iteration yields `n` arrays of shape `[d1, .., dk]`. Rows are fetched from the
/// file in blocks of `capacity` rows, so only one block is held in memory at a time.
pub struct Hdf5Dataset<T> {
    path: PathBuf,
    key: String,
    _file: hdf5::File,
    ds: hdf5::Dataset,
    shape: Vec<usize>,
    dtype: Dtype,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> Debug for Hdf5Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hdf5Dataset")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: H5Type> Hdf5Dataset<T> {
    /// Opens dataset `key` in file `path` with default options.
    pub fn from_hdf5<P: AsRef<Path>>(path: P, key: &str) -> Result<Self> {
        DatasetOptions::default().open(path, key)
    }

    /// Returns a builder for opening a dataset with non-default options.
    pub fn with_options() -> DatasetOptions {
        DatasetOptions::new()
    }
}

impl<T> Hdf5Dataset<T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Normalized (absolute) key of the dataset within the file.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Shape of a single element (the dataset shape without its leading dimension).
    pub fn row_shape(&self) -> &[usize] {
        &self.shape[1..]
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows (the leading dimension).
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: H5Type + Clone> Hdf5Dataset<T> {
    /// Reads a contiguous range of rows into a dense array of shape `[range.len(), ..]`.
    pub fn read_rows(&self, range: Range<usize>) -> Result<ArrayD<T>> {
        read_row_range(&self.ds, &self.key, &self.shape, range)
            .map_err(|err| err.in_file(&self.path))
    }

    /// Iterates over all rows, starting from the first one on every call.
    pub fn iter(&self) -> Rows<T> {
        Rows { dataset: self, next: 0, block: None, block_start: 0, failed: false }
    }

    /// Iterates over blocks of up to `size` rows; the last block may be shorter.
    pub fn batches(&self, size: usize) -> Result<Batches<T>> {
        ensure!(size > 0, "batch size must be positive");
        Ok(Batches { dataset: self, size, next: 0, failed: false })
    }
}

impl<'a, T: H5Type + Clone> IntoIterator for &'a Hdf5Dataset<T> {
    type Item = Result<ArrayD<T>>;
    type IntoIter = Rows<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row iterator over an [`Hdf5Dataset`].
///
/// The iterator stops after yielding the first error.
pub struct Rows<'a, T> {
    dataset: &'a Hdf5Dataset<T>,
    next: usize,
    block: Option<ArrayD<T>>,
    block_start: usize,
    failed: bool,
}

impl<'a, T: H5Type + Clone> Rows<'a, T> {
    fn block_contains(&self, row: usize) -> bool {
        match self.block {
            Some(ref block) => {
                row >= self.block_start && row < self.block_start + block.len_of(Axis(0))
            }
            None => false,
        }
    }
}

impl<'a, T: H5Type + Clone> Iterator for Rows<'a, T> {
    type Item = Result<ArrayD<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.dataset.len() {
            return None;
        }
        if !self.block_contains(self.next) {
            let end = (self.next + self.dataset.capacity).min(self.dataset.len());
            match self.dataset.read_rows(self.next..end) {
                Ok(block) => {
                    self.block = Some(block);
                    self.block_start = self.next;
                }
                Err(err) => {
                    self.failed = true;
                    self.block = None;
                    return Some(Err(err));
                }
            }
        }
        let block = self.block.as_ref()?;
        let row = block.index_axis(Axis(0), self.next - self.block_start).to_owned();
        self.next += 1;
        Some(Ok(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed { 0 } else { self.dataset.len() - self.next };
        (remaining, Some(remaining))
    }
}

/// Block iterator over an [`Hdf5Dataset`], see [`Hdf5Dataset::batches`].
pub struct Batches<'a, T> {
    dataset: &'a Hdf5Dataset<T>,
    size: usize,
    next: usize,
    failed: bool,
}

impl<'a, T: H5Type + Clone> Iterator for Batches<'a, T> {
    type Item = Result<ArrayD<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.dataset.len() {
            return None;
        }
        let end = (self.next + self.size).min(self.dataset.len());
        let batch = self.dataset.read_rows(self.next..end);
        self.failed = batch.is_err();
        self.next = end;
        Some(batch)
    }
}
