//! Schema-driven, materializable views over the datasets of an HDF5 file.

use std::fmt::{self, Debug};
use std::ops::Range;
use std::path::{Path, PathBuf};

use hdf5::H5Type;
use ndarray::ArrayD;
use tracing::debug;

use crate::dataset::read_row_range;
use crate::error::Result;
use crate::schema::{check_dtype, Dtype, Schema};
use crate::util::normalize_key;

/// A multi-key view over an HDF5 file.
///
/// Each schema entry becomes an [`Hdf5Column`] that can be materialized into a
/// dense array. Nothing is read from the datasets until a column is materialized.
pub struct Hdf5Tensor {
    path: PathBuf,
    _file: hdf5::File,
    schema: Schema,
    columns: Vec<Hdf5Column>,
}

impl Debug for Hdf5Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hdf5Tensor")
            .field("path", &self.path)
            .field("columns", &self.columns)
            .finish()
    }
}

impl Hdf5Tensor {
    /// Opens `path` as a tensor.
    ///
    /// With a schema, every key must name a non-scalar dataset stored with the
    /// declared dtype. Without one, the schema is inferred from all non-scalar
    /// numeric datasets in the file, sorted by key.
    pub fn from_hdf5<P: AsRef<Path>>(path: P, schema: Option<&Schema>) -> Result<Self> {
        let path = path.as_ref();
        Self::open_impl(path, schema).map_err(|err| err.in_file(path))
    }

    fn open_impl(path: &Path, schema: Option<&Schema>) -> Result<Self> {
        let file = hdf5::File::open(path)?;
        let mut columns = vec![];
        match schema {
            Some(schema) => {
                for (key, declared) in schema {
                    let column = Hdf5Column::new(path, key, file.dataset(key)?)?;
                    ensure!(
                        column.dtype == *declared,
                        "dtype mismatch for {}: stored as {}, declared {}",
                        key,
                        column.dtype,
                        declared
                    );
                    columns.push(column);
                }
            }
            None => {
                let mut datasets = collect_datasets(&file)?;
                datasets.sort_by(|a, b| a.name().cmp(&b.name()));
                for ds in datasets {
                    let key = ds.name();
                    match Hdf5Column::new(path, &key, ds) {
                        Ok(column) => columns.push(column),
                        Err(err) => debug!(key = %key, error = %err, "skipping dataset"),
                    }
                }
            }
        }
        let schema = Schema::from_entries(columns.iter().map(|c| (c.key(), c.dtype())))?;
        debug!(path = %path.display(), columns = columns.len(), "opened tensor");
        Ok(Self { path: path.to_path_buf(), _file: file, schema, columns })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema of the tensor, either as given or as inferred from the file.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Hdf5Column::key)
    }

    pub fn columns(&self) -> &[Hdf5Column] {
        &self.columns
    }

    /// Returns the column for `key` (with or without the leading slash).
    pub fn column(&self, key: &str) -> Result<&Hdf5Column> {
        let key = normalize_key(key)?;
        match self.columns.iter().find(|c| c.key == key) {
            Some(column) => Ok(column),
            None => fail!("unknown key {} in {}", key, self.path.display()),
        }
    }
}

/// Collects every dataset reachable from `root`, each object once even when it
/// is hard-linked under several names (including group cycles).
fn collect_datasets(root: &hdf5::Group) -> Result<Vec<hdf5::Dataset>> {
    let mut seen = vec![];
    let mut datasets = vec![];
    let mut pending = vec![root.clone()];
    while let Some(group) = pending.pop() {
        let info = group.loc_info()?;
        if seen.contains(&(info.fileno, info.token)) {
            continue;
        }
        seen.push((info.fileno, info.token));
        for ds in group.datasets()? {
            let info = ds.loc_info()?;
            if !seen.contains(&(info.fileno, info.token)) {
                seen.push((info.fileno, info.token));
                datasets.push(ds);
            }
        }
        pending.extend(group.groups()?);
    }
    Ok(datasets)
}

/// One named dataset of an [`Hdf5Tensor`].
pub struct Hdf5Column {
    path: PathBuf,
    key: String,
    ds: hdf5::Dataset,
    dtype: Dtype,
    shape: Vec<usize>,
}

impl Debug for Hdf5Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hdf5Column")
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .finish()
    }
}

impl Hdf5Column {
    fn new(path: &Path, key: &str, ds: hdf5::Dataset) -> Result<Self> {
        let key = normalize_key(key)?;
        let dtype = Dtype::of_dataset(&ds)?;
        let shape = ds.shape();
        ensure!(!shape.is_empty(), "dataset {} is scalar and has no rows", key);
        Ok(Self { path: path.to_path_buf(), key, ds, dtype, shape })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of rows (the leading dimension).
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the whole column into a dense array.
    pub fn to_array<T: H5Type>(&self) -> Result<ArrayD<T>> {
        self.to_array_impl().map_err(|err| err.in_file(&self.path))
    }

    fn to_array_impl<T: H5Type>(&self) -> Result<ArrayD<T>> {
        check_dtype::<T>(self.dtype, &self.key)?;
        let arr = self.ds.read_dyn::<T>()?;
        debug!(key = %self.key, shape = ?arr.shape(), "materialized column");
        Ok(arr)
    }

    /// Reads rows `range` of the column into a dense array.
    pub fn read_rows<T: H5Type>(&self, range: Range<usize>) -> Result<ArrayD<T>> {
        check_dtype::<T>(self.dtype, &self.key)
            .and_then(|_| read_row_range(&self.ds, &self.key, &self.shape, range))
            .map_err(|err| err.in_file(&self.path))
    }
}
