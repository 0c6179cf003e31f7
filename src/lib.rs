//! HDF5 datasets for data pipelines.
//!
//! This crate exposes the datasets stored in `HDF5` files to data pipelines in two
//! forms:
//!
//! - [`Hdf5Dataset`]: a lazy, row-iterable view over a single named dataset, read from
//!   the file in fixed-size blocks of rows.
//! - [`Hdf5Tensor`]: a multi-key view over a file driven by a [`Schema`] mapping dataset
//!   keys to element types; each [`Hdf5Column`] materializes into an `ndarray` array.
//!
//! Rows of two datasets are paired with [`zip`], and per-file work is spread over a
//! thread pool with [`ParallelMap`], which always returns results in input order.
//! The [`fixture`] module writes synthetic files for tests and benchmarks, and the
//! [`scan`] module runs complete eager and parallel passes over a directory of them.
//!
//! All `HDF5` access goes through the thread-safe `hdf5` bindings, so handles may be
//! used from pool threads.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod export {
    pub use crate::{
        dataset::{Batches, DatasetOptions, Hdf5Dataset, Rows, DEFAULT_CAPACITY},
        error::{Error, Result},
        pipeline::{map_parallel, zip, ParallelMap, Zip, DEFAULT_PARALLEL_CALLS},
        schema::{Dtype, Schema},
        tensor::{Hdf5Column, Hdf5Tensor},
        util::{list_files, normalize_key},
    };
}

pub use crate::export::*;

#[macro_use]
mod macros;

mod dataset;
mod error;
mod pipeline;
mod schema;
mod tensor;
mod util;

pub mod fixture;
pub mod scan;
