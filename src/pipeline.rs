//! Minimal data-pipeline combinators: zipping fallible streams and an
//! order-preserving parallel map.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::error::Result;

/// Default number of concurrent calls for [`ParallelMap`].
pub const DEFAULT_PARALLEL_CALLS: usize = 4;

/// Pairs up two fallible streams element by element.
///
/// The stream ends when either side is exhausted. The first error from either
/// side is yielded, after which the stream ends.
pub fn zip<A, B, X, Y>(a: A, b: B) -> Zip<A::IntoIter, B::IntoIter>
where
    A: IntoIterator<Item = Result<X>>,
    B: IntoIterator<Item = Result<Y>>,
{
    Zip { a: a.into_iter(), b: b.into_iter(), done: false }
}

/// Iterator returned by [`zip`].
pub struct Zip<A, B> {
    a: A,
    b: B,
    done: bool,
}

impl<A, B, X, Y> Iterator for Zip<A, B>
where
    A: Iterator<Item = Result<X>>,
    B: Iterator<Item = Result<Y>>,
{
    type Item = Result<(X, Y)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match (self.a.next(), self.b.next()) {
            (Some(Ok(x)), Some(Ok(y))) => Some(Ok((x, y))),
            (Some(Err(err)), _) | (_, Some(Err(err))) => {
                self.done = true;
                Some(Err(err))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let (a_lo, a_hi) = self.a.size_hint();
        let (b_lo, b_hi) = self.b.size_hint();
        let hi = match (a_hi, b_hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        (a_lo.min(b_lo), hi)
    }
}

/// Applies a function to every input on a dedicated pool of worker threads.
///
/// Inputs are processed concurrently in no particular order, but outputs are
/// always returned in input order.
#[derive(Clone, Debug)]
pub struct ParallelMap {
    num_parallel_calls: usize,
}

impl Default for ParallelMap {
    fn default() -> Self {
        Self { num_parallel_calls: DEFAULT_PARALLEL_CALLS }
    }
}

impl ParallelMap {
    pub fn new(num_parallel_calls: usize) -> Result<Self> {
        ensure!(num_parallel_calls > 0, "num_parallel_calls must be positive");
        Ok(Self { num_parallel_calls })
    }

    pub fn num_parallel_calls(&self) -> usize {
        self.num_parallel_calls
    }

    /// Maps `func` over `inputs`.
    ///
    /// Every input is processed even if some fail; the error of the first failed
    /// input (in input order) is returned.
    pub fn run<I, O, F>(&self, inputs: &[I], func: F) -> Result<Vec<O>>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> Result<O> + Sync + Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.num_parallel_calls)
            .thread_name(|i| format!("hdf5-io-map-{i}"))
            .build()
            .map_err(|err| format!("failed to build thread pool: {err}"))?;
        debug!(inputs = inputs.len(), threads = self.num_parallel_calls, "running parallel map");
        let results: Vec<Result<O>> = pool.install(|| inputs.par_iter().map(&func).collect());
        results.into_iter().collect()
    }
}

/// Shorthand for `ParallelMap::new(num_parallel_calls)?.run(inputs, func)`.
pub fn map_parallel<I, O, F>(inputs: &[I], num_parallel_calls: usize, func: F) -> Result<Vec<O>>
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> Result<O> + Sync + Send,
{
    ParallelMap::new(num_parallel_calls)?.run(inputs, func)
}
