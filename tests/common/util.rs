use std::path::Path;

use lazy_static::lazy_static;
use rand::prelude::{SeedableRng, SmallRng};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use hdf5_io::fixture::{create_fixtures, Fixture, FixtureSpec};

lazy_static! {
    static ref TRACING: () = {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    };
}

/// Installs a test-friendly tracing subscriber once per test binary (filtered by `RUST_LOG`).
pub fn init_tracing() {
    lazy_static::initialize(&TRACING);
}

/// Generates fixtures into a fresh temporary directory and passes both to `func`.
///
/// The directory is removed when `func` returns or panics.
pub fn with_fixtures<F>(spec: &FixtureSpec, seed: u64, func: F)
where
    F: FnOnce(&Path, &[Fixture]),
{
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    let fixtures = create_fixtures(dir.path(), spec, &mut rng).unwrap();
    func(dir.path(), &fixtures);
}
