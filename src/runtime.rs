use anyhow::{Context, Result};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Host/system abstraction for the two effects the filter performs:
/// marker-file probes and reading the wall clock.
#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    /// Checks whether `path` exists. Unlike `Path::exists`, an inaccessible
    /// parent directory surfaces as an error instead of `false`, so callers
    /// can distinguish "absent" from "could not probe".
    fn try_exists(&self, path: &Path) -> Result<bool>;

    /// Seconds since the unix epoch.
    fn unix_timestamp(&self) -> u64;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn try_exists(&self, path: &Path) -> Result<bool> {
        path.try_exists().context("Failed to probe path existence")
    }

    #[tracing::instrument(skip(self))]
    fn unix_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
