//! Decides whether a single plugin or theme is excluded from update checks.

use log::warn;
use std::collections::HashSet;
use std::path::Path;

use crate::runtime::Runtime;

/// True if `identifier` is explicitly blocklisted or its install directory
/// contains one of the version-control marker files.
///
/// Blocklist membership is an exact, case-sensitive match. Markers are
/// scanned in configuration order and the first hit wins; each probe is a
/// synchronous filesystem check. `install_dir == None` means the item has no
/// directory of its own, so only the explicit blocklist applies.
pub fn is_blocked<R: Runtime>(
    runtime: &R,
    identifier: &str,
    install_dir: Option<&Path>,
    explicit: &HashSet<String>,
    markers: &[String],
) -> bool {
    if explicit.contains(identifier) {
        return true;
    }

    let Some(dir) = install_dir else {
        return false;
    };

    markers.iter().any(|marker| {
        match runtime.try_exists(&dir.join(marker)) {
            Ok(found) => found,
            Err(e) => {
                // Fail open: an unprobeable directory must not block a
                // legitimate update.
                warn!(
                    "Marker probe for {} in {} failed ({}), treating as not blocked",
                    marker,
                    dir.display(),
                    e
                );
                false
            }
        }
    })
}
