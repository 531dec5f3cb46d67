use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    curves: HashMap<String, String>,
    presets: HashMap<String, String>,
}

/// Directory holding every fixture file; usable as a `FileSource` root.
pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// `<time>_<value>` time-series files.
pub mod curves {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.curves.keys().cloned().collect()
    }

    pub fn text(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.curves, "curve", name)?)
    }

    /// Locator relative to [`fixtures_root`].
    pub fn locator(name: &str) -> Result<String> {
        lookup(&MANIFEST.curves, "curve", name).map(str::to_string)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.curves, "curve", name)?))
    }
}

/// Keyframe preset CSVs.
pub mod presets {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.presets.keys().cloned().collect()
    }

    pub fn text(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.presets, "preset", name)?)
    }

    pub fn locator(name: &str) -> Result<String> {
        lookup(&MANIFEST.presets, "preset", name).map(str::to_string)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.presets, "preset", name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_exists() {
        for key in curves::keys() {
            assert!(curves::path(&key).unwrap().is_file(), "missing curve {key}");
        }
        for key in presets::keys() {
            assert!(presets::path(&key).unwrap().is_file(), "missing preset {key}");
        }
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(curves::text("nope").is_err());
        assert!(presets::locator("nope").is_err());
    }
}
