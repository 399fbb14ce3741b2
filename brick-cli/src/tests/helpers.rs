//! Scratch catalogues and output capture for CLI tests.

use brick_core::test_support::{sample_records, write_reference_database};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tempfile::TempDir;

use crate::catalogue::CatalogueConfig;

/// A bundled catalogue written to a temporary directory, plus a destination
/// for the provisioned copy.
pub(super) struct ScratchCatalogue {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ScratchCatalogue {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        write_reference_database(&root.join("bundled.db"), &sample_records())
            .expect("write bundled catalogue");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("databases").join("lego_sets.db")
    }

    pub(super) fn config(&self) -> CatalogueConfig {
        CatalogueConfig::from_layers(
            Some(self.root.join("bundled.db")),
            Some(self.database()),
            None,
        )
    }
}

/// Parse everything written to `buffer` as one JSON document.
pub(super) fn json_output(buffer: &[u8]) -> Value {
    serde_json::from_slice(buffer).expect("command output should be JSON")
}

/// Parse `buffer` as newline-delimited JSON.
pub(super) fn json_lines(buffer: &[u8]) -> Vec<Value> {
    std::str::from_utf8(buffer)
        .expect("utf-8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}
