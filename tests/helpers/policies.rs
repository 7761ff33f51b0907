use std::fs;
use std::path::Path;

use gatehouse::gates::loader::load_policies;
use gatehouse::gates::RuleStore;
use tempfile::TempDir;

/// Policy directory with automatic cleanup
pub struct TestPolicies {
    dir: TempDir,
}

impl TestPolicies {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write `<name>.kdl` into the directory.
    pub fn with_file(self, name: &str, content: &str) -> Self {
        fs::write(self.dir.path().join(format!("{name}.kdl")), content)
            .expect("Failed to write policy file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn load(&self) -> RuleStore {
        load_policies(self.path()).expect("Failed to load policies")
    }
}

impl Default for TestPolicies {
    fn default() -> Self {
        Self::new()
    }
}
