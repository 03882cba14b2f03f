//! Data directory layout

use std::path::{Path, PathBuf};

/// Files and directories under the pantry data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory, e.g. `~/.local/share/pantry` on Linux
    ///
    /// Falls back to `./pantry-data` when the platform has none.
    pub fn platform_default() -> Self {
        let root = dirs::data_dir()
            .map(|dir| dir.join("pantry"))
            .unwrap_or_else(|| PathBuf::from("./pantry-data"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn saved_recipes(&self) -> PathBuf {
        self.root.join("saved_recipes.json")
    }

    pub fn usage(&self) -> PathBuf {
        self.root.join("usage.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = DataPaths::new("/tmp/pantry");
        assert_eq!(paths.cache_dir(), PathBuf::from("/tmp/pantry/cache"));
        assert_eq!(
            paths.saved_recipes(),
            PathBuf::from("/tmp/pantry/saved_recipes.json")
        );
        assert_eq!(paths.usage(), PathBuf::from("/tmp/pantry/usage.json"));
    }
}
