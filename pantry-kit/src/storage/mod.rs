//! Small JSON-file stores kept next to the recipe cache
//!
//! - [`SavedRecipeBook`]: recipes the user chose to keep
//! - [`UsageTracker`]: monthly image scan quota

pub mod saved;
pub mod usage;

pub use saved::{SavedRecipe, SavedRecipeBook};
pub use usage::{UsagePeriod, UsageTracker, DEFAULT_FREE_MONTHLY_SCANS};

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Read a JSON document, or `None` if the file does not exist yet
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write a JSON document through a temporary file
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
