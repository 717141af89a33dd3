//! Fragment working directories

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const FRAGMENTS_DIR: &str = "fragments";

/// Creates the isolated working directory a fragment runs in
#[async_trait]
pub trait WorkspacePreparer: Send + Sync {
    async fn prepare_fragment(&self, scenario_dir: &Path, region: &str) -> io::Result<PathBuf>;
}

/// Copies the scenario's template files into `<dir>/fragments/<region>`.
///
/// Only `*.tf`, `*.tfvars` and `*.json` files from the top level are
/// copied; `.terraform/` and state files stay behind so each fragment
/// starts from empty state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyWorkdir;

impl CopyWorkdir {
    fn is_template_file(path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with("terraform.tfstate") {
            return false;
        }
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("tf" | "tfvars" | "json")
        )
    }
}

pub fn fragment_dir(scenario_dir: &Path, region: &str) -> PathBuf {
    scenario_dir.join(FRAGMENTS_DIR).join(region)
}

#[async_trait]
impl WorkspacePreparer for CopyWorkdir {
    async fn prepare_fragment(&self, scenario_dir: &Path, region: &str) -> io::Result<PathBuf> {
        let target = fragment_dir(scenario_dir, region);
        fs::create_dir_all(&target).await?;

        let mut entries = fs::read_dir(scenario_dir).await?;
        let mut copied = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !Self::is_template_file(&path) {
                continue;
            }
            fs::copy(&path, target.join(entry.file_name())).await?;
            copied += 1;
        }

        tracing::debug!(region = %region, files = copied, "Prepared fragment workspace: {}", target.display());
        Ok(target)
    }
}
