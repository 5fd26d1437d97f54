//! Workspace manager
//!
//! Each job gets a uniquely named directory holding its source file, stdin
//! file and build artifacts. The directory is removed on every exit path:
//! `release()` on the normal paths, and the owned `TempDir` drop if the
//! coordinating task panics or is cancelled.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};

/// Name of the materialized stdin file
pub const STDIN_FILE: &str = "input.txt";

/// Handle to one job's isolated directory
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    source_path: PathBuf,
    stdin_path: PathBuf,
}

impl Workspace {
    /// Create the workspace directory under `root`, named after the job id,
    /// and materialize the source and stdin files.
    pub async fn acquire(
        root: &Path,
        job_id: &str,
        source_file: &str,
        source_code: &str,
        stdin: &str,
    ) -> Result<Self> {
        fs::create_dir_all(root)
            .await
            .with_context(|| format!("failed to create workspace root {:?}", root))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(root)
            .with_context(|| format!("failed to create workspace under {:?}", root))?;

        let source_path = dir.path().join(source_file);
        fs::write(&source_path, source_code)
            .await
            .with_context(|| format!("failed to write source file {:?}", source_path))?;

        let stdin_path = dir.path().join(STDIN_FILE);
        fs::write(&stdin_path, stdin)
            .await
            .with_context(|| format!("failed to write stdin file {:?}", stdin_path))?;

        debug!("Workspace acquired at {:?}", dir.path());

        Ok(Self {
            dir,
            source_path,
            stdin_path,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn stdin_path(&self) -> &Path {
        &self.stdin_path
    }

    /// Remove generated artifacts matching the given glob patterns, then the
    /// whole directory. Failures are logged rather than propagated so that a
    /// cleanup hiccup never masks the job's real outcome.
    pub async fn release(self, artifact_globs: &[String]) {
        if !artifact_globs.is_empty() {
            if let Err(e) = remove_matching(self.dir.path(), artifact_globs).await {
                warn!("Failed to remove artifacts in {:?}: {}", self.dir.path(), e);
            }
        }

        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove workspace {:?}: {}", path, e);
        } else {
            debug!("Workspace released at {:?}", path);
        }
    }
}

/// Delete every top-level file in `dir` whose name matches one of the
/// patterns. Patterns support a single `*` wildcard (e.g. `*.class`).
async fn remove_matching(dir: &Path, patterns: &[String]) -> Result<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.metadata().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if patterns.iter().any(|p| matches_pattern(p, name)) {
            fs::remove_file(entry.path())
                .await
                .with_context(|| format!("failed to remove artifact {:?}", entry.path()))?;
        }
    }
    Ok(())
}

fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => pattern == name,
    }
}
