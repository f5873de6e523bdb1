//! Desktop application stage.
//!
//! Platform support is behind the [`WallpaperApplier`] trait. Only
//! macOS has a real implementation; every other platform reports
//! [`ApplyError::Unsupported`] so the run degrades to partial success
//! with the artifact preserved on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::pipeline::generate::WallpaperArtifact;
use crate::scheduler::JobContext;

const OSASCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("wallpaper file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("setting the desktop wallpaper is not supported on {0}")]
    Unsupported(&'static str),
    #[error("wallpaper command failed: {0}")]
    CommandFailed(String),
    #[error("wallpaper command timed out")]
    Timeout,
}

/// Platform-specific mechanism for changing the desktop background.
#[async_trait]
pub trait WallpaperApplier: Send + Sync {
    async fn apply(&self, path: &Path) -> Result<(), ApplyError>;
}

/// Sets the wallpaper through Finder via `osascript`.
pub struct MacosWallpaperApplier;

#[async_trait]
impl WallpaperApplier for MacosWallpaperApplier {
    async fn apply(&self, path: &Path) -> Result<(), ApplyError> {
        let script = finder_script(path);

        let command = tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .output();

        let output = tokio::time::timeout(OSASCRIPT_TIMEOUT, command)
            .await
            .map_err(|_| ApplyError::Timeout)?
            .map_err(|error| ApplyError::CommandFailed(error.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ApplyError::CommandFailed(stderr));
        }

        Ok(())
    }
}

fn finder_script(path: &Path) -> String {
    let escaped = path
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!(
        "tell application \"Finder\" to set desktop picture to POSIX file \"{escaped}\""
    )
}

/// Applier for platforms without wallpaper support.
pub struct UnsupportedApplier {
    os: &'static str,
}

#[async_trait]
impl WallpaperApplier for UnsupportedApplier {
    async fn apply(&self, _path: &Path) -> Result<(), ApplyError> {
        Err(ApplyError::Unsupported(self.os))
    }
}

/// Pick the applier for the current platform.
#[must_use]
pub fn platform_applier() -> Arc<dyn WallpaperApplier> {
    match std::env::consts::OS {
        "macos" => Arc::new(MacosWallpaperApplier),
        os => Arc::new(UnsupportedApplier { os }),
    }
}

#[async_trait]
pub trait ApplyStage: Send + Sync {
    async fn apply(&self, job: &JobContext, artifact: &WallpaperArtifact) -> Result<()>;
}

pub struct DesktopApplyStage {
    applier: Arc<dyn WallpaperApplier>,
}

impl DesktopApplyStage {
    pub fn new(applier: Arc<dyn WallpaperApplier>) -> Self {
        Self { applier }
    }
}

#[async_trait]
impl ApplyStage for DesktopApplyStage {
    async fn apply(&self, job: &JobContext, artifact: &WallpaperArtifact) -> Result<()> {
        if !artifact.file_path.is_file() {
            return Err(ApplyError::MissingFile(artifact.file_path.clone()).into());
        }

        self.applier.apply(&artifact.file_path).await?;
        info!(job_id = %job.job_id, path = %artifact.file_path.display(), "wallpaper applied");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::scheduler::Trigger;

    fn artifact(path: PathBuf) -> WallpaperArtifact {
        WallpaperArtifact {
            file_path: path,
            width: 100,
            height: 100,
        }
    }

    fn job() -> JobContext {
        JobContext::new(Uuid::new_v4(), Trigger::Manual)
    }

    #[test]
    fn finder_script_escapes_quotes_and_backslashes() {
        let script = finder_script(Path::new("/tmp/we\"ird\\name.png"));

        assert!(script.contains("POSIX file \"/tmp/we\\\"ird\\\\name.png\""));
    }

    #[tokio::test]
    async fn missing_file_is_rejected_before_the_applier_runs() {
        let stage = DesktopApplyStage::new(Arc::new(UnsupportedApplier { os: "test" }));

        let error = stage
            .apply(&job(), &artifact(PathBuf::from("/nonexistent/wall.png")))
            .await
            .expect_err("should fail");

        assert!(
            matches!(
                error.downcast_ref::<ApplyError>(),
                Some(ApplyError::MissingFile(_))
            ),
            "unexpected error: {error}"
        );
    }

    #[tokio::test]
    async fn unsupported_platform_reports_unsupported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wall.png");
        std::fs::write(&path, b"png").expect("write");
        let stage = DesktopApplyStage::new(Arc::new(UnsupportedApplier { os: "testos" }));

        let error = stage
            .apply(&job(), &artifact(path))
            .await
            .expect_err("should fail");

        assert!(matches!(
            error.downcast_ref::<ApplyError>(),
            Some(ApplyError::Unsupported("testos"))
        ));
    }
}
