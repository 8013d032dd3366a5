//! Docker Compose rendering

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::utils::sha256_hash;

/// Placeholder replaced by the requested docker tag
pub const TAG_PLACEHOLDER: &str = "${DOCKER_TAG}";

/// Compose text and optional pre-launch script ready to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCompose {
    pub docker_compose_file: String,
    pub pre_launch_script: Option<String>,

    /// Number of tag placeholders replaced
    pub substitutions: usize,
}

/// Reads compose inputs from the checked-out workspace
#[derive(Debug, Clone)]
pub struct ComposeRenderer {
    workspace: PathBuf,
}

impl ComposeRenderer {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// Render the compose file for `docker_tag`, never touching the source
    pub async fn render(
        &self,
        compose_path: &Path,
        docker_tag: &str,
        prelaunch_path: Option<&Path>,
    ) -> Result<RenderedCompose, DeployError> {
        let raw = self.read(compose_path, "Docker Compose").await?;
        let (docker_compose_file, substitutions) = substitute_tag(&raw, docker_tag);

        if substitutions == 0 {
            warn!(
                "No {} placeholder found in {}; the compose file is used as-is",
                TAG_PLACEHOLDER,
                compose_path.display()
            );
        } else {
            info!("Using Docker tag: {} ({} substitution(s))", docker_tag, substitutions);
        }

        let pre_launch_script = match prelaunch_path {
            Some(path) => Some(self.read(path, "Pre-launch script").await?),
            None => None,
        };

        debug!(
            "Rendered compose digest: {}",
            &sha256_hash(docker_compose_file.as_bytes())[..12]
        );

        Ok(RenderedCompose {
            docker_compose_file,
            pre_launch_script,
            substitutions,
        })
    }

    /// Read a workspace file, refusing paths that escape the workspace
    pub async fn read(&self, path: &Path, purpose: &str) -> Result<String, DeployError> {
        let resolved = self.resolve(path, purpose).await?;
        File::new(resolved).read_string().await
    }

    async fn resolve(&self, path: &Path, purpose: &str) -> Result<PathBuf, DeployError> {
        let not_found = || DeployError::FileNotFound {
            purpose: purpose.to_string(),
            path: path.display().to_string(),
        };

        let workspace = tokio::fs::canonicalize(&self.workspace)
            .await
            .map_err(|_| not_found())?;
        let candidate = tokio::fs::canonicalize(workspace.join(path))
            .await
            .map_err(|_| not_found())?;

        if !candidate.starts_with(&workspace) {
            warn!(
                "{} path {} resolves outside the workspace",
                purpose,
                path.display()
            );
            return Err(not_found());
        }
        if !tokio::fs::metadata(&candidate).await?.is_file() {
            return Err(not_found());
        }
        Ok(candidate)
    }
}

/// Replace every tag placeholder, returning the text and replacement count
pub fn substitute_tag(text: &str, docker_tag: &str) -> (String, usize) {
    let count = text.matches(TAG_PLACEHOLDER).count();
    (text.replace(TAG_PLACEHOLDER, docker_tag), count)
}
