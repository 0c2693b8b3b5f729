//! Filesystem artifact repository: one folder per node under a root directory.
//!
//! Node ids are opaque, so folder names are the percent-encoded id. `a/b`
//! lives in `<root>/a%2Fb`, and `..` in `<root>/%2E%2E`.

use crate::traits::{ArtifactHandle, ArtifactRepository};
use crate::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use provenance_types::NodeId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Node payload folders stored as `<root>/<encoded node id>/`.
#[derive(Clone, Debug)]
pub struct FsArtifactRepository {
    root: PathBuf,
}

impl FsArtifactRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder that holds (or would hold) the payload of `node_id`.
    pub fn artifact_path(&self, node_id: &NodeId) -> RepositoryResult<PathBuf> {
        if node_id.as_str().is_empty() {
            return Err(RepositoryError::InvalidLocation(
                "empty node id has no artifact folder".to_string(),
            ));
        }
        Ok(self.root.join(folder_name(node_id)))
    }

    /// Create the folder for a node and return its path.
    pub async fn ensure_artifact(&self, node_id: &NodeId) -> RepositoryResult<PathBuf> {
        let path = self.artifact_path(node_id)?;
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    fn checked_location(&self, handle: &ArtifactHandle) -> RepositoryResult<PathBuf> {
        let path = PathBuf::from(&handle.location);
        if path.parent() != Some(self.root.as_path()) {
            return Err(RepositoryError::InvalidLocation(handle.location.clone()));
        }
        Ok(path)
    }
}

#[async_trait]
impl ArtifactRepository for FsArtifactRepository {
    async fn locate_artifact(&self, node_id: &NodeId) -> RepositoryResult<Option<ArtifactHandle>> {
        let path = self.artifact_path(node_id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(ArtifactHandle {
                node_id: node_id.clone(),
                location: path.to_string_lossy().into_owned(),
            })),
            Ok(_) => Err(RepositoryError::InvalidLocation(format!(
                "{} is not a directory",
                path.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn erase(&self, handle: &ArtifactHandle, force: bool) -> RepositoryResult<()> {
        let path = self.checked_location(handle)?;
        let result = if force {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_dir(&path).await
        };
        match result {
            Ok(()) => {
                debug!(node_id = %handle.node_id, path = %path.display(), "Erased artifact folder");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                if !force && is_not_empty(&path).await {
                    return Err(RepositoryError::NotEmpty(handle.location.clone()));
                }
                Err(e.into())
            }
        }
    }
}

/// Single path segment for a node id. Dot-only ids are encoded too, since
/// `urlencoding` leaves `.` alone.
fn folder_name(node_id: &NodeId) -> String {
    let encoded = urlencoding::encode(node_id.as_str());
    if encoded.chars().all(|c| c == '.') {
        encoded.replace('.', "%2E")
    } else {
        encoded.into_owned()
    }
}

async fn is_not_empty(path: &Path) -> bool {
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}
