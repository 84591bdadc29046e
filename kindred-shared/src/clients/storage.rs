use std::io;
use std::path::{Path, PathBuf};

/// Local-disk store for processed photos.
///
/// Writes land in a hidden `.{name}.part` staging file first and are renamed
/// into place, so a reader never observes a half-written photo.
#[derive(Clone, Debug)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::info!(root = %root.display(), "photo storage initialized");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    /// Store `bytes` under `filename` and return the final path.
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let target = self.path_for(filename)?;
        let staging = self.root.join(format!(".{filename}.part"));

        let result = async {
            tokio::fs::write(&staging, bytes).await?;
            tokio::fs::rename(&staging, &target).await
        }
        .await;

        if let Err(e) = result {
            discard(&staging).await;
            discard(&target).await;
            tracing::error!(error = %e, filename = %filename, "failed to store photo");
            return Err(e);
        }

        tracing::debug!(filename = %filename, size = bytes.len(), "photo stored");
        Ok(target)
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %path.display(), "failed to clean up partial photo");
        }
    }
}

fn validate_filename(filename: &str) -> io::Result<()> {
    let ok = !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
        && filename != "..";
    if ok {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid photo filename: {filename:?}"),
        ))
    }
}
