//! Handing finished artifacts to their destination.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::export::Artifact;

/// A destination for finished artifacts.
pub trait Delivery {
    /// Deliver one artifact. Called only with a complete artifact.
    fn deliver(&self, artifact: &Artifact) -> Result<()>;
}

/// Writes artifacts into a directory under their own file name.
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Where `artifact` will be written.
    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        // Artifact names come from user titles; never let them leave the directory
        let name = Path::new(&artifact.file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "export".into());
        self.dir.join(name)
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&self, artifact: &Artifact) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(artifact);
        fs::write(&path, &artifact.bytes)?;
        tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
        Ok(())
    }
}
