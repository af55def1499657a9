//! Project folders and stage file naming.
//!
//! Each input gets a `Proj-<base>` folder under the projects directory;
//! every stage writes its output there under a fixed naming scheme so a
//! finished project is self-describing on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Ensure a directory exists (mkdir -p style).
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Write text to a file, creating parent dirs if necessary.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

/// Read a text file if it exists, else return the provided default.
pub fn read_text(path: &Path, default: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| default.to_string())
}

/// Create (if needed) and return the project folder for a given base name.
pub fn make_project_folder(projects_dir: &Path, base: &str) -> Result<PathBuf> {
    let project = projects_dir.join(format!("Proj-{}", base));
    ensure_dir(&project)?;
    Ok(project)
}

/// Standardized output paths for one project.
#[derive(Debug, Clone)]
pub struct StagePaths {
    project_dir: PathBuf,
    base: String,
}

impl StagePaths {
    pub fn new(project_dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            base: base.into(),
        }
    }

    pub fn asr(&self) -> PathBuf {
        self.project_dir.join(format!("{}-ASR.txt", self.base))
    }

    pub fn clean(&self) -> PathBuf {
        self.project_dir.join(format!("{}-ASR-Clean.txt", self.base))
    }

    pub fn translated(&self, lang: &str) -> PathBuf {
        self.project_dir
            .join(format!("{}-{}-Translated.txt", self.base, lang))
    }

    pub fn tts(&self, lang: &str) -> PathBuf {
        self.project_dir.join(format!("{}-{}-TTS.wav", self.base, lang))
    }
}
