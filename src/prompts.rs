//! Instruction prompt store for the cleanup and translation stages.
//!
//! Prompts live as plain text files so operators can tune wording without
//! rebuilding. Missing files are materialized with the defaults on startup;
//! reads are never cached, so edits take effect on the next stage call.

use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::Result;

const CORRECTOR_FILE: &str = "corrector.txt";
const TRANSLATOR_FILE: &str = "translator.txt";

/// File-backed prompt store rooted at one directory.
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the prompt directory and write default prompt files for any
    /// that are missing. Existing files are left untouched.
    pub fn materialize_defaults(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        for (file, default) in [
            (CORRECTOR_FILE, defaults::DEFAULT_CORRECTOR_PROMPT),
            (TRANSLATOR_FILE, defaults::DEFAULT_TRANSLATOR_PROMPT),
        ] {
            let path = self.dir.join(file);
            if !path.exists() {
                fs::write(&path, default)?;
            }
        }
        Ok(())
    }

    /// Instruction prompt for the text-cleanup stage.
    pub fn corrector(&self) -> String {
        read_or(&self.dir.join(CORRECTOR_FILE), defaults::DEFAULT_CORRECTOR_PROMPT)
    }

    /// Instruction prompt for the translation stage.
    pub fn translator(&self) -> String {
        read_or(&self.dir.join(TRANSLATOR_FILE), defaults::DEFAULT_TRANSLATOR_PROMPT)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Read a text file if it exists, else return the provided default.
fn read_or(path: &Path, default: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| default.to_string())
}
