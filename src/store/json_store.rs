use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::exam::submission::Submission;

/// Results directory holding one JSON file per submitted exam.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(results_dir: &str) -> Result<Self> {
        Self::with_base_dir(PathBuf::from(results_dir))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating results dir {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Write through a temporary file and rename, so a crash never leaves a
    /// half-written submission behind.
    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<PathBuf> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// First name based on `name` that no existing file uses.
    fn unused_name(&self, name: &str) -> String {
        let stem = name.strip_suffix(".json").unwrap_or(name);
        let mut candidate = name.to_string();
        let mut n = 1;
        while self.file_path(&candidate).exists() {
            candidate = format!("{stem}-{n}.json");
            n += 1;
        }
        candidate
    }

    /// Never overwrites an earlier submission.
    pub fn save_submission(&self, submission: &Submission) -> Result<PathBuf> {
        let name = self.unused_name(&submission.file_name());
        let path = self.save(&name, submission)?;
        info!(path = %path.display(), "submission saved");
        Ok(path)
    }

    /// All readable submissions, newest first. Files that fail to parse are
    /// skipped.
    pub fn load_submissions(&self) -> Vec<Submission> {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return Vec::new();
        };
        let mut submissions: Vec<Submission> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("json"))
            .filter_map(|path| {
                let content = fs::read_to_string(&path).ok()?;
                match serde_json::from_str(&content) {
                    Ok(submission) => Some(submission),
                    Err(err) => {
                        warn!(path = %path.display(), %err, "skipping unreadable submission");
                        None
                    }
                }
            })
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        submissions
    }
}
