use crate::domain::storage::{Storage, StorageKeys};
use crate::domain::{RunManifest, SiteJobs};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone)]
pub struct FileSystemStore {
    out_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir)?;
        }
        Ok(())
    }

    fn write_json_file<T: serde::Serialize + ?Sized>(&self, file: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.out_dir.join(file);
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&path, content)?;
        info!("Wrote {:?}", path);
        Ok(())
    }
}

impl Storage for FileSystemStore {
    fn save_site_jobs(&self, site_jobs: &SiteJobs) -> Result<()> {
        self.write_json_file(&site_jobs.output, &site_jobs.jobs)
    }

    fn save_manifest(&self, manifest: &RunManifest) -> Result<()> {
        self.write_json_file(StorageKeys::MANIFEST, manifest)
    }
}
