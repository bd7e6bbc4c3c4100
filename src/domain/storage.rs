use super::{RunManifest, SiteJobs};
use crate::error::Result;

pub trait Storage: Send + Sync {
    fn save_site_jobs(&self, site_jobs: &SiteJobs) -> Result<()>;
    fn save_manifest(&self, manifest: &RunManifest) -> Result<()>;
}

pub struct StorageKeys;

impl StorageKeys {
    pub const MANIFEST: &'static str = "manifest.json";
}
