use crate::domain::job::SiteJobs;
use chrono::Local;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSummary {
    pub site: String,
    pub file: String,
    pub count: usize,
    pub status: SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteSummary {
    pub fn ok(site_jobs: &SiteJobs) -> Self {
        Self {
            site: site_jobs.site.clone(),
            file: site_jobs.output.clone(),
            count: site_jobs.jobs.len(),
            status: SiteStatus::Ok,
            error: None,
        }
    }

    pub fn failed(site: &str, file: &str, error: String) -> Self {
        Self {
            site: site.to_string(),
            file: file.to_string(),
            count: 0,
            status: SiteStatus::Failed,
            error: Some(error),
        }
    }

    pub fn skipped(site: &str, file: &str) -> Self {
        Self {
            site: site.to_string(),
            file: file.to_string(),
            count: 0,
            status: SiteStatus::Skipped,
            error: None,
        }
    }
}

/// Summary of a harvest run, written next to the per-employer files.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub last_updated: String,
    pub total_jobs: usize,
    pub sites: Vec<SiteSummary>,
    pub version: String,
}

impl RunManifest {
    pub fn new(sites: Vec<SiteSummary>) -> Self {
        Self {
            last_updated: Local::now().to_rfc3339(),
            total_jobs: sites.iter().map(|s| s.count).sum(),
            sites,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn failures(&self) -> usize {
        self.sites
            .iter()
            .filter(|s| s.status == SiteStatus::Failed)
            .count()
    }
}
