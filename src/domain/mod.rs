mod job;
mod manifest;
pub(crate) mod storage;

pub use job::{JobCollector, JobRecord, JobSource, SiteJobs};
pub use manifest::{RunManifest, SiteStatus, SiteSummary};
