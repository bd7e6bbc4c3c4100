use crate::utils::clean_text;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a posting was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Greenhouse,
    Icims,
    Apple,
    Workday,
}

/// A single normalized job posting, as written to the output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub source: JobSource,
    pub company: String,
    pub title: String,
    pub location: String,
    pub url: String,
}

impl JobRecord {
    pub fn new(source: JobSource, company: &str, title: &str, location: &str, url: &str) -> Self {
        Self {
            source,
            company: company.to_string(),
            title: clean_text(title),
            location: clean_text(location),
            url: url.to_string(),
        }
    }

    /// Replaces an empty title with the site's placeholder.
    pub fn with_placeholder_title(mut self, placeholder: &str) -> Self {
        if self.title.is_empty() {
            self.title = placeholder.to_string();
        }
        self
    }
}

/// Everything collected from one site in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteJobs {
    pub site: String,
    pub output: String,
    pub jobs: Vec<JobRecord>,
}

impl SiteJobs {
    pub fn new(site: impl Into<String>, output: impl Into<String>, jobs: Vec<JobRecord>) -> Self {
        Self {
            site: site.into(),
            output: output.into(),
            jobs,
        }
    }
}

/// Accumulates records across pages or extraction passes, dropping repeated URLs.
#[derive(Debug, Default)]
pub struct JobCollector {
    seen: HashSet<String>,
    jobs: Vec<JobRecord>,
}

impl JobCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many of the given records were new.
    pub fn extend(&mut self, records: impl IntoIterator<Item = JobRecord>) -> usize {
        let before = self.jobs.len();
        for record in records {
            if self.seen.insert(record.url.clone()) {
                self.jobs.push(record);
            }
        }
        self.jobs.len() - before
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn into_jobs(self) -> Vec<JobRecord> {
        self.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_in_field_order() {
        let job = JobRecord::new(
            JobSource::Workday,
            "Zillow",
            " Senior\n Engineer ",
            "Remote,  USA",
            "https://example.com/job/1",
        );
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(
            json,
            r#"{"source":"workday","company":"Zillow","title":"Senior Engineer","location":"Remote, USA","url":"https://example.com/job/1"}"#
        );
    }

    #[test]
    fn placeholder_only_fills_empty_titles() {
        let empty = JobRecord::new(JobSource::Icims, "Liberty Mutual", "  ", "", "u")
            .with_placeholder_title("(Job)");
        assert_eq!(empty.title, "(Job)");

        let named = JobRecord::new(JobSource::Icims, "Liberty Mutual", "Actuary", "", "u")
            .with_placeholder_title("(Job)");
        assert_eq!(named.title, "Actuary");
    }

    #[test]
    fn collector_drops_repeated_urls() {
        let job = |title: &str, url: &str| JobRecord::new(JobSource::Workday, "Zillow", title, "", url);
        let mut collector = JobCollector::new();

        assert_eq!(collector.extend(vec![job("A", "/1"), job("B", "/2")]), 2);
        assert_eq!(collector.extend(vec![job("A again", "/1"), job("C", "/3")]), 1);
        assert_eq!(collector.extend(Vec::new()), 0);

        let titles: Vec<_> = collector.into_jobs().into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }
}
