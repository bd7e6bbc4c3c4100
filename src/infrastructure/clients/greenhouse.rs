use crate::config::GreenhouseSite;
use crate::domain::{JobRecord, JobSource};
use crate::error::{HarvestError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct GreenhouseBoard {
    #[serde(default)]
    pub jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
pub struct GreenhouseJob {
    #[serde(default)]
    pub title: Option<String>,
    /// Usually `{ "name": "..." }`, but not always an object
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub absolute_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl GreenhouseJob {
    fn location_name(&self) -> &str {
        match &self.location {
            Some(Value::Object(map)) => map.get("name").and_then(Value::as_str).unwrap_or(""),
            _ => "",
        }
    }

    fn job_url(&self) -> &str {
        self.absolute_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(self.url.as_deref())
            .unwrap_or("")
    }

    pub fn into_record(self, company: &str) -> JobRecord {
        JobRecord::new(
            JobSource::Greenhouse,
            company,
            self.title.as_deref().unwrap_or(""),
            self.location_name(),
            self.job_url(),
        )
    }
}

pub struct GreenhouseClient {
    client: Client,
}

impl GreenhouseClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn board_url(site: &GreenhouseSite) -> String {
        format!(
            "{}/v1/boards/{}/jobs?content=true",
            site.api_base.trim_end_matches('/'),
            site.board
        )
    }

    pub async fn fetch_jobs(&self, site: &GreenhouseSite) -> Result<Vec<JobRecord>> {
        let url = Self::board_url(site);
        info!("Fetching Greenhouse board {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            error!("Greenhouse API error: Status {}", response.status());
            return Err(HarvestError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let board: GreenhouseBoard = response.json().await?;
        let jobs = parse_board(board, &site.company);
        info!("Found {} Greenhouse jobs for {}", jobs.len(), site.company);
        Ok(jobs)
    }
}

pub fn parse_board(board: GreenhouseBoard, company: &str) -> Vec<JobRecord> {
    board
        .jobs
        .into_iter()
        .map(|job| job.into_record(company))
        .collect()
}
