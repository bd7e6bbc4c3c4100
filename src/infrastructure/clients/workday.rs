use crate::config::WorkdaySite;
use crate::domain::{JobCollector, JobRecord, JobSource};
use crate::error::{HarvestError, Result};
use crate::utils::{clean_opt, title_from_slug};
use reqwest::header::{ACCEPT, ORIGIN, REFERER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const DEFAULT_BOARD: &str = "Zillow_Group_External";

/// Addresses derived from a Workday board URL such as
/// `https://zillow.wd5.myworkdayjobs.com/en-US/Zillow_Group_External`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkdayBoard {
    pub board_url: String,
    /// Scheme, host and any explicit port of the board URL
    pub origin: String,
    pub host: String,
    pub tenant: String,
    pub board: String,
}

impl WorkdayBoard {
    pub fn parse(board_url: &str) -> Result<Self> {
        let parsed = Url::parse(board_url)
            .map_err(|e| HarvestError::Parse(format!("Invalid board URL {board_url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| HarvestError::Parse(format!("Board URL has no host: {board_url}")))?
            .to_string();
        let board = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or(DEFAULT_BOARD)
            .to_string();
        let tenant = host.split('.').next().unwrap_or_default().to_string();

        Ok(Self {
            board_url: board_url.trim_end_matches('/').to_string(),
            origin: parsed.origin().ascii_serialization(),
            host,
            tenant,
            board,
        })
    }

    pub fn cxs_url(&self) -> String {
        format!(
            "{}/wday/cxs/{}/{}/jobs",
            self.origin, self.tenant, self.board
        )
    }

    /// Public posting URL for a CxS `externalPath` (`/job/...`) or a bare path.
    pub fn posting_url(&self, external_path: &str) -> String {
        let path = external_path.trim_start_matches('/');
        let path = path.strip_prefix("job/").unwrap_or(path);
        format!("{}/job/{}", self.board_url, path)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CxsRequest {
    pub applied_facets: serde_json::Map<String, serde_json::Value>,
    pub limit: usize,
    pub offset: usize,
    pub search_text: String,
}

impl CxsRequest {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            applied_facets: serde_json::Map::new(),
            limit,
            offset,
            search_text: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CxsPage {
    #[serde(default)]
    pub job_postings: Vec<CxsPosting>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CxsPosting {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_facet: Option<String>,
    #[serde(default)]
    pub locations_text: Option<String>,
    #[serde(default)]
    pub external_path: Option<String>,
}

impl CxsPosting {
    /// Postings without an `externalPath` cannot be linked and are dropped.
    pub fn into_record(self, board: &WorkdayBoard, site: &WorkdaySite) -> Option<JobRecord> {
        let external_path = self.external_path.filter(|p| !p.trim().is_empty())?;

        let mut title = clean_opt(self.title.as_deref());
        if title.is_empty() {
            title = clean_opt(self.title_facet.as_deref());
        }
        if title.is_empty() {
            title = title_from_slug(&external_path).unwrap_or_default();
        }

        Some(
            JobRecord::new(
                JobSource::Workday,
                &site.company,
                &title,
                self.locations_text.as_deref().unwrap_or(""),
                &board.posting_url(&external_path),
            )
            .with_placeholder_title(&site.placeholder_title),
        )
    }
}

impl CxsPage {
    pub fn into_records(self, board: &WorkdayBoard, site: &WorkdaySite) -> Vec<JobRecord> {
        self.job_postings
            .into_iter()
            .filter_map(|posting| posting.into_record(board, site))
            .collect()
    }
}

/// Decides when to stop walking CxS pages.
#[derive(Debug)]
pub struct CxsPagination {
    pub limit: usize,
    pub offset: usize,
    pub total: Option<u64>,
    max_pages: usize,
    pages: usize,
}

impl CxsPagination {
    pub fn new(limit: usize, max_pages: usize) -> Self {
        Self {
            limit,
            offset: 0,
            total: None,
            max_pages,
            pages: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        if self.pages >= self.max_pages {
            return false;
        }
        match self.total {
            Some(total) if self.pages > 0 => (self.offset as u64) < total,
            _ => true,
        }
    }

    /// Records a fetched batch; returns whether another page should be requested.
    pub fn advance(&mut self, batch_len: usize, new_records: usize, total: Option<u64>) -> bool {
        self.pages += 1;
        // Workday only reports `total` reliably on the first page
        if self.total.is_none() {
            self.total = total.filter(|t| *t > 0);
        }
        if batch_len < self.limit || new_records == 0 {
            return false;
        }
        self.offset += self.limit;
        self.has_next()
    }
}

pub struct WorkdayClient {
    client: Client,
}

impl WorkdayClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_page(&self, board: &WorkdayBoard, request: &CxsRequest) -> Result<CxsPage> {
        let url = board.cxs_url();
        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(40))
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ORIGIN, board.origin.as_str())
            .header(REFERER, &board.board_url)
            .json(request)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(HarvestError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    /// Walks the board's CxS API. A failure after the first page keeps what was collected.
    pub async fn fetch_jobs(&self, board: &WorkdayBoard, site: &WorkdaySite) -> Result<Vec<JobRecord>> {
        let mut collector = JobCollector::new();
        let mut pagination = CxsPagination::new(site.page_size, site.max_pages);

        while pagination.has_next() {
            let request = CxsRequest::page(pagination.limit, pagination.offset);
            let page = match self.fetch_page(board, &request).await {
                Ok(page) => page,
                Err(e) if collector.is_empty() => return Err(e),
                Err(e) => {
                    warn!("[Workday CxS] stopping at offset {}: {}", pagination.offset, e);
                    break;
                }
            };

            let batch_len = page.job_postings.len();
            let total = page.total;
            let added = collector.extend(page.into_records(board, site));
            info!(
                "[Workday CxS] got {} (offset {}) total_so_far={} total_label={:?}",
                batch_len,
                pagination.offset,
                collector.len(),
                pagination.total.or(total)
            );

            if !pagination.advance(batch_len, added, total) {
                break;
            }
        }

        info!(
            "[Workday CxS] final: {} jobs (Workday total label: {:?})",
            collector.len(),
            pagination.total
        );
        Ok(collector.into_jobs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{local_client, CannedServer};

    fn board() -> WorkdayBoard {
        WorkdayBoard::parse("https://zillow.wd5.myworkdayjobs.com/en-US/Zillow_Group_External/")
            .unwrap()
    }

    #[test]
    fn derives_cxs_endpoint_from_board_url() {
        let board = board();
        assert_eq!(board.host, "zillow.wd5.myworkdayjobs.com");
        assert_eq!(board.tenant, "zillow");
        assert_eq!(board.board, "Zillow_Group_External");
        assert_eq!(
            board.cxs_url(),
            "https://zillow.wd5.myworkdayjobs.com/wday/cxs/zillow/Zillow_Group_External/jobs"
        );
        assert_eq!(board.origin, "https://zillow.wd5.myworkdayjobs.com");
    }

    #[test]
    fn board_defaults_when_path_is_empty() {
        let board = WorkdayBoard::parse("https://acme.wd1.myworkdayjobs.com").unwrap();
        assert_eq!(board.board, "Zillow_Group_External");
        assert!(WorkdayBoard::parse("not a url").is_err());
    }

    #[test]
    fn request_body_matches_cxs_shape() {
        let body = serde_json::to_value(CxsRequest::page(50, 100)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"appliedFacets": {}, "limit": 50, "offset": 100, "searchText": ""})
        );
    }

    #[test]
    fn page_postings_become_records() {
        let page: CxsPage = serde_json::from_str(
            r#"{"total": 3, "jobPostings": [
                {"title": "Senior  Software Engineer", "locationsText": "Remote: U.S.",
                 "externalPath": "/job/Remote-USA/Senior-Software-Engineer_P123"},
                {"titleFacet": "Data Analyst", "externalPath": "job/Seattle-WA/Data-Analyst_P456"},
                {"externalPath": "/job/Remote/Product-Designer_P789"},
                {"title": "No link"}
            ]}"#,
        )
        .unwrap();
        let site = WorkdaySite::default();
        let jobs = page.into_records(&board(), &site);

        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].title, "Senior Software Engineer");
        assert_eq!(jobs[0].location, "Remote: U.S.");
        assert_eq!(
            jobs[0].url,
            "https://zillow.wd5.myworkdayjobs.com/en-US/Zillow_Group_External/job/Remote-USA/Senior-Software-Engineer_P123"
        );
        assert_eq!(jobs[1].title, "Data Analyst");
        assert_eq!(
            jobs[1].url,
            "https://zillow.wd5.myworkdayjobs.com/en-US/Zillow_Group_External/job/Seattle-WA/Data-Analyst_P456"
        );
        assert_eq!(jobs[2].title, "Product Designer");
        assert_eq!(jobs[2].source, JobSource::Workday);
    }

    #[test]
    fn pagination_stops_on_short_batch() {
        let mut pagination = CxsPagination::new(50, 60);
        assert!(pagination.has_next());
        assert!(pagination.advance(50, 50, Some(120)));
        assert_eq!(pagination.offset, 50);
        assert!(pagination.advance(50, 50, None));
        assert!(!pagination.advance(20, 20, None));
    }

    #[test]
    fn pagination_stops_when_total_reached_or_nothing_new() {
        let mut pagination = CxsPagination::new(50, 60);
        assert!(!pagination.advance(50, 50, Some(50)));

        let mut stale = CxsPagination::new(50, 60);
        assert!(stale.advance(50, 50, None));
        assert!(!stale.advance(50, 0, None));
    }

    #[test]
    fn pagination_respects_page_cap() {
        let mut pagination = CxsPagination::new(10, 2);
        assert!(pagination.advance(10, 10, None));
        assert!(!pagination.advance(10, 10, None));
    }

    fn cxs_page(offset: usize, count: usize, total: usize) -> String {
        let postings: Vec<String> = (offset..offset + count)
            .map(|i| format!(r#"{{"title":"Role {i}","externalPath":"/job/Remote/Role_P{i}"}}"#))
            .collect();
        format!(r#"{{"total":{total},"jobPostings":[{}]}}"#, postings.join(","))
    }

    fn requested_offset(body: &str) -> u64 {
        serde_json::from_str::<serde_json::Value>(body).unwrap()["offset"]
            .as_u64()
            .unwrap()
    }

    fn local_site(server: &CannedServer) -> (WorkdayBoard, WorkdaySite) {
        let site = WorkdaySite {
            board_url: format!("{}/en-US/Acme_Careers", server.base_url),
            page_size: 2,
            ..WorkdaySite::default()
        };
        (WorkdayBoard::parse(&site.board_url).unwrap(), site)
    }

    #[test]
    fn local_board_keeps_its_scheme_and_port() {
        let board = WorkdayBoard::parse("http://127.0.0.1:8080/en-US/Acme_Careers").unwrap();
        assert_eq!(board.cxs_url(), "http://127.0.0.1:8080/wday/cxs/127/Acme_Careers/jobs");
    }

    #[tokio::test]
    async fn later_page_failure_keeps_collected_postings() {
        let server = CannedServer::start(|request| match requested_offset(&request.body) {
            0 => (200, cxs_page(0, 2, 10)),
            2 => (200, cxs_page(2, 2, 10)),
            _ => (500, "{}".to_string()),
        })
        .await;
        let (board, site) = local_site(&server);

        let jobs = WorkdayClient::new(local_client())
            .fetch_jobs(&board, &site)
            .await
            .unwrap();

        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[3].title, "Role 3");
        assert_eq!(jobs[0].url, format!("{}/en-US/Acme_Careers/job/Remote/Role_P0", server.base_url));
        assert_eq!(server.paths().len(), 3);
        assert!(server.paths().iter().all(|p| p == "/wday/cxs/127/Acme_Careers/jobs"));
    }

    #[tokio::test]
    async fn first_page_failure_is_an_error() {
        let server = CannedServer::start(|_| (403, "denied".to_string())).await;
        let (board, site) = local_site(&server);

        let result = WorkdayClient::new(local_client()).fetch_jobs(&board, &site).await;

        assert!(matches!(result, Err(HarvestError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn walk_stops_at_reported_total() {
        let server = CannedServer::start(|request| {
            assert_eq!(request.method, "POST");
            let offset = requested_offset(&request.body) as usize;
            (200, cxs_page(offset, 2, 4))
        })
        .await;
        let (board, site) = local_site(&server);

        let jobs = WorkdayClient::new(local_client())
            .fetch_jobs(&board, &site)
            .await
            .unwrap();

        assert_eq!(jobs.len(), 4);
        assert_eq!(server.paths().len(), 2);
    }
}
