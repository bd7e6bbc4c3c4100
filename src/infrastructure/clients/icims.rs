use crate::config::IcimsSite;
use crate::domain::{JobRecord, JobSource};
use crate::error::{HarvestError, Result};
use crate::infrastructure::scrapers::job_detail::IcimsDetailScraper;
use crate::infrastructure::scrapers::DetailPageScraper;
use crate::utils::dedup_preserving_order;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct IcimsClient {
    client: Client,
    site: IcimsSite,
    sitemap_link: Regex,
    search_link: Regex,
    detail: IcimsDetailScraper,
}

impl IcimsClient {
    pub fn new(client: Client, site: IcimsSite) -> Result<Self> {
        let base = regex::escape(site.base_url.trim_end_matches('/'));
        let sitemap_link = Regex::new(&format!(r"(?i)<loc>\s*({base}/jobs/\d+/[^<]+)</loc>"))
            .map_err(|e| HarvestError::Parse(e.to_string()))?;
        let search_link = Regex::new(&format!(r#"(?i){base}/jobs/\d+/[^\s"'>]+"#))
            .map_err(|e| HarvestError::Parse(e.to_string()))?;

        Ok(Self {
            client,
            site,
            sitemap_link,
            search_link,
            detail: IcimsDetailScraper::new()?,
        })
    }

    fn base(&self) -> &str {
        self.site.base_url.trim_end_matches('/')
    }

    /// Sitemap first; the paginated search only runs when the sitemap gave nothing.
    pub async fn fetch_jobs(&self) -> Result<Vec<JobRecord>> {
        let mut jobs = match self.sitemap_links().await {
            Ok(links) if !links.is_empty() => {
                info!("Found {} iCIMS links in sitemap", links.len());
                self.fetch_details(&links).await
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("iCIMS sitemap unavailable: {}", e);
                Vec::new()
            }
        };

        if jobs.is_empty() {
            info!("Falling back to iCIMS search pages");
            jobs = self.search_jobs().await;
        }

        info!("Found {} iCIMS jobs for {}", jobs.len(), self.site.company);
        Ok(jobs)
    }

    async fn sitemap_links(&self) -> Result<Vec<String>> {
        let url = format!("{}/sitemap.xml", self.base());
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(HarvestError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        Ok(self.parse_sitemap(&body))
    }

    pub fn parse_sitemap(&self, xml: &str) -> Vec<String> {
        let links = self
            .sitemap_link
            .captures_iter(xml)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());

        dedup_preserving_order(links)
            .into_iter()
            .take(self.site.max_sitemap_links)
            .collect()
    }

    pub fn parse_search_page(&self, html: &str, seen: &HashSet<String>) -> Vec<String> {
        let links = self
            .search_link
            .find_iter(html)
            .map(|m| m.as_str().to_string())
            .filter(|link| !seen.contains(link));
        dedup_preserving_order(links)
    }

    async fn search_jobs(&self) -> Vec<JobRecord> {
        let mut jobs = Vec::new();
        let mut seen = HashSet::new();

        for pr in 0..self.site.search_pages {
            let url = format!("{}/jobs/search?ss=1&pr={}", self.base(), pr);
            let html = match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("Could not read {}: {}", url, e);
                        break;
                    }
                },
                Ok(response) => {
                    info!("Search page {} returned {}", pr, response.status());
                    break;
                }
                Err(e) => {
                    warn!("Could not fetch {}: {}", url, e);
                    break;
                }
            };

            let links = self.parse_search_page(&html, &seen);
            if links.is_empty() {
                debug!("No new links on search page {}", pr);
                break;
            }
            seen.extend(links.iter().cloned());
            jobs.extend(self.fetch_details(&links).await);
        }

        jobs
    }

    async fn fetch_details(&self, links: &[String]) -> Vec<JobRecord> {
        let pb = ProgressBar::new(links.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style);
        }

        let mut jobs = Vec::with_capacity(links.len());
        for href in links {
            pb.set_message(format!("iCIMS {}", href));
            match self.fetch_detail(href).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => debug!("Skipping {}: {}", href, e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        jobs
    }

    async fn fetch_detail(&self, href: &str) -> Result<Option<JobRecord>> {
        let response = self.client.get(href).send().await?;
        if !response.status().is_success() {
            debug!("Detail page {} returned {}", href, response.status());
            return Ok(None);
        }
        let html = response.text().await?;
        Ok(Some(self.parse_detail(&html, href)))
    }

    pub fn parse_detail(&self, html: &str, href: &str) -> JobRecord {
        let document = Html::parse_document(html);
        let posting = self.detail.extract_posting(&document);
        JobRecord::new(
            JobSource::Icims,
            &self.site.company,
            &posting.title,
            &posting.location,
            href,
        )
        .with_placeholder_title(&self.site.placeholder_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{local_client, CannedServer};

    fn client(max_links: usize) -> IcimsClient {
        let site = IcimsSite {
            max_sitemap_links: max_links,
            ..IcimsSite::default()
        };
        IcimsClient::new(reqwest::Client::new(), site).unwrap()
    }

    #[test]
    fn sitemap_links_are_deduped_and_capped() {
        let xml = r#"<urlset>
            <url><loc> https://careers-libertymutual.icims.com/jobs/101/claims-adjuster/job </loc></url>
            <url><loc>https://careers-libertymutual.icims.com/jobs/102/actuary/job</loc></url>
            <url><LOC>https://careers-libertymutual.icims.com/jobs/101/claims-adjuster/job</LOC></url>
            <url><loc>https://careers-libertymutual.icims.com/about</loc></url>
            <url><loc>https://careers-libertymutual.icims.com/jobs/103/analyst/job</loc></url>
        </urlset>"#;

        assert_eq!(
            client(200).parse_sitemap(xml),
            vec![
                "https://careers-libertymutual.icims.com/jobs/101/claims-adjuster/job",
                "https://careers-libertymutual.icims.com/jobs/102/actuary/job",
                "https://careers-libertymutual.icims.com/jobs/103/analyst/job",
            ]
        );
        assert_eq!(client(2).parse_sitemap(xml).len(), 2);
    }

    #[test]
    fn search_page_links_skip_seen_and_repeats() {
        let html = r#"<a href="https://careers-libertymutual.icims.com/jobs/5/a/job?in_iframe=1">A</a>
            <a href='https://careers-libertymutual.icims.com/jobs/6/b/job'>B</a>
            <a href="https://careers-libertymutual.icims.com/jobs/5/a/job?in_iframe=1">A again</a>
            <a href="https://elsewhere.example.com/jobs/7/c/job">C</a>"#;
        let mut seen = HashSet::new();
        seen.insert("https://careers-libertymutual.icims.com/jobs/6/b/job".to_string());

        assert_eq!(
            client(200).parse_search_page(html, &seen),
            vec!["https://careers-libertymutual.icims.com/jobs/5/a/job?in_iframe=1"]
        );
    }

    #[test]
    fn detail_without_title_uses_placeholder() {
        let job = client(200).parse_detail(
            "<html><body><p>nothing here</p></body></html>",
            "https://careers-libertymutual.icims.com/jobs/9/x/job",
        );
        assert_eq!(job.source, JobSource::Icims);
        assert_eq!(job.company, "Liberty Mutual");
        assert_eq!(job.title, "(Job)");
        assert_eq!(job.location, "");
    }

    fn local_client_for(server: &CannedServer) -> IcimsClient {
        let site = IcimsSite {
            base_url: server.base_url.clone(),
            ..IcimsSite::default()
        };
        IcimsClient::new(local_client(), site).unwrap()
    }

    const ALPHA_PAGE: &str = r#"<html><body><h1>Alpha</h1>
        <div class="job-location">Boston</div></body></html>"#;

    #[tokio::test]
    async fn search_fallback_runs_when_sitemap_is_missing() {
        let server = CannedServer::start(|request| match request.path.as_str() {
            "/sitemap.xml" => (404, String::new()),
            "/jobs/search?ss=1&pr=0" => {
                let html = r#"<a href="{base}/jobs/1/alpha/job">Alpha</a>
                    <a href="{base}/jobs/1/alpha/job">Alpha again</a>
                    <a href="{base}/jobs/2/beta/job">Beta</a>"#;
                (200, html.replace("{base}", &base_of(request)))
            }
            "/jobs/1/alpha/job" => (200, ALPHA_PAGE.to_string()),
            _ => (500, String::new()),
        })
        .await;

        let jobs = local_client_for(&server).fetch_jobs().await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Alpha");
        assert_eq!(jobs[0].location, "Boston");
        assert_eq!(jobs[0].url, format!("{}/jobs/1/alpha/job", server.base_url));

        let paths = server.paths();
        assert_eq!(paths.iter().filter(|p| *p == "/jobs/1/alpha/job").count(), 1);
        assert!(paths.contains(&"/jobs/search?ss=1&pr=1".to_string()));
        assert!(!paths.contains(&"/jobs/search?ss=1&pr=2".to_string()));
    }

    #[tokio::test]
    async fn sitemap_links_skip_the_search_fallback() {
        let server = CannedServer::start(|request| match request.path.as_str() {
            "/sitemap.xml" => (
                200,
                format!("<urlset><url><loc>{}/jobs/1/alpha/job</loc></url></urlset>", base_of(request)),
            ),
            "/jobs/1/alpha/job" => (200, ALPHA_PAGE.to_string()),
            _ => (500, String::new()),
        })
        .await;

        let jobs = local_client_for(&server).fetch_jobs().await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert!(server.paths().iter().all(|p| !p.starts_with("/jobs/search")));
    }

    /// The server's own base URL, rebuilt from the request's `Host` header.
    fn base_of(request: &crate::test_support::CannedRequest) -> String {
        format!("http://{}", request.host)
    }
}
