use super::{close_tab, eval_json, goto, wait_for, BrowserSession};
use crate::config::AppleSite;
use crate::domain::{JobCollector, JobRecord, JobSource};
use crate::error::{HarvestError, Result};
use crate::infrastructure::scrapers::job_detail::AppleDetailScraper;
use crate::infrastructure::scrapers::DetailPageScraper;
use crate::utils::dedup_preserving_order;
use headless_chrome::Tab;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DETAIL_LINK: &str = "a[href*='details/']";

const DETAIL_LINKS_JS: &str = r#"JSON.stringify(
  Array.from(document.querySelectorAll("a[href*='details/']")).map(a => a.href)
)"#;

pub struct AppleScraper {
    session: BrowserSession,
    site: AppleSite,
    detail: AppleDetailScraper,
}

impl AppleScraper {
    pub fn new(session: BrowserSession, site: AppleSite) -> Result<Self> {
        Ok(Self {
            session,
            site,
            detail: AppleDetailScraper::new()?,
        })
    }

    /// Walks every team search page, then each posting it links to.
    pub fn scrape(&self) -> Result<Vec<JobRecord>> {
        let mut collector = JobCollector::new();

        for team_url in &self.site.team_urls {
            let tab = self.session.new_tab()?;
            match self.scrape_team(&tab, team_url) {
                Ok(jobs) => {
                    info!("Apple team {} gave {} jobs", team_url, jobs.len());
                    collector.extend(jobs);
                }
                Err(e) => warn!("Apple team {} failed: {}", team_url, e),
            }
            close_tab(&tab);
        }

        Ok(collector.into_jobs())
    }

    fn scrape_team(&self, tab: &Arc<Tab>, team_url: &str) -> Result<Vec<JobRecord>> {
        goto(tab, team_url)?;
        wait_for(tab, DETAIL_LINK, Duration::from_secs(15));

        let hrefs: Vec<String> = eval_json(tab, DETAIL_LINKS_JS, false)?;
        let links = cap_links(hrefs, self.site.max_links_per_team);
        debug!("{} detail links on {}", links.len(), team_url);

        let pb = ProgressBar::new(links.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style);
        }

        let mut jobs = Vec::with_capacity(links.len());
        for href in &links {
            pb.set_message(format!("Apple {}", href));
            match self.visit(tab, href) {
                Ok(job) => jobs.push(job),
                Err(e) => debug!("Skipping {}: {}", href, e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(jobs)
    }

    fn visit(&self, tab: &Arc<Tab>, href: &str) -> Result<JobRecord> {
        goto(tab, href)?;
        wait_for(tab, "h1", Duration::from_secs(5));
        let html = tab.get_content().map_err(HarvestError::browser)?;
        Ok(self.parse_detail(&html, href))
    }

    pub fn parse_detail(&self, html: &str, href: &str) -> JobRecord {
        let document = Html::parse_document(html);
        let posting = self.detail.extract_posting(&document);
        JobRecord::new(
            JobSource::Apple,
            &self.site.company,
            &posting.title,
            &posting.location,
            href,
        )
        .with_placeholder_title(&self.site.placeholder_title)
    }
}

/// Unique, non-empty links in page order, at most `max`.
pub fn cap_links(hrefs: Vec<String>, max: usize) -> Vec<String> {
    dedup_preserving_order(hrefs.into_iter().filter(|h| !h.trim().is_empty()))
        .into_iter()
        .take(max)
        .collect()
}
