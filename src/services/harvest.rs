use crate::config::cli::Site;
use crate::config::Config;
use crate::domain::storage::Storage;
use crate::domain::{JobRecord, RunManifest, SiteJobs, SiteSummary};
use crate::error::{HarvestError, Result};
use crate::infrastructure::{
    AppleScraper, BrowserSession, GreenhouseClient, IcimsClient, WorkdayBoard,
    WorkdayBoardScraper, WorkdayClient,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;
use tracing::{error, info, warn};

/// Sites in the order they are harvested.
pub const SITE_ORDER: [Site; 4] = [Site::Greenhouse, Site::Icims, Site::Apple, Site::Workday];

pub struct HarvestService {
    config: Config,
    store: Arc<dyn Storage>,
    greenhouse: GreenhouseClient,
    workday: WorkdayClient,
    browser: OnceCell<BrowserSession>,
}

impl HarvestService {
    pub fn new(config: Config, store: Arc<dyn Storage + 'static>) -> Self {
        let greenhouse = GreenhouseClient::new(config.http_client.clone());
        let workday = WorkdayClient::new(config.http_client.clone());
        Self {
            config,
            store,
            greenhouse,
            workday,
            browser: OnceCell::new(),
        }
    }

    /// Harvests every site in turn. A failing site is recorded in the manifest
    /// and does not stop the others.
    pub async fn process(&self) -> Result<RunManifest> {
        info!("Starting harvest");
        let mut summaries = Vec::with_capacity(SITE_ORDER.len());

        for site in SITE_ORDER {
            let output = self.output_file(site).to_string();

            if self.is_skipped(site) {
                info!("Skipping {}", site);
                summaries.push(SiteSummary::skipped(site.as_str(), &output));
                continue;
            }

            info!("Harvesting {}", site);
            match self.harvest_site(site).await {
                Ok(jobs) => {
                    let site_jobs = SiteJobs::new(site.as_str(), output, jobs);
                    self.store.save_site_jobs(&site_jobs)?;
                    info!("{}: {} jobs", site, site_jobs.jobs.len());
                    summaries.push(SiteSummary::ok(&site_jobs));
                }
                Err(e) => {
                    error!("{} failed: {}", site, e);
                    summaries.push(SiteSummary::failed(site.as_str(), &output, e.to_string()));
                }
            }
        }

        let manifest = RunManifest::new(summaries);
        self.store.save_manifest(&manifest)?;
        info!(
            "Harvest finished: {} jobs, {} failed sites",
            manifest.total_jobs,
            manifest.failures()
        );
        Ok(manifest)
    }

    fn output_file(&self, site: Site) -> &str {
        let sites = &self.config.harvest_config;
        match site {
            Site::Greenhouse => &sites.greenhouse.output,
            Site::Icims => &sites.icims.output,
            Site::Apple => &sites.apple.output,
            Site::Workday => &sites.workday.output,
        }
    }

    fn is_skipped(&self, site: Site) -> bool {
        let args = &self.config.args;
        args.skip.contains(&site) || (site == Site::Apple && args.no_browser)
    }

    async fn harvest_site(&self, site: Site) -> Result<Vec<JobRecord>> {
        let sites = &self.config.harvest_config;
        match site {
            Site::Greenhouse => self.greenhouse.fetch_jobs(&sites.greenhouse).await,
            Site::Icims => {
                IcimsClient::new(self.config.http_client.clone(), sites.icims.clone())?
                    .fetch_jobs()
                    .await
            }
            Site::Apple => {
                let session = self.browser().await?;
                let apple = sites.apple.clone();
                run_blocking(move || AppleScraper::new(session, apple)?.scrape()).await
            }
            Site::Workday => self.harvest_workday().await,
        }
    }

    /// CxS API first, then the browser tiers when it yields nothing.
    async fn harvest_workday(&self) -> Result<Vec<JobRecord>> {
        let site = &self.config.harvest_config.workday;
        let board = WorkdayBoard::parse(&site.board_url)?;

        let mut api_error = None;
        if site.use_api {
            match self.workday.fetch_jobs(&board, site).await {
                Ok(jobs) if !jobs.is_empty() => return Ok(jobs),
                Ok(_) => info!("[Workday] CxS API returned no postings"),
                Err(e) => {
                    warn!("[Workday] CxS API failed: {}", e);
                    api_error = Some(e);
                }
            }
        }

        if self.config.args.no_browser {
            return match api_error {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }

        let site = site.clone();
        let outcome = match self.browser().await {
            Ok(session) => {
                run_blocking(move || WorkdayBoardScraper::new(session, board, site).scrape()).await
            }
            Err(e) => Err(e),
        };
        outcome.map_err(|e| with_api_error(api_error, e))
    }

    /// Launches the browser on first use and hands out clones of the session.
    async fn browser(&self) -> Result<BrowserSession> {
        self.browser
            .get_or_try_init(|| run_blocking(BrowserSession::launch))
            .await
            .cloned()
    }
}

/// Keeps the CxS API failure visible when the browser tiers fail as well.
fn with_api_error(api_error: Option<HarvestError>, browser_error: HarvestError) -> HarvestError {
    match api_error {
        Some(api) => HarvestError::Other(format!(
            "CxS API failed ({api}); browser tiers failed ({browser_error})"
        )),
        None => browser_error,
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| HarvestError::Other(format!("Blocking task failed: {e}")))?
}
