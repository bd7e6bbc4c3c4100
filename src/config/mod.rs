use crate::config::cli::Args;
use crate::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GreenhouseSite {
    pub company: String,
    pub board: String,
    pub api_base: String,
    pub output: String,
}

impl Default for GreenhouseSite {
    fn default() -> Self {
        Self {
            company: "Airbnb".to_string(),
            board: "airbnb".to_string(),
            api_base: "https://boards-api.greenhouse.io".to_string(),
            output: "airbnb.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IcimsSite {
    pub company: String,
    pub base_url: String,
    pub output: String,
    pub max_sitemap_links: usize,
    pub search_pages: usize,
    pub placeholder_title: String,
}

impl Default for IcimsSite {
    fn default() -> Self {
        Self {
            company: "Liberty Mutual".to_string(),
            base_url: "https://careers-libertymutual.icims.com".to_string(),
            output: "libertymutual.json".to_string(),
            max_sitemap_links: 200,
            search_pages: 6,
            placeholder_title: "(Job)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppleSite {
    pub company: String,
    pub team_urls: Vec<String>,
    pub output: String,
    pub max_links_per_team: usize,
    pub placeholder_title: String,
}

impl Default for AppleSite {
    fn default() -> Self {
        Self {
            company: "Apple".to_string(),
            team_urls: vec![
                "https://jobs.apple.com/en-us/search?team=software-quality-automation-and-tools-SFTWR-SQAT".to_string(),
                "https://jobs.apple.com/en-us/search?team=quality-engineering-OPMFG-QE".to_string(),
            ],
            output: "apple.json".to_string(),
            max_links_per_team: 80,
            placeholder_title: "(Apple role)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkdaySite {
    pub company: String,
    pub board_url: String,
    pub output: String,
    /// Set to false to go straight to the browser tiers
    pub use_api: bool,
    pub page_size: usize,
    pub max_pages: usize,
    pub max_dom_pages: usize,
    pub placeholder_title: String,
}

impl Default for WorkdaySite {
    fn default() -> Self {
        Self {
            company: "Zillow".to_string(),
            board_url: "https://zillow.wd5.myworkdayjobs.com/en-US/Zillow_Group_External"
                .to_string(),
            output: "zillow.json".to_string(),
            use_api: true,
            page_size: 50,
            max_pages: 60,
            max_dom_pages: 40,
            placeholder_title: "(Zillow role)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub greenhouse: GreenhouseSite,
    pub icims: IcimsSite,
    pub apple: AppleSite,
    pub workday: WorkdaySite,
}

impl HarvestConfig {
    /// Reads the config file, or falls back to the built-in targets when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using built-in targets", path);
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

pub struct Config {
    pub args: Args,
    pub harvest_config: HarvestConfig,
    pub http_client: Client,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let harvest_config = HarvestConfig::load(&args.config_file)?;
        let http_client = build_http_client()?;

        Ok(Self {
            args,
            harvest_config,
            http_client,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.out_dir.exists() {
            std::fs::create_dir_all(&self.args.out_dir)?;
        }

        info!("Output dir {:?} exists", self.args.out_dir);
        Ok(())
    }
}

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?)
}
