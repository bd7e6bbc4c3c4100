//! Browser-side extraction for Workday boards.
//!
//! Workday renders its boards client-side and changes the markup often, so
//! postings are pulled out through a ladder of increasingly blunt tiers. The
//! first tier that produces postings wins.

use super::{close_tab, eval_json, eval_string, goto, wait_for, BrowserSession};
use crate::config::WorkdaySite;
use crate::domain::{JobCollector, JobRecord, JobSource};
use crate::error::{HarvestError, Result};
use crate::infrastructure::clients::workday::{CxsPage, CxsPagination, CxsRequest, WorkdayBoard};
use crate::utils::{clean_text, title_from_slug};
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::Tab;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

const SNIFFER: &str = "workday-cxs-sniffer";

const JOB_LIST_READY: &str = "a[data-automation-id='jobTitle'], a[href*='/job/']";

const COLLECT_ANCHORS_JS: &str = r##"JSON.stringify(
  Array.from(document.querySelectorAll("a[data-automation-id='jobTitle'], a[href*='/job/']")).map(a => {
    const item = a.closest("li");
    const loc = item ? item.querySelector("[data-automation-id='locations'] dd, [data-automation-id='locations']") : null;
    return {
      href: a.href,
      text: (a.innerText || a.textContent || "").trim(),
      location: loc ? (loc.innerText || loc.textContent || "").trim() : ""
    };
  })
)"##;

const NEXT_PAGE_JS: &str = r##"(() => {
  const usable = el => el && !el.disabled && el.getAttribute("aria-disabled") !== "true" && el.offsetParent !== null;
  const next = document.querySelector("button[data-uxi-element-id='next'], button[aria-label='next'], button[aria-label='Next'], a[aria-label='next']");
  if (usable(next)) { next.click(); return "next"; }
  const current = document.querySelector("button[aria-current='page'], [data-automation-id='pageNumber'][aria-current='true']");
  if (current) {
    const n = parseInt(current.innerText, 10);
    const target = Array.from(document.querySelectorAll("nav button, [data-automation-id='pagination'] button"))
      .find(b => parseInt(b.innerText, 10) === n + 1);
    if (usable(target)) { target.click(); return "numbered"; }
  }
  const more = Array.from(document.querySelectorAll("button, a"))
    .find(b => /^\s*(show|load|view)\s+more/i.test(b.innerText || ""));
  if (usable(more)) { more.click(); return "more"; }
  return "none";
})()"##;

const DEEP_ANCHORS_JS: &str = r##"(() => {
  const out = [];
  const walk = (root, depth) => {
    if (!root || depth > 8) return;
    root.querySelectorAll("a[href*='/job/']").forEach(a => out.push({
      href: a.href,
      text: (a.innerText || a.textContent || "").trim(),
      location: ""
    }));
    root.querySelectorAll("*").forEach(el => {
      if (el.shadowRoot) walk(el.shadowRoot, depth + 1);
      if (el.tagName === "IFRAME") {
        try { walk(el.contentDocument, depth + 1); } catch (e) {}
      }
    });
  };
  walk(document, 0);
  return JSON.stringify(out);
})()"##;

static JSON_OBJECT_WITH_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{[^{}]*"externalPath"\s*:\s*"[^"]+"[^{}]*\}"#).unwrap());
static BARE_JOB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"/job/[^"'\s<>?#\\]+"#).unwrap());

fn json_field(name: &str) -> Regex {
    Regex::new(&format!(r#""{name}"\s*:\s*"((?:[^"\\]|\\.)*)""#)).unwrap()
}

static TITLE_FIELD: Lazy<Regex> = Lazy::new(|| json_field("title"));
static EXTERNAL_PATH_FIELD: Lazy<Regex> = Lazy::new(|| json_field("externalPath"));
static LOCATIONS_FIELD: Lazy<Regex> = Lazy::new(|| json_field("locationsText"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    InPageApi,
    NetworkSniff,
    DomPagination,
    DeepTraversal,
    RawHtml,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::InPageApi,
        Tier::NetworkSniff,
        Tier::DomPagination,
        Tier::DeepTraversal,
        Tier::RawHtml,
    ];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::InPageApi => "in-page API",
            Tier::NetworkSniff => "network sniffing",
            Tier::DomPagination => "DOM pagination",
            Tier::DeepTraversal => "iframe/shadow DOM",
            Tier::RawHtml => "raw HTML",
        };
        f.write_str(name)
    }
}

/// A job link as seen in the rendered page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Anchor {
    pub href: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub location: String,
}

/// Stops DOM paging after two pages in a row add nothing, or at the page cap.
#[derive(Debug)]
pub struct DomPagination {
    max_pages: usize,
    pages: usize,
    stale_pages: usize,
}

impl DomPagination {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            pages: 0,
            stale_pages: 0,
        }
    }

    /// Returns whether it is worth asking for another page.
    pub fn record_page(&mut self, new_records: usize) -> bool {
        self.pages += 1;
        if new_records == 0 {
            self.stale_pages += 1;
        } else {
            self.stale_pages = 0;
        }
        self.stale_pages < 2 && self.pages < self.max_pages
    }
}

pub struct WorkdayBoardScraper {
    session: BrowserSession,
    board: WorkdayBoard,
    site: WorkdaySite,
}

impl WorkdayBoardScraper {
    pub fn new(session: BrowserSession, board: WorkdayBoard, site: WorkdaySite) -> Self {
        Self {
            session,
            board,
            site,
        }
    }

    /// Opens the board once and tries each tier until one yields postings.
    pub fn scrape(&self) -> Result<Vec<JobRecord>> {
        let tab = self.session.new_tab()?;
        let sniffed = Arc::new(Mutex::new(Vec::new()));
        self.start_sniffing(&tab, Arc::clone(&sniffed));

        let result = self.run_tiers(&tab, &sniffed);

        if let Err(e) = tab.deregister_response_handling(SNIFFER) {
            debug!("Could not remove response handler: {}", e);
        }
        close_tab(&tab);
        result
    }

    fn run_tiers(&self, tab: &Arc<Tab>, sniffed: &Arc<Mutex<Vec<String>>>) -> Result<Vec<JobRecord>> {
        goto(tab, &self.board.board_url)?;
        wait_for(tab, JOB_LIST_READY, Duration::from_secs(20));

        for tier in Tier::ALL {
            let outcome = match tier {
                Tier::InPageApi => self.in_page_api(tab),
                Tier::NetworkSniff => Ok(self.sniffed_records(sniffed)),
                Tier::DomPagination => self.dom_pagination(tab),
                Tier::DeepTraversal => self.deep_traversal(tab),
                Tier::RawHtml => self.raw_html(tab),
            };

            match outcome {
                Ok(jobs) if !jobs.is_empty() => {
                    info!("[Workday] {} tier found {} jobs", tier, jobs.len());
                    return Ok(jobs);
                }
                Ok(_) => info!("[Workday] {} tier found nothing", tier),
                Err(e) => warn!("[Workday] {} tier failed: {}", tier, e),
            }
        }

        Ok(Vec::new())
    }

    fn start_sniffing(&self, tab: &Arc<Tab>, sniffed: Arc<Mutex<Vec<String>>>) {
        let handler = move |params: ResponseReceivedEventParams,
                            fetch_body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
            if !is_cxs_jobs_url(&params.response.url) {
                return;
            }
            match fetch_body() {
                Ok(body) if !body.base_64_encoded => {
                    if let Ok(mut bodies) = sniffed.lock() {
                        bodies.push(body.body);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Could not read sniffed body: {}", e),
            }
        };

        if let Err(e) = tab.register_response_handling(SNIFFER, Box::new(handler)) {
            warn!("Response sniffing unavailable: {}", e);
        }
    }

    fn sniffed_records(&self, sniffed: &Arc<Mutex<Vec<String>>>) -> Vec<JobRecord> {
        let bodies = sniffed.lock().map(|b| b.clone()).unwrap_or_default();
        debug!("{} CxS responses sniffed", bodies.len());
        let mut collector = JobCollector::new();
        for body in &bodies {
            collector.extend(records_from_cxs_body(body, &self.board, &self.site));
        }
        collector.into_jobs()
    }

    /// Calls the CxS API from inside the board page, so cookies and origin match.
    fn in_page_api(&self, tab: &Arc<Tab>) -> Result<Vec<JobRecord>> {
        walk_in_page_api(&self.board, &self.site, |script| eval_string(tab, script, true))
    }

    fn dom_pagination(&self, tab: &Arc<Tab>) -> Result<Vec<JobRecord>> {
        let mut collector = JobCollector::new();
        let mut pagination = DomPagination::new(self.site.max_dom_pages);

        loop {
            let anchors: Vec<Anchor> = eval_json(tab, COLLECT_ANCHORS_JS, false)?;
            let added = collector.extend(records_from_anchors(anchors, &self.board, &self.site));
            debug!("[Workday DOM] page added {} (total {})", added, collector.len());

            if !pagination.record_page(added) {
                break;
            }

            let action = eval_string(tab, NEXT_PAGE_JS, false)?;
            if action == "none" {
                break;
            }
            debug!("[Workday DOM] advanced via {}", action);
            std::thread::sleep(Duration::from_millis(1500));
            wait_for(tab, JOB_LIST_READY, Duration::from_secs(10));
        }

        Ok(collector.into_jobs())
    }

    fn deep_traversal(&self, tab: &Arc<Tab>) -> Result<Vec<JobRecord>> {
        let anchors: Vec<Anchor> = eval_json(tab, DEEP_ANCHORS_JS, false)?;
        let mut collector = JobCollector::new();
        collector.extend(records_from_anchors(anchors, &self.board, &self.site));
        Ok(collector.into_jobs())
    }

    fn raw_html(&self, tab: &Arc<Tab>) -> Result<Vec<JobRecord>> {
        let html = tab.get_content().map_err(HarvestError::browser)?;
        Ok(records_from_raw_html(&html, &self.board, &self.site))
    }
}

fn is_cxs_jobs_url(url: &str) -> bool {
    url.contains("/wday/cxs/") && url.split('?').next().unwrap_or_default().ends_with("/jobs")
}

/// Pages through the CxS API with `eval` running each fetch script in the board page.
/// A failure after the first page keeps what was collected.
fn walk_in_page_api<F>(board: &WorkdayBoard, site: &WorkdaySite, mut eval: F) -> Result<Vec<JobRecord>>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut collector = JobCollector::new();
    let mut pagination = CxsPagination::new(site.page_size, site.max_pages);

    while pagination.has_next() {
        let request = CxsRequest::page(pagination.limit, pagination.offset);
        let script = in_page_fetch_script(&board.cxs_url(), &request)?;
        let body = match eval(&script) {
            Ok(body) => body,
            Err(e) if collector.is_empty() => return Err(e),
            Err(e) => {
                warn!("[Workday in-page] stopping at offset {}: {}", pagination.offset, e);
                break;
            }
        };
        let page: CxsPage = match serde_json::from_str(&body) {
            Ok(page) => page,
            Err(e) => {
                debug!("In-page CxS call returned {}: {}", truncate(&body, 120), e);
                break;
            }
        };

        let batch_len = page.job_postings.len();
        let total = page.total;
        let added = collector.extend(page.into_records(board, site));
        info!(
            "[Workday in-page] got {} (offset {}) total_so_far={}",
            batch_len,
            pagination.offset,
            collector.len()
        );
        if !pagination.advance(batch_len, added, total) {
            break;
        }
    }

    Ok(collector.into_jobs())
}

fn in_page_fetch_script(cxs_url: &str, request: &CxsRequest) -> Result<String> {
    let url = serde_json::to_string(cxs_url)?;
    let body = serde_json::to_string(&serde_json::to_string(request)?)?;
    Ok(format!(
        r#"(async () => {{
  const r = await fetch({url}, {{
    method: "POST",
    credentials: "include",
    headers: {{ "Accept": "application/json", "Content-Type": "application/json" }},
    body: {body}
  }});
  return await r.text();
}})()"#
    ))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn records_from_cxs_body(body: &str, board: &WorkdayBoard, site: &WorkdaySite) -> Vec<JobRecord> {
    match serde_json::from_str::<CxsPage>(body) {
        Ok(page) => page.into_records(board, site),
        Err(e) => {
            debug!("Ignoring non-CxS body: {}", e);
            Vec::new()
        }
    }
}

/// Anchors pointing at `/job/` pages; link text is the title, else the slug.
pub fn records_from_anchors(anchors: Vec<Anchor>, board: &WorkdayBoard, site: &WorkdaySite) -> Vec<JobRecord> {
    anchors
        .into_iter()
        .filter_map(|anchor| {
            let path = job_path(&anchor.href)?;
            let url = board.posting_url(path);
            let mut title = clean_text(&anchor.text);
            if title.is_empty() {
                title = title_from_slug(&url).unwrap_or_default();
            }
            Some(
                JobRecord::new(JobSource::Workday, &site.company, &title, &anchor.location, &url)
                    .with_placeholder_title(&site.placeholder_title),
            )
        })
        .collect()
}

/// The `/job/...` part of a link, without query or fragment.
fn job_path(href: &str) -> Option<&str> {
    let href = href.split(['?', '#']).next()?;
    let start = href.find("/job/")?;
    let path = &href[start..];
    (path.len() > "/job/".len()).then_some(path)
}

/// Last resort: JSON fragments and bare `/job/` paths embedded in the page source.
pub fn records_from_raw_html(html: &str, board: &WorkdayBoard, site: &WorkdaySite) -> Vec<JobRecord> {
    let html = html.replace("\\/", "/");
    let mut collector = JobCollector::new();

    let from_json = JSON_OBJECT_WITH_PATH.find_iter(&html).filter_map(|object| {
        let object = object.as_str();
        let path = capture_json_string(&EXTERNAL_PATH_FIELD, object)?;
        let mut title = capture_json_string(&TITLE_FIELD, object).unwrap_or_default();
        if clean_text(&title).is_empty() {
            title = title_from_slug(&path).unwrap_or_default();
        }
        let location = capture_json_string(&LOCATIONS_FIELD, object).unwrap_or_default();
        Some(
            JobRecord::new(JobSource::Workday, &site.company, &title, &location, &board.posting_url(&path))
                .with_placeholder_title(&site.placeholder_title),
        )
    });
    collector.extend(from_json.collect::<Vec<_>>());

    let from_paths = BARE_JOB_PATH.find_iter(&html).filter_map(|m| {
        let path = job_path(m.as_str())?;
        let url = board.posting_url(path);
        let title = title_from_slug(&url).unwrap_or_default();
        Some(
            JobRecord::new(JobSource::Workday, &site.company, &title, "", &url)
                .with_placeholder_title(&site.placeholder_title),
        )
    });
    collector.extend(from_paths.collect::<Vec<_>>());

    collector.into_jobs()
}

/// Captured JSON string value with its escapes resolved.
fn capture_json_string(field: &Regex, text: &str) -> Option<String> {
    let raw = field.captures(text)?.get(1)?.as_str();
    Some(serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string()))
}
