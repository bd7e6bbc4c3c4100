use crate::error::{HarvestError, Result};
use crate::utils::clean_text;
use scraper::{ElementRef, Html, Selector};

pub(crate) mod job_detail;

/// Title and location pulled off a single posting page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapedPosting {
    pub title: String,
    pub location: String,
}

pub trait DetailPageScraper {
    fn extract_posting(&self, document: &Html) -> ScrapedPosting;
}

/// Ordered fallbacks: the first selector whose first match has text wins.
pub struct Selectors {
    pub title: Vec<Selector>,
    pub location: Vec<Selector>,
}

impl Selectors {
    pub fn new(title_selectors: &[&str], location_selectors: &[&str]) -> Result<Self> {
        Ok(Self {
            title: parse_all(title_selectors)?,
            location: parse_all(location_selectors)?,
        })
    }
}

fn parse_all(selectors: &[&str]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).map_err(|e| HarvestError::Selector(e.to_string())))
        .collect()
}

/// `<meta>` tags carry their value in `content`, everything else in its text.
fn element_value(element: ElementRef<'_>) -> String {
    if element.value().name() == "meta" {
        clean_text(element.value().attr("content").unwrap_or(""))
    } else {
        clean_text(&element.text().collect::<String>())
    }
}

pub fn first_value(document: &Html, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(element_value)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
