use super::{first_value, DetailPageScraper, ScrapedPosting, Selectors};
use crate::error::Result;
use scraper::Html;

/// iCIMS posting pages: an `h1` title with `og:title` as backup.
pub struct IcimsDetailScraper {
    selectors: Selectors,
}

impl IcimsDetailScraper {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: Selectors::new(
                &["h1", r#"meta[property="og:title"]"#],
                &[".job-location", "li.job-data-location span"],
            )?,
        })
    }
}

/// Apple posting pages, after client-side rendering.
pub struct AppleDetailScraper {
    selectors: Selectors,
}

impl AppleDetailScraper {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: Selectors::new(&["h1"], &[".job-location", "li.location span"])?,
        })
    }
}

impl DetailPageScraper for IcimsDetailScraper {
    fn extract_posting(&self, document: &Html) -> ScrapedPosting {
        ScrapedPosting {
            title: first_value(document, &self.selectors.title),
            location: first_value(document, &self.selectors.location),
        }
    }
}

impl DetailPageScraper for AppleDetailScraper {
    fn extract_posting(&self, document: &Html) -> ScrapedPosting {
        ScrapedPosting {
            title: first_value(document, &self.selectors.title),
            location: first_value(document, &self.selectors.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icims_prefers_heading_then_og_title() {
        let scraper = IcimsDetailScraper::new().unwrap();

        let page = Html::parse_document(
            r#"<html><head><meta property="og:title" content="OG Title"></head>
               <body><h1>
                 Claims   Adjuster
               </h1><div class="job-location">Boston,
               MA</div></body></html>"#,
        );
        assert_eq!(
            scraper.extract_posting(&page),
            ScrapedPosting {
                title: "Claims Adjuster".to_string(),
                location: "Boston, MA".to_string(),
            }
        );

        let no_heading = Html::parse_document(
            r#"<html><head><meta property="og:title" content=" Underwriter II "></head>
               <body><ul><li class="job-data-location"><span>Dover, NH</span></li></ul></body></html>"#,
        );
        let posting = scraper.extract_posting(&no_heading);
        assert_eq!(posting.title, "Underwriter II");
        assert_eq!(posting.location, "Dover, NH");
    }

    #[test]
    fn apple_reads_location_list() {
        let scraper = AppleDetailScraper::new().unwrap();
        let page = Html::parse_document(
            r#"<body><h1>QA Engineer</h1><ul><li class="location"><span>Cupertino, California, United States</span></li></ul></body>"#,
        );
        let posting = scraper.extract_posting(&page);
        assert_eq!(posting.title, "QA Engineer");
        assert_eq!(posting.location, "Cupertino, California, United States");
    }

    #[test]
    fn blank_page_gives_blank_posting() {
        let scraper = AppleDetailScraper::new().unwrap();
        let posting = scraper.extract_posting(&Html::parse_document("<body></body>"));
        assert_eq!(posting, ScrapedPosting::default());
    }
}
