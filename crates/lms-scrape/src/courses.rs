//! Enrolled-course discovery from the dashboard page.

use std::collections::HashSet;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::info;
use url::Url;

use crate::download::course_id;
use crate::error::{Result, ScrapeError};
use crate::fetch::PageFetcher;
use crate::session::HttpSession;
use crate::types::Course;

/// Dashboard path relative to the site root.
pub const DASHBOARD_PATH: &str = "/my/";

/// Course link selectors, most specific first.
const COURSE_LINKS: &[&str] = &[
    ".course-info-container h4.course-title a",
    "a.coursename",
    ".coursebox .coursename a",
    "a[href*=\"/course/view.php\"]",
];

/// Lists the courses visible to the logged-in user.
#[derive(Debug, Clone, Copy)]
pub struct CourseCatalog {
    fetcher: PageFetcher,
}

impl CourseCatalog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            fetcher: PageFetcher::new(timeout),
        }
    }

    /// Fetch the dashboard at `dashboard_url` and parse its course links.
    pub async fn list_courses(
        &self,
        session: &dyn HttpSession,
        dashboard_url: &str,
    ) -> Result<Vec<Course>> {
        let resp = self.fetcher.fetch_response(session, dashboard_url).await?;
        let courses = parse_dashboard(&resp.body, &resp.final_url)?;
        info!("found {} courses on {dashboard_url}", courses.len());
        Ok(courses)
    }
}

/// Dashboard URL for a site root such as `https://lms.example.com` or
/// `https://uni.example.org/moodle`.
pub fn dashboard_url(base_url: &str) -> Result<String> {
    Url::parse(base_url).map_err(|e| ScrapeError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(format!("{}{DASHBOARD_PATH}", base_url.trim_end_matches('/')))
}

/// Parse course links. Links without an `id` are skipped and duplicates
/// keep their first occurrence.
pub fn parse_dashboard(html: &str, page_url: &str) -> Result<Vec<Course>> {
    let base = Url::parse(page_url).map_err(|e| ScrapeError::InvalidUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut courses = Vec::new();
    for css in COURSE_LINKS {
        let selector = Selector::parse(css).expect("course selectors are valid");
        for link in document.select(&selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(url) = base.join(href.trim()) else {
                continue;
            };
            let Some(id) = course_id(url.as_str()) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            let name = link.text().collect::<String>();
            courses.push(Course {
                id,
                name: name.split_whitespace().collect::<Vec<_>>().join(" "),
                source_url: url.to_string(),
            });
        }
    }
    Ok(courses)
}
