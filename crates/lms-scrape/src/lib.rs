//! Course scraping for session-cookie learning-management systems.
//!
//! Logs into a Moodle-style site, walks a course page, classifies each
//! activity, extracts quiz and assignment deadlines, and optionally
//! downloads document payloads. The entry point is [`scrape`] (or
//! [`scrape_with`] for explicit configuration); the result serializes to the
//! `{ courseTitle, sections: [{ name, materials }] }` wire format.

pub mod auth;
pub mod classify;
pub mod config;
pub mod courses;
pub mod deadline;
pub mod download;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod selectors;
pub mod session;
pub mod traverse;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::{Authenticator, CheckOutcome, LoginCheck};
pub use classify::{Classification, ElementMetadata, ResourceClassifier};
pub use config::{DownloadConfig, LoginConfig, ScrapeConfig};
pub use courses::{dashboard_url, CourseCatalog};
pub use deadline::{DateOrder, DeadlineExtractor, DEFAULT_DUE_MARKERS};
pub use download::Downloader;
pub use error::{Result, ScrapeError};
pub use fetch::PageFetcher;
pub use orchestrator::{
    list_enrolled_courses, scrape, scrape_all, scrape_with, CourseScrape, ScrapeOrchestrator,
    ScrapeOutcome, ScrapeState,
};
pub use selectors::SelectorProfile;
pub use session::{HttpSession, ReqwestSession};
pub use traverse::CourseTraverser;
pub use types::*;
