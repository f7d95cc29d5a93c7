//! End-to-end scrape driver.
//!
//! ```text
//! Idle -> LoggingIn -> FetchingCourse -> Traversing -> Done
//!                                                   -> Fallback -> Done
//!        (any of LoggingIn / FetchingCourse)        -> Failed
//! ```
//!
//! The caller always gets a well-formed [`ScrapeResult`]. `error` is set only
//! when the run ends in [`ScrapeState::Failed`]; best-effort degradations are
//! reported through `warnings`.

use std::fmt;

use tracing::{error, info, warn};
use url::Url;

use crate::auth::Authenticator;
use crate::config::ScrapeConfig;
use crate::courses::{dashboard_url, CourseCatalog};
use crate::error::{Result, ScrapeError};
use crate::fetch::PageFetcher;
use crate::session::{HttpSession, ReqwestSession};
use crate::traverse::CourseTraverser;
use crate::types::{Course, Credentials, ScrapeResult};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeState {
    Idle,
    LoggingIn,
    FetchingCourse,
    Traversing,
    Fallback,
    Done,
    Failed,
}

impl ScrapeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScrapeState::Done | ScrapeState::Failed)
    }
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScrapeState::Idle => "idle",
            ScrapeState::LoggingIn => "logging-in",
            ScrapeState::FetchingCourse => "fetching-course",
            ScrapeState::Traversing => "traversing",
            ScrapeState::Fallback => "fallback",
            ScrapeState::Done => "done",
            ScrapeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a run produced, plus the states it went through.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub result: ScrapeResult,
    pub states: Vec<ScrapeState>,
}

impl ScrapeOutcome {
    pub fn final_state(&self) -> ScrapeState {
        self.states.last().copied().unwrap_or(ScrapeState::Idle)
    }

    pub fn visited(&self, state: ScrapeState) -> bool {
        self.states.contains(&state)
    }
}

/// Single-use driver for one scrape.
pub struct ScrapeOrchestrator {
    config: ScrapeConfig,
    authenticator: Authenticator,
    fetcher: PageFetcher,
    states: Vec<ScrapeState>,
}

impl ScrapeOrchestrator {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            authenticator: Authenticator::new(&config),
            fetcher: PageFetcher::new(config.timeout),
            config,
            states: vec![ScrapeState::Idle],
        }
    }

    /// Use a custom authenticator, e.g. one with extra login checks.
    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    fn state(&self) -> ScrapeState {
        self.states.last().copied().unwrap_or(ScrapeState::Idle)
    }

    fn transition(&mut self, next: ScrapeState) {
        info!("scrape: {} -> {next}", self.state());
        self.states.push(next);
    }

    fn fail(mut self, err: ScrapeError) -> ScrapeOutcome {
        error!("scrape failed in {}: {err}", self.state());
        self.transition(ScrapeState::Failed);
        ScrapeOutcome {
            result: ScrapeResult::failed(err),
            states: self.states,
        }
    }

    /// Run the scrape. Consumes the orchestrator.
    pub async fn run(
        mut self,
        session: &dyn HttpSession,
        course_url: &str,
        credentials: Option<&Credentials>,
    ) -> ScrapeOutcome {
        let primary = match CourseTraverser::new(&self.config, &self.config.primary) {
            Ok(t) => t,
            Err(e) => return self.fail(e),
        };

        if let Some(creds) = credentials {
            self.transition(ScrapeState::LoggingIn);
            let login_url = match login_url(course_url, &self.config.login.login_path) {
                Ok(url) => url,
                Err(e) => return self.fail(e),
            };
            let login = self
                .authenticator
                .login(session, &login_url, &creds.username, &creds.password)
                .await;
            if let Err(e) = login {
                return self.fail(e);
            }
        }

        self.transition(ScrapeState::FetchingCourse);
        let fetched = self.fetcher.fetch_response(session, course_url).await;
        let page = match fetched {
            Ok(page) => page,
            Err(e) => return self.fail(e),
        };

        self.transition(ScrapeState::Traversing);
        let mut result = primary.traverse(session, &page.final_url, &page.body).await;

        if result.material_count() == 0 {
            self.transition(ScrapeState::Fallback);
            warn!("primary extraction found no materials, trying fallback profile");
            match self.fallback(session, course_url).await {
                Ok(alt) if alt.material_count() > 0 => {
                    let mut alt = alt;
                    alt.warnings.insert(
                        0,
                        "primary extraction found no materials; used fallback profile".into(),
                    );
                    result = alt;
                }
                Ok(_) => {
                    result
                        .warnings
                        .push("fallback extraction found no materials".into());
                }
                Err(e) => {
                    warn!("fallback failed: {e}");
                    result.warnings.push(format!("fallback failed: {e}"));
                }
            }
        }

        self.transition(ScrapeState::Done);
        info!(
            "scraped '{}': {} sections, {} materials",
            result.course_title,
            result.sections.len(),
            result.material_count()
        );
        ScrapeOutcome {
            result,
            states: self.states,
        }
    }

    /// One looser pass: re-fetch and traverse with the fallback profile.
    async fn fallback(&self, session: &dyn HttpSession, course_url: &str) -> Result<ScrapeResult> {
        let traverser = CourseTraverser::new(&self.config, &self.config.fallback)?;
        let page = self.fetcher.fetch_response(session, course_url).await?;
        Ok(traverser
            .traverse(session, &page.final_url, &page.body)
            .await)
    }
}

impl fmt::Debug for ScrapeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeOrchestrator")
            .field("state", &self.state())
            .field("authenticator", &self.authenticator)
            .finish()
    }
}

/// Site root of a course URL: scheme, host and any path prefix before
/// `/course/`, without a trailing slash.
pub fn site_root(course_url: &str) -> Result<String> {
    let url = Url::parse(course_url).map_err(|e| ScrapeError::InvalidUrl {
        url: course_url.to_string(),
        reason: e.to_string(),
    })?;
    let prefix = url
        .path()
        .find("/course/")
        .map(|idx| &url.path()[..idx])
        .unwrap_or("");
    Ok(format!(
        "{}{}",
        url.origin().ascii_serialization(),
        prefix.trim_end_matches('/')
    ))
}

/// Login page URL for the site hosting `course_url`.
pub fn login_url(course_url: &str, login_path: &str) -> Result<String> {
    Ok(format!(
        "{}/{}",
        site_root(course_url)?,
        login_path.trim_start_matches('/')
    ))
}

/// Scrape a course with default configuration.
pub async fn scrape(course_url: &str, credentials: Option<&Credentials>) -> ScrapeResult {
    scrape_with(ScrapeConfig::default(), course_url, credentials)
        .await
        .result
}

/// Scrape a course with a fresh cookie session built from `config`.
pub async fn scrape_with(
    config: ScrapeConfig,
    course_url: &str,
    credentials: Option<&Credentials>,
) -> ScrapeOutcome {
    let session = match ReqwestSession::new(&config) {
        Ok(s) => s,
        Err(e) => {
            return ScrapeOutcome {
                result: ScrapeResult::failed(e),
                states: vec![ScrapeState::Idle, ScrapeState::Failed],
            }
        }
    };
    ScrapeOrchestrator::new(config)
        .run(&session, course_url, credentials)
        .await
}

/// One course of a batch run.
#[derive(Debug)]
pub struct CourseScrape {
    pub course: Course,
    pub outcome: ScrapeOutcome,
}

/// Log in at `base_url` (when credentials are given) and list the dashboard
/// courses.
pub async fn list_enrolled_courses(
    config: &ScrapeConfig,
    base_url: &str,
    credentials: Option<&Credentials>,
) -> Result<Vec<Course>> {
    let dashboard = dashboard_url(base_url)?;
    let session = ReqwestSession::new(config)?;
    if let Some(creds) = credentials {
        let login = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            config.login.login_path.trim_start_matches('/')
        );
        Authenticator::new(config)
            .login(&session, &login, &creds.username, &creds.password)
            .await?;
    }
    CourseCatalog::new(config.timeout)
        .list_courses(&session, &dashboard)
        .await
}

/// Scrape every course on the dashboard, one after another.
///
/// Each course gets its own [`scrape_with`] run and therefore its own
/// session. Only a failure to list the courses is an error; per-course
/// failures are reported in that course's outcome.
pub async fn scrape_all(
    config: ScrapeConfig,
    base_url: &str,
    credentials: Option<&Credentials>,
) -> Result<Vec<CourseScrape>> {
    let courses = list_enrolled_courses(&config, base_url, credentials).await?;
    info!("scraping {} courses from {base_url}", courses.len());

    let mut runs = Vec::with_capacity(courses.len());
    for course in courses {
        info!("course {} ({})", course.id, course.name);
        let outcome = scrape_with(config.clone(), &course.source_url, credentials).await;
        if outcome.final_state() == ScrapeState::Failed {
            warn!("course {} failed: {:?}", course.id, outcome.result.error);
        }
        runs.push(CourseScrape { course, outcome });
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Method, MockSession, Reply};
    use crate::types::ResourceKind;

    const COURSE: &str = "https://lms.example.com/course/view.php?id=7";
    const LOGIN: &str = "https://lms.example.com/login/index.php";
    const DASHBOARD: &str = "https://lms.example.com/my/";

    const LOGIN_PAGE: &str = r#"<form id="login" action="/login/index.php" method="post">
        <input type="hidden" name="logintoken" value="t0k"/>
        <input name="username"/><input type="password" name="password"/></form>"#;

    const STRUCTURED: &str = r#"<h1>Algorithms</h1><ul>
        <li class="section"><h3 class="sectionname">Week 1</h3><ul>
          <li class="activity resource"><a href="/mod/resource/view.php?id=1"><span class="instancename">Slides</span></a></li>
          <li class="activity assign"><a href="/mod/assign/view.php?id=2"><span class="instancename">Essay</span></a>
            <div class="activity-dates">Due: 15 March 2024</div></li>
        </ul></li></ul>"#;

    const LOOSE: &str = r#"<h1>Physics</h1>
        <div class="section"><h3 class="sectionname">Week 1</h3>
        <a class="resource">Slides.pdf</a></div>"#;

    fn creds() -> Credentials {
        Credentials::new("student", "secret")
    }

    #[test]
    fn test_login_url() {
        assert_eq!(login_url(COURSE, "/login/index.php").unwrap(), LOGIN);
        assert_eq!(
            login_url(
                "https://uni.example.org/moodle/course/view.php?id=3",
                "/login/index.php"
            )
            .unwrap(),
            "https://uni.example.org/moodle/login/index.php"
        );
        assert!(login_url("nope", "/login/index.php").is_err());
    }

    #[tokio::test]
    async fn test_full_run_with_login() {
        let session = MockSession::new()
            .on_get(LOGIN, Reply::html(LOGIN_PAGE))
            .on_post(LOGIN, Reply::html("<p>Dashboard</p>").redirected_to(DASHBOARD))
            .on_get(COURSE, Reply::html(STRUCTURED));

        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, Some(&creds()))
            .await;

        assert_eq!(
            outcome.states,
            vec![
                ScrapeState::Idle,
                ScrapeState::LoggingIn,
                ScrapeState::FetchingCourse,
                ScrapeState::Traversing,
                ScrapeState::Done
            ]
        );
        let result = outcome.result;
        assert!(result.is_success());
        assert!(result.warnings.is_empty());
        assert_eq!(result.course_title, "Algorithms");
        let essay = &result.sections[0].resources[1];
        assert_eq!(essay.kind, ResourceKind::Assignment);
        assert_eq!(
            essay.deadline.as_ref().unwrap().normalized.as_deref(),
            Some("2024-03-15")
        );
    }

    #[tokio::test]
    async fn test_no_credentials_skips_login() {
        let session = MockSession::new().on_get(COURSE, Reply::html(STRUCTURED));
        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, None)
            .await;
        assert!(!outcome.visited(ScrapeState::LoggingIn));
        assert_eq!(outcome.final_state(), ScrapeState::Done);
        assert_eq!(session.count(Method::Get, LOGIN), 0);
    }

    #[tokio::test]
    async fn test_token_missing_stops_before_traversal() {
        let session = MockSession::new()
            .on_get(LOGIN, Reply::html("<p>Site maintenance</p>"))
            .on_get(COURSE, Reply::html(STRUCTURED));

        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, Some(&creds()))
            .await;

        assert_eq!(outcome.final_state(), ScrapeState::Failed);
        assert!(!outcome.visited(ScrapeState::Traversing));
        assert_eq!(session.count(Method::Get, COURSE), 0);
        let result = outcome.result;
        assert!(result.error.unwrap().contains("Login token not found"));
        assert!(result.sections.is_empty());
    }

    #[tokio::test]
    async fn test_login_failed_sets_error() {
        let session = MockSession::new()
            .on_get(LOGIN, Reply::html(LOGIN_PAGE))
            .on_post(
                LOGIN,
                Reply::html("<div class=\"loginerrors\">Invalid login, please try again</div>"),
            )
            .on_get(COURSE, Reply::html(STRUCTURED));

        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, Some(&creds()))
            .await;

        assert_eq!(outcome.final_state(), ScrapeState::Failed);
        assert_eq!(session.count(Method::Get, COURSE), 0);
        assert!(outcome.result.error.unwrap().starts_with("Login failed"));
        assert!(outcome.result.sections.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_fails() {
        let session = MockSession::new().on_get(COURSE, Reply::status(503, "busy"));
        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, None)
            .await;
        assert_eq!(outcome.final_state(), ScrapeState::Failed);
        assert_eq!(
            outcome.result.error.as_deref(),
            Some("HTTP error 503 for https://lms.example.com/course/view.php?id=7")
        );
    }

    #[tokio::test]
    async fn test_fallback_used_once() {
        let session = MockSession::new().on_get(COURSE, Reply::html(LOOSE));
        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, None)
            .await;

        assert_eq!(
            outcome.states,
            vec![
                ScrapeState::Idle,
                ScrapeState::FetchingCourse,
                ScrapeState::Traversing,
                ScrapeState::Fallback,
                ScrapeState::Done
            ]
        );
        // One fetch for the primary pass, one for the fallback.
        assert_eq!(session.count(Method::Get, COURSE), 2);

        let result = outcome.result;
        assert!(result.is_success());
        assert_eq!(result.sections[0].name, "Week 1");
        assert_eq!(result.sections[0].resources[0].title, "Slides.pdf");
        assert_eq!(result.sections[0].resources[0].kind, ResourceKind::Document);
        assert!(result.warnings[0].contains("fallback"));
    }

    #[tokio::test]
    async fn test_fallback_empty_is_done_with_warning() {
        let session =
            MockSession::new().on_get(COURSE, Reply::html("<h1>Empty</h1><p>Nothing yet</p>"));
        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, None)
            .await;

        assert_eq!(outcome.final_state(), ScrapeState::Done);
        assert_eq!(session.count(Method::Get, COURSE), 2);
        assert!(outcome.result.error.is_none());
        assert_eq!(outcome.result.material_count(), 0);
        assert_eq!(
            outcome.result.warnings,
            vec!["fallback extraction found no materials".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fallback_fetch_failure_still_done() {
        let session = MockSession::new()
            .on_get(COURSE, Reply::html("<h1>Empty</h1>"))
            .on_get(COURSE, Reply::Unreachable("connection reset".into()));

        let outcome = ScrapeOrchestrator::new(ScrapeConfig::default())
            .run(&session, COURSE, None)
            .await;

        assert_eq!(outcome.final_state(), ScrapeState::Done);
        assert!(outcome.result.error.is_none());
        assert_eq!(outcome.result.course_title, "Empty");
        assert!(outcome.result.warnings[0].starts_with("fallback failed"));
    }

    #[tokio::test]
    async fn test_invalid_primary_profile_fails() {
        let mut config = ScrapeConfig::default();
        config.primary.section = "li[".into();
        let session = MockSession::new().on_get(COURSE, Reply::html(STRUCTURED));

        let outcome = ScrapeOrchestrator::new(config)
            .run(&session, COURSE, None)
            .await;
        assert_eq!(outcome.final_state(), ScrapeState::Failed);
        assert!(session.calls().is_empty());
    }
}
