//! Explicit scrape configuration, passed to each component at construction.

use std::path::PathBuf;
use std::time::Duration;

use crate::deadline::{DateOrder, DEFAULT_DUE_MARKERS};
use crate::selectors::SelectorProfile;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent. Some LMS installs block unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Everything a scrape run needs to know, in one value.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Timeout applied to every HTTP call.
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub login: LoginConfig,
    /// Day/month order assumed for numeric `D/M/YYYY` dates.
    pub date_order: DateOrder,
    /// Labels that introduce the closing date in an activity's date text.
    pub due_markers: Vec<String>,
    /// When set, document payloads are downloaded.
    pub download: Option<DownloadConfig>,
    /// Structured extraction pass.
    pub primary: SelectorProfile,
    /// Permissive pass used once when the primary finds nothing.
    pub fallback: SelectorProfile,
    /// Maximum characters kept in `Resource::raw_text_excerpt`.
    pub excerpt_chars: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
            login: LoginConfig::default(),
            date_order: DateOrder::DayFirst,
            due_markers: DEFAULT_DUE_MARKERS.iter().map(|m| m.to_string()).collect(),
            download: None,
            primary: SelectorProfile::primary(),
            fallback: SelectorProfile::fallback(),
            excerpt_chars: 280,
        }
    }
}

impl ScrapeConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.date_order = order;
        self
    }

    pub fn with_due_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.due_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Enable document downloads into `dir`.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download = Some(DownloadConfig::new(dir));
        self
    }

    pub fn with_login(mut self, login: LoginConfig) -> Self {
        self.login = login;
        self
    }
}

/// How the login form looks and how success is judged.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Path of the login page relative to the site root.
    pub login_path: String,
    /// Selector for the login form.
    pub form_selector: String,
    /// Name of the hidden anti-forgery field.
    pub token_field: String,
    pub username_field: String,
    pub password_field: String,
    /// Body fragments that mean the login was rejected.
    pub failure_markers: Vec<String>,
    /// URL fragments that mean we landed back on the login page.
    pub login_url_markers: Vec<String>,
    /// Body or URL fragments that override a login-looking URL.
    pub success_markers: Vec<String>,
    /// Also require the username to appear in the post-login page.
    pub require_username: bool,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_path: "/login/index.php".to_string(),
            form_selector: "form#login".to_string(),
            token_field: "logintoken".to_string(),
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            failure_markers: vec![
                "loginerrors".to_string(),
                "loginerrormessage".to_string(),
                "Invalid login".to_string(),
            ],
            login_url_markers: vec!["login".to_string()],
            success_markers: vec!["success".to_string()],
            require_username: false,
        }
    }
}

/// Where and how payloads are written.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub dir: PathBuf,
    /// Downloads in flight at once.
    pub concurrency: usize,
    /// Follow Moodle resource landing pages to the real file.
    pub follow_landing_pages: bool,
}

impl DownloadConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            concurrency: 4,
            follow_landing_pages: true,
        }
    }
}
