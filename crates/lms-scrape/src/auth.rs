//! Form-based login against a session-cookie LMS.
//!
//! The flow is: GET the login page, pull the anti-forgery token out of the
//! login form, POST credentials plus token, then run a list of
//! [`LoginCheck`]s over the response. Target sites signal success in
//! different ways, so the checks are pluggable.

use std::fmt;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::config::{LoginConfig, ScrapeConfig};
use crate::error::{Result, ScrapeError};
use crate::fetch::PageFetcher;
use crate::session::{HttpResponse, HttpSession};

/// Verdict of a single login check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail(String),
    /// The check found no evidence either way.
    Inconclusive,
}

/// A predicate over the post-login response.
pub trait LoginCheck: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn check(&self, response: &HttpResponse, username: &str) -> CheckOutcome;
}

/// Fails when the body contains a known login-error marker.
#[derive(Debug, Clone)]
pub struct FailureMarkers {
    pub markers: Vec<String>,
}

impl LoginCheck for FailureMarkers {
    fn name(&self) -> &'static str {
        "failure-markers"
    }

    fn check(&self, response: &HttpResponse, _username: &str) -> CheckOutcome {
        match self.markers.iter().find(|m| response.body.contains(m.as_str())) {
            Some(marker) => CheckOutcome::Fail(format!("response contains '{marker}'")),
            None => CheckOutcome::Pass,
        }
    }
}

/// Fails when we were sent back to a login-looking URL without a success marker.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub login_markers: Vec<String>,
    pub success_markers: Vec<String>,
}

impl LoginCheck for LoginRedirect {
    fn name(&self) -> &'static str {
        "login-redirect"
    }

    fn check(&self, response: &HttpResponse, _username: &str) -> CheckOutcome {
        let location = path_and_query(&response.final_url).to_lowercase();
        let on_login = self
            .login_markers
            .iter()
            .any(|m| location.contains(&m.to_lowercase()));
        let succeeded = self
            .success_markers
            .iter()
            .any(|m| location.contains(&m.to_lowercase()));

        if on_login && !succeeded {
            CheckOutcome::Fail(format!("still on login page {}", response.final_url))
        } else {
            CheckOutcome::Pass
        }
    }
}

/// Path and query of `url`; host names never count as login evidence.
fn path_and_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Passes only when the username shows up in the landing page.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsernamePresence;

impl LoginCheck for UsernamePresence {
    fn name(&self) -> &'static str {
        "username-presence"
    }

    fn check(&self, response: &HttpResponse, username: &str) -> CheckOutcome {
        if username.is_empty() {
            return CheckOutcome::Inconclusive;
        }
        if response.body.to_lowercase().contains(&username.to_lowercase()) {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail(format!("username '{username}' not found on landing page"))
        }
    }
}

/// The parts of the login form we need to submit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Resolved submission URL.
    pub action: String,
    pub token: String,
    /// Hidden fields to echo back, token included.
    pub hidden: Vec<(String, String)>,
}

/// Locate the login form and its token. `None` when either is missing.
pub fn extract_login_form(html: &str, page_url: &str, config: &LoginConfig) -> Option<LoginForm> {
    let document = Html::parse_document(html);
    let configured = Selector::parse(&config.form_selector).ok();
    let any_form = Selector::parse("form").expect("form selector is valid");
    let password_sel =
        Selector::parse("input[type=\"password\"]").expect("password selector is valid");
    let hidden_sel = Selector::parse("input[type=\"hidden\"]").expect("hidden selector is valid");
    let token_sel = Selector::parse(&format!("input[name=\"{}\"]", config.token_field)).ok()?;

    let form = configured
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .or_else(|| {
            document
                .select(&any_form)
                .find(|f| f.select(&password_sel).next().is_some())
        })?;

    let token = form
        .select(&token_sel)
        .next()?
        .value()
        .attr("value")
        .unwrap_or("")
        .to_string();

    let mut hidden: Vec<(String, String)> = form
        .select(&hidden_sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            Some((
                name.to_string(),
                input.value().attr("value").unwrap_or("").to_string(),
            ))
        })
        .collect();
    if !hidden.iter().any(|(name, _)| name == &config.token_field) {
        hidden.push((config.token_field.clone(), token.clone()));
    }

    let action_raw = form.value().attr("action").unwrap_or("").trim();
    let action = if action_raw.is_empty() {
        page_url.to_string()
    } else {
        Url::parse(page_url)
            .and_then(|base| base.join(action_raw))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| page_url.to_string())
    };

    Some(LoginForm {
        action,
        token,
        hidden,
    })
}

/// Drives the login exchange and judges the outcome.
pub struct Authenticator {
    config: LoginConfig,
    checks: Vec<Box<dyn LoginCheck>>,
    fetcher: PageFetcher,
}

impl Authenticator {
    /// Build an authenticator with the checks implied by `config`.
    pub fn new(config: &ScrapeConfig) -> Self {
        let login = config.login.clone();
        let mut checks: Vec<Box<dyn LoginCheck>> = vec![
            Box::new(FailureMarkers {
                markers: login.failure_markers.clone(),
            }),
            Box::new(LoginRedirect {
                login_markers: login.login_url_markers.clone(),
                success_markers: login.success_markers.clone(),
            }),
        ];
        if login.require_username {
            checks.push(Box::new(UsernamePresence));
        }

        Self {
            config: login,
            checks,
            fetcher: PageFetcher::new(config.timeout),
        }
    }

    /// Replace the timeout used for both login requests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = PageFetcher::new(timeout);
        self
    }

    /// Append a custom check.
    pub fn with_check(mut self, check: impl LoginCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Names of the active checks, in evaluation order.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Log in. Mutates only the session's cookie jar.
    pub async fn login(
        &self,
        session: &dyn HttpSession,
        login_page_url: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let page = self.fetcher.fetch_response(session, login_page_url).await?;
        let form = extract_login_form(&page.body, &page.final_url, &self.config).ok_or_else(
            || ScrapeError::TokenNotFound {
                url: login_page_url.to_string(),
            },
        )?;

        let mut fields = form.hidden.clone();
        fields.push((self.config.username_field.clone(), username.to_string()));
        fields.push((self.config.password_field.clone(), password.to_string()));

        let resp = session.post_form(&form.action, &fields).await?;
        if resp.status >= 400 {
            return Err(ScrapeError::HttpError {
                url: form.action,
                status: resp.status,
            });
        }

        self.verify(&resp, username)?;
        info!("logged in as {username}");
        Ok(())
    }

    /// Run every check; the first failure rejects the login.
    pub fn verify(&self, response: &HttpResponse, username: &str) -> Result<()> {
        for check in &self.checks {
            match check.check(response, username) {
                CheckOutcome::Fail(reason) => {
                    warn!("login check {} failed: {reason}", check.name());
                    return Err(ScrapeError::LoginFailed(reason));
                }
                CheckOutcome::Pass | CheckOutcome::Inconclusive => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("checks", &self.check_names())
            .finish()
    }
}
