//! Configuration resolution: command-line flag, then environment, then default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use lms_scrape::{Credentials, DateOrder, ScrapeConfig};

/// Site root, e.g. `https://lms.example.com`.
pub const ENV_URL: &str = "MOODLE_URL";
pub const ENV_USERNAME: &str = "MOODLE_USERNAME";
pub const ENV_PASSWORD: &str = "MOODLE_PASSWORD";
pub const ENV_DOWNLOAD_DIR: &str = "LMS_DOWNLOAD_DIR";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the course page URL.
///
/// An explicit URL wins. Otherwise a course id is combined with the site
/// root from `--base-url` or `MOODLE_URL`.
pub fn resolve_course_url(
    explicit: Option<&str>,
    course_id: Option<&str>,
    base_url: Option<&str>,
) -> anyhow::Result<String> {
    resolve_course_url_from(explicit, course_id, base_url, &env_var)
}

fn resolve_course_url_from(
    explicit: Option<&str>,
    course_id: Option<&str>,
    base_url: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }
    let Some(id) = course_id else {
        bail!("no course given: pass a course URL or --course-id");
    };
    let base = resolve_base_url_from(base_url, env)?;
    Ok(format!("{base}/course/view.php?id={id}"))
}

/// Resolve the site root used for login and the dashboard.
pub fn resolve_base_url(explicit: Option<&str>) -> anyhow::Result<String> {
    resolve_base_url_from(explicit, &env_var)
}

fn resolve_base_url_from(
    explicit: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<String> {
    let base = explicit
        .map(str::to_string)
        .or_else(|| env(ENV_URL))
        .with_context(|| format!("no site URL: pass --base-url or set {ENV_URL}"))?;
    Ok(base.trim_end_matches('/').to_string())
}

/// Resolve login credentials. Both halves must be present or neither.
pub fn resolve_credentials(
    username: Option<&str>,
    password: Option<&str>,
) -> anyhow::Result<Option<Credentials>> {
    resolve_credentials_from(username, password, &env_var)
}

fn resolve_credentials_from(
    username: Option<&str>,
    password: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<Credentials>> {
    let username = username.map(str::to_string).or_else(|| env(ENV_USERNAME));
    let password = password.map(str::to_string).or_else(|| env(ENV_PASSWORD));
    match (username, password) {
        (Some(u), Some(p)) => Ok(Some(Credentials::new(u, p))),
        (None, None) => Ok(None),
        (Some(_), None) => bail!("username given without password (set {ENV_PASSWORD})"),
        (None, Some(_)) => bail!("password given without username (set {ENV_USERNAME})"),
    }
}

/// Resolve the download directory, if downloads are wanted at all.
pub fn resolve_download_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_download_dir_from(explicit, &env_var)
}

fn resolve_download_dir_from(
    explicit: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env(ENV_DOWNLOAD_DIR).map(PathBuf::from))
}

/// Options that shape a [`ScrapeConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub timeout_secs: Option<u64>,
    pub date_order: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub require_username: bool,
}

/// Build the library configuration from resolved options.
pub fn build_config(options: &ConfigOptions) -> anyhow::Result<ScrapeConfig> {
    let mut config = ScrapeConfig::default();
    if let Some(secs) = options.timeout_secs {
        if secs == 0 {
            bail!("timeout must be at least one second");
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(order) = options.date_order.as_deref() {
        let order: DateOrder = order.parse()?;
        config = config.with_date_order(order);
    }
    if let Some(dir) = &options.download_dir {
        config = config.with_download_dir(dir);
    }
    config.login.require_username = options.require_username;
    Ok(config)
}
