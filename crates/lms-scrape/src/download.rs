//! Document payload downloads.
//!
//! Moodle usually serves `/mod/resource/view.php` either as the file itself
//! or as an HTML "landing page" that links to the real file under
//! `pluginfile.php`. Both shapes are handled here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::DownloadConfig;
use crate::error::{Result, ScrapeError};
use crate::session::{ByteResponse, HttpSession};

/// Selectors that point at the real file on a resource landing page, in order.
const LANDING_LINKS: &[(&str, &str)] = &[
    ("a.resourcelinkdetails", "href"),
    (".resourceworkaround a", "href"),
    (".resourcecontent a", "href"),
    ("object[data]", "data"),
    ("iframe#resourceobject", "src"),
    ("a[href*=\"pluginfile.php\"]", "href"),
];

/// Characters that are not allowed in file names on common platforms.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// A fetched payload with its proposed (sanitized, unreserved) file name.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Writes document payloads into one course directory.
#[derive(Debug)]
pub struct Downloader {
    dir: PathBuf,
    follow_landing_pages: bool,
    timeout: Duration,
    /// Names already handed out in this run.
    taken: Mutex<HashSet<String>>,
}

impl Downloader {
    pub fn new(dir: impl Into<PathBuf>, config: &DownloadConfig, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            follow_landing_pages: config.follow_landing_pages,
            timeout,
            taken: Mutex::new(HashSet::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download `url` and return the path written.
    ///
    /// `title` and `format` name the file when neither the response headers
    /// nor the URL carry a usable name.
    pub async fn download(
        &self,
        session: &dyn HttpSession,
        url: &str,
        title: &str,
        format: Option<&str>,
    ) -> Result<PathBuf> {
        let file = self.fetch(session, url, title, format).await?;
        self.save(file).await
    }

    /// Fetch the payload behind `url` without touching the disk.
    pub async fn fetch(
        &self,
        session: &dyn HttpSession,
        url: &str,
        title: &str,
        format: Option<&str>,
    ) -> Result<FetchedFile> {
        let mut resp = self.get(session, url).await?;

        if resp.is_html() {
            if !self.follow_landing_pages {
                return Err(ScrapeError::Unsupported(format!(
                    "{url} returned a page, not a file"
                )));
            }
            let page = String::from_utf8_lossy(&resp.bytes).into_owned();
            let file_url = find_file_link(&page, &resp.final_url).ok_or_else(|| {
                ScrapeError::Unsupported(format!("no file link on landing page {url}"))
            })?;
            debug!("landing page {url} points to {file_url}");
            resp = self.get(session, &file_url).await?;
            if resp.is_html() {
                return Err(ScrapeError::Unsupported(format!(
                    "{file_url} returned a page, not a file"
                )));
            }
        }

        let name = resp
            .header("content-disposition")
            .and_then(filename_from_disposition)
            .or_else(|| filename_from_url(&resp.final_url))
            .unwrap_or_else(|| fallback_name(title, format));
        Ok(FetchedFile {
            name: sanitize_filename(&name),
            bytes: resp.bytes,
        })
    }

    /// Claim a unique name for `file` and write it into the course directory.
    ///
    /// Names are claimed in call order, so callers that save in document
    /// order get the same `_N` suffixes on every run.
    pub async fn save(&self, file: FetchedFile) -> Result<PathBuf> {
        let name = self.reserve(&file.name);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &file.bytes).await?;
        debug!("saved {} ({} bytes)", path.display(), file.bytes.len());
        Ok(path)
    }

    async fn get(&self, session: &dyn HttpSession, url: &str) -> Result<ByteResponse> {
        let resp = tokio::time::timeout(self.timeout, session.get_bytes(url))
            .await
            .map_err(|_| {
                ScrapeError::unreachable(url, format!("timed out after {:?}", self.timeout))
            })??;
        if !resp.is_success() {
            return Err(ScrapeError::HttpError {
                url: url.to_string(),
                status: resp.status,
            });
        }
        Ok(resp)
    }

    /// Claim `name`, adding `_1`, `_2`, ... before the extension on collision.
    fn reserve(&self, name: &str) -> String {
        let mut taken = self.taken.lock().unwrap_or_else(|e| e.into_inner());
        if taken.insert(name.to_string()) {
            return name.to_string();
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        let mut n = 1;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            };
            if taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Directory name for a course: `course_<id>_<name>`, or `course_<name>`.
pub fn course_dir_name(course_id: Option<&str>, course_title: &str) -> String {
    let name = sanitize_filename(&course_title.split_whitespace().collect::<Vec<_>>().join("_"));
    match course_id {
        Some(id) => format!("course_{id}_{name}"),
        None => format!("course_{name}"),
    }
}

/// The `id` query parameter of a course URL.
pub fn course_id(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Filename from a `Content-Disposition` value. `filename*` wins over `filename`.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';') {
        let Some((key, raw)) = part.trim().split_once('=') else {
            continue;
        };
        let raw = raw.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.rsplit_once("''").map(|(_, e)| e).unwrap_or(raw);
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    if !decoded.is_empty() {
                        return Some(decoded.into_owned());
                    }
                }
            }
            "filename" if !raw.is_empty() => plain = Some(raw.to_string()),
            _ => {}
        }
    }
    plain
}

/// Last path segment of `url`, percent-decoded. Script names don't count.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?.into_owned();
    if decoded.to_ascii_lowercase().ends_with(".php") {
        return None;
    }
    Some(decoded)
}

/// Strip path components and characters that are unsafe in file names.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned.to_string()
    }
}

fn fallback_name(title: &str, format: Option<&str>) -> String {
    match format {
        Some(ext) if !title.to_ascii_lowercase().ends_with(&format!(".{ext}")) => {
            format!("{title}.{ext}")
        }
        _ => title.to_string(),
    }
}

/// Find the real file link on a resource landing page.
pub fn find_file_link(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok()?;
    LANDING_LINKS.iter().find_map(|(css, attr)| {
        let selector = Selector::parse(css).expect("landing selectors are valid");
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|target| base.join(target.trim()).ok())
            .map(|u| u.to_string())
    })
}
