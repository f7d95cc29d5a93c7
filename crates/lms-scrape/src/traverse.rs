//! Course page traversal.
//!
//! Traversal runs in two phases. [`parse_course_page`] walks the HTML tree
//! synchronously and produces owned [`ParsedCourse`] records, because
//! `scraper::Html` is not `Send` and must not live across an await point.
//! [`CourseTraverser::traverse`] then classifies each record, extracts
//! deadlines and, when enabled, downloads document payloads.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::{ElementMetadata, ResourceClassifier};
use crate::config::{DownloadConfig, ScrapeConfig};
use crate::deadline::DeadlineExtractor;
use crate::download::{course_dir_name, course_id, Downloader};
use crate::error::{Result, ScrapeError};
use crate::selectors::{CompiledProfile, SelectorProfile};
use crate::session::HttpSession;
use crate::types::{Resource, ResourceKind, ScrapeResult, Section};

/// Course title used when the page has none.
pub const UNKNOWN_COURSE: &str = "Unknown course";

/// Resource title used when an element has a link but no text.
pub const UNTITLED: &str = "Untitled resource";

/// One course page, reduced to owned data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCourse {
    pub title: String,
    pub sections: Vec<ParsedSection>,
    /// Elements dropped because nothing usable could be read from them.
    pub skipped: usize,
}

impl ParsedCourse {
    pub fn activity_count(&self) -> usize {
        self.sections.iter().map(|s| s.activities.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSection {
    pub name: String,
    pub activities: Vec<ElementMetadata>,
}

/// Parse a course page with `profile`. Never fails; unreadable elements are
/// logged and counted in [`ParsedCourse::skipped`].
pub fn parse_course_page(html: &str, profile: &CompiledProfile, page_url: &str) -> ParsedCourse {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let root = document.root_element();

    let title = profile
        .course_title
        .iter()
        .find_map(|sel| {
            document
                .select(sel)
                .map(|el| collapse(&el.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
        .unwrap_or_else(|| UNKNOWN_COURSE.to_string());

    let mut course = ParsedCourse {
        title,
        ..ParsedCourse::default()
    };

    let sections = outermost(root, &profile.section);
    if sections.is_empty() {
        if profile.whole_page_section {
            debug!("profile {}: no sections, using whole page", profile.name);
            let mut section = parse_section(root, 0, profile, base.as_ref(), &mut course.skipped);
            section.name = "Section 1".to_string();
            if !section.activities.is_empty() {
                course.sections.push(section);
            }
        }
        return course;
    }

    for (ordinal, el) in sections.into_iter().enumerate() {
        let section = parse_section(el, ordinal, profile, base.as_ref(), &mut course.skipped);
        course.sections.push(section);
    }
    course
}

fn parse_section(
    el: ElementRef<'_>,
    ordinal: usize,
    profile: &CompiledProfile,
    base: Option<&Url>,
    skipped: &mut usize,
) -> ParsedSection {
    let name = profile
        .section_name
        .iter()
        .find_map(|sel| first_text(el, sel))
        .unwrap_or_else(|| format!("Section {}", ordinal + 1));

    let mut activities = Vec::new();
    for (index, activity) in outermost(el, &profile.activity).into_iter().enumerate() {
        match parse_activity(activity, index, profile, base) {
            Ok(meta) => activities.push(meta),
            Err(e) => {
                warn!("section '{name}': skipping element: {e}");
                *skipped += 1;
            }
        }
    }

    ParsedSection { name, activities }
}

/// Read one activity element. Fails when it has neither a title nor a link.
fn parse_activity(
    el: ElementRef<'_>,
    index: usize,
    profile: &CompiledProfile,
    base: Option<&Url>,
) -> Result<ElementMetadata> {
    let value = el.value();
    let is_anchor = value.name().eq_ignore_ascii_case("a");

    let own_href = if is_anchor { value.attr("href") } else { None };
    let link = el.select(&profile.link).next();
    let href = own_href
        .or_else(|| link.and_then(|a| a.value().attr("href")))
        .and_then(|h| resolve(base, h));

    let title = profile
        .title
        .iter()
        .find_map(|sel| {
            el.select(sel)
                .map(|t| text_without(t, profile.title_strip.as_ref()))
                .find(|t| !t.is_empty())
        })
        .or_else(|| {
            link.map(|a| text_without(a, profile.title_strip.as_ref()))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            is_anchor
                .then(|| text_without(el, profile.title_strip.as_ref()))
                .filter(|t| !t.is_empty())
        });

    if title.is_none() && href.is_none() {
        return Err(ScrapeError::Parse {
            index,
            reason: "element has neither title nor link".to_string(),
        });
    }

    let mut classes: Vec<String> = value.classes().map(str::to_string).collect();
    if profile.infer_module_class {
        if let Some(module) = href.as_deref().and_then(module_from_href) {
            classes.push(format!("modtype_{module}"));
        }
    }

    let icon_src = el
        .select(&profile.icon)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let excerpt = profile
        .excerpt
        .iter()
        .find_map(|sel| first_text(el, sel));

    Ok(ElementMetadata {
        index,
        classes,
        title,
        href,
        icon_src,
        date_text: first_block_text(el, &profile.date),
        excerpt,
    })
}

/// Matches of `selector` under `scope` that are not nested in another match.
fn outermost<'a>(scope: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    let matched: Vec<ElementRef<'a>> = scope.select(selector).collect();
    let ids: HashSet<_> = matched.iter().map(|el| el.id()).collect();
    matched
        .into_iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .collect()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(|el| collapse(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

/// Like [`first_text`], but text nodes are space-separated so adjacent
/// blocks such as `<div>Opened: ..</div><div>Due: ..</div>` stay apart.
fn first_block_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(|el| collapse(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
}

/// Element text with `strip` matches (screen-reader hints) removed.
fn text_without(el: ElementRef<'_>, strip: Option<&Selector>) -> String {
    let skip: HashSet<_> = strip
        .map(|sel| el.select(sel).map(|s| s.id()).collect())
        .unwrap_or_default();
    let mut text = String::new();
    for node in el.descendants() {
        if let Some(t) = node.value().as_text() {
            if !node.ancestors().any(|a| skip.contains(&a.id())) {
                text.push_str(t);
            }
        }
    }
    collapse(&text)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}

/// `assign` from `.../mod/assign/view.php?id=3`.
fn module_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/mod/")?;
    let module = rest.split('/').next()?;
    (!module.is_empty() && module.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .then(|| module.to_ascii_lowercase())
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text,
    }
}

/// Walks a course page with one selector profile.
#[derive(Debug, Clone)]
pub struct CourseTraverser {
    profile: CompiledProfile,
    classifier: ResourceClassifier,
    deadlines: DeadlineExtractor,
    download: Option<DownloadConfig>,
    timeout: Duration,
    excerpt_chars: usize,
}

impl CourseTraverser {
    /// Compile `profile` and capture the relevant parts of `config`.
    pub fn new(config: &ScrapeConfig, profile: &SelectorProfile) -> Result<Self> {
        Ok(Self {
            profile: profile.compile()?,
            classifier: ResourceClassifier::new(),
            deadlines: DeadlineExtractor::with_due_markers(config.date_order, &config.due_markers),
            download: config.download.clone(),
            timeout: config.timeout,
            excerpt_chars: config.excerpt_chars,
        })
    }

    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }

    /// Parse `html` into owned records.
    pub fn parse(&self, html: &str, page_url: &str) -> ParsedCourse {
        parse_course_page(html, &self.profile, page_url)
    }

    /// Classify parsed records and assemble the result. No network.
    pub fn assemble(&self, parsed: ParsedCourse) -> ScrapeResult {
        let sections = parsed
            .sections
            .into_iter()
            .enumerate()
            .map(|(ordinal, section)| Section {
                name: section.name,
                ordinal,
                resources: section
                    .activities
                    .into_iter()
                    .map(|meta| self.to_resource(meta))
                    .collect(),
            })
            .collect();

        ScrapeResult {
            course_title: parsed.title,
            sections,
            ..ScrapeResult::default()
        }
    }

    fn to_resource(&self, meta: ElementMetadata) -> Resource {
        let classification = self.classifier.classify(&meta);
        let deadline = if classification.kind.has_deadline() {
            self.deadlines.extract(&meta)
        } else {
            None
        };

        Resource {
            title: meta.title.unwrap_or_else(|| UNTITLED.to_string()),
            kind: classification.kind,
            source_url: meta.href,
            deadline,
            raw_text_excerpt: meta.excerpt.map(|e| truncate_chars(e, self.excerpt_chars)),
            format: classification.format,
            local_path: None,
        }
    }

    /// Parse, classify and optionally download. Never fails; download
    /// problems become warnings.
    pub async fn traverse(
        &self,
        session: &dyn HttpSession,
        page_url: &str,
        html: &str,
    ) -> ScrapeResult {
        let parsed = self.parse(html, page_url);
        info!(
            "profile {}: {} sections, {} activities, {} skipped",
            self.profile.name,
            parsed.sections.len(),
            parsed.activity_count(),
            parsed.skipped
        );

        let mut result = self.assemble(parsed);
        if let Some(download) = &self.download {
            self.download_documents(session, page_url, download, &mut result)
                .await;
        }
        result
    }

    async fn download_documents(
        &self,
        session: &dyn HttpSession,
        page_url: &str,
        config: &DownloadConfig,
        result: &mut ScrapeResult,
    ) {
        let dir = config.dir.join(course_dir_name(
            course_id(page_url).as_deref(),
            &result.course_title,
        ));
        let downloader = Downloader::new(dir, config, self.timeout);

        let jobs: Vec<(usize, usize, String, String, Option<String>)> = result
            .sections
            .iter()
            .enumerate()
            .flat_map(|(si, section)| {
                section
                    .resources
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.kind == ResourceKind::Document)
                    .filter_map(move |(ri, r)| {
                        let url = r.source_url.clone()?;
                        Some((si, ri, url, r.title.clone(), r.format.clone()))
                    })
            })
            .collect();
        if jobs.is_empty() {
            return;
        }

        // Payloads are fetched concurrently but saved in document order, so
        // colliding names get the same suffixes on every run.
        let downloader = &downloader;
        let mut fetches = stream::iter(jobs)
            .map(|(si, ri, url, title, format)| async move {
                let fetched = downloader
                    .fetch(session, &url, &title, format.as_deref())
                    .await;
                (si, ri, url, fetched)
            })
            .buffered(config.concurrency.max(1));

        let mut saved = 0;
        while let Some((si, ri, url, fetched)) = fetches.next().await {
            let outcome = match fetched {
                Ok(file) => downloader.save(file).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(path) => {
                    result.sections[si].resources[ri].local_path = Some(path);
                    saved += 1;
                }
                Err(e) => {
                    warn!("download failed for {url}: {e}");
                    result.warnings.push(format!("download failed for {url}: {e}"));
                }
            }
        }
        info!("downloaded {saved} documents into {}", downloader.dir().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSession, Reply};

    const PAGE: &str = "https://lms.example.com/course/view.php?id=7";

    const MOODLE_PAGE: &str = r#"
    <html><head><title>Course: Algorithms</title></head><body>
    <h1>Algorithms and Data Structures</h1>
    <ul class="topics">
      <li class="section main" id="section-0">
        <h3 class="sectionname">General</h3>
        <ul class="section">
          <li class="activity forum modtype_forum">
            <a href="/mod/forum/view.php?id=1"><span class="instancename">Announcements<span class="accesshide"> Forum</span></span></a>
          </li>
        </ul>
      </li>
      <li class="section main" id="section-1">
        <h3 class="sectionname">Week 1</h3>
        <ul class="section">
          <li class="activity resource modtype_resource">
            <a href="/mod/resource/view.php?id=10">
              <img class="activityicon" src="/theme/image.php/boost/core/1/f/pdf-24" />
              <span class="instancename">Intro slides<span class="accesshide"> File</span></span>
            </a>
          </li>
          <li class="activity assign modtype_assign">
            <a href="/mod/assign/view.php?id=11"><span class="instancename">Homework 1</span></a>
            <div class="activity-dates"><div>Due: 15 March 2024, 23:59</div></div>
          </li>
          <li class="activity label modtype_label">
            <div class="contentwithoutlink"></div>
          </li>
          <li class="activity quiz modtype_quiz">
            <a href="/mod/quiz/view.php?id=12"><span class="instancename">Quiz 1</span></a>
            <div class="activity-dates">Closes: 03/04/2024</div>
          </li>
        </ul>
      </li>
      <li class="section main" id="section-2">
        <ul class="section">
          <li class="activity url modtype_url">
            <a href="https://en.wikipedia.org/wiki/Heap"><span class="instancename">Heaps</span></a>
            <div class="contentafterlink">Background reading on binary heaps.</div>
          </li>
        </ul>
      </li>
    </ul>
    </body></html>
    "#;

    fn traverser(profile: SelectorProfile) -> CourseTraverser {
        CourseTraverser::new(&ScrapeConfig::default(), &profile).unwrap()
    }

    #[test]
    fn test_parse_primary_layout() {
        let parsed = traverser(SelectorProfile::primary()).parse(MOODLE_PAGE, PAGE);
        assert_eq!(parsed.title, "Algorithms and Data Structures");
        let names: Vec<_> = parsed.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["General", "Week 1", "Section 3"]);
        assert_eq!(parsed.sections[1].activities.len(), 3);
        assert_eq!(parsed.skipped, 1);

        let slides = &parsed.sections[1].activities[0];
        assert_eq!(slides.title.as_deref(), Some("Intro slides"));
        assert_eq!(
            slides.href.as_deref(),
            Some("https://lms.example.com/mod/resource/view.php?id=10")
        );
        assert!(slides.icon_src.as_deref().unwrap().contains("pdf"));
    }

    #[test]
    fn test_assemble_classifies_and_orders() {
        let t = traverser(SelectorProfile::primary());
        let result = t.assemble(t.parse(MOODLE_PAGE, PAGE));

        assert_eq!(result.material_count(), 5);
        let week1 = &result.sections[1];
        assert_eq!(week1.ordinal, 1);
        let kinds: Vec<_> = week1.resources.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::Document,
                ResourceKind::Assignment,
                ResourceKind::Quiz
            ]
        );
        assert_eq!(week1.resources[0].format.as_deref(), Some("pdf"));

        let homework = week1.resources[1].deadline.as_ref().unwrap();
        assert_eq!(homework.raw, "15 March 2024");
        assert_eq!(homework.normalized.as_deref(), Some("2024-03-15T23:59:00"));

        let quiz = week1.resources[2].deadline.as_ref().unwrap();
        assert_eq!(quiz.raw, "03/04/2024");
        assert_eq!(quiz.normalized.as_deref(), Some("2024-04-03"));
        assert!(quiz.ambiguous);

        let heaps = &result.sections[2].resources[0];
        assert_eq!(heaps.kind, ResourceKind::Link);
        assert_eq!(
            heaps.raw_text_excerpt.as_deref(),
            Some("Background reading on binary heaps.")
        );
    }

    #[test]
    fn test_deadline_prefers_due_over_opened() {
        let html = r#"<h1>Algorithms</h1>
            <ul><li class="section"><h3 class="sectionname">Week 2</h3><ul>
              <li class="activity assign modtype_assign">
                <a href="/mod/assign/view.php?id=20"><span class="instancename">Homework 2</span></a>
                <div data-region="activity-dates" class="activity-dates"><div><strong>Opened:</strong> Friday, 1 March 2024, 12:00 AM</div><div><strong>Due:</strong> Friday, 15 March 2024, 11:59 PM</div></div>
              </li>
            </ul></li></ul>"#;
        let t = traverser(SelectorProfile::primary());
        let result = t.assemble(t.parse(html, PAGE));
        let deadline = result.sections[0].resources[0].deadline.clone().unwrap();
        assert_eq!(deadline.raw, "15 March 2024");
        assert_eq!(deadline.normalized.as_deref(), Some("2024-03-15T23:59:00"));
    }

    #[test]
    fn test_forum_never_gets_deadline() {
        let html = r#"<ul><li class="section"><h3 class="sectionname">S</h3><ul>
            <li class="activity forum"><span class="instancename">Q&amp;A</span>
            <div class="activity-dates">Due: 1 June 2024</div></li></ul></li></ul>"#;
        let t = traverser(SelectorProfile::primary());
        let result = t.assemble(t.parse(html, PAGE));
        let forum = &result.sections[0].resources[0];
        assert_eq!(forum.kind, ResourceKind::Forum);
        assert!(forum.deadline.is_none());
    }

    #[test]
    fn test_fallback_anchor_resource() {
        let html = r#"<html><body><h1>Physics</h1>
            <div class="section"><h3 class="sectionname">Week 1</h3>
            <a class="resource">Slides.pdf</a></div></body></html>"#;
        let t = traverser(SelectorProfile::fallback());
        let result = t.assemble(t.parse(html, PAGE));

        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].name, "Week 1");
        let slides = &result.sections[0].resources[0];
        assert_eq!(slides.title, "Slides.pdf");
        assert_eq!(slides.kind, ResourceKind::Document);
    }

    #[test]
    fn test_primary_misses_loose_layout() {
        let html = r#"<div class="section"><a class="resource">Slides.pdf</a></div>"#;
        let t = traverser(SelectorProfile::primary());
        assert_eq!(t.assemble(t.parse(html, PAGE)).material_count(), 0);
    }

    #[test]
    fn test_fallback_whole_page_and_module_inference() {
        let html = r#"<html><body><h2>Chemistry</h2>
            <p>Links:</p>
            <a href="/mod/quiz/view.php?id=5">Midterm practice</a>
            <a href="/mod/assign/view.php?id=6">Lab report</a>
            </body></html>"#;
        let t = traverser(SelectorProfile::fallback());
        let result = t.assemble(t.parse(html, PAGE));

        assert_eq!(result.course_title, "Chemistry");
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].name, "Section 1");
        let kinds: Vec<_> = result.sections[0].resources.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Quiz, ResourceKind::Assignment]);
    }

    #[test]
    fn test_nested_matches_counted_once() {
        let html = r#"<div class="section"><h3>Week 2</h3>
            <div class="activity resource"><a class="activity" href="/mod/resource/view.php?id=9">Notes</a></div>
            </div>"#;
        let t = traverser(SelectorProfile::fallback());
        let result = t.assemble(t.parse(html, PAGE));
        assert_eq!(result.material_count(), 1);
        assert_eq!(result.sections[0].resources[0].title, "Notes");
    }

    #[test]
    fn test_unknown_title() {
        let parsed = traverser(SelectorProfile::primary()).parse("<p>empty</p>", PAGE);
        assert_eq!(parsed.title, UNKNOWN_COURSE);
        assert!(parsed.sections.is_empty());
    }

    #[test]
    fn test_module_from_href() {
        assert_eq!(
            module_from_href("https://x/mod/assign/view.php?id=3").as_deref(),
            Some("assign")
        );
        assert_eq!(module_from_href("https://x/course/view.php"), None);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef".into(), 10), "abcdef");
        assert_eq!(truncate_chars("àbc def".into(), 3), "àbc…");
    }

    #[tokio::test]
    async fn test_traverse_downloads_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let html = r#"<h1>Algorithms</h1>
            <ul><li class="section"><h3 class="sectionname">Week 1</h3><ul>
              <li class="activity resource"><a href="/pluginfile.php/1/a.pdf"><span class="instancename">A</span></a></li>
              <li class="activity resource"><a href="/pluginfile.php/1/broken.pdf"><span class="instancename">B</span></a></li>
              <li class="activity resource"><a href="/pluginfile.php/1/c.pdf"><span class="instancename">C</span></a></li>
            </ul></li></ul>"#;
        let session = MockSession::new()
            .on_get(
                "https://lms.example.com/pluginfile.php/1/a.pdf",
                Reply::file(b"A", &[("content-type", "application/pdf")]),
            )
            .on_get(
                "https://lms.example.com/pluginfile.php/1/broken.pdf",
                Reply::status(500, "boom"),
            )
            .on_get(
                "https://lms.example.com/pluginfile.php/1/c.pdf",
                Reply::file(b"C", &[("content-type", "application/pdf")]),
            );

        let config = ScrapeConfig::default().with_download_dir(tmp.path());
        let t = CourseTraverser::new(&config, &SelectorProfile::primary()).unwrap();
        let result = t.traverse(&session, PAGE, html).await;

        let course_dir = tmp.path().join("course_7_Algorithms");
        let resources = &result.sections[0].resources;
        let titles: Vec<_> = resources.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(resources[0].local_path, Some(course_dir.join("a.pdf")));
        assert_eq!(resources[1].local_path, None);
        assert_eq!(resources[2].local_path, Some(course_dir.join("c.pdf")));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("broken.pdf"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_colliding_names_follow_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        let html = r#"<h1>Algorithms</h1>
            <ul><li class="section"><h3 class="sectionname">Week 1</h3><ul>
              <li class="activity resource"><a href="/pluginfile.php/1/notes.pdf"><span class="instancename">Notes</span></a></li>
              <li class="activity resource"><a href="/pluginfile.php/2/notes.pdf"><span class="instancename">Notes</span></a></li>
            </ul></li></ul>"#;
        let session = MockSession::new()
            .on_get(
                "https://lms.example.com/pluginfile.php/1/notes.pdf",
                Reply::file(b"one", &[("content-type", "application/pdf")]),
            )
            .on_get(
                "https://lms.example.com/pluginfile.php/2/notes.pdf",
                Reply::file(b"two", &[("content-type", "application/pdf")]),
            );

        let config = ScrapeConfig::default().with_download_dir(tmp.path());
        let t = CourseTraverser::new(&config, &SelectorProfile::primary()).unwrap();
        let result = t.traverse(&session, PAGE, html).await;

        let course_dir = tmp.path().join("course_7_Algorithms");
        let resources = &result.sections[0].resources;
        assert_eq!(resources[0].local_path, Some(course_dir.join("notes.pdf")));
        assert_eq!(resources[1].local_path, Some(course_dir.join("notes_1.pdf")));
        assert_eq!(std::fs::read(course_dir.join("notes.pdf")).unwrap(), b"one");
        assert_eq!(std::fs::read(course_dir.join("notes_1.pdf")).unwrap(), b"two");
    }
}
