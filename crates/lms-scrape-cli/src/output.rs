//! Rendering scrape results for stdout or a file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use lms_scrape::download::course_dir_name;
use lms_scrape::{Course, CourseScrape, FlatMaterial, ScrapeResult};
use serde::Serialize;

/// The flat list view: one array of materials, each tagged with its section.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatResult<'a> {
    pub course_title: &'a str,
    pub materials: Vec<FlatMaterial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<'a> FlatResult<'a> {
    pub fn new(result: &'a ScrapeResult) -> Self {
        Self {
            course_title: &result.course_title,
            materials: result.flatten(),
            error: result.error.as_deref(),
            warnings: result.warnings.clone(),
        }
    }
}

/// Pretty JSON for `result`, sectioned or flat.
pub fn render(result: &ScrapeResult, flat: bool) -> serde_json::Result<String> {
    if flat {
        serde_json::to_string_pretty(&FlatResult::new(result))
    } else {
        serde_json::to_string_pretty(result)
    }
}

/// Pretty JSON array with one result per course, in dashboard order.
pub fn render_batch(runs: &[CourseScrape], flat: bool) -> serde_json::Result<String> {
    if flat {
        let results: Vec<_> = runs
            .iter()
            .map(|r| FlatResult::new(&r.outcome.result))
            .collect();
        serde_json::to_string_pretty(&results)
    } else {
        let results: Vec<_> = runs.iter().map(|r| &r.outcome.result).collect();
        serde_json::to_string_pretty(&results)
    }
}

/// File name for one course of a batch run: `course_<id>_<name>.json`.
pub fn course_file_name(course: &Course) -> String {
    format!("{}.json", course_dir_name(Some(&course.id), &course.name))
}

/// Write each course's result as its own file under `dir`.
pub fn emit_batch(
    runs: &[CourseScrape],
    flat: bool,
    dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(runs.len());
    for run in runs {
        let path = dir.join(course_file_name(&run.course));
        let json = render(&run.outcome.result, flat)?;
        emit(&json, Some(&path)).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Write `json` to `path`, or to stdout when no path is given.
pub fn emit(json: &str, path: Option<&Path>) -> std::io::Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, format!("{json}\n"))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
