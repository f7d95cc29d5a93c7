//! Rule-table classification of course activities.
//!
//! Rules are evaluated in a fixed priority order and the first match wins,
//! so an element carrying both a generic and a specific class resolves the
//! same way every time. Only the class set, link and icon are consulted.

use crate::types::ResourceKind;

/// Class fragments in priority order.
const CLASS_RULES: &[(&str, ResourceKind)] = &[
    ("resource", ResourceKind::Document),
    ("quiz", ResourceKind::Quiz),
    ("assign", ResourceKind::Assignment),
    ("url", ResourceKind::Link),
    ("forum", ResourceKind::Forum),
    ("page", ResourceKind::Text),
    ("folder", ResourceKind::Folder),
];

/// File extensions recognised as document formats.
const KNOWN_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "odt", "odp", "ods", "txt", "zip", "csv",
];

/// Moodle file icon names mapped to a format.
const ICON_FORMATS: &[(&str, &str)] = &[
    ("pdf", "pdf"),
    ("powerpoint", "ppt"),
    ("spreadsheet", "xls"),
    ("document", "doc"),
    ("archive", "zip"),
];

/// What the traverser knows about one activity element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementMetadata {
    /// Position of the element within its section.
    pub index: usize,
    pub classes: Vec<String>,
    pub title: Option<String>,
    pub href: Option<String>,
    pub icon_src: Option<String>,
    /// Text of the first date-like descendant.
    pub date_text: Option<String>,
    pub excerpt: Option<String>,
}

impl ElementMetadata {
    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Outcome of classifying one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ResourceKind,
    /// Document flavour (`pdf`, `docx`, ...) when the kind is a document.
    pub format: Option<String>,
}

/// Deterministic class-based classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceClassifier;

impl ResourceClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an element. Never fails; unmatched elements are `Other`.
    pub fn classify(&self, element: &ElementMetadata) -> Classification {
        let kind = classify_classes(&element.classes);
        let format = if kind == ResourceKind::Document {
            document_format(element.href.as_deref(), element.icon_src.as_deref())
        } else {
            None
        };
        Classification { kind, format }
    }
}

/// Apply the rule table to a class set.
pub fn classify_classes(classes: &[String]) -> ResourceKind {
    for (fragment, kind) in CLASS_RULES {
        if classes
            .iter()
            .any(|c| c.to_ascii_lowercase().contains(fragment))
        {
            return *kind;
        }
    }
    ResourceKind::Other
}

/// Work out a document format from the link extension, then the icon.
pub fn document_format(href: Option<&str>, icon_src: Option<&str>) -> Option<String> {
    if let Some(ext) = href.and_then(link_extension) {
        if KNOWN_EXTENSIONS.contains(&ext.as_str()) {
            return Some(ext);
        }
    }
    let icon = icon_src?.to_ascii_lowercase();
    ICON_FORMATS
        .iter()
        .find(|(needle, _)| icon.contains(needle))
        .map(|(_, format)| format.to_string())
}

/// Lower-cased extension of the last path segment, ignoring query and fragment.
fn link_extension(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
