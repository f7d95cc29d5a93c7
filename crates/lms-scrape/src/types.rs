//! Core data types for scraped courses and the JSON wire format.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScrapeError;

/// A course discovered on the LMS dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub source_url: String,
}

/// The fixed set of resource kinds exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Link,
    Quiz,
    Assignment,
    Forum,
    Folder,
    Text,
    Other,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Document,
        ResourceKind::Link,
        ResourceKind::Quiz,
        ResourceKind::Assignment,
        ResourceKind::Forum,
        ResourceKind::Folder,
        ResourceKind::Text,
        ResourceKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Document => "document",
            ResourceKind::Link => "link",
            ResourceKind::Quiz => "quiz",
            ResourceKind::Assignment => "assignment",
            ResourceKind::Forum => "forum",
            ResourceKind::Folder => "folder",
            ResourceKind::Text => "text",
            ResourceKind::Other => "other",
        }
    }

    /// Kinds whose elements may carry a due date.
    pub fn has_deadline(self) -> bool {
        matches!(self, ResourceKind::Quiz | ResourceKind::Assignment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ScrapeError::Unsupported(format!("resource type '{s}'")))
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    /// Unknown type strings degrade to `other` instead of failing the payload.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(ResourceKind::Other))
    }
}

/// A due date attached to a quiz or assignment.
///
/// `raw` is always the text that matched; `normalized` is ISO-8601 when the
/// text could be parsed. `ambiguous` marks numeric dates whose day/month
/// order was assumed rather than known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub raw: String,
    #[serde(default)]
    pub normalized: Option<String>,
    #[serde(default)]
    pub ambiguous: bool,
}

impl Deadline {
    /// A deadline whose text could not be parsed.
    pub fn raw_only(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            normalized: None,
            ambiguous: false,
        }
    }
}

/// A single discoverable item on a course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(rename = "link", default)]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    #[serde(rename = "content", default, skip_serializing_if = "Option::is_none")]
    pub raw_text_excerpt: Option<String>,
    /// Document flavour such as `pdf`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl Resource {
    pub fn new(title: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            title: title.into(),
            kind,
            source_url: None,
            deadline: None,
            raw_text_excerpt: None,
            format: None,
            local_path: None,
        }
    }
}

/// A named grouping of resources, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub ordinal: usize,
    #[serde(rename = "materials", default)]
    pub resources: Vec<Resource>,
}

/// The artifact handed to whoever persists or displays a scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub course_title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ScrapeResult {
    /// A result that carries only an error.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            course_title: String::new(),
            sections: Vec::new(),
            error: Some(error.to_string()),
            warnings: Vec::new(),
        }
    }

    /// Total number of resources across all sections.
    pub fn material_count(&self) -> usize {
        self.sections.iter().map(|s| s.resources.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Flatten sections into a single list, tagging each item with its section.
    pub fn flatten(&self) -> Vec<FlatMaterial> {
        self.sections
            .iter()
            .flat_map(|section| {
                section.resources.iter().map(move |r| FlatMaterial {
                    title: r.title.clone(),
                    kind: r.kind,
                    url: r.source_url.clone(),
                    deadline: r.deadline.clone(),
                    content: r.raw_text_excerpt.clone(),
                    section: section.name.clone(),
                })
            })
            .collect()
    }
}

/// One material in the flat list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatMaterial {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub section: String,
}

/// Login credentials. The password never appears in debug output.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
