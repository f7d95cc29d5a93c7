//! Selector profiles: where sections, activities and their parts live.
//!
//! The built-in `primary` and `fallback` profiles are embedded at compile
//! time from `selectors.json`, so there is no runtime file I/O. Callers may
//! build their own profile and hand it to the traverser instead.

use std::collections::HashMap;
use std::sync::OnceLock;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// Raw JSON content of the built-in profiles.
const PROFILES_JSON: &str = include_str!("selectors.json");

/// A named set of CSS selectors describing one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorProfile {
    #[serde(default)]
    pub name: String,
    /// Tried in order; the first with non-empty text wins.
    pub course_title: Vec<String>,
    pub section: String,
    /// Tried in order within each section.
    pub section_name: Vec<String>,
    pub activity: String,
    /// Tried in order within each activity.
    pub title: Vec<String>,
    /// Screen-reader helper text removed from titles.
    #[serde(default)]
    pub title_strip: Option<String>,
    pub link: String,
    pub icon: String,
    pub date: String,
    #[serde(default)]
    pub excerpt: Vec<String>,
    /// Derive a `modtype_<module>` class from `/mod/<module>/` links.
    #[serde(default)]
    pub infer_module_class: bool,
    /// Treat the whole page as one section when no section matches.
    #[serde(default)]
    pub whole_page_section: bool,
}

fn builtin_profiles() -> &'static HashMap<String, SelectorProfile> {
    static PROFILES: OnceLock<HashMap<String, SelectorProfile>> = OnceLock::new();
    PROFILES.get_or_init(|| {
        let mut profiles: HashMap<String, SelectorProfile> =
            serde_json::from_str(PROFILES_JSON).expect("embedded selector profiles are valid");
        for (name, profile) in profiles.iter_mut() {
            profile.name = name.clone();
        }
        profiles
    })
}

impl SelectorProfile {
    /// Look up a built-in profile by name.
    pub fn builtin(name: &str) -> Option<Self> {
        builtin_profiles().get(name).cloned()
    }

    /// The structured Moodle course layout.
    pub fn primary() -> Self {
        Self::builtin("primary").expect("primary profile is embedded")
    }

    /// The permissive layout used when the primary pass finds nothing.
    pub fn fallback() -> Self {
        Self::builtin("fallback").expect("fallback profile is embedded")
    }

    /// Parse every selector, failing on the first invalid one.
    pub fn compile(&self) -> Result<CompiledProfile> {
        let one = |s: &str| parse_selector(&self.name, s);
        let many = |list: &[String]| list.iter().map(|s| one(s)).collect::<Result<Vec<_>>>();

        Ok(CompiledProfile {
            name: self.name.clone(),
            course_title: many(&self.course_title)?,
            section: one(&self.section)?,
            section_name: many(&self.section_name)?,
            activity: one(&self.activity)?,
            title: many(&self.title)?,
            title_strip: self.title_strip.as_deref().map(one).transpose()?,
            link: one(&self.link)?,
            icon: one(&self.icon)?,
            date: one(&self.date)?,
            excerpt: many(&self.excerpt)?,
            infer_module_class: self.infer_module_class,
            whole_page_section: self.whole_page_section,
        })
    }
}

fn parse_selector(profile: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector {
        profile: profile.to_string(),
        selector: selector.to_string(),
    })
}

/// A profile with all selectors parsed and ready to run.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub name: String,
    pub course_title: Vec<Selector>,
    pub section: Selector,
    pub section_name: Vec<Selector>,
    pub activity: Selector,
    pub title: Vec<Selector>,
    pub title_strip: Option<Selector>,
    pub link: Selector,
    pub icon: Selector,
    pub date: Selector,
    pub excerpt: Vec<Selector>,
    pub infer_module_class: bool,
    pub whole_page_section: bool,
}
