//! Locators and per-page locator catalogs.
//!
//! A [`Locator`] pairs a lookup strategy with a selector string. Locators are
//! only meaningful for the page state they were written against, so every page
//! domain owns its own [`LocatorCatalog`] and catalogs are never merged.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Id,
    Css,
    #[serde(rename = "xpath")]
    XPath,
    ClassName,
    TagName,
    LinkText,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Id => "id",
            Strategy::Css => "css",
            Strategy::XPath => "xpath",
            Strategy::ClassName => "class",
            Strategy::TagName => "tag",
            Strategy::LinkText => "link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: Strategy,
    pub selector: String,
}

impl Locator {
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
        }
    }

    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Id, selector)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, selector)
    }

    pub fn class_name(selector: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, selector)
    }

    pub fn tag_name(selector: impl Into<String>) -> Self {
        Self::new(Strategy::TagName, selector)
    }

    pub fn link_text(selector: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, selector)
    }

    /// CSS equivalent for strategies WebDriver has no native lookup for.
    ///
    /// A class-name locator holding several space separated classes
    /// (`"notification-text notification-title"`) becomes a compound
    /// class selector (`.notification-text.notification-title`).
    pub fn as_css(&self) -> Option<String> {
        match self.strategy {
            Strategy::Css => Some(self.selector.clone()),
            Strategy::ClassName => {
                let classes: Vec<&str> = self.selector.split_whitespace().collect();
                if classes.is_empty() {
                    None
                } else {
                    Some(format!(".{}", classes.join(".")))
                }
            }
            Strategy::TagName => Some(self.selector.trim().to_string()),
            Strategy::Id | Strategy::XPath | Strategy::LinkText => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.selector)
    }
}

/// How an element lookup should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Block until at least one match is attached to the DOM.
    Presence,
    /// Block until a match is displayed and enabled.
    Clickable,
    /// Enumerate current matches without waiting.
    All,
}

/// Named locators for a single page domain.
#[derive(Debug, Clone, Default)]
pub struct LocatorCatalog {
    domain: String,
    entries: BTreeMap<&'static str, Locator>,
}

impl LocatorCatalog {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, locator: Locator) -> Self {
        self.entries.insert(name, locator);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn get(&self, name: &str) -> Result<&Locator, SessionError> {
        self.entries
            .get(name)
            .ok_or_else(|| SessionError::UnknownLocator {
                domain: self.domain.clone(),
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_class_becomes_css() {
        let locator = Locator::class_name("notification-text notification-title");
        assert_eq!(
            locator.as_css().as_deref(),
            Some(".notification-text.notification-title")
        );
    }

    #[test]
    fn test_native_strategies_have_no_css() {
        assert!(Locator::id("name-input").as_css().is_none());
        assert!(Locator::xpath("//button").as_css().is_none());
        assert_eq!(Locator::tag_name("td").as_css().as_deref(), Some("td"));
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = LocatorCatalog::new("circuit").with("name", Locator::id("name-input"));
        assert_eq!(catalog.get("name").unwrap(), &Locator::id("name-input"));
        match catalog.get("missing") {
            Err(SessionError::UnknownLocator { domain, name }) => {
                assert_eq!(domain, "circuit");
                assert_eq!(name, "missing");
            }
            other => panic!("expected UnknownLocator, got {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::css("table tr").to_string(), "css=table tr");
    }
}
