//! Locators: how an element is found in a document.
//!
//! A [`Locator`] is an immutable `(strategy, value)` pair. It is used both for the
//! first resolution of a binding and for re-resolution after the element went stale.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{PagesError, PagesResult};

/// Search strategy for locating elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `id` attribute
    Id,
    /// XPath expression
    XPath,
    /// Single CSS class name
    ClassName,
    /// Tag name
    TagName,
    /// CSS selector
    CssSelector,
    /// `name` attribute
    Name,
}

impl Strategy {
    /// Wire name of the strategy (WebDriver `using` value)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::XPath => "xpath",
            Self::ClassName => "class name",
            Self::TagName => "tag name",
            Self::CssSelector => "css selector",
            Self::Name => "name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable `(strategy, value)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

impl Locator {
    /// Build a locator from optional parts.
    ///
    /// A value without a strategy defaults to XPath. A missing value is a
    /// configuration error.
    pub fn new(strategy: Option<Strategy>, value: Option<&str>) -> PagesResult<Self> {
        match (strategy, value) {
            (_, None) => Err(PagesError::config(
                "[value, search_by] param must be passed to the element binding",
            )),
            (_, Some(v)) if v.is_empty() => Err(PagesError::config(
                "[value, search_by] param must be passed to the element binding",
            )),
            (strategy, Some(v)) => Ok(Self {
                strategy: strategy.unwrap_or(Strategy::XPath),
                value: v.to_string(),
            }),
        }
    }

    /// XPath locator
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::XPath,
            value: value.into(),
        }
    }

    /// `id` locator
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Id,
            value: value.into(),
        }
    }

    /// CSS class locator
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::ClassName,
            value: value.into(),
        }
    }

    /// Tag name locator
    #[must_use]
    pub fn tag_name(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::TagName,
            value: value.into(),
        }
    }

    /// CSS selector locator
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::CssSelector,
            value: value.into(),
        }
    }

    /// `name` attribute locator
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Name,
            value: value.into(),
        }
    }

    /// XPath matching any element whose `attribute` equals `value`
    #[must_use]
    pub fn by_attribute(attribute: &str, value: &str) -> Self {
        Self::xpath(format!(r#"//*[@{attribute}="{value}"]"#))
    }

    /// The search strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The search value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.strategy, self.value)
    }
}

/// Rewrite an absolute xpath so it searches below the current element.
///
/// `//button` becomes `.//button`, `tag` becomes `./tag`.
#[must_use]
pub fn xpath_from_parent(xpath: &str) -> String {
    match xpath.strip_prefix("//") {
        Some(rest) => format!(".//{rest}"),
        None => format!("./{xpath}"),
    }
}
