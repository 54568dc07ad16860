//! Narrow interfaces to the browser-automation client.
//!
//! The framework never speaks the wire protocol itself. A concrete client
//! (WebDriver, CDP, or the in-memory [`crate::mock`] session) implements
//! [`Session`] and [`RawElement`], and a [`SessionProvider`] hands sessions out.
//!
//! All calls are synchronous. One test owns one session; nothing here is shared
//! across threads.

use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

use crate::locator::Locator;
use crate::result::PagesResult;

/// Result type for raw driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Faults reported by the automation client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The element reference no longer corresponds to a live node
    #[error("stale element reference")]
    StaleElement,
    /// Nothing matched the query
    #[error("no such element: {0}")]
    NoSuchElement(String),
    /// Any other transport or protocol failure
    #[error("{0}")]
    Other(String),
}

/// A browser cookie as returned by the client (`name`, `value`, `domain`, ...)
pub type Cookie = serde_json::Map<String, Value>;

/// Argument passed to [`Session::execute_script`]
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// Plain JSON value
    Value(Value),
    /// Reference to an element, by its client-side id
    Element(String),
}

/// Capability set of a raw element reference.
pub trait RawElement {
    /// Client-side id of the element (used for script arguments)
    fn element_id(&self) -> String;

    /// Lower-case tag name
    fn tag_name(&self) -> DriverResult<String>;

    /// Rendered text
    fn text(&self) -> DriverResult<String>;

    /// Attribute or property value
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Click the element
    fn click(&self) -> DriverResult<()>;

    /// Type into the element
    fn send_keys(&self, text: &str) -> DriverResult<()>;

    /// Clear an input
    fn clear(&self) -> DriverResult<()>;

    /// Whether the element is rendered visibly
    fn is_displayed(&self) -> DriverResult<bool>;

    /// Whether the element accepts interaction
    fn is_enabled(&self) -> DriverResult<bool>;

    /// Whether an option/checkbox is selected
    fn is_selected(&self) -> DriverResult<bool>;

    /// First descendant matching `locator`
    fn find_element(&self, locator: &Locator) -> DriverResult<Box<dyn RawElement>>;

    /// All descendants matching `locator` (possibly none)
    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn RawElement>>>;

    /// Whether the reference went stale.
    ///
    /// The default probes the tag name.
    fn is_stale(&self) -> bool {
        matches!(self.tag_name(), Err(DriverError::StaleElement))
    }
}

/// A live browser session
pub trait Session {
    /// Load `url` in the focused tab
    fn navigate(&self, url: &str) -> DriverResult<()>;

    /// URL of the focused tab
    fn current_url(&self) -> DriverResult<String>;

    /// Run a script in the page and return its JSON result
    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value>;

    /// All cookies visible to the current document
    fn cookies(&self) -> DriverResult<Vec<Cookie>>;

    /// Delete one cookie by name
    fn delete_cookie(&self, name: &str) -> DriverResult<()>;

    /// Delete all cookies for the current domain
    fn delete_all_cookies(&self) -> DriverResult<()>;

    /// First element in the document matching `locator`
    fn find_element(&self, locator: &Locator) -> DriverResult<Box<dyn RawElement>>;

    /// All elements in the document matching `locator` (possibly none)
    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn RawElement>>>;

    /// Handles of all open tabs, oldest first
    fn window_handles(&self) -> DriverResult<Vec<String>>;

    /// Focus the tab with `handle`
    fn switch_to_window(&self, handle: &str) -> DriverResult<()>;

    /// Close the focused tab
    fn close_window(&self) -> DriverResult<()>;

    /// Browser log entries of the given kind (`browser`, `driver`, ...)
    fn browser_log(&self, kind: &str) -> DriverResult<Vec<Value>>;
}

/// Hands out sessions and tears them down
pub trait SessionProvider {
    /// Current session, or a fresh one with cleared state when `fresh` is set
    fn session(&self, fresh: bool) -> PagesResult<Rc<dyn Session>>;

    /// Quit the browser
    fn quit(&self) -> PagesResult<()>;
}
