//! Result and error types for page objects.

use crate::session::DriverError;
use thiserror::Error;

/// Result type for page-object operations
pub type PagesResult<T> = Result<T, PagesError>;

/// Errors that can occur while working with pages, elements and components
#[derive(Debug, Error)]
pub enum PagesError {
    /// Malformed declaration or application config (never retried)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The browser is not on one of the page's valid URLs
    #[error("Page not opened: {message}")]
    PageNotOpened {
        /// Error message
        message: String,
    },

    /// Generic page-level failure (readiness script missing, bad argument)
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Zero matches for a required element
    #[error("Element not found by {locator}")]
    ElementNotFound {
        /// Display form of the locator that failed
        locator: String,
    },

    /// Element reference went stale and the single recovery attempt failed
    #[error("Stale element reference at {context}")]
    StaleElement {
        /// Slot name of the element, or a generic marker
        context: String,
    },

    /// Any other browser-automation failure, wrapped with its context
    #[error("Driver error during {operation} at {context}: {message}")]
    Driver {
        /// Slot name of the element, or a generic marker
        context: String,
        /// Operation that failed
        operation: String,
        /// Underlying message
        message: String,
    },

    /// A wait exceeded its deadline
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Generic table misuse (unknown column, bad index)
    #[error("Table error: {message}")]
    Table {
        /// Error message
        message: String,
    },

    /// Element inside a table could not be found
    #[error("Table element not found: {message}")]
    TableElementNotFound {
        /// Error message
        message: String,
    },

    /// Row with the requested index is missing
    #[error("Table row not found: {message}")]
    TableRowNotFound {
        /// Error message
        message: String,
    },

    /// Column with the requested index is missing
    #[error("Table column not found: {message}")]
    TableColumnNotFound {
        /// Error message
        message: String,
    },

    /// Markup could not be interpreted (unexpected tag, missing rows)
    #[error("Markup error: {message}")]
    Markup {
        /// Error message
        message: String,
    },

    /// Component wrapped an element with the wrong tag
    #[error("Unexpected tag: {message}")]
    UnexpectedTag {
        /// Error message
        message: String,
    },

    /// Select component failure
    #[error("Select error: {message}")]
    Select {
        /// Error message
        message: String,
    },

    /// Date picker component failure
    #[error("Date picker error: {message}")]
    DatePicker {
        /// Error message
        message: String,
    },

    /// Confirm dialog component failure
    #[error("Confirm dialog error: {message}")]
    ConfirmDialog {
        /// Error message
        message: String,
    },

    /// Tab set component failure
    #[error("Tab set error: {message}")]
    TabSet {
        /// Error message
        message: String,
    },

    /// Toast component failure
    #[error("Toast error: {message}")]
    Toast {
        /// Error message
        message: String,
    },

    /// Rich-text editor component failure
    #[error("CKEditor error: {message}")]
    CkEditor {
        /// Error message
        message: String,
    },

    /// Input mask component failure
    #[error("Input mask error: {message}")]
    InputMask {
        /// Error message
        message: String,
    },

    /// Invalid URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PagesError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a generic table error
    #[must_use]
    pub fn table(message: impl Into<String>) -> Self {
        Self::Table {
            message: message.into(),
        }
    }

    /// Create a markup error
    #[must_use]
    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup {
            message: message.into(),
        }
    }

    /// Map a driver fault into the page error taxonomy.
    ///
    /// `context` is the cache-slot name if known.
    #[must_use]
    pub fn from_driver(err: DriverError, context: &str, operation: &str) -> Self {
        match err {
            DriverError::NoSuchElement(locator) => Self::ElementNotFound { locator },
            DriverError::StaleElement => Self::StaleElement {
                context: context.to_string(),
            },
            DriverError::Other(message) => Self::Driver {
                context: context.to_string(),
                operation: operation.to_string(),
                message,
            },
        }
    }

    /// True for "element not found" style failures that polling waits tolerate
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::TableElementNotFound { .. }
        )
    }

    /// True for any table lookup miss: row, column or generic element
    #[must_use]
    pub const fn is_table_element_not_found(&self) -> bool {
        matches!(
            self,
            Self::TableElementNotFound { .. }
                | Self::TableRowNotFound { .. }
                | Self::TableColumnNotFound { .. }
        )
    }
}
