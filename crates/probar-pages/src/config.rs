//! Application settings and per-page configuration.
//!
//! [`Settings`] is loaded once per test run (YAML or JSON) and looked up by
//! application name. Each page declares a [`PageConfig`]; at construction it is
//! resolved against the settings into an immutable [`ResolvedPageConfig`], and any
//! missing key fails right there.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

use crate::result::{PagesError, PagesResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

// =============================================================================
// APPLICATION CONFIG
// =============================================================================

/// Settings of one application under test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root URL every page route is joined onto
    pub base_url: Option<String>,
    /// CSS class of the full-page loading indicator
    pub page_loader_css_class: Option<String>,
    /// CSS class of the table loading indicator
    pub table_loader_css_class: Option<String>,
    /// CSS class present on an open modal
    pub modal_visible_css_class: Option<String>,
    /// Whether the frontend sets `window.e2eReady` once rendered
    pub has_page_ready_script: bool,
}

impl AppConfig {
    /// Create an app config with only a base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Set all three CSS classes
    #[must_use]
    pub fn with_css_classes(
        mut self,
        page_loader: impl Into<String>,
        table_loader: impl Into<String>,
        modal_visible: impl Into<String>,
    ) -> Self {
        self.page_loader_css_class = Some(page_loader.into());
        self.table_loader_css_class = Some(table_loader.into());
        self.modal_visible_css_class = Some(modal_visible.into());
        self
    }

    /// Enable the readiness script check
    #[must_use]
    pub const fn with_page_ready_script(mut self, enabled: bool) -> Self {
        self.has_page_ready_script = enabled;
        self
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application configs keyed by application name
    pub apps: HashMap<String, AppConfig>,
    /// Default wait timeout in milliseconds
    pub wait_timeout_ms: u64,
    /// Default polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Log level of the automation client (`warning`, `info`, ...)
    pub driver_log_level: String,
    /// Attribute marking elements for tests
    pub data_e2e_attribute: String,
    /// Attribute marking tables for tests
    pub table_e2e_attribute: String,
    /// Tag of a top-level table component
    pub default_table_tag: String,
    /// Tag of a nested table
    pub nested_table_tag: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            apps: HashMap::new(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            driver_log_level: "warning".to_string(),
            data_e2e_attribute: "data-e2e".to_string(),
            table_e2e_attribute: "data-e2e-table".to_string(),
            default_table_tag: "p-table".to_string(),
            nested_table_tag: "table".to_string(),
        }
    }
}

impl Settings {
    /// Create default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application
    #[must_use]
    pub fn with_app(mut self, name: impl Into<String>, app: AppConfig) -> Self {
        let _ = self.apps.insert(name.into(), app);
        self
    }

    /// Set wait timeout and poll interval
    #[must_use]
    pub const fn with_wait(mut self, timeout_ms: u64, poll_interval_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(content: &str) -> PagesResult<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Parse settings from a JSON string
    pub fn from_json(content: &str) -> PagesResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load settings from a file, picking the format by extension.
    ///
    /// `.json` is parsed as JSON, everything else as YAML.
    pub fn load(path: &Path) -> PagesResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content)?,
            _ => Self::from_yaml(&content)?,
        };
        settings.validate()?;
        tracing::debug!(path = %path.display(), apps = settings.apps.len(), "settings loaded");
        Ok(settings)
    }

    /// Check that every application has a parseable base URL
    pub fn validate(&self) -> PagesResult<()> {
        for (name, app) in &self.apps {
            let base = app.base_url.as_deref().ok_or_else(|| {
                PagesError::config(format!("Base url not found in config for project {name}"))
            })?;
            let _ = Url::parse(base).map_err(|e| {
                PagesError::config(format!("Invalid base url {base:?} for project {name}: {e}"))
            })?;
        }
        let _ = self.log_level()?;
        Ok(())
    }

    /// Look up an application by name
    pub fn app(&self, name: &str) -> PagesResult<&AppConfig> {
        self.apps
            .get(name)
            .ok_or_else(|| PagesError::config(format!("Application {name} is not configured")))
    }

    /// Default wait options
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.wait_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// `driver_log_level` as a tracing level
    pub fn log_level(&self) -> PagesResult<tracing::Level> {
        match self.driver_log_level.to_ascii_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" | "critical" => Ok(tracing::Level::ERROR),
            other => Err(PagesError::config(format!("Unknown log level {other:?}"))),
        }
    }
}

// =============================================================================
// PAGE CONFIG
// =============================================================================

/// Configuration a page declares for itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageConfig {
    /// Application the page belongs to
    pub app: String,
    /// Route of the page, relative to the application's base URL
    pub url: Option<String>,
    /// Other routes that also show this page
    pub valid_urls: Vec<String>,
    /// Overrides the application's page loader class
    pub page_loader_css_class: Option<String>,
    /// Overrides the application's table loader class
    pub table_loader_css_class: Option<String>,
    /// Overrides the application's modal class
    pub modal_visible_css_class: Option<String>,
}

/// Page configuration after merging with the application settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPageConfig {
    /// Application name
    pub app: String,
    /// Application base URL
    pub base_url: String,
    /// Absolute URL of the page
    pub page_url: String,
    /// Absolute URLs that count as "this page is opened"
    pub valid_urls: Vec<String>,
    /// Whether to wait for `window.e2eReady`
    pub has_page_ready_script: bool,
    /// Page loader class
    pub page_loader_css_class: String,
    /// Table loader class
    pub table_loader_css_class: String,
    /// Modal class
    pub modal_visible_css_class: String,
}

impl ResolvedPageConfig {
    /// Merge a page declaration with the settings of its application
    pub fn resolve(page: &PageConfig, settings: &Settings) -> PagesResult<Self> {
        let app = settings.app(&page.app)?;
        let base_url = app.base_url.clone().ok_or_else(|| {
            PagesError::config(format!(
                "Base url not found in config for project {}",
                page.app
            ))
        })?;
        let base = Url::parse(&base_url)?;

        let route = page
            .url
            .as_deref()
            .ok_or_else(|| PagesError::config("Page object must have a page url"))?;
        let page_url = base.join(route)?.to_string();

        let mut valid_urls = Vec::with_capacity(page.valid_urls.len() + 1);
        for extra in page.valid_urls.iter().map(String::as_str).chain([route]) {
            valid_urls.push(base.join(extra)?.to_string());
        }

        let pick = |own: &Option<String>, shared: &Option<String>, key: &str| {
            own.clone().or_else(|| shared.clone()).ok_or_else(|| {
                PagesError::config(format!(
                    "{key} must be set in config for current app {}",
                    page.app
                ))
            })
        };

        Ok(Self {
            app: page.app.clone(),
            base_url,
            page_url,
            valid_urls,
            has_page_ready_script: app.has_page_ready_script,
            page_loader_css_class: pick(
                &page.page_loader_css_class,
                &app.page_loader_css_class,
                "page_loader_css_class",
            )?,
            table_loader_css_class: pick(
                &page.table_loader_css_class,
                &app.table_loader_css_class,
                "table_loader_css_class",
            )?,
            modal_visible_css_class: pick(
                &page.modal_visible_css_class,
                &app.modal_visible_css_class,
                "modal_visible_css_class",
            )?,
        })
    }
}
