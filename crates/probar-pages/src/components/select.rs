//! Searchable drop-down (`<ng-select>`).

use std::rc::Rc;

use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::result::{PagesError, PagesResult};
use crate::wait::{WaitOptions, Waiter};

use super::{ensure_tag, unexpected_tag};

const TAG_NAME: &str = "ng-select";
const PANEL_TAG_NAME: &str = "ng-dropdown-panel";
const OPTIONS_XPATH: &str = r#"//*[contains(@class,"ng-option")]"#;
const DISABLED_OPTION_CLASS: &str = "ng-option-disabled";
const FILTER_INPUT_TAG: &str = "input";

/// Options show placeholder text while the list is loading
const OPTIONS_LOADING_TIMEOUT_MS: u64 = 1_000;
const OPTIONS_LOADING_POLL_MS: u64 = 100;

/// Drop-down with type-ahead filtering, single or multiple selection
#[derive(Debug, Clone)]
pub struct Select {
    container: Rc<ElementHandle>,
    multiple: bool,
}

impl Select {
    /// Wrap an `<ng-select>` container
    pub fn new(container: Rc<ElementHandle>) -> PagesResult<Self> {
        ensure_tag(&container, TAG_NAME, unexpected_tag)?;
        let multiple = container
            .attribute("multiple")?
            .is_some_and(|value| value != "false");
        Ok(Self {
            container,
            multiple,
        })
    }

    /// Whether several options can be selected
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// The container element
    #[must_use]
    pub const fn container(&self) -> &Rc<ElementHandle> {
        &self.container
    }

    /// Open the drop-down and return every available option
    pub fn options(&self) -> PagesResult<Vec<Rc<ElementHandle>>> {
        self.find_options(&Locator::xpath(OPTIONS_XPATH))
    }

    /// Select the option at 0-based `index`
    pub fn select_by_index(&self, index: usize) -> PagesResult<()> {
        let options = self.options()?;
        let option = options.get(index).ok_or_else(|| PagesError::Select {
            message: format!("Could not locate option with index {index}"),
        })?;
        self.select_option(option)
    }

    /// Select options whose text contains `[id]`, filtering by the bare id
    pub fn select_by_visible_id(&self, id: i64, select_all: bool) -> PagesResult<()> {
        let filter = id.to_string();
        self.select_by_visible_text(&format!("[{id}]"), select_all, Some(&filter))
            .map_err(|e| match e {
                PagesError::Select { .. } => PagesError::Select {
                    message: format!("Could not locate option with id {id}"),
                },
                other => other,
            })
    }

    /// Type `filter` (or `text`) into the search box and select matching options.
    ///
    /// Only the first match is selected unless the select is multiple and
    /// `select_all` is set. Already selected options are left alone.
    pub fn select_by_visible_text(
        &self,
        text: &str,
        select_all: bool,
        filter: Option<&str>,
    ) -> PagesResult<()> {
        self.send_keys(filter.unwrap_or(text))?;
        let locator = Locator::xpath(format!(
            r#"//*[contains(@class,"ng-option") and contains(string(),"{text}")]"#
        ));
        let options = self.find_options(&locator)?;
        if options.is_empty() {
            return Err(PagesError::Select {
                message: format!("Could not locate option with visible text {text}"),
            });
        }
        for option in &options {
            self.select_option(option)?;
            if !(self.multiple && select_all) {
                break;
            }
        }
        Ok(())
    }

    /// Type into the search box without clearing it
    pub fn send_keys(&self, value: &str) -> PagesResult<()> {
        self.container
            .find_element(&Locator::tag_name(FILTER_INPUT_TAG))?
            .send_keys(value)
    }

    fn select_option(&self, option: &Rc<ElementHandle>) -> PagesResult<()> {
        if option.is_selected()? {
            tracing::debug!(locator = %option.locator(), "option already selected");
            return Ok(());
        }
        option.click()
    }

    fn find_options(&self, locator: &Locator) -> PagesResult<Vec<Rc<ElementHandle>>> {
        self.container.click()?;
        let page = self.container.page()?;
        let panel = Locator::tag_name(PANEL_TAG_NAME);
        let _ = page.waiter().until("drop-down panel to open", || {
            page.find_element(&panel)?.is_displayed()
        })?;

        let options = self.wait_options_loaded(locator)?;
        if let [only] = options.as_slice() {
            let classes = only.attribute("class")?.unwrap_or_default();
            if classes.split_whitespace().any(|c| c == DISABLED_OPTION_CLASS) {
                return Ok(Vec::new());
            }
        }
        Ok(options)
    }

    /// Poll while the first option still shows a loading placeholder.
    ///
    /// Running out of time is not an error: whatever is listed by then is returned.
    fn wait_options_loaded(&self, locator: &Locator) -> PagesResult<Vec<Rc<ElementHandle>>> {
        let mut options = Vec::new();
        let waiter = Waiter::new(
            WaitOptions::new()
                .with_timeout(OPTIONS_LOADING_TIMEOUT_MS)
                .with_poll_interval(OPTIONS_LOADING_POLL_MS),
        );
        let waited = waiter.until("select options to load", || {
            options = self.container.find_elements(locator)?;
            let first = match options.first() {
                Some(option) => option.text()?.to_lowercase(),
                None => return Ok(false),
            };
            Ok(!(first.contains("load") || first.contains("not found")))
        });
        match waited {
            Ok(_) | Err(PagesError::Timeout { .. }) => Ok(options),
            Err(e) => Err(e),
        }
    }
}
