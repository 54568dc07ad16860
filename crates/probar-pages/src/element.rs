//! Element handles with one-shot staleness recovery.
//!
//! An [`ElementHandle`] owns a raw element reference and the [`Locator`] it was
//! found with. When an operation fails because the reference went stale, the
//! handle re-runs its locator, swaps in the new reference and retries the
//! operation once. A second stale fault is returned to the caller.
//!
//! Re-resolution repeats the original query: a handle found under another
//! element searches under that element again, and the n-th match of a list
//! query is looked up at the same position.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::locator::Locator;
use crate::page::{Page, PageInner};
use crate::result::{PagesError, PagesResult};
use crate::session::{DriverError, DriverResult, RawElement, ScriptArg};

/// Context reported for handles that are not bound to a cache slot
pub const ANONYMOUS_CONTEXT: &str = "<unbound element>";

/// A live element on a page
pub struct ElementHandle {
    raw: RefCell<Box<dyn RawElement>>,
    locator: Locator,
    slot: Option<String>,
    memoize: bool,
    parent: Option<Rc<ElementHandle>>,
    position: Option<usize>,
    page: Weak<PageInner>,
    me: Weak<ElementHandle>,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("locator", &self.locator)
            .field("slot", &self.slot)
            .field("memoize", &self.memoize)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl ElementHandle {
    /// Handle for the first document match of `locator`
    pub(crate) fn new(
        raw: Box<dyn RawElement>,
        locator: Locator,
        slot: Option<String>,
        memoize: bool,
        page: Weak<PageInner>,
    ) -> Rc<Self> {
        Self::build(raw, locator, slot, memoize, None, None, page)
    }

    /// Handle for match number `position` (0-based) of a document list query
    pub(crate) fn nth(
        raw: Box<dyn RawElement>,
        locator: Locator,
        slot: Option<String>,
        position: usize,
        page: Weak<PageInner>,
    ) -> Rc<Self> {
        Self::build(raw, locator, slot, false, None, Some(position), page)
    }

    fn build(
        raw: Box<dyn RawElement>,
        locator: Locator,
        slot: Option<String>,
        memoize: bool,
        parent: Option<Rc<Self>>,
        position: Option<usize>,
        page: Weak<PageInner>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            raw: RefCell::new(raw),
            locator,
            slot,
            memoize,
            parent,
            position,
            page,
            me: me.clone(),
        })
    }

    /// Locator this handle re-resolves with
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Cache slot the handle belongs to, `None` for one-off finds
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Whether the underlying reference went stale
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.raw.borrow().is_stale()
    }

    /// Client-side id of the current reference
    #[must_use]
    pub fn element_id(&self) -> String {
        self.raw.borrow().element_id()
    }

    /// This element as a script argument
    #[must_use]
    pub fn as_script_arg(&self) -> ScriptArg {
        ScriptArg::Element(self.element_id())
    }

    fn context(&self) -> &str {
        self.slot.as_deref().unwrap_or(ANONYMOUS_CONTEXT)
    }

    fn fail(&self, err: DriverError, operation: &str) -> PagesError {
        PagesError::from_driver(err, self.context(), operation)
    }

    pub(crate) fn page(&self) -> PagesResult<Page> {
        self.page
            .upgrade()
            .map(Page::from_inner)
            .ok_or_else(|| PagesError::page(format!("page of {} was dropped", self.context())))
    }

    /// Repeat the query this handle came from
    fn refind(&self, page: &Page) -> PagesResult<Box<dyn RawElement>> {
        let locator = &self.locator;
        let Some(position) = self.position else {
            return match &self.parent {
                Some(parent) => parent.with_raw("reload", |raw| raw.find_element(locator)),
                None => page
                    .session()
                    .find_element(locator)
                    .map_err(|e| self.fail(e, "reload")),
            };
        };
        let found = match &self.parent {
            Some(parent) => parent.with_raw("reload", |raw| raw.find_elements(locator))?,
            None => page
                .session()
                .find_elements(locator)
                .map_err(|e| self.fail(e, "reload"))?,
        };
        found
            .into_iter()
            .nth(position)
            .ok_or_else(|| PagesError::ElementNotFound {
                locator: format!("{locator} [{position}]"),
            })
    }

    /// Find the element again and, for single-element slots, put it back in the cache
    fn reload(&self) -> PagesResult<()> {
        let page = self.page()?;
        tracing::debug!(
            slot = self.context(),
            locator = %self.locator,
            position = ?self.position,
            "re-resolving stale element"
        );
        let fresh = self.refind(&page)?;
        *self.raw.borrow_mut() = fresh;
        if let (Some(slot), true, Some(me)) = (&self.slot, self.memoize, self.me.upgrade()) {
            page.memoize_handle(slot, me);
        }
        Ok(())
    }

    /// Run `op` against the raw reference, recovering from staleness once
    fn with_raw<T, F>(&self, operation: &str, op: F) -> PagesResult<T>
    where
        F: Fn(&dyn RawElement) -> DriverResult<T>,
    {
        let first = op(&**self.raw.borrow());
        match first {
            Ok(value) => Ok(value),
            Err(DriverError::StaleElement) => {
                self.reload()?;
                let retried = op(&**self.raw.borrow());
                retried.map_err(|e| self.fail(e, operation))
            }
            Err(e) => Err(self.fail(e, operation)),
        }
    }

    fn child(
        &self,
        raw: Box<dyn RawElement>,
        locator: &Locator,
        position: Option<usize>,
    ) -> Rc<Self> {
        let parent = self.me.upgrade();
        Self::build(
            raw,
            locator.clone(),
            None,
            false,
            parent,
            position,
            self.page.clone(),
        )
    }

    // =========================================================================
    // CAPABILITIES
    // =========================================================================

    /// Lower-case tag name
    pub fn tag_name(&self) -> PagesResult<String> {
        self.with_raw("tag_name", |raw| raw.tag_name())
    }

    /// Rendered text
    pub fn text(&self) -> PagesResult<String> {
        self.with_raw("text", |raw| raw.text())
    }

    /// Attribute or property value
    pub fn attribute(&self, name: &str) -> PagesResult<Option<String>> {
        self.with_raw("attribute", |raw| raw.attribute(name))
    }

    /// Current `value` of an input
    pub fn value(&self) -> PagesResult<Option<String>> {
        self.attribute("value")
    }

    /// Markup of the element's children
    pub fn inner_html(&self) -> PagesResult<String> {
        Ok(self.attribute("innerHTML")?.unwrap_or_default())
    }

    /// Markup of the element itself
    pub fn outer_html(&self) -> PagesResult<String> {
        Ok(self.attribute("outerHTML")?.unwrap_or_default())
    }

    /// Whether the element is rendered visibly
    pub fn is_displayed(&self) -> PagesResult<bool> {
        self.with_raw("is_displayed", |raw| raw.is_displayed())
    }

    /// Whether the element accepts interaction
    pub fn is_enabled(&self) -> PagesResult<bool> {
        self.with_raw("is_enabled", |raw| raw.is_enabled())
    }

    /// Whether an option or checkbox is selected
    pub fn is_selected(&self) -> PagesResult<bool> {
        self.with_raw("is_selected", |raw| raw.is_selected())
    }

    /// Type into the element
    pub fn send_keys(&self, text: &str) -> PagesResult<()> {
        self.with_raw("send_keys", |raw| raw.send_keys(text))
    }

    /// Clear an input
    pub fn clear(&self) -> PagesResult<()> {
        self.with_raw("clear", |raw| raw.clear())
    }

    /// First descendant matching `locator`, as an unbound handle
    pub fn find_element(&self, locator: &Locator) -> PagesResult<Rc<Self>> {
        let raw = self.with_raw("find_element", |raw| raw.find_element(locator))?;
        Ok(self.child(raw, locator, None))
    }

    /// All descendants matching `locator`, possibly none
    pub fn find_elements(&self, locator: &Locator) -> PagesResult<Vec<Rc<Self>>> {
        let found = self.with_raw("find_elements", |raw| raw.find_elements(locator))?;
        Ok(found
            .into_iter()
            .enumerate()
            .map(|(position, raw)| self.child(raw, locator, Some(position)))
            .collect())
    }

    // =========================================================================
    // CLICKS AND WAITS
    // =========================================================================

    /// Block until the element is displayed and enabled
    pub fn wait_clickable(&self) -> PagesResult<()> {
        let page = self.page()?;
        let _ = page
            .waiter()
            .until(&format!("{} to be clickable", self.locator), || {
                Ok(self.is_displayed()? && self.is_enabled()?)
            })?;
        Ok(())
    }

    /// Block until the element is displayed
    pub fn wait_visible(&self) -> PagesResult<()> {
        let page = self.page()?;
        let _ = page
            .waiter()
            .until(&format!("{} to be visible", self.locator), || self.is_displayed())?;
        Ok(())
    }

    /// Wait until clickable, click, then follow a newly opened tab
    pub fn click(&self) -> PagesResult<()> {
        self.click_with(true)
    }

    /// Like [`click`](Self::click); `focus_opened_tab = false` keeps the current tab
    pub fn click_with(&self, focus_opened_tab: bool) -> PagesResult<()> {
        self.wait_clickable()?;
        self.with_raw("click", |raw| raw.click())?;
        if focus_opened_tab {
            self.page()?.focus_on_last_opened_tab()?;
        }
        Ok(())
    }

    /// Click, then wait for the page and table loaders to disappear
    pub fn click_and_wait(&self) -> PagesResult<()> {
        self.click_and_wait_with(true)
    }

    /// [`click_and_wait`](Self::click_and_wait) with explicit tab handling
    pub fn click_and_wait_with(&self, focus_opened_tab: bool) -> PagesResult<()> {
        self.click_with(focus_opened_tab)?;
        self.page()?.wait_loaders_hidden()
    }
}
