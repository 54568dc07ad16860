//! Pages: declared slots, the per-navigation cache and page-level helpers.
//!
//! A [`PageSpec`] declares what a page contains. [`Page::new`] resolves the
//! declaration against [`Settings`] once, so configuration mistakes surface before
//! the browser is touched. Everything resolved through a page is memoized until
//! the next navigation.
//!
//! ## Example
//!
//! ```ignore
//! struct OrdersPage(Page);
//!
//! impl PageObject for OrdersPage {
//!     fn spec() -> PageSpec {
//!         PageSpec::new("OrdersPage", "shop")
//!             .url("orders")
//!             .element("title", ElementBinding::one(Locator::xpath("//h1")))
//!             .table("orders", TableSpec::new().search_value("orders"))
//!     }
//!     fn from_page(page: Page) -> Self {
//!         Self(page)
//!     }
//!     fn page(&self) -> &Page {
//!         &self.0
//!     }
//! }
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use regex::RegexBuilder;
use serde_json::Value;

use crate::binding::{ElementBinding, Resolved};
use crate::components::{ConfirmDialog, Toast};
use crate::config::{PageConfig, ResolvedPageConfig, Settings};
use crate::element::ElementHandle;
use crate::group::{ElementGroup, GroupAccessor};
use crate::locator::Locator;
use crate::result::{PagesError, PagesResult};
use crate::session::{DriverError, ScriptArg, Session, SessionProvider};
use crate::table::{NestedTables, Table, TableSpec};
use crate::urls::{
    add_url_params, get_base_url, get_id_from_url, get_param_from_url, split_url_and_params,
};
use crate::wait::{WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS, ELEMENT_POLL_INTERVAL_MS};

/// Script answering whether the frontend finished rendering
pub const PAGE_READY_SCRIPT: &str =
    "if ('e2eReady' in window && window.e2eReady === true){return true;}else{return false;}";

const DIALOG_XPATH: &str = r#"//*[@role="dialog"]"#;

// =============================================================================
// DECLARATIONS
// =============================================================================

/// A named bundle of slots shared between pages (menus, headers)
#[derive(Debug, Clone, Default)]
pub struct NavigationSpec {
    name: String,
    elements: Vec<(String, ElementBinding)>,
    tables: Vec<(String, TableSpec)>,
    groups: Vec<(String, ElementGroup)>,
}

impl NavigationSpec {
    /// Create an empty section; its slots are exposed as `name.slot`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare an element slot
    #[must_use]
    pub fn element(mut self, slot: impl Into<String>, binding: ElementBinding) -> Self {
        self.elements.push((slot.into(), binding));
        self
    }

    /// Declare a table slot
    #[must_use]
    pub fn table(mut self, slot: impl Into<String>, table: TableSpec) -> Self {
        self.tables.push((slot.into(), table));
        self
    }

    /// Declare a group slot
    #[must_use]
    pub fn group(mut self, slot: impl Into<String>, group: ElementGroup) -> Self {
        self.groups.push((slot.into(), group));
        self
    }

    fn scoped(&self, slot: &str) -> String {
        format!("{}.{slot}", self.name)
    }
}

/// Declaration of a page: where it lives and what it contains
#[derive(Debug, Clone)]
pub struct PageSpec {
    name: String,
    config: PageConfig,
    elements: Vec<(String, ElementBinding)>,
    tables: Vec<(String, TableSpec)>,
    groups: Vec<(String, ElementGroup)>,
    nested: Vec<(String, NestedTables)>,
}

impl PageSpec {
    /// Start a declaration for a page of application `app`
    #[must_use]
    pub fn new(name: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PageConfig {
                app: app.into(),
                ..PageConfig::default()
            },
            elements: Vec::new(),
            tables: Vec::new(),
            groups: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Route of the page relative to the application's base URL
    #[must_use]
    pub fn url(mut self, route: impl Into<String>) -> Self {
        self.config.url = Some(route.into());
        self
    }

    /// Another route that also shows this page
    #[must_use]
    pub fn valid_url(mut self, route: impl Into<String>) -> Self {
        self.config.valid_urls.push(route.into());
        self
    }

    /// Override the application's page loader class
    #[must_use]
    pub fn page_loader_css_class(mut self, class: impl Into<String>) -> Self {
        self.config.page_loader_css_class = Some(class.into());
        self
    }

    /// Override the application's table loader class
    #[must_use]
    pub fn table_loader_css_class(mut self, class: impl Into<String>) -> Self {
        self.config.table_loader_css_class = Some(class.into());
        self
    }

    /// Override the application's modal class
    #[must_use]
    pub fn modal_visible_css_class(mut self, class: impl Into<String>) -> Self {
        self.config.modal_visible_css_class = Some(class.into());
        self
    }

    /// Declare an element slot
    #[must_use]
    pub fn element(mut self, slot: impl Into<String>, binding: ElementBinding) -> Self {
        self.elements.push((slot.into(), binding));
        self
    }

    /// Declare a table slot
    #[must_use]
    pub fn table(mut self, slot: impl Into<String>, table: TableSpec) -> Self {
        self.tables.push((slot.into(), table));
        self
    }

    /// Declare a group slot
    #[must_use]
    pub fn group(mut self, slot: impl Into<String>, group: ElementGroup) -> Self {
        self.groups.push((slot.into(), group));
        self
    }

    /// Declare nested tables inside an already declared table slot
    #[must_use]
    pub fn nested_tables(mut self, slot: impl Into<String>, nested: NestedTables) -> Self {
        self.nested.push((slot.into(), nested));
        self
    }

    /// Merge a navigation section
    #[must_use]
    pub fn section(mut self, section: NavigationSpec) -> Self {
        for (slot, binding) in &section.elements {
            self.elements.push((section.scoped(slot), binding.clone()));
        }
        for (slot, table) in &section.tables {
            self.tables.push((section.scoped(slot), table.clone()));
        }
        for (slot, group) in &section.groups {
            self.groups.push((section.scoped(slot), group.clone()));
        }
        self
    }

    /// Page name used in errors and logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

struct Slots {
    elements: HashMap<String, ElementBinding>,
    tables: HashMap<String, TableSpec>,
    groups: HashMap<String, ElementGroup>,
    nested: HashMap<String, NestedTables>,
}

fn collect_slots<T>(
    page: &str,
    seen: &mut HashSet<String>,
    declared: Vec<(String, T)>,
) -> PagesResult<HashMap<String, T>> {
    let mut slots = HashMap::with_capacity(declared.len());
    for (slot, value) in declared {
        if !seen.insert(slot.clone()) {
            return Err(PagesError::config(format!(
                "Slot {slot:?} is declared twice on page {page}"
            )));
        }
        let _ = slots.insert(slot, value);
    }
    Ok(slots)
}

impl Slots {
    fn from_spec(spec: PageSpec) -> PagesResult<(String, PageConfig, Self)> {
        let PageSpec {
            name,
            config,
            elements,
            tables,
            groups,
            nested,
        } = spec;
        let mut seen = HashSet::new();
        let slots = Self {
            elements: collect_slots(&name, &mut seen, elements)?,
            tables: collect_slots(&name, &mut seen, tables)?,
            groups: collect_slots(&name, &mut seen, groups)?,
            nested: collect_slots(&name, &mut seen, nested)?,
        };
        for (slot, nested) in &slots.nested {
            if !slots.tables.contains_key(nested.parent()) {
                return Err(PagesError::config(format!(
                    "Nested tables {slot:?} refer to {:?}, \
                     which is not a table slot of page {name}",
                    nested.parent()
                )));
            }
        }
        Ok((name, config, slots))
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// A cached resolution
#[derive(Debug, Clone)]
pub(crate) enum Cached {
    One(Rc<ElementHandle>),
    Many(Vec<Rc<ElementHandle>>),
    Table(Rc<Table>),
}

pub(crate) struct PageInner {
    name: String,
    session: Rc<dyn Session>,
    config: ResolvedPageConfig,
    settings: Settings,
    slots: Slots,
    cache: RefCell<HashMap<String, Cached>>,
    group_store: RefCell<HashMap<String, ElementBinding>>,
}

/// Where an element ends up in the viewport after scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPosition {
    /// Aligned to the start
    Start,
    /// Centered
    Center,
    /// Aligned to the end
    End,
    /// Whichever edge is closest
    Nearest,
}

impl ScrollPosition {
    /// `scrollIntoView` keyword
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Center => "center",
            Self::End => "end",
            Self::Nearest => "nearest",
        }
    }
}

/// A page bound to a browser session.
///
/// Cloning is cheap and clones share the cache.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.inner.name)
            .field("page_url", &self.inner.config.page_url)
            .field("cached", &self.inner.cache.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Bind a declaration to a session without navigating
    pub fn new(spec: PageSpec, settings: &Settings, session: Rc<dyn Session>) -> PagesResult<Self> {
        let (name, page_config, slots) = Slots::from_spec(spec)?;
        let config = ResolvedPageConfig::resolve(&page_config, settings)?;
        tracing::debug!(page = %name, url = %config.page_url, "page bound to session");
        Ok(Self {
            inner: Rc::new(PageInner {
                name,
                session,
                config,
                settings: settings.clone(),
                slots,
                cache: RefCell::new(HashMap::new()),
                group_store: RefCell::new(HashMap::new()),
            }),
        })
    }

    /// Get a session from `provider` and open the page with `query_params`
    pub fn launch(
        spec: PageSpec,
        settings: &Settings,
        provider: &dyn SessionProvider,
        fresh_session: bool,
        query_params: &[(&str, &str)],
    ) -> PagesResult<Self> {
        let session = provider.session(fresh_session)?;
        let page = Self::new(spec, settings, session)?;
        page.open(None, query_params)?;
        Ok(page)
    }

    pub(crate) const fn from_inner(inner: Rc<PageInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<PageInner> {
        Rc::downgrade(&self.inner)
    }

    /// Page name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The browser session
    #[must_use]
    pub fn session(&self) -> &Rc<dyn Session> {
        &self.inner.session
    }

    /// Resolved configuration
    #[must_use]
    pub fn config(&self) -> &ResolvedPageConfig {
        &self.inner.config
    }

    /// Settings the page was created with
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    fn fail(&self, err: DriverError, operation: &str) -> PagesError {
        PagesError::from_driver(err, &self.inner.name, operation)
    }

    // =========================================================================
    // CACHE
    // =========================================================================

    pub(crate) fn cache_get(&self, slot: &str) -> Option<Cached> {
        self.inner.cache.borrow().get(slot).cloned()
    }

    pub(crate) fn cache_put(&self, slot: &str, value: Cached) {
        let _ = self.inner.cache.borrow_mut().insert(slot.to_string(), value);
    }

    pub(crate) fn memoize_handle(&self, slot: &str, handle: Rc<ElementHandle>) {
        self.cache_put(slot, Cached::One(handle));
    }

    /// Whether `slot` currently holds a memoized value
    #[must_use]
    pub fn is_cached(&self, slot: &str) -> bool {
        self.inner.cache.borrow().contains_key(slot)
    }

    /// Forget everything resolved since the last navigation
    pub fn clear_cache(&self) {
        self.inner.cache.borrow_mut().clear();
        self.inner.group_store.borrow_mut().clear();
        tracing::trace!(page = %self.inner.name, "cache cleared");
    }

    pub(crate) fn group_binding(
        &self,
        name: &str,
        make: impl FnOnce() -> ElementBinding,
    ) -> ElementBinding {
        self.inner
            .group_store
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(make)
            .clone()
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Navigate to the page URL, or to the valid URL matching `custom_url`.
    ///
    /// Clears the cache, then waits for the readiness script and both loaders.
    pub fn open(&self, custom_url: Option<&str>, params: &[(&str, &str)]) -> PagesResult<()> {
        let url = self.make_valid_url(custom_url, params)?;
        self.clear_cache();
        tracing::debug!(page = %self.inner.name, %url, "opening page");
        self.inner
            .session
            .navigate(&url)
            .map_err(|e| self.fail(e, "navigate"))?;
        self.wait_page_loaded()?;
        self.wait_loaders_hidden()
    }

    fn search_in_valid_urls(&self, pattern: &str) -> PagesResult<String> {
        let (base, params) = split_url_and_params(pattern);
        let needle = base.trim_end_matches('/');
        self.inner
            .config
            .valid_urls
            .iter()
            .find(|url| url.contains(needle))
            .map(|url| {
                if params.is_empty() {
                    url.clone()
                } else {
                    format!("{url}?{params}")
                }
            })
            .ok_or_else(|| PagesError::PageNotOpened {
                message: format!(
                    "You want to open url by pattern={pattern:?} \
                     but url not found in valid_urls: {:?}",
                    self.inner.config.valid_urls
                ),
            })
    }

    fn make_valid_url(
        &self,
        custom_url: Option<&str>,
        params: &[(&str, &str)],
    ) -> PagesResult<String> {
        let url = match custom_url.filter(|u| !u.is_empty()) {
            Some(custom) => self.search_in_valid_urls(custom)?,
            None => self.inner.config.page_url.clone(),
        };
        Ok(if params.is_empty() {
            url
        } else {
            add_url_params(&url, params)
        })
    }

    /// Navigate to an arbitrary URL, clearing the cache but not waiting
    pub fn open_redirect_url(&self, url: &str) -> PagesResult<()> {
        self.clear_cache();
        self.inner
            .session
            .navigate(url)
            .map_err(|e| self.fail(e, "navigate"))
    }

    /// URL the browser is on
    pub fn opened_url(&self) -> PagesResult<String> {
        self.inner
            .session
            .current_url()
            .map_err(|e| self.fail(e, "current_url"))
    }

    /// Fail unless the browser is on one of the page's valid URLs
    pub fn check_opened(&self) -> PagesResult<()> {
        let opened = self.opened_url()?;
        let base = get_base_url(&opened);
        if self
            .inner
            .config
            .valid_urls
            .iter()
            .any(|url| base.contains(url.trim_end_matches('/')))
        {
            return Ok(());
        }
        Err(PagesError::PageNotOpened {
            message: format!("Get attr of {}, but current url: {opened}", self.inner.name),
        })
    }

    /// Wait for `window.e2eReady` when the application sets it
    pub fn wait_page_loaded(&self) -> PagesResult<()> {
        if !self.inner.config.has_page_ready_script {
            return Ok(());
        }
        let session = &self.inner.session;
        let waited = self.waiter().until("page ready script", || {
            let ready = session
                .execute_script(PAGE_READY_SCRIPT, &[])
                .map_err(|e| self.fail(e, "execute_script"))?;
            Ok(ready == Value::Bool(true))
        });
        match waited {
            Ok(_) => Ok(()),
            Err(PagesError::Timeout { .. }) => Err(PagesError::page(
                "Check that \"e2eReady\" attribute set by frontend on the current page.",
            )),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // WAITS
    // =========================================================================

    /// Waiter with the default timeout and poll interval
    #[must_use]
    pub fn waiter(&self) -> Waiter {
        Waiter::new(self.inner.settings.wait_options())
    }

    /// Waiter with the given timeout and poll interval; `None` keeps the default
    #[must_use]
    pub fn custom_waiter(&self, timeout_ms: Option<u64>, poll_interval_ms: Option<u64>) -> Waiter {
        let defaults = self.inner.settings.wait_options();
        Waiter::new(
            WaitOptions::new()
                .with_timeout(timeout_ms.unwrap_or(defaults.timeout_ms))
                .with_poll_interval(poll_interval_ms.unwrap_or(defaults.poll_interval_ms)),
        )
    }

    fn locator_invisible(&self, locator: &Locator) -> PagesResult<bool> {
        let raw = match self.inner.session.find_element(locator) {
            Ok(raw) => raw,
            Err(DriverError::NoSuchElement(_) | DriverError::StaleElement) => return Ok(true),
            Err(e) => return Err(self.fail(e, "find_element")),
        };
        match raw.is_displayed() {
            Ok(displayed) => Ok(!displayed),
            Err(DriverError::NoSuchElement(_) | DriverError::StaleElement) => Ok(true),
            Err(e) => Err(self.fail(e, "is_displayed")),
        }
    }

    fn locator_visible(&self, locator: &Locator) -> PagesResult<bool> {
        let raw = self
            .inner
            .session
            .find_element(locator)
            .map_err(|e| self.fail(e, "find_element"))?;
        raw.is_displayed().map_err(|e| self.fail(e, "is_displayed"))
    }

    fn locator_clickable(&self, locator: &Locator) -> PagesResult<bool> {
        let raw = self
            .inner
            .session
            .find_element(locator)
            .map_err(|e| self.fail(e, "find_element"))?;
        Ok(raw.is_displayed().map_err(|e| self.fail(e, "is_displayed"))?
            && raw.is_enabled().map_err(|e| self.fail(e, "is_enabled"))?)
    }

    fn wait_invisible(&self, class: &str) -> PagesResult<()> {
        if class.is_empty() {
            return Ok(());
        }
        let locator = Locator::class_name(class);
        let _ = self
            .waiter()
            .until(&format!("{locator} to disappear"), || self.locator_invisible(&locator))?;
        Ok(())
    }

    fn wait_visible(&self, locator: &Locator) -> PagesResult<()> {
        let _ = self
            .waiter()
            .until(&format!("{locator} to be visible"), || self.locator_visible(locator))?;
        Ok(())
    }

    /// Wait until the page loader is gone
    pub fn wait_loader_not_visible(&self) -> PagesResult<()> {
        self.wait_invisible(&self.inner.config.page_loader_css_class)
    }

    /// Wait until the table loader is gone
    pub fn wait_tableloader_not_visible(&self) -> PagesResult<()> {
        self.wait_invisible(&self.inner.config.table_loader_css_class)
    }

    /// Wait until both loaders are gone
    pub fn wait_loaders_hidden(&self) -> PagesResult<()> {
        self.wait_loader_not_visible()?;
        self.wait_tableloader_not_visible()
    }

    /// Wait until an element with `role="dialog"` is visible
    pub fn wait_dialog_is_visible(&self) -> PagesResult<()> {
        self.wait_visible(&Locator::xpath(DIALOG_XPATH))
    }

    /// Wait until an element carrying exactly the modal class is visible
    pub fn wait_modal_is_visible(&self) -> PagesResult<()> {
        let class = &self.inner.config.modal_visible_css_class;
        if class.is_empty() {
            return Ok(());
        }
        self.wait_visible(&Locator::xpath(format!(r#"//*[@class="{class}"]"#)))
    }

    /// Wait until the element declared by `binding` is visible
    pub fn wait_accessibility_of(
        &self,
        binding: &ElementBinding,
        timeout_ms: Option<u64>,
    ) -> PagesResult<()> {
        let locator = binding.locator();
        let _ = self
            .custom_waiter(timeout_ms, Some(ELEMENT_POLL_INTERVAL_MS))
            .until(&format!("{locator} to be visible"), || self.locator_visible(locator))?;
        Ok(())
    }

    /// Wait until the element declared by `binding` is visible and enabled
    pub fn wait_element_clickable(
        &self,
        binding: &ElementBinding,
        timeout_ms: Option<u64>,
    ) -> PagesResult<()> {
        let locator = binding.locator();
        let _ = self
            .custom_waiter(timeout_ms, Some(ELEMENT_POLL_INTERVAL_MS))
            .until(&format!("{locator} to be clickable"), || self.locator_clickable(locator))?;
        Ok(())
    }

    /// Return the first of `elements` that becomes visible
    pub fn wait_visibility_one_of_elements(
        &self,
        elements: &[Rc<ElementHandle>],
        timeout_ms: Option<u64>,
    ) -> PagesResult<Rc<ElementHandle>> {
        if elements.is_empty() {
            return Err(PagesError::page(
                "Nothing to wait. At least one element must be passed",
            ));
        }
        let mut visible = None;
        let _ = self
            .custom_waiter(timeout_ms, Some(DEFAULT_POLL_INTERVAL_MS))
            .until("visibility of any of the elements", || {
                for element in elements {
                    if element.is_displayed()? {
                        visible = Some(Rc::clone(element));
                        return Ok(true);
                    }
                }
                Ok(false)
            })?;
        visible.ok_or_else(|| {
            PagesError::page("Could not wait for the visibility of any of the elements")
        })
    }

    // =========================================================================
    // SLOTS
    // =========================================================================

    fn binding(&self, slot: &str) -> PagesResult<&ElementBinding> {
        self.inner.slots.elements.get(slot).ok_or_else(|| {
            PagesError::config(format!("Page {} has no element slot {slot:?}", self.inner.name))
        })
    }

    /// Resolve an element slot
    pub fn resolve(&self, slot: &str) -> PagesResult<Resolved> {
        self.binding(slot)?.resolve(self, slot)
    }

    /// The element of a slot (the first one for list slots)
    pub fn element(&self, slot: &str) -> PagesResult<Rc<ElementHandle>> {
        self.resolve(slot)?.head()
    }

    /// All elements of a slot
    pub fn elements(&self, slot: &str) -> PagesResult<Vec<Rc<ElementHandle>>> {
        Ok(self.resolve(slot)?.into_vec())
    }

    /// The table of a slot, built once per navigation
    pub fn table(&self, slot: &str) -> PagesResult<Rc<Table>> {
        self.check_opened()?;
        if let Some(Cached::Table(table)) = self.cache_get(slot) {
            tracing::trace!(slot, "table cache hit");
            return Ok(table);
        }
        let spec = self.inner.slots.tables.get(slot).ok_or_else(|| {
            PagesError::config(format!("Page {} has no table slot {slot:?}", self.inner.name))
        })?;
        let root = spec.root_xpath(&self.inner.settings);
        let table = Rc::new(Table::load(self, slot, spec, root)?);
        self.cache_put(slot, Cached::Table(Rc::clone(&table)));
        Ok(table)
    }

    /// Nested table number `index` of a nested slot, built once per navigation
    pub fn nested_table(&self, slot: &str, index: usize) -> PagesResult<Rc<Table>> {
        self.check_opened()?;
        let key = format!("{slot}[{index}]");
        if let Some(Cached::Table(table)) = self.cache_get(&key) {
            tracing::trace!(slot = %key, "nested table cache hit");
            return Ok(table);
        }
        let nested = self.inner.slots.nested.get(slot).ok_or_else(|| {
            PagesError::config(format!(
                "Page {} has no nested tables slot {slot:?}",
                self.inner.name
            ))
        })?;
        let parent = self.inner.slots.tables.get(nested.parent()).ok_or_else(|| {
            PagesError::config(format!("Unknown parent table {:?}", nested.parent()))
        })?;
        let settings = &self.inner.settings;
        let root = nested.root_xpath(&parent.root_xpath(settings), index, settings);
        let table = Rc::new(Table::load(self, &key, nested.table_spec(), root)?);
        self.cache_put(&key, Cached::Table(Rc::clone(&table)));
        Ok(table)
    }

    /// Accessor for a group slot
    pub fn group(&self, slot: &str) -> PagesResult<GroupAccessor<'_>> {
        let group = self.inner.slots.groups.get(slot).ok_or_else(|| {
            PagesError::config(format!("Page {} has no group slot {slot:?}", self.inner.name))
        })?;
        Ok(GroupAccessor::new(self, group))
    }

    /// Find the element again, dropping its slot from the cache
    pub fn reload_element(&self, element: &Resolved) -> PagesResult<Resolved> {
        let first = element.head()?;
        let binding = match element {
            Resolved::One(_) => ElementBinding::one(first.locator().clone()),
            Resolved::Many(_) => ElementBinding::many(first.locator().clone()),
        };
        match first.slot() {
            Some(slot) => {
                let _ = self.inner.cache.borrow_mut().remove(slot);
                binding.resolve(self, slot)
            }
            None => binding.query(self, None),
        }
    }

    // =========================================================================
    // ONE-OFF FINDS
    // =========================================================================

    /// Find one element without caching it
    pub fn find_element(&self, locator: &Locator) -> PagesResult<Rc<ElementHandle>> {
        ElementBinding::one(locator.clone()).query(self, None)?.head()
    }

    /// Find all matching elements without caching them; zero matches is an error
    pub fn find_elements(&self, locator: &Locator) -> PagesResult<Vec<Rc<ElementHandle>>> {
        Ok(ElementBinding::many(locator.clone()).query(self, None)?.into_vec())
    }

    /// Find an element by its test attribute value
    pub fn find_element_by_data_e2e(&self, value: &str) -> PagesResult<Rc<ElementHandle>> {
        self.find_element(&Locator::by_attribute(
            &self.inner.settings.data_e2e_attribute,
            value,
        ))
    }

    // =========================================================================
    // TABS
    // =========================================================================

    fn focus_tab(&self, keep_last: bool) -> PagesResult<()> {
        let session = &self.inner.session;
        let mut tabs = session
            .window_handles()
            .map_err(|e| self.fail(e, "window_handles"))?;
        if tabs.len() < 2 {
            return Ok(());
        }
        self.clear_cache();
        let keep = if keep_last { tabs.pop() } else { Some(tabs.remove(0)) };
        for tab in &tabs {
            session
                .switch_to_window(tab)
                .map_err(|e| self.fail(e, "switch_to_window"))?;
            session.close_window().map_err(|e| self.fail(e, "close_window"))?;
        }
        if let Some(keep) = keep {
            tracing::debug!(
                page = %self.inner.name,
                tab = %keep,
                closed = tabs.len(),
                "focused tab"
            );
            session
                .switch_to_window(&keep)
                .map_err(|e| self.fail(e, "switch_to_window"))?;
        }
        Ok(())
    }

    /// Keep only the most recently opened tab and focus it
    pub fn focus_on_last_opened_tab(&self) -> PagesResult<()> {
        self.focus_tab(true)
    }

    /// Keep only the first tab and focus it
    pub fn focus_on_first_opened_tab(&self) -> PagesResult<()> {
        self.focus_tab(false)
    }

    // =========================================================================
    // URL, SCROLL AND STORAGE
    // =========================================================================

    /// Numeric id of the opened URL (`id` query param or last path segment)
    pub fn extract_id_from_opened_url(&self) -> PagesResult<Option<i64>> {
        self.check_opened()?;
        Ok(get_id_from_url(&self.opened_url()?))
    }

    /// First value of query param `name` in the opened URL
    pub fn extract_param_from_opened_url(&self, name: &str) -> PagesResult<Option<String>> {
        self.check_opened()?;
        Ok(get_param_from_url(&self.opened_url()?, name)
            .and_then(|values| values.into_iter().next()))
    }

    /// Scroll `element` into view
    pub fn scroll_to_element(
        &self,
        element: &ElementHandle,
        vertical: ScrollPosition,
        horizontal: ScrollPosition,
    ) -> PagesResult<()> {
        let script = format!(
            "\narguments[0].scrollIntoView({{block: \"{}\", inline: \"{}\"}})\n",
            vertical.as_str(),
            horizontal.as_str()
        );
        let _ = self
            .inner
            .session
            .execute_script(&script, &[element.as_script_arg()])
            .map_err(|e| self.fail(e, "scroll_to_element"))?;
        Ok(())
    }

    /// Delete cookies whose `cookie_key` field matches `filter` (case-insensitive
    /// regex), or every cookie when `filter` is `None`
    pub fn delete_cookies(&self, filter: Option<&str>, cookie_key: &str) -> PagesResult<()> {
        let session = &self.inner.session;
        let Some(filter) = filter else {
            return session
                .delete_all_cookies()
                .map_err(|e| self.fail(e, "delete_all_cookies"));
        };
        let pattern = RegexBuilder::new(filter)
            .case_insensitive(true)
            .build()
            .map_err(|e| PagesError::config(format!("Invalid cookie filter {filter:?}: {e}")))?;
        let cookies = session.cookies().map_err(|e| self.fail(e, "cookies"))?;
        for cookie in cookies {
            let value = match cookie.get(cookie_key) {
                Some(Value::String(value)) => value.clone(),
                Some(other) => other.to_string(),
                None => {
                    return Err(PagesError::page(format!(
                        "Not found cookie by (value, key) = ({filter}, {cookie_key})"
                    )))
                }
            };
            if !pattern.is_match(&value) {
                continue;
            }
            match cookie.get("name").and_then(Value::as_str) {
                Some(name) => session
                    .delete_cookie(name)
                    .map_err(|e| self.fail(e, "delete_cookie"))?,
                None => tracing::warn!(?cookie, "matching cookie has no name, skipped"),
            }
        }
        Ok(())
    }

    /// Remove one local storage key, or clear it all
    pub fn delete_local_storage(&self, key: Option<&str>) -> PagesResult<()> {
        let session = &self.inner.session;
        let result = match key.filter(|k| !k.is_empty()) {
            Some(key) => session.execute_script(
                "window.localStorage.removeItem(arguments[0]);",
                &[ScriptArg::Value(Value::String(key.to_string()))],
            ),
            None => session.execute_script("window.localStorage.clear();", &[]),
        };
        let _ = result.map_err(|e| self.fail(e, "delete_local_storage"))?;
        Ok(())
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    /// Wait for a toast to appear and snapshot it
    pub fn wait_and_get_toast(&self) -> PagesResult<Toast> {
        let found = self.find_elements(&Locator::id(Toast::COMPONENT_ID))?;
        let element = self.wait_visibility_one_of_elements(&found, None)?;
        Toast::new(&element)
    }

    /// Whether the next toast is a success toast
    pub fn is_toast_success(&self) -> PagesResult<bool> {
        Ok(self.wait_and_get_toast()?.is_success())
    }

    /// Whether the next toast is an error toast
    pub fn is_toast_error(&self) -> PagesResult<bool> {
        Ok(self.wait_and_get_toast()?.is_error())
    }

    /// Whether the next toast is a warning toast
    pub fn is_toast_warning(&self) -> PagesResult<bool> {
        Ok(self.wait_and_get_toast()?.is_warning())
    }

    /// The page's confirm dialog
    pub fn confirm_dialog(&self) -> PagesResult<ConfirmDialog> {
        ConfirmDialog::new(self.find_element(&Locator::tag_name(ConfirmDialog::TAG_NAME))?)
    }
}

// =============================================================================
// PAGE OBJECTS
// =============================================================================

/// A typed page built on a [`Page`].
///
/// Implementors declare their slots in [`spec`](Self::spec) and add typed
/// accessors and actions on top of [`page`](Self::page).
pub trait PageObject: Sized {
    /// Declaration of the page
    fn spec() -> PageSpec;

    /// Wrap a bound page
    fn from_page(page: Page) -> Self;

    /// The bound page
    fn page(&self) -> &Page;

    /// Bind to `session` without navigating
    fn attach(settings: &Settings, session: Rc<dyn Session>) -> PagesResult<Self> {
        Page::new(Self::spec(), settings, session).map(Self::from_page)
    }

    /// Get a session from `provider` and open the page
    fn launch(
        settings: &Settings,
        provider: &dyn SessionProvider,
        fresh_session: bool,
        query_params: &[(&str, &str)],
    ) -> PagesResult<Self> {
        Page::launch(Self::spec(), settings, provider, fresh_session, query_params)
            .map(Self::from_page)
    }

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::mock::{MockNode, MockSession};
    use crate::test_support::{opened_page, settings, spec};

    mod declaration_tests {
        use super::*;

        #[test]
        fn test_duplicate_slot_is_config_error() {
            let spec = spec()
                .element("title", ElementBinding::one(Locator::xpath("//h1")))
                .table("title", TableSpec::new());
            let err = Page::new(spec, &settings(), Rc::new(MockSession::new())).unwrap_err();
            assert!(matches!(err, PagesError::Config { .. }));
        }

        #[test]
        fn test_nested_parent_must_be_table() {
            let spec = spec().nested_tables("details", NestedTables::new("orders", "details_"));
            assert!(matches!(
                Page::new(spec, &settings(), Rc::new(MockSession::new())),
                Err(PagesError::Config { .. })
            ));
        }

        #[test]
        fn test_missing_url_is_config_error() {
            let spec = PageSpec::new("Broken", "shop");
            assert!(matches!(
                Page::new(spec, &settings(), Rc::new(MockSession::new())),
                Err(PagesError::Config { .. })
            ));
        }

        #[test]
        fn test_section_slots_are_namespaced() {
            let session = MockSession::new();
            let _ = session.node("//nav//a", MockNode::new("a").with_text("Home"));
            let menu = NavigationSpec::new("menu")
                .element("home", ElementBinding::one(Locator::xpath("//nav//a")));
            let page = opened_page(&session, spec().section(menu));
            assert_eq!(page.element("menu.home").unwrap().text().unwrap(), "Home");
            assert!(page.element("home").is_err());
        }
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn test_open_navigates_to_page_url() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            assert_eq!(session.history(), vec!["http://shop.local/orders".to_string()]);
            page.check_opened().unwrap();
        }

        #[test]
        fn test_open_custom_url_with_params() {
            let session = MockSession::new();
            let page = opened_page(&session, spec().valid_url("orders/archive"));
            page.open(Some("orders/archive?tab=2"), &[("sort", "date")]).unwrap();
            assert_eq!(
                session.history().last().unwrap(),
                "http://shop.local/orders/archive?tab=2&sort=date"
            );
        }

        #[test]
        fn test_open_unknown_custom_url() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            assert!(matches!(
                page.open(Some("settings"), &[]),
                Err(PagesError::PageNotOpened { .. })
            ));
        }

        #[test]
        fn test_check_opened_ignores_query() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.set_url("http://shop.local/orders/?page=3");
            page.check_opened().unwrap();
            session.set_url("http://shop.local/customers");
            assert!(matches!(
                page.check_opened(),
                Err(PagesError::PageNotOpened { .. })
            ));
        }

        #[test]
        fn test_launch_uses_provider_and_params() {
            let session = MockSession::new();
            session.add_cookie("sid", "1");
            let page = Page::launch(spec(), &settings(), &session, true, &[("id", "7")]).unwrap();
            assert!(session.cookie_names().is_empty());
            assert_eq!(page.extract_id_from_opened_url().unwrap(), Some(7));
        }

        #[test]
        fn test_extract_param() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.set_url("http://shop.local/orders?status=open&status=closed");
            assert_eq!(
                page.extract_param_from_opened_url("status").unwrap(),
                Some("open".to_string())
            );
            assert_eq!(page.extract_param_from_opened_url("missing").unwrap(), None);
        }

        #[test]
        fn test_ready_script_awaited() {
            let session = MockSession::new();
            session.script_result("e2eReady", Value::Bool(true));
            let settings = settings().with_app(
                "shop",
                AppConfig::new("http://shop.local/")
                    .with_css_classes("page-loader", "table-loader", "modal-open")
                    .with_page_ready_script(true),
            );
            let page = Page::new(spec(), &settings, Rc::new(session.clone())).unwrap();
            page.open(None, &[]).unwrap();
            assert!(session.scripts().iter().any(|(s, _)| s == PAGE_READY_SCRIPT));
        }

        #[test]
        fn test_ready_script_never_set() {
            let session = MockSession::new();
            let settings = settings().with_app(
                "shop",
                AppConfig::new("http://shop.local/")
                    .with_css_classes("page-loader", "table-loader", "modal-open")
                    .with_page_ready_script(true),
            );
            let page = Page::new(spec(), &settings, Rc::new(session)).unwrap();
            let err = page.open(None, &[]).unwrap_err();
            assert!(err.to_string().contains("e2eReady"));
        }

        #[test]
        fn test_visible_loader_times_out() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.add("table-loader", MockNode::new("div"));
            assert!(matches!(
                page.wait_loaders_hidden(),
                Err(PagesError::Timeout { .. })
            ));
        }
    }

    mod tab_tests {
        use super::*;

        #[test]
        fn test_focus_first_closes_the_rest() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.open_window("window-2");
            session.open_window("window-3");
            page.focus_on_first_opened_tab().unwrap();
            assert_eq!(session.open_windows(), vec!["window-1".to_string()]);
            assert_eq!(session.current_window(), "window-1");
        }

        #[test]
        fn test_single_tab_keeps_cache() {
            let session = MockSession::new();
            let _ = session.node("//h1", MockNode::new("h1"));
            let page = opened_page(
                &session,
                spec().element("title", ElementBinding::one(Locator::xpath("//h1"))),
            );
            let _ = page.element("title").unwrap();
            page.focus_on_last_opened_tab().unwrap();
            assert!(page.is_cached("title"));
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_delete_cookies_by_regex() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.add_cookie("Session_ID", "1");
            session.add_cookie("theme", "dark");
            page.delete_cookies(Some("^session"), "name").unwrap();
            assert_eq!(session.cookie_names(), vec!["theme".to_string()]);
            page.delete_cookies(None, "name").unwrap();
            assert!(session.cookie_names().is_empty());
        }

        #[test]
        fn test_delete_cookies_unknown_key() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            session.add_cookie("theme", "dark");
            assert!(matches!(
                page.delete_cookies(Some("x"), "domain"),
                Err(PagesError::Page { .. })
            ));
        }

        #[test]
        fn test_delete_local_storage() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            page.delete_local_storage(Some("token")).unwrap();
            page.delete_local_storage(None).unwrap();
            let scripts = session.scripts();
            let (script, args) = &scripts[scripts.len() - 2];
            assert!(script.contains("removeItem"));
            assert_eq!(args, &vec![ScriptArg::Value(Value::String("token".into()))]);
            assert_eq!(scripts.last().unwrap().0, "window.localStorage.clear();");
        }

        #[test]
        fn test_scroll_script() {
            let session = MockSession::new();
            let _ = session.node("//footer", MockNode::new("footer"));
            let page = opened_page(&session, spec());
            let footer = page.find_element(&Locator::xpath("//footer")).unwrap();
            page.scroll_to_element(&footer, ScrollPosition::Center, ScrollPosition::Nearest)
                .unwrap();
            let (script, args) = session.scripts().pop().unwrap();
            assert!(script.contains(r#"scrollIntoView({block: "center", inline: "nearest"})"#));
            assert_eq!(args, vec![footer.as_script_arg()]);
        }

        #[test]
        fn test_one_of_elements_returns_visible() {
            let session = MockSession::new();
            session.add("li", MockNode::new("li").with_text("a").hidden());
            session.add("li", MockNode::new("li").with_text("b"));
            let page = opened_page(&session, spec());
            let items = page.find_elements(&Locator::tag_name("li")).unwrap();
            let shown = page.wait_visibility_one_of_elements(&items, None).unwrap();
            assert_eq!(shown.text().unwrap(), "b");
            assert!(page.wait_visibility_one_of_elements(&[], None).is_err());
        }

        #[test]
        fn test_find_elements_empty_is_error() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            assert!(matches!(
                page.find_elements(&Locator::css(".none")),
                Err(PagesError::ElementNotFound { .. })
            ));
        }

        #[test]
        fn test_find_by_data_e2e() {
            let session = MockSession::new();
            let _ = session.node(r#"//*[@data-e2e="save"]"#, MockNode::new("button"));
            let page = opened_page(&session, spec());
            let button = page.find_element_by_data_e2e("save").unwrap();
            assert_eq!(button.tag_name().unwrap(), "button");
            assert_eq!(button.slot(), None);
        }

        #[test]
        fn test_wait_element_clickable() {
            let session = MockSession::new();
            let button = session.node("//button", MockNode::new("button").disabled());
            let page = opened_page(&session, spec());
            let binding = ElementBinding::one(Locator::xpath("//button"));
            page.wait_accessibility_of(&binding, None).unwrap();
            assert!(page.wait_element_clickable(&binding, Some(20)).is_err());
            button.set_enabled(true);
            page.wait_element_clickable(&binding, None).unwrap();
        }

        #[test]
        fn test_reload_element_refreshes_slot() {
            let session = MockSession::new();
            let _ = session.node("//h1", MockNode::new("h1"));
            let page = opened_page(
                &session,
                spec().element("title", ElementBinding::one(Locator::xpath("//h1"))),
            );
            let first = page.resolve("title").unwrap();
            let again = page.reload_element(&first).unwrap();
            assert!(!Rc::ptr_eq(&first.head().unwrap(), &again.head().unwrap()));
            assert!(Rc::ptr_eq(&again.head().unwrap(), &page.element("title").unwrap()));
            assert_eq!(session.query_count("//h1"), 2);
        }

        #[test]
        fn test_dialog_and_modal_waits() {
            let session = MockSession::new();
            let page = opened_page(&session, spec());
            assert!(page.wait_dialog_is_visible().is_err());
            session.add(r#"//*[@role="dialog"]"#, MockNode::new("div"));
            session.add(r#"//*[@class="modal-open"]"#, MockNode::new("div"));
            page.wait_dialog_is_visible().unwrap();
            page.wait_modal_is_visible().unwrap();
        }
    }

    mod page_object_tests {
        use super::*;

        struct OrdersPage(Page);

        impl PageObject for OrdersPage {
            fn spec() -> PageSpec {
                spec().element("title", ElementBinding::one(Locator::xpath("//h1")))
            }

            fn from_page(page: Page) -> Self {
                Self(page)
            }

            fn page(&self) -> &Page {
                &self.0
            }
        }

        impl OrdersPage {
            fn title(&self) -> PagesResult<String> {
                self.page().element("title")?.text()
            }
        }

        #[test]
        fn test_typed_accessor() {
            let session = MockSession::new();
            let _ = session.node("//h1", MockNode::new("h1").with_text("Orders"));
            let orders = OrdersPage::launch(&settings(), &session, false, &[]).unwrap();
            assert_eq!(orders.title().unwrap(), "Orders");
            assert!(orders.page_name().ends_with("OrdersPage"));
        }

        #[test]
        fn test_attach_does_not_navigate() {
            let session = MockSession::new();
            let orders = OrdersPage::attach(&settings(), Rc::new(session.clone())).unwrap();
            assert!(session.history().is_empty());
            assert!(matches!(
                orders.title(),
                Err(PagesError::PageNotOpened { .. })
            ));
        }
    }
}
