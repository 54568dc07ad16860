//! In-memory browser session for unit tests.
//!
//! [`MockSession`] keeps a flat registry of nodes keyed by locator value and
//! counts every query, so tests can assert on caching. A node is a shared
//! [`MockNode`]; tests keep a clone and mutate it (text, visibility, children)
//! while the page under test holds references to it.
//!
//! Staleness is modelled with a generation counter: every reference remembers the
//! generation it was created in and goes stale once [`MockSession::rerender`] or a
//! navigation bumps it. [`MockNode::fail_stale`] forces a number of stale faults on
//! a single node regardless of generation, and [`MockNode::fail_with`] injects any
//! other client fault.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

use crate::locator::Locator;
use crate::result::PagesResult;
use crate::session::{
    Cookie, DriverError, DriverResult, RawElement, ScriptArg, Session, SessionProvider,
};

// =============================================================================
// NODES
// =============================================================================

type ClickHook = Box<dyn Fn()>;

struct NodeData {
    id: String,
    tag: RefCell<String>,
    text: RefCell<String>,
    attributes: RefCell<HashMap<String, String>>,
    displayed: Cell<bool>,
    enabled: Cell<bool>,
    selected: Cell<bool>,
    children: RefCell<HashMap<String, Vec<MockNode>>>,
    clicks: Cell<u32>,
    stale_failures: Cell<u32>,
    failure: RefCell<Option<DriverError>>,
    on_click: RefCell<Option<ClickHook>>,
}

/// A fake DOM node shared between the test and the page under test
#[derive(Clone)]
pub struct MockNode {
    data: Rc<NodeData>,
}

impl fmt::Debug for MockNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockNode")
            .field("id", &self.data.id)
            .field("tag", &self.data.tag.borrow())
            .field("text", &self.data.text.borrow())
            .finish_non_exhaustive()
    }
}

impl MockNode {
    /// Create a visible, enabled node with the given tag
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            data: Rc::new(NodeData {
                id: Uuid::new_v4().to_string(),
                tag: RefCell::new(tag.to_ascii_lowercase()),
                text: RefCell::new(String::new()),
                attributes: RefCell::new(HashMap::new()),
                displayed: Cell::new(true),
                enabled: Cell::new(true),
                selected: Cell::new(false),
                children: RefCell::new(HashMap::new()),
                clicks: Cell::new(0),
                stale_failures: Cell::new(0),
                failure: RefCell::new(None),
                on_click: RefCell::new(None),
            }),
        }
    }

    /// Set the rendered text
    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set `outerHTML`
    #[must_use]
    pub fn with_html(self, outer_html: &str) -> Self {
        self.set_attribute("outerHTML", outer_html);
        self
    }

    /// Register a child answered for `locator_value`
    #[must_use]
    pub fn with_child(self, locator_value: &str, child: MockNode) -> Self {
        self.add_child(locator_value, child);
        self
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(self) -> Self {
        self.set_displayed(false);
        self
    }

    /// Start disabled
    #[must_use]
    pub fn disabled(self) -> Self {
        self.set_enabled(false);
        self
    }

    /// Client-side id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Replace the rendered text
    pub fn set_text(&self, text: &str) {
        *self.data.text.borrow_mut() = text.to_string();
    }

    /// Set an attribute
    pub fn set_attribute(&self, name: &str, value: &str) {
        let _ = self
            .data
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    /// Read an attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.data.attributes.borrow().get(name).cloned()
    }

    /// Show or hide
    pub fn set_displayed(&self, displayed: bool) {
        self.data.displayed.set(displayed);
    }

    /// Enable or disable
    pub fn set_enabled(&self, enabled: bool) {
        self.data.enabled.set(enabled);
    }

    /// Mark as selected
    pub fn set_selected(&self, selected: bool) {
        self.data.selected.set(selected);
    }

    /// Append a child answered for `locator_value`
    pub fn add_child(&self, locator_value: &str, child: MockNode) {
        self.data
            .children
            .borrow_mut()
            .entry(locator_value.to_string())
            .or_default()
            .push(child);
    }

    /// Drop all children answered for `locator_value`
    pub fn remove_children(&self, locator_value: &str) {
        let _ = self.data.children.borrow_mut().remove(locator_value);
    }

    /// Fail the next `count` operations on any reference to this node as stale
    pub fn fail_stale(&self, count: u32) {
        self.data.stale_failures.set(count);
    }

    /// Fail the next operation on any reference to this node with `err`
    pub fn fail_with(&self, err: DriverError) {
        *self.data.failure.borrow_mut() = Some(err);
    }

    /// Run `hook` after every click
    pub fn on_click(&self, hook: impl Fn() + 'static) {
        *self.data.on_click.borrow_mut() = Some(Box::new(hook));
    }

    /// Number of clicks received
    #[must_use]
    pub fn clicks(&self) -> u32 {
        self.data.clicks.get()
    }

    /// Current `value` attribute
    #[must_use]
    pub fn value(&self) -> String {
        self.attribute("value").unwrap_or_default()
    }
}

// =============================================================================
// ELEMENT REFERENCES
// =============================================================================

struct MockElement {
    node: MockNode,
    born: u64,
    generation: Rc<Cell<u64>>,
}

impl MockElement {
    fn check(&self) -> DriverResult<&NodeData> {
        let data = &self.node.data;
        if let Some(err) = data.failure.borrow_mut().take() {
            return Err(err);
        }
        let pending = data.stale_failures.get();
        if pending > 0 {
            data.stale_failures.set(pending - 1);
            return Err(DriverError::StaleElement);
        }
        if self.generation.get() != self.born {
            return Err(DriverError::StaleElement);
        }
        Ok(data)
    }

    fn wrap(&self, node: MockNode) -> Box<dyn RawElement> {
        Box::new(Self {
            node,
            born: self.generation.get(),
            generation: Rc::clone(&self.generation),
        })
    }
}

impl RawElement for MockElement {
    fn element_id(&self) -> String {
        self.node.data.id.clone()
    }

    fn tag_name(&self) -> DriverResult<String> {
        Ok(self.check()?.tag.borrow().clone())
    }

    fn text(&self) -> DriverResult<String> {
        Ok(self.check()?.text.borrow().clone())
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        Ok(self.check()?.attributes.borrow().get(name).cloned())
    }

    fn click(&self) -> DriverResult<()> {
        let data = self.check()?;
        data.clicks.set(data.clicks.get() + 1);
        if let Some(hook) = data.on_click.borrow().as_ref() {
            hook();
        }
        Ok(())
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        let data = self.check()?;
        let mut attributes = data.attributes.borrow_mut();
        attributes.entry("value".to_string()).or_default().push_str(text);
        Ok(())
    }

    fn clear(&self) -> DriverResult<()> {
        let data = self.check()?;
        let _ = data
            .attributes
            .borrow_mut()
            .insert("value".to_string(), String::new());
        Ok(())
    }

    fn is_displayed(&self) -> DriverResult<bool> {
        Ok(self.check()?.displayed.get())
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        Ok(self.check()?.enabled.get())
    }

    fn is_selected(&self) -> DriverResult<bool> {
        Ok(self.check()?.selected.get())
    }

    fn find_element(&self, locator: &Locator) -> DriverResult<Box<dyn RawElement>> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))
    }

    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn RawElement>>> {
        let data = self.check()?;
        let children = data.children.borrow();
        Ok(children
            .get(locator.value())
            .map(|nodes| nodes.iter().map(|n| self.wrap(n.clone())).collect())
            .unwrap_or_default())
    }

    fn is_stale(&self) -> bool {
        self.generation.get() != self.born
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Default)]
struct SessionState {
    url: RefCell<String>,
    history: RefCell<Vec<String>>,
    generation: Rc<Cell<u64>>,
    nodes: RefCell<HashMap<String, Vec<MockNode>>>,
    queries: RefCell<HashMap<String, u32>>,
    scripts: RefCell<Vec<(String, Vec<ScriptArg>)>>,
    script_results: RefCell<Vec<(String, Value)>>,
    cookies: RefCell<Vec<Cookie>>,
    windows: RefCell<Vec<String>>,
    current_window: RefCell<String>,
    logs: RefCell<HashMap<String, Vec<Value>>>,
    quit: Cell<bool>,
}

/// In-memory [`Session`] and [`SessionProvider`]
#[derive(Clone)]
pub struct MockSession {
    state: Rc<SessionState>,
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("url", &self.state.url.borrow())
            .field("generation", &self.state.generation.get())
            .field("windows", &self.state.windows.borrow())
            .finish_non_exhaustive()
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    /// Create a session with one open window and a blank page
    #[must_use]
    pub fn new() -> Self {
        let state = SessionState::default();
        *state.windows.borrow_mut() = vec!["window-1".to_string()];
        *state.current_window.borrow_mut() = "window-1".to_string();
        *state.url.borrow_mut() = "about:blank".to_string();
        Self {
            state: Rc::new(state),
        }
    }

    /// Register a node answered for `locator_value`
    pub fn add(&self, locator_value: &str, node: MockNode) {
        self.state
            .nodes
            .borrow_mut()
            .entry(locator_value.to_string())
            .or_default()
            .push(node);
    }

    /// Register and return a node
    pub fn node(&self, locator_value: &str, node: MockNode) -> MockNode {
        self.add(locator_value, node.clone());
        node
    }

    /// Drop all nodes answered for `locator_value`
    pub fn remove(&self, locator_value: &str) {
        let _ = self.state.nodes.borrow_mut().remove(locator_value);
    }

    /// Invalidate every outstanding element reference
    pub fn rerender(&self) {
        let generation = &self.state.generation;
        generation.set(generation.get() + 1);
    }

    /// Pretend the browser is on `url` without recording a navigation
    pub fn set_url(&self, url: &str) {
        *self.state.url.borrow_mut() = url.to_string();
    }

    /// Queries issued for `locator_value` so far
    #[must_use]
    pub fn query_count(&self, locator_value: &str) -> u32 {
        self.state
            .queries
            .borrow()
            .get(locator_value)
            .copied()
            .unwrap_or(0)
    }

    /// URLs navigated to, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.history.borrow().clone()
    }

    /// Return `result` for any script containing `fragment`
    pub fn script_result(&self, fragment: &str, result: Value) {
        self.state
            .script_results
            .borrow_mut()
            .push((fragment.to_string(), result));
    }

    /// Scripts executed so far with their arguments
    #[must_use]
    pub fn scripts(&self) -> Vec<(String, Vec<ScriptArg>)> {
        self.state.scripts.borrow().clone()
    }

    /// Add a cookie with `name` and `value` (plus any extra fields)
    pub fn add_cookie(&self, name: &str, value: &str) {
        let mut cookie = Cookie::new();
        let _ = cookie.insert("name".into(), Value::String(name.into()));
        let _ = cookie.insert("value".into(), Value::String(value.into()));
        self.state.cookies.borrow_mut().push(cookie);
    }

    /// Names of the remaining cookies
    #[must_use]
    pub fn cookie_names(&self) -> Vec<String> {
        self.state
            .cookies
            .borrow()
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Open a new window (as a click with `target=_blank` would)
    pub fn open_window(&self, handle: &str) {
        self.state.windows.borrow_mut().push(handle.to_string());
    }

    /// Handles of all open windows
    #[must_use]
    pub fn open_windows(&self) -> Vec<String> {
        self.state.windows.borrow().clone()
    }

    /// Handle of the focused window
    #[must_use]
    pub fn current_window(&self) -> String {
        self.state.current_window.borrow().clone()
    }

    /// Add a browser log entry
    pub fn push_log(&self, kind: &str, entry: Value) {
        self.state
            .logs
            .borrow_mut()
            .entry(kind.to_string())
            .or_default()
            .push(entry);
    }

    /// Whether [`SessionProvider::quit`] was called
    #[must_use]
    pub fn was_quit(&self) -> bool {
        self.state.quit.get()
    }

    fn wrap(&self, node: MockNode) -> Box<dyn RawElement> {
        Box::new(MockElement {
            node,
            born: self.state.generation.get(),
            generation: Rc::clone(&self.state.generation),
        })
    }
}

impl Session for MockSession {
    fn navigate(&self, url: &str) -> DriverResult<()> {
        *self.state.url.borrow_mut() = url.to_string();
        self.state.history.borrow_mut().push(url.to_string());
        self.rerender();
        Ok(())
    }

    fn current_url(&self) -> DriverResult<String> {
        Ok(self.state.url.borrow().clone())
    }

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        self.state
            .scripts
            .borrow_mut()
            .push((script.to_string(), args.to_vec()));
        if script.contains("localStorage.clear()") || script.contains("localStorage.removeItem") {
            return Ok(Value::Null);
        }
        Ok(self
            .state
            .script_results
            .borrow()
            .iter()
            .rev()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or(Value::Null))
    }

    fn cookies(&self) -> DriverResult<Vec<Cookie>> {
        Ok(self.state.cookies.borrow().clone())
    }

    fn delete_cookie(&self, name: &str) -> DriverResult<()> {
        self.state
            .cookies
            .borrow_mut()
            .retain(|c| c.get("name").and_then(Value::as_str) != Some(name));
        Ok(())
    }

    fn delete_all_cookies(&self) -> DriverResult<()> {
        self.state.cookies.borrow_mut().clear();
        Ok(())
    }

    fn find_element(&self, locator: &Locator) -> DriverResult<Box<dyn RawElement>> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))
    }

    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn RawElement>>> {
        *self
            .state
            .queries
            .borrow_mut()
            .entry(locator.value().to_string())
            .or_insert(0) += 1;
        let nodes = self.state.nodes.borrow();
        Ok(nodes
            .get(locator.value())
            .map(|found| found.iter().map(|n| self.wrap(n.clone())).collect())
            .unwrap_or_default())
    }

    fn window_handles(&self) -> DriverResult<Vec<String>> {
        Ok(self.state.windows.borrow().clone())
    }

    fn switch_to_window(&self, handle: &str) -> DriverResult<()> {
        if !self.state.windows.borrow().iter().any(|w| w == handle) {
            return Err(DriverError::Other(format!("no such window: {handle}")));
        }
        *self.state.current_window.borrow_mut() = handle.to_string();
        Ok(())
    }

    fn close_window(&self) -> DriverResult<()> {
        let current = self.current_window();
        self.state.windows.borrow_mut().retain(|w| *w != current);
        Ok(())
    }

    fn browser_log(&self, kind: &str) -> DriverResult<Vec<Value>> {
        Ok(self
            .state
            .logs
            .borrow_mut()
            .remove(kind)
            .unwrap_or_default())
    }
}

impl SessionProvider for MockSession {
    fn session(&self, fresh: bool) -> PagesResult<Rc<dyn Session>> {
        if fresh {
            self.state.cookies.borrow_mut().clear();
        }
        Ok(Rc::new(self.clone()))
    }

    fn quit(&self) -> PagesResult<()> {
        self.state.quit.set(true);
        Ok(())
    }
}
