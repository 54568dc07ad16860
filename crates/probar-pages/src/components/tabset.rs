//! Tab strips: `<p-tabview>` and the older `<tabset>`.

use std::rc::Rc;

use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::result::{PagesError, PagesResult};

use super::{ensure_tag, unexpected_tag};

fn tab_error(message: impl Into<String>) -> PagesError {
    PagesError::TabSet {
        message: message.into(),
    }
}

/// Locators that differ between the two tab widgets
#[derive(Debug, Clone, Copy)]
struct TabMarkup {
    tag: &'static str,
    selected_xpath: &'static str,
    tab_by_text: fn(&str) -> String,
}

fn tab_view_link(text: &str) -> String {
    format!(r#".//a[@role="tab" and contains(string(),"{text}")]"#)
}

fn tab_set_link(text: &str) -> String {
    format!(r#".//a[contains(@class, "nav-link") and contains(string(),"{text}")]"#)
}

const TAB_VIEW: TabMarkup = TabMarkup {
    tag: "p-tabview",
    selected_xpath: r#".//li[contains(@class, "p-highlight")]"#,
    tab_by_text: tab_view_link,
};

const TAB_SET: TabMarkup = TabMarkup {
    tag: "tabset",
    selected_xpath: r#".//*[contains(@class, "nav-item") and contains(@class, "active")]"#,
    tab_by_text: tab_set_link,
};

#[derive(Debug, Clone)]
struct Tabs {
    element: Rc<ElementHandle>,
    markup: TabMarkup,
}

impl Tabs {
    fn new(element: Rc<ElementHandle>, markup: TabMarkup) -> PagesResult<Self> {
        ensure_tag(&element, markup.tag, unexpected_tag)?;
        Ok(Self { element, markup })
    }

    fn selected_tab(&self) -> PagesResult<Rc<ElementHandle>> {
        self.element
            .find_element(&Locator::xpath(self.markup.selected_xpath))
            .map_err(|e| {
                if e.is_not_found() {
                    tab_error("Cannot find selected tab")
                } else {
                    e
                }
            })
    }

    fn open(&self, locator: &Locator) -> PagesResult<()> {
        let tab = self.element.find_element(locator).map_err(|e| {
            if e.is_not_found() {
                tab_error(format!("Cannot find tab {locator}"))
            } else {
                e
            }
        })?;
        tab.click()?;
        self.element.page()?.wait_loaders_hidden()
    }

    fn select_by_visible_text(&self, text: &str) -> PagesResult<()> {
        self.open(&Locator::xpath((self.markup.tab_by_text)(text)))
    }
}

/// PrimeNG tab view
#[derive(Debug, Clone)]
pub struct TabView {
    tabs: Tabs,
}

impl TabView {
    /// Wrap a `<p-tabview>` element
    pub fn new(element: Rc<ElementHandle>) -> PagesResult<Self> {
        Ok(Self {
            tabs: Tabs::new(element, TAB_VIEW)?,
        })
    }

    /// The highlighted tab header
    pub fn selected_tab(&self) -> PagesResult<Rc<ElementHandle>> {
        self.tabs.selected_tab()
    }

    /// Text of the highlighted tab
    pub fn selected_tab_text(&self) -> PagesResult<String> {
        self.selected_tab()?.text()
    }

    /// Open the tab controlling panel `index` (0-based)
    pub fn select_by_index(&self, index: usize) -> PagesResult<()> {
        self.tabs.open(&Locator::xpath(format!(
            r#".//a[@aria-controls="p-tabpanel-{index}"]"#
        )))
    }

    /// Open the first tab whose text contains `text`
    pub fn select_by_visible_text(&self, text: &str) -> PagesResult<()> {
        self.tabs.select_by_visible_text(text)
    }
}

/// Bootstrap tab set; tabs can only be chosen by text
#[derive(Debug, Clone)]
pub struct TabSet {
    tabs: Tabs,
}

impl TabSet {
    /// Wrap a `<tabset>` element
    pub fn new(element: Rc<ElementHandle>) -> PagesResult<Self> {
        Ok(Self {
            tabs: Tabs::new(element, TAB_SET)?,
        })
    }

    /// The active tab item
    pub fn selected_tab(&self) -> PagesResult<Rc<ElementHandle>> {
        self.tabs.selected_tab()
    }

    /// Text of the active tab
    pub fn selected_tab_text(&self) -> PagesResult<String> {
        self.selected_tab()?.text()
    }

    /// Always fails: tab sets do not expose panel indices
    pub fn select_by_index(&self, index: usize) -> PagesResult<()> {
        Err(tab_error(format!(
            "Selecting tab {index} by index is not supported by <{}>",
            self.tabs.markup.tag
        )))
    }

    /// Open the first tab whose link text contains `text`
    pub fn select_by_visible_text(&self, text: &str) -> PagesResult<()> {
        self.tabs.select_by_visible_text(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};
    use crate::page::Page;
    use crate::test_support::{opened_page, spec};

    fn page_with(session: &MockSession, host: MockNode) -> Page {
        session.add("tabs", host);
        opened_page(session, spec())
    }

    fn host(page: &Page) -> Rc<ElementHandle> {
        page.find_element(&Locator::tag_name("tabs")).unwrap()
    }

    mod tab_view_tests {
        use super::*;

        #[test]
        fn test_selected_and_select_by_index() {
            let session = MockSession::new();
            let second = MockNode::new("a");
            let view = MockNode::new("p-tabview")
                .with_child(
                    TAB_VIEW.selected_xpath,
                    MockNode::new("li").with_text("General"),
                )
                .with_child(r#".//a[@aria-controls="p-tabpanel-1"]"#, second.clone());
            let page = page_with(&session, view);
            let tabs = TabView::new(host(&page)).unwrap();
            assert_eq!(tabs.selected_tab_text().unwrap(), "General");
            tabs.select_by_index(1).unwrap();
            assert_eq!(second.clicks(), 1);
        }

        #[test]
        fn test_select_by_text() {
            let session = MockSession::new();
            let history = MockNode::new("a");
            let view = MockNode::new("p-tabview").with_child(
                r#".//a[@role="tab" and contains(string(),"History")]"#,
                history.clone(),
            );
            let page = page_with(&session, view);
            TabView::new(host(&page))
                .unwrap()
                .select_by_visible_text("History")
                .unwrap();
            assert_eq!(history.clicks(), 1);
        }

        #[test]
        fn test_misses_are_tab_errors() {
            let session = MockSession::new();
            let page = page_with(&session, MockNode::new("p-tabview"));
            let tabs = TabView::new(host(&page)).unwrap();
            let err = tabs.selected_tab().unwrap_err();
            assert!(err.to_string().contains("Cannot find selected tab"));
            assert!(matches!(
                tabs.select_by_index(3),
                Err(PagesError::TabSet { .. })
            ));
        }

        #[test]
        fn test_wrong_tag() {
            let session = MockSession::new();
            let page = page_with(&session, MockNode::new("tabset"));
            assert!(matches!(
                TabView::new(host(&page)),
                Err(PagesError::UnexpectedTag { .. })
            ));
        }
    }

    mod tab_set_tests {
        use super::*;

        #[test]
        fn test_select_by_text_and_selected() {
            let session = MockSession::new();
            let notes = MockNode::new("a");
            let set = MockNode::new("tabset")
                .with_child(TAB_SET.selected_xpath, MockNode::new("li").with_text("Notes"))
                .with_child(
                    r#".//a[contains(@class, "nav-link") and contains(string(),"Notes")]"#,
                    notes.clone(),
                );
            let page = page_with(&session, set);
            let tabs = TabSet::new(host(&page)).unwrap();
            tabs.select_by_visible_text("Notes").unwrap();
            assert_eq!(notes.clicks(), 1);
            assert_eq!(tabs.selected_tab_text().unwrap(), "Notes");
        }

        #[test]
        fn test_select_by_index_unsupported() {
            let session = MockSession::new();
            let page = page_with(&session, MockNode::new("tabset"));
            let err = TabSet::new(host(&page)).unwrap().select_by_index(0).unwrap_err();
            assert!(matches!(err, PagesError::TabSet { .. }));
        }
    }
}
