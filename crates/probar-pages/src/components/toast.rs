//! Notification toasts.
//!
//! Toasts disappear on their own, so the container's markup is captured once when
//! the [`Toast`] is built and read from that snapshot afterwards.

use std::fmt;
use std::rc::Rc;

use crate::element::ElementHandle;
use crate::result::{PagesError, PagesResult};
use crate::table::markup::{parse_element, Element};

const TOAST_CLASS: &str = "adc-toast";
const TITLE_CLASS: &str = "adc-toast-title";
const MESSAGE_CLASS: &str = "adc-toast-body";

fn toast_error(message: impl Into<String>) -> PagesError {
    PagesError::Toast {
        message: message.into(),
    }
}

/// Severity of a toast, taken from its modifier class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    /// `adc-toast-error`
    Error,
    /// `adc-toast-info`
    Info,
    /// `adc-toast-success`
    Success,
    /// `adc-toast-warning`
    Warning,
}

impl ToastType {
    const ALL: [Self; 4] = [Self::Error, Self::Info, Self::Success, Self::Warning];

    /// CSS class marking this type
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Error => "adc-toast-error",
            Self::Info => "adc-toast-info",
            Self::Success => "adc-toast-success",
            Self::Warning => "adc-toast-warning",
        }
    }

    fn of(element: &Element) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| element.has_class(kind.css_class()))
    }
}

impl fmt::Display for ToastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
        };
        f.write_str(name)
    }
}

/// Snapshot of the toast container
#[derive(Debug, Clone)]
pub struct Toast {
    element: Rc<ElementHandle>,
    toast: Element,
    kind: Option<ToastType>,
}

impl Toast {
    /// Id of the toast container element
    pub const COMPONENT_ID: &'static str = "adc-toast-container";

    /// Capture the toast shown inside the container `element`
    pub fn new(element: &Rc<ElementHandle>) -> PagesResult<Self> {
        let id = element.attribute("id")?;
        if id.as_deref() != Some(Self::COMPONENT_ID) {
            return Err(toast_error(format!(
                "expected the element with id {}, got {id:?}",
                Self::COMPONENT_ID
            )));
        }
        let container = parse_element(&element.outer_html()?)?;
        let toast = if container.has_class(TOAST_CLASS) {
            container
        } else {
            container
                .find(&|e| e.has_class(TOAST_CLASS))
                .cloned()
                .ok_or_else(|| toast_error("Cannot find toast in the container"))?
        };
        let kind = ToastType::of(&toast);
        tracing::debug!(kind = ?kind, "captured toast");
        Ok(Self {
            element: Rc::clone(element),
            toast,
            kind,
        })
    }

    /// Severity, `None` when no modifier class is present
    #[must_use]
    pub const fn kind(&self) -> Option<ToastType> {
        self.kind
    }

    /// Whether this is a success toast
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == Some(ToastType::Success)
    }

    /// Whether this is an error toast
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == Some(ToastType::Error)
    }

    /// Whether this is a warning toast
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.kind == Some(ToastType::Warning)
    }

    /// Whether this is an info toast
    #[must_use]
    pub fn is_info(&self) -> bool {
        self.kind == Some(ToastType::Info)
    }

    fn section(&self, class: &str) -> Option<String> {
        self.toast
            .find(&|e| e.has_class(class))
            .map(|e| e.text_content().trim().to_string())
    }

    /// Heading text
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.section(TITLE_CLASS)
    }

    /// Body text
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.section(MESSAGE_CLASS)
    }

    /// Dismiss the toast if it is still shown
    pub fn hide(&self) -> PagesResult<()> {
        if self.element.is_displayed()? {
            self.element.click_with(false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::mock::{MockNode, MockSession};
    use crate::test_support::{opened_page, spec};

    fn container(kind_class: &str) -> MockNode {
        MockNode::new("div")
            .with_attribute("id", Toast::COMPONENT_ID)
            .with_html(&format!(
                concat!(
                    r#"<div id="adc-toast-container"><div class="adc-toast {}">"#,
                    r#"<div class="adc-toast-title">Saved</div>"#,
                    r#"<div class="adc-toast-body">Order <b>42</b> was saved</div>"#,
                    "</div></div>",
                ),
                kind_class
            ))
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_reads_type_title_and_message() {
            let session = MockSession::new();
            session.add(Toast::COMPONENT_ID, container("adc-toast-success"));
            let page = opened_page(&session, spec());
            let toast = page.wait_and_get_toast().unwrap();
            assert_eq!(toast.kind(), Some(ToastType::Success));
            assert!(toast.is_success());
            assert!(!toast.is_error());
            assert_eq!(toast.title().as_deref(), Some("Saved"));
            assert_eq!(toast.message().as_deref(), Some("Order 42 was saved"));
        }

        #[test]
        fn test_page_shortcuts() {
            let session = MockSession::new();
            session.add(Toast::COMPONENT_ID, container("adc-toast-warning"));
            let page = opened_page(&session, spec());
            assert!(page.is_toast_warning().unwrap());
            assert!(!page.is_toast_success().unwrap());
            assert!(!page.is_toast_error().unwrap());
        }

        #[test]
        fn test_untyped_toast() {
            let session = MockSession::new();
            session.add(Toast::COMPONENT_ID, container(""));
            let page = opened_page(&session, spec());
            let toast = page.wait_and_get_toast().unwrap();
            assert_eq!(toast.kind(), None);
            assert!(!toast.is_info());
        }

        #[test]
        fn test_wrong_id_is_toast_error() {
            let session = MockSession::new();
            session.add("toast", MockNode::new("div").with_attribute("id", "other"));
            let page = opened_page(&session, spec());
            let element = page.find_element(&Locator::id("toast")).unwrap();
            assert!(matches!(Toast::new(&element), Err(PagesError::Toast { .. })));
        }

        #[test]
        fn test_container_without_toast() {
            let session = MockSession::new();
            session.add(
                Toast::COMPONENT_ID,
                MockNode::new("div")
                    .with_attribute("id", Toast::COMPONENT_ID)
                    .with_html(r#"<div id="adc-toast-container"></div>"#),
            );
            let page = opened_page(&session, spec());
            assert!(matches!(
                page.wait_and_get_toast(),
                Err(PagesError::Toast { .. })
            ));
        }

        #[test]
        fn test_hidden_container_times_out() {
            let session = MockSession::new();
            session.add(Toast::COMPONENT_ID, container("adc-toast-info").hidden());
            let page = opened_page(&session, spec());
            assert!(matches!(
                page.wait_and_get_toast(),
                Err(PagesError::Timeout { .. })
            ));
        }
    }

    mod hide_tests {
        use super::*;

        #[test]
        fn test_hide_clicks_visible_toast_only() {
            let session = MockSession::new();
            let node = session.node(Toast::COMPONENT_ID, container("adc-toast-error"));
            let page = opened_page(&session, spec());
            let toast = page.wait_and_get_toast().unwrap();
            toast.hide().unwrap();
            assert_eq!(node.clicks(), 1);

            node.set_displayed(false);
            toast.hide().unwrap();
            assert_eq!(node.clicks(), 1);
            assert_eq!(ToastType::Error.to_string(), "error");
        }
    }
}
