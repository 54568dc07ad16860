//! Yes/No confirmation dialog (`<p-confirmdialog>`).

use std::rc::Rc;

use crate::element::ElementHandle;
use crate::locator::{xpath_from_parent, Locator};
use crate::result::{PagesError, PagesResult};

use super::ensure_tag;

/// Dialog body classes, newest theme first
const BODY_CLASSES: [&str; 2] = ["p-dialog", "ui-dialog"];
const TITLE_CLASS: &str = "p-dialog-title";
const MESSAGE_CLASS: &str = "p-dialog-content";
const OK_BUTTON_XPATH: &str = r#"//button[@ng-reflect-label="Yes"]"#;
const CANCEL_BUTTON_XPATH: &str = r#"//button[@ng-reflect-label="No"]"#;

fn dialog_error(message: String) -> PagesError {
    PagesError::ConfirmDialog { message }
}

/// Modal asking the user to confirm an action
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    element: Rc<ElementHandle>,
    body: Rc<ElementHandle>,
}

impl ConfirmDialog {
    /// Tag of the dialog host element
    pub const TAG_NAME: &'static str = "p-confirmdialog";

    /// Wrap a `<p-confirmdialog>` host and locate its body
    pub fn new(element: Rc<ElementHandle>) -> PagesResult<Self> {
        ensure_tag(&element, Self::TAG_NAME, dialog_error)?;
        let mut body = None;
        for class in BODY_CLASSES {
            match element.find_element(&Locator::class_name(class)) {
                Ok(found) => {
                    body = Some(found);
                    break;
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        let body = body.ok_or_else(|| {
            dialog_error(format!(
                "no dialog body with any of the classes {BODY_CLASSES:?}"
            ))
        })?;
        Ok(Self { element, body })
    }

    /// The host element
    #[must_use]
    pub const fn element(&self) -> &Rc<ElementHandle> {
        &self.element
    }

    fn child(&self, locator: &Locator) -> PagesResult<Rc<ElementHandle>> {
        self.body.find_element(locator).map_err(|e| {
            if e.is_not_found() {
                dialog_error(format!("Cannot find {locator} in the dialog"))
            } else {
                e
            }
        })
    }

    /// Dialog heading
    pub fn title(&self) -> PagesResult<String> {
        self.child(&Locator::class_name(TITLE_CLASS))?.text()
    }

    /// Dialog question
    pub fn message(&self) -> PagesResult<String> {
        self.child(&Locator::class_name(MESSAGE_CLASS))?.text()
    }

    /// The "Yes" button
    pub fn button_ok(&self) -> PagesResult<Rc<ElementHandle>> {
        self.child(&Locator::xpath(xpath_from_parent(OK_BUTTON_XPATH)))
    }

    /// The "No" button
    pub fn button_cancel(&self) -> PagesResult<Rc<ElementHandle>> {
        self.child(&Locator::xpath(xpath_from_parent(CANCEL_BUTTON_XPATH)))
    }

    /// Answer "Yes" and wait for the loaders to settle
    pub fn confirm(&self) -> PagesResult<()> {
        self.button_ok()?.click()?;
        self.element.page()?.wait_loaders_hidden()
    }

    /// Answer "No" and wait for the loaders to settle
    pub fn cancel(&self) -> PagesResult<()> {
        self.button_cancel()?.click()?;
        self.element.page()?.wait_loaders_hidden()
    }
}
