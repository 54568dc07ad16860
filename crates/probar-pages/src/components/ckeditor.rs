//! Rich-text editor (`<ckeditor>`) toolbar and editing area.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::result::{PagesError, PagesResult};

use super::ensure_tag;

const TAG_NAME: &str = "ckeditor";

const CUT_BUTTON_CLASS: &str = "cke_button__cut";
const COPY_BUTTON_CLASS: &str = "cke_button__copy";
const TEXT_AREA_CLASS: &str = "cke_contents_ltr";
const BOLD_BUTTON_CLASS: &str = "cke_button__bold";
const CENTER_TEXT_BUTTON_CLASS: &str = "cke_button__justifycenter_icon";

fn editor_error(message: String) -> PagesError {
    PagesError::CkEditor { message }
}

/// Editor wrapper; toolbar elements are looked up once per instance
pub struct CkEditor {
    element: Rc<ElementHandle>,
    parts: RefCell<HashMap<&'static str, Rc<ElementHandle>>>,
}

impl fmt::Debug for CkEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CkEditor")
            .field("element", &self.element)
            .field("cached_parts", &self.parts.borrow().len())
            .finish()
    }
}

impl CkEditor {
    /// Wrap a `<ckeditor>` element
    pub fn new(element: Rc<ElementHandle>) -> PagesResult<Self> {
        ensure_tag(&element, TAG_NAME, editor_error)?;
        Ok(Self {
            element,
            parts: RefCell::new(HashMap::new()),
        })
    }

    fn part(&self, class: &'static str) -> PagesResult<Rc<ElementHandle>> {
        self.element.page()?.check_opened()?;
        if let Some(found) = self.parts.borrow().get(class) {
            return Ok(Rc::clone(found));
        }
        let found = self
            .element
            .find_element(&Locator::class_name(class))
            .map_err(|e| {
                if e.is_not_found() {
                    editor_error(format!("Cannot find .{class} in the editor"))
                } else {
                    e
                }
            })?;
        let _ = self.parts.borrow_mut().insert(class, Rc::clone(&found));
        Ok(found)
    }

    /// Toolbar "cut" button
    pub fn btn_cut(&self) -> PagesResult<Rc<ElementHandle>> {
        self.part(CUT_BUTTON_CLASS)
    }

    /// Toolbar "copy" button
    pub fn btn_copy(&self) -> PagesResult<Rc<ElementHandle>> {
        self.part(COPY_BUTTON_CLASS)
    }

    /// Toolbar "bold" button
    pub fn btn_bold(&self) -> PagesResult<Rc<ElementHandle>> {
        self.part(BOLD_BUTTON_CLASS)
    }

    /// Toolbar "center" button
    pub fn btn_center_text(&self) -> PagesResult<Rc<ElementHandle>> {
        self.part(CENTER_TEXT_BUTTON_CLASS)
    }

    /// Editable content area
    pub fn text_area(&self) -> PagesResult<Rc<ElementHandle>> {
        self.part(TEXT_AREA_CLASS)
    }
}
