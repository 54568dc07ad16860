//! Wrappers around the application's reusable UI widgets.
//!
//! Each component is built from an [`ElementHandle`] pointing at the widget's
//! container and checks the container's tag on construction. Operations go through
//! the handle, so stale-reference recovery and clickability waits apply as usual.

mod ckeditor;
mod confirm_dialog;
mod datepicker;
mod input_mask;
mod select;
mod tabset;
mod toast;

pub use ckeditor::CkEditor;
pub use confirm_dialog::ConfirmDialog;
pub use datepicker::{DatePicker, DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT};
pub use input_mask::{generate_for_mask, InputMask};
pub use select::Select;
pub use tabset::{TabSet, TabView};
pub use toast::{Toast, ToastType};

use std::rc::Rc;

use crate::element::ElementHandle;
use crate::result::{PagesError, PagesResult};

/// Fail with `error(actual_tag)` unless `element` has tag `expected`
fn ensure_tag(
    element: &Rc<ElementHandle>,
    expected: &str,
    error: impl FnOnce(String) -> PagesError,
) -> PagesResult<()> {
    let actual = element.tag_name()?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(error(format!(
            "{} expects a <{expected}> element, got <{actual}>",
            element.locator()
        )))
    }
}

fn unexpected_tag(message: String) -> PagesError {
    PagesError::UnexpectedTag { message }
}
