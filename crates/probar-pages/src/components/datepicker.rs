//! Date and date-range picker attached to a text input.
//!
//! The picker (`<ngx-daterangepicker-material>`) is a sibling of the input it fills.
//! Values are typed into the input in the application's display format and then
//! confirmed with the picker's OK button.

use std::fmt::{self, Write as _};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::element::ElementHandle;
use crate::locator::{xpath_from_parent, Locator};
use crate::result::{PagesError, PagesResult};

/// Format used for dates when none is given
pub const DEFAULT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Format used for date-times when none is given
pub const DEFAULT_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

const TAG_NAME: &str = "ngx-daterangepicker-material";
const PANEL_CLASS: &str = "md-drppicker";
const RANGE_SEPARATOR: &str = " - ";
const OK_BUTTON_XPATH: &str = r#".//button[contains(text(), "ok") or contains(text(), "OK")]"#;
const ACTIVE_DAY_XPATH: &str = r#".//td[contains(@class, "active")]"#;

fn picker_error(message: impl Into<String>) -> PagesError {
    PagesError::DatePicker {
        message: message.into(),
    }
}

fn not_found_as_picker_error(what: &str) -> impl FnOnce(PagesError) -> PagesError + '_ {
    move |e| {
        if e.is_not_found() {
            picker_error(format!("Cannot find {what}"))
        } else {
            e
        }
    }
}

/// Render a chrono `format(...)` value, reporting bad patterns instead of panicking
fn render(formatted: impl fmt::Display, format: &str) -> PagesResult<String> {
    let mut out = String::new();
    write!(out, "{formatted}").map_err(|_| picker_error(format!("invalid format {format:?}")))?;
    Ok(out)
}

/// Picker bound to its input element
#[derive(Debug, Clone)]
pub struct DatePicker {
    input: Rc<ElementHandle>,
    component: Rc<ElementHandle>,
    panel: Rc<ElementHandle>,
}

impl DatePicker {
    /// Locate the picker next to `input`
    pub fn new(input: Rc<ElementHandle>) -> PagesResult<Self> {
        let parent = input
            .find_element(&Locator::xpath("./.."))
            .map_err(not_found_as_picker_error("the input's parent"))?;
        let component = parent
            .find_element(&Locator::xpath(xpath_from_parent(TAG_NAME)))
            .map_err(not_found_as_picker_error(TAG_NAME))?;
        let panel = component
            .find_element(&Locator::class_name(PANEL_CLASS))
            .map_err(not_found_as_picker_error(PANEL_CLASS))?;
        Ok(Self {
            input,
            component,
            panel,
        })
    }

    /// The input the picker fills
    #[must_use]
    pub const fn input(&self) -> &Rc<ElementHandle> {
        &self.input
    }

    /// Whether the calendar panel is open
    pub fn is_visible(&self) -> PagesResult<bool> {
        self.panel.is_displayed()
    }

    /// Open the calendar panel by clicking the input
    pub fn show(&self) -> PagesResult<()> {
        if !self.is_visible()? {
            self.input.click_with(false)?;
        }
        Ok(())
    }

    /// The OK button of the open panel
    pub fn button_ok(&self) -> PagesResult<Rc<ElementHandle>> {
        self.component.page()?.check_opened()?;
        self.component
            .find_element(&Locator::xpath(OK_BUTTON_XPATH))
            .map_err(not_found_as_picker_error("the OK button"))
    }

    /// The highlighted day cell
    pub fn active_picker(&self) -> PagesResult<Rc<ElementHandle>> {
        self.component.page()?.check_opened()?;
        self.component
            .find_element(&Locator::xpath(ACTIVE_DAY_XPATH))
            .map_err(not_found_as_picker_error("the active day"))
    }

    fn type_value(&self, value: &str) -> PagesResult<()> {
        self.show()?;
        self.input.clear()?;
        self.input.send_keys(value)?;
        tracing::debug!(value, "typed into date picker");
        Ok(())
    }

    /// Type `from` (and `to` for a range) using `format` or [`DEFAULT_DATE_FORMAT`]
    pub fn set_date(
        &self,
        from: NaiveDate,
        to: Option<NaiveDate>,
        format: Option<&str>,
    ) -> PagesResult<()> {
        let format = format.unwrap_or(DEFAULT_DATE_FORMAT);
        let mut value = render(from.format(format), format)?;
        if let Some(to) = to {
            value.push_str(RANGE_SEPARATOR);
            value.push_str(&render(to.format(format), format)?);
        }
        self.type_value(&value)
    }

    /// Type `from` (and `to` for a range) using `format` or [`DEFAULT_TIME_FORMAT`]
    pub fn set_time(
        &self,
        from: NaiveDateTime,
        to: Option<NaiveDateTime>,
        format: Option<&str>,
    ) -> PagesResult<()> {
        let format = format.unwrap_or(DEFAULT_TIME_FORMAT);
        let mut value = render(from.format(format), format)?;
        if let Some(to) = to {
            value.push_str(RANGE_SEPARATOR);
            value.push_str(&render(to.format(format), format)?);
        }
        self.type_value(&value)
    }

    /// [`set_date`](Self::set_date), then confirm.
    ///
    /// Single-date pickers without an OK button are confirmed by clicking the
    /// highlighted day.
    pub fn set_date_and_apply(
        &self,
        from: NaiveDate,
        to: Option<NaiveDate>,
        format: Option<&str>,
    ) -> PagesResult<()> {
        self.set_date(from, to, format)?;
        match self.button_ok() {
            Ok(ok) => ok.click_with(false),
            Err(PagesError::DatePicker { .. }) if to.is_none() => {
                self.active_picker()?.click_with(false)
            }
            Err(e) => Err(e),
        }
    }

    /// [`set_time`](Self::set_time), then press OK
    pub fn set_time_and_apply(
        &self,
        from: NaiveDateTime,
        to: Option<NaiveDateTime>,
        format: Option<&str>,
    ) -> PagesResult<()> {
        self.set_time(from, to, format)?;
        self.button_ok()?.click_with(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};
    use crate::page::Page;
    use crate::test_support::{opened_page, spec};

    struct Fixture {
        _session: MockSession,
        page: Page,
        input: MockNode,
        component: MockNode,
    }

    fn fixture(with_ok: bool) -> Fixture {
        let session = MockSession::new();
        let panel = MockNode::new("div").hidden();
        let component = MockNode::new(TAG_NAME).with_child(PANEL_CLASS, panel.clone());
        if with_ok {
            component.add_child(OK_BUTTON_XPATH, MockNode::new("button").with_text("OK"));
        }
        let parent = MockNode::new("div")
            .with_child(&format!("./{TAG_NAME}"), component.clone());
        let input = MockNode::new("input").with_child("./..", parent);
        input.on_click(move || panel.set_displayed(true));
        session.add("due-date", input.clone());
        let page = opened_page(&session, spec());
        Fixture {
            _session: session,
            page,
            input,
            component,
        }
    }

    fn picker(fixture: &Fixture) -> DatePicker {
        DatePicker::new(fixture.page.find_element(&Locator::id("due-date")).unwrap()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod typing_tests {
        use super::*;

        #[test]
        fn test_show_clicks_input_once() {
            let fixture = fixture(true);
            let picker = picker(&fixture);
            assert!(!picker.is_visible().unwrap());
            picker.show().unwrap();
            picker.show().unwrap();
            assert!(picker.is_visible().unwrap());
            assert_eq!(fixture.input.clicks(), 1);
        }

        #[test]
        fn test_set_date_replaces_value() {
            let fixture = fixture(true);
            fixture.input.set_attribute("value", "old");
            picker(&fixture)
                .set_date(date(2024, 3, 9), None, None)
                .unwrap();
            assert_eq!(fixture.input.value(), "03-09-2024");
        }

        #[test]
        fn test_set_date_range_with_format() {
            let fixture = fixture(true);
            picker(&fixture)
                .set_date(date(2024, 1, 2), Some(date(2024, 1, 31)), Some("%Y/%m/%d"))
                .unwrap();
            assert_eq!(fixture.input.value(), "2024/01/02 - 2024/01/31");
        }

        #[test]
        fn test_set_time_default_format() {
            let fixture = fixture(true);
            let at = date(2024, 5, 17).and_hms_opt(14, 5, 0).unwrap();
            picker(&fixture).set_time(at, None, None).unwrap();
            assert_eq!(fixture.input.value(), "17/05/2024 14:05");
        }

        #[test]
        fn test_invalid_format_is_picker_error() {
            let fixture = fixture(true);
            assert!(matches!(
                picker(&fixture).set_date(date(2024, 1, 1), None, Some("%Q")),
                Err(PagesError::DatePicker { .. })
            ));
        }
    }

    mod apply_tests {
        use super::*;

        #[test]
        fn test_apply_presses_ok() {
            let fixture = fixture(false);
            let ok = MockNode::new("button").with_text("OK");
            fixture.component.add_child(OK_BUTTON_XPATH, ok.clone());
            picker(&fixture)
                .set_time_and_apply(date(2024, 5, 17).and_hms_opt(9, 0, 0).unwrap(), None, None)
                .unwrap();
            assert_eq!(ok.clicks(), 1);
            assert_eq!(fixture.input.value(), "17/05/2024 09:00");
        }

        #[test]
        fn test_single_date_without_ok_clicks_active_day() {
            let fixture = fixture(false);
            let active = MockNode::new("td");
            fixture.component.add_child(ACTIVE_DAY_XPATH, active.clone());
            picker(&fixture)
                .set_date_and_apply(date(2024, 2, 29), None, None)
                .unwrap();
            assert_eq!(active.clicks(), 1);
        }

        #[test]
        fn test_range_without_ok_fails() {
            let fixture = fixture(false);
            let err = picker(&fixture)
                .set_date_and_apply(date(2024, 2, 1), Some(date(2024, 2, 3)), None)
                .unwrap_err();
            assert!(matches!(err, PagesError::DatePicker { .. }));
        }

        #[test]
        fn test_missing_component() {
            let session = MockSession::new();
            session.add(
                "due-date",
                MockNode::new("input").with_child("./..", MockNode::new("div")),
            );
            let page = opened_page(&session, spec());
            let input = page.find_element(&Locator::id("due-date")).unwrap();
            let err = DatePicker::new(input).unwrap_err();
            assert!(err.to_string().contains(TAG_NAME));
        }
    }
}
