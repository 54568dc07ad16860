//! Families of elements that differ only by indices in an attribute value.
//!
//! `<button data-e2e="row_1_edit">`, `<button data-e2e="row_2_edit">` and so on are
//! declared once as `ElementGroup::new(["row"]).end_part("edit")` and accessed as
//! `page.group("edit")?.get(&[2])`.

use std::fmt::Display;
use std::rc::Rc;

use crate::binding::{ElementBinding, Resolved};
use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::{PagesError, PagesResult};

/// Declaration of an indexed element family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementGroup {
    parts: Vec<String>,
    end_part: Option<String>,
    many: bool,
    attribute: Option<String>,
}

impl ElementGroup {
    /// Group whose names combine each of `parts` with one index
    #[must_use]
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            parts: parts
                .into_iter()
                .map(|p| p.as_ref().trim_matches('_').to_string())
                .collect(),
            end_part: None,
            many: false,
            attribute: None,
        }
    }

    /// Constant suffix appended after the indexed parts
    #[must_use]
    pub fn end_part(mut self, end: &str) -> Self {
        let end = end.trim_matches('_');
        self.end_part = (!end.is_empty()).then(|| end.to_string());
        self
    }

    /// Resolve every match of a name instead of the first
    #[must_use]
    pub const fn many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    /// Attribute carrying the names (defaults to the data-e2e attribute)
    #[must_use]
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Number of indices a name needs
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parts.len()
    }

    /// Concrete attribute value for `indices`
    pub fn name<T: Display>(&self, indices: &[T]) -> PagesResult<String> {
        if indices.len() != self.parts.len() {
            return Err(PagesError::config(format!(
                "Group needs {} indices but got {}",
                self.parts.len(),
                indices.len()
            )));
        }
        let mut pieces: Vec<String> = self
            .parts
            .iter()
            .zip(indices)
            .map(|(part, index)| {
                if part.is_empty() {
                    index.to_string()
                } else {
                    format!("{part}_{index}")
                }
            })
            .collect();
        pieces.extend(self.end_part.clone());
        Ok(pieces.join("_"))
    }

    fn locator(&self, page: &Page, name: &str) -> Locator {
        let attribute = self
            .attribute
            .as_deref()
            .unwrap_or(page.settings().data_e2e_attribute.as_str());
        Locator::by_attribute(attribute, name)
    }
}

/// A group bound to a page
#[derive(Debug)]
pub struct GroupAccessor<'a> {
    page: &'a Page,
    group: &'a ElementGroup,
}

impl<'a> GroupAccessor<'a> {
    pub(crate) const fn new(page: &'a Page, group: &'a ElementGroup) -> Self {
        Self { page, group }
    }

    fn binding_for(&self, name: &str) -> ElementBinding {
        self.page.group_binding(name, || {
            let locator = self.group.locator(self.page, name);
            if self.group.many {
                ElementBinding::many(locator)
            } else {
                ElementBinding::one(locator)
            }
        })
    }

    /// Unresolved binding for `indices`, for use with waits
    pub fn binding<T: Display>(&self, indices: &[T]) -> PagesResult<ElementBinding> {
        let name = self.group.name(indices)?;
        Ok(self.binding_for(&name))
    }

    /// Resolve the member for `indices`, memoized under its concrete name
    pub fn get<T: Display>(&self, indices: &[T]) -> PagesResult<Resolved> {
        let name = self.group.name(indices)?;
        self.binding_for(&name).resolve(self.page, &name)
    }

    /// [`get`](Self::get) restricted to numeric indices
    pub fn get_by_index(&self, indices: &[usize]) -> PagesResult<Resolved> {
        self.get(indices)
    }

    /// Uncached lookup of the member for `indices`
    pub fn get_relative<T: Display>(&self, indices: &[T]) -> PagesResult<Rc<ElementHandle>> {
        let name = self.group.name(indices)?;
        self.page.find_element(&self.group.locator(self.page, &name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};
    use crate::test_support::{opened_page, spec};
    use proptest::prelude::*;

    mod name_tests {
        use super::*;

        #[test]
        fn test_parts_trimmed_and_joined() {
            let group = ElementGroup::new(["row_", "_cell"]).end_part("_edit_");
            assert_eq!(group.name(&[1, 2]).unwrap(), "row_1_cell_2_edit");
        }

        #[test]
        fn test_empty_part_yields_bare_index() {
            let group = ElementGroup::new([""]).end_part("item");
            assert_eq!(group.name(&[3]).unwrap(), "3_item");
        }

        #[test]
        fn test_wrong_arity_is_config_error() {
            let group = ElementGroup::new(["row"]);
            assert!(matches!(group.name(&[1, 2]), Err(PagesError::Config { .. })));
            assert!(matches!(group.name::<usize>(&[]), Err(PagesError::Config { .. })));
        }

        #[test]
        fn test_string_keys() {
            let group = ElementGroup::new(["lang"]);
            assert_eq!(group.name(&["en"]).unwrap(), "lang_en");
        }
    }

    mod accessor_tests {
        use super::*;

        fn page(session: &MockSession) -> Page {
            opened_page(
                session,
                spec()
                    .group("edit", ElementGroup::new(["row"]).end_part("edit"))
                    .group(
                        "tags",
                        ElementGroup::new(["tag"]).many(true).attribute("name"),
                    ),
            )
        }

        #[test]
        fn test_get_resolves_and_memoizes() {
            let session = MockSession::new();
            let value = r#"//*[@data-e2e="row_2_edit"]"#;
            let _ = session.node(value, MockNode::new("button"));
            let page = page(&session);
            let group = page.group("edit").unwrap();
            let first = group.get(&[2]).unwrap();
            let second = group.get_by_index(&[2]).unwrap();
            assert!(Rc::ptr_eq(&first.head().unwrap(), &second.head().unwrap()));
            assert_eq!(session.query_count(value), 1);
            assert!(page.is_cached("row_2_edit"));
        }

        #[test]
        fn test_many_and_custom_attribute() {
            let session = MockSession::new();
            let value = r#"//*[@name="tag_1"]"#;
            session.add(value, MockNode::new("span"));
            session.add(value, MockNode::new("span"));
            let page = page(&session);
            let tags = page.group("tags").unwrap().get(&[1]).unwrap();
            assert_eq!(tags.len(), 2);
        }

        #[test]
        fn test_binding_survives_until_navigation() {
            let session = MockSession::new();
            let page = page(&session);
            let group = page.group("edit").unwrap();
            let binding = group.binding(&[4]).unwrap();
            assert_eq!(binding.locator().value(), r#"//*[@data-e2e="row_4_edit"]"#);
            assert!(!binding.is_many());
            page.open(None, &[]).unwrap();
            assert_eq!(page.group("edit").unwrap().binding(&[4]).unwrap(), binding);
        }

        #[test]
        fn test_get_relative_is_uncached() {
            let session = MockSession::new();
            let value = r#"//*[@data-e2e="row_1_edit"]"#;
            let _ = session.node(value, MockNode::new("button"));
            let page = page(&session);
            let group = page.group("edit").unwrap();
            let handle = group.get_relative(&[1]).unwrap();
            assert_eq!(handle.slot(), None);
            assert!(!page.is_cached("row_1_edit"));
        }

        #[test]
        fn test_unknown_group_slot() {
            let session = MockSession::new();
            let page = page(&session);
            assert!(matches!(page.group("nope"), Err(PagesError::Config { .. })));
        }
    }

    proptest! {
        #[test]
        fn prop_name_has_one_piece_per_part(
            parts in prop::collection::vec("[a-z]{1,6}", 1..4),
            end in proptest::option::of("[a-z]{1,6}"),
        ) {
            let indices: Vec<usize> = (1..=parts.len()).collect();
            let mut group = ElementGroup::new(&parts);
            if let Some(end) = &end {
                group = group.end_part(end);
            }
            let name = group.name(&indices).unwrap();
            let pieces = name.split('_').count();
            prop_assert_eq!(pieces, parts.len() * 2 + usize::from(end.is_some()));
            for (part, index) in parts.iter().zip(&indices) {
                let expected = format!("{part}_{index}");
                prop_assert!(name.contains(&expected));
            }
        }
    }
}
