//! Table markup parsers: header index, row values and cell values.

use std::collections::{HashMap, HashSet};

use super::markup::{parse_element, parse_fragments, Child, Element};
use crate::result::{PagesError, PagesResult};

/// Tag of a column header cell
pub const HEAD_COLUMN_TAG: &str = "th";

/// Lookup key under which visible header text is indexed
pub const TEXT_KEY: &str = "text";

/// Normalize header text: trim and drop line breaks
#[must_use]
pub fn format_tag_text(text: Option<&str>) -> String {
    text.unwrap_or_default().trim().replace('\n', "")
}

/// Column positions by lookup key and lookup value.
///
/// `index["text"]["Name"] == 2` means the column whose header reads "Name" is the
/// second real column. Positions are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    text_key: String,
    map: HashMap<String, HashMap<String, usize>>,
}

impl HeaderIndex {
    /// Position of the column with `value` under `key`
    #[must_use]
    pub fn get(&self, key: &str, value: &str) -> Option<usize> {
        self.map.get(key).and_then(|values| values.get(value)).copied()
    }

    /// Position of the column whose visible text is `text`
    #[must_use]
    pub fn by_text(&self, text: &str) -> Option<usize> {
        self.get(&self.text_key, text)
    }

    /// All values indexed under `key`
    #[must_use]
    pub fn values(&self, key: &str) -> Option<&HashMap<String, usize>> {
        self.map.get(key)
    }

    /// Number of genuine (non-group) columns
    #[must_use]
    pub fn real_column_count(&self) -> usize {
        self.map.get(&self.text_key).map_or(0, HashMap::len)
    }

    /// Lookup keys present in the index
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

fn collect_rows(children: Vec<Child>) -> Vec<Element> {
    let mut rows = Vec::new();
    for child in children {
        let Child::Element(element) = child else {
            continue;
        };
        match element.tag.as_str() {
            "tr" => rows.push(element),
            // some headers wrap their rows in one extra container
            "div" => rows.extend(
                element
                    .children
                    .into_iter()
                    .filter_map(|c| match c {
                        Child::Element(e) if e.tag == "tr" => Some(e),
                        _ => None,
                    }),
            ),
            _ => {}
        }
    }
    rows
}

fn is_group_label(cell: &Element) -> PagesResult<bool> {
    let Some(span) = cell.attribute("colspan") else {
        return Ok(false);
    };
    let span: u32 = span.trim().parse().map_err(|_| {
        PagesError::markup(format!("Invalid colspan={span:?} in header of table"))
    })?;
    Ok(span > 1)
}

/// Build the column index from the inner markup of a `thead`.
///
/// Cells spanning more than one column are group labels and take no position.
/// Duplicate header text is an error since lookups would be ambiguous.
pub fn parse_table_thead(
    markup: &str,
    text_key: &str,
    tracked_attributes: &HashSet<String>,
) -> PagesResult<HeaderIndex> {
    let rows = collect_rows(parse_fragments(markup));
    if rows.is_empty() {
        return Err(PagesError::markup("Table format could be changed: no header rows"));
    }

    let mut index = HeaderIndex {
        text_key: text_key.to_string(),
        map: HashMap::new(),
    };
    let mut position = 1;
    for row in &rows {
        for cell in row.elements() {
            if cell.tag != HEAD_COLUMN_TAG || is_group_label(cell)? {
                continue;
            }
            let key = format_tag_text(cell.text().as_deref());
            let texts = index.map.entry(text_key.to_string()).or_default();
            if texts.contains_key(&key) {
                return Err(PagesError::markup(format!(
                    "Duplicate value={key} of th.text in header of table"
                )));
            }
            let _ = texts.insert(key, position);
            for (name, value) in &cell.attributes {
                if !value.is_empty() && tracked_attributes.contains(name) {
                    let _ = index
                        .map
                        .entry(name.clone())
                        .or_default()
                        .insert(value.clone(), position);
                }
            }
            position += 1;
        }
    }
    Ok(index)
}

fn cell_value(cell: &Element) -> Option<String> {
    cell.text().map(|text| text.trim().to_string())
}

/// Visible values of a `tr`, one per cell
pub fn parse_table_row(markup: &str) -> PagesResult<Vec<Option<String>>> {
    let row = parse_element(markup)?;
    if row.tag != "tr" {
        return Err(PagesError::UnexpectedTag {
            message: format!("It parses only tr tag content, got <{}>", row.tag),
        });
    }
    Ok(row.elements().map(cell_value).collect())
}

/// Visible value of a `td`
pub fn parse_table_cell(markup: &str) -> PagesResult<Option<String>> {
    let cell = parse_element(markup)?;
    if cell.tag != "td" {
        return Err(PagesError::UnexpectedTag {
            message: format!("It parses only td tag content, got <{}>", cell.tag),
        });
    }
    Ok(cell_value(&cell))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEADER: &str = r#"
<tr>
    <th psortablecolumn="id"> #
        <p-sorticon _ngcontent-wlu-c2="" ng-reflect-field="id"><i class="ui-sortable-column-icon"></i>
        </p-sorticon>
    </th>
    <th psortablecolumn="name" ng-reflect-field="name">
        Name
    </th>
    <th _ngcontent-wlu-c2=""> Flag (push_disabled)</th>
</tr>
"#;

    const ROW: &str = r#"
<tr>
    <td _ngcontent-wyw-c2=""> 2</td>
    <td _ngcontent-wyw-c2=""> test Campaign</td>
    <td _ngcontent-wyw-c2=""><label><input type="checkbox"><span _ngcontent-wyw-c2="" class="switch-slider"
                                           data-e2e="enable_camp_2"></span></label>
    </td>
</tr>
"#;

    fn tracked() -> HashSet<String> {
        ["ng-reflect-field", "psortablecolumn"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    mod header_tests {
        use super::*;

        #[test]
        fn test_sortable_header() {
            let index = parse_table_thead(HEADER, TEXT_KEY, &tracked()).unwrap();
            assert_eq!(index.by_text("#"), Some(1));
            assert_eq!(index.by_text("Name"), Some(2));
            assert_eq!(index.by_text("Flag (push_disabled)"), Some(3));
            assert_eq!(index.get("psortablecolumn", "id"), Some(1));
            assert_eq!(index.get("psortablecolumn", "name"), Some(2));
            assert_eq!(index.get("ng-reflect-field", "name"), Some(2));
            assert_eq!(index.values("ng-reflect-field").map(HashMap::len), Some(1));
            assert_eq!(index.real_column_count(), 3);
        }

        #[test]
        fn test_untracked_attributes_ignored() {
            let index = parse_table_thead(HEADER, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.keys().collect::<Vec<_>>(), vec![TEXT_KEY]);
        }

        #[test]
        fn test_group_labels_take_no_position() {
            let markup = r#"
                <tr><th colspan="2">Customer</th><th rowspan="2">Total</th></tr>
                <tr><th>First</th><th>Last</th></tr>"#;
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text("Customer"), None);
            assert_eq!(index.by_text("Total"), Some(1));
            assert_eq!(index.by_text("First"), Some(2));
            assert_eq!(index.by_text("Last"), Some(3));
            assert_eq!(index.real_column_count(), 3);
        }

        #[test]
        fn test_group_only_row_is_noop() {
            let markup = r#"<tr><th colspan="3">All</th></tr><tr><th>A</th></tr>"#;
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text("A"), Some(1));
            assert_eq!(index.real_column_count(), 1);
        }

        #[test]
        fn test_div_wrapper_flattened() {
            let markup = "<div><tr><th>A</th><th>B</th></tr></div>";
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text("B"), Some(2));
        }

        #[test]
        fn test_duplicate_text_is_error() {
            let markup = "<tr><th> A </th><th>A</th></tr>";
            assert!(matches!(
                parse_table_thead(markup, TEXT_KEY, &HashSet::new()),
                Err(PagesError::Markup { .. })
            ));
        }

        #[test]
        fn test_no_rows_is_error() {
            assert!(parse_table_thead("<th>A</th>", TEXT_KEY, &HashSet::new()).is_err());
        }

        #[test]
        fn test_non_th_cells_skipped() {
            let markup = "<tr><td>x</td><th>A</th></tr>";
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text("A"), Some(1));
        }

        #[test]
        fn test_non_numeric_colspan_is_error() {
            let markup = r#"<tr><th colspan="wide">All</th><th>A</th></tr>"#;
            let err = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap_err();
            assert!(matches!(err, PagesError::Markup { .. }));
            assert!(err.to_string().contains("wide"));
        }

        #[test]
        fn test_colspan_one_is_a_column() {
            let markup = r#"<tr><th colspan=" 1 ">A</th><th>B</th></tr>"#;
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text("A"), Some(1));
            assert_eq!(index.by_text("B"), Some(2));
        }

        #[test]
        fn test_text_behind_comment_indexes_as_empty() {
            let markup = "<tr><th><!---->Name</th><th>Total</th></tr>";
            let index = parse_table_thead(markup, TEXT_KEY, &HashSet::new()).unwrap();
            assert_eq!(index.by_text(""), Some(1));
            assert_eq!(index.by_text("Name"), None);
            assert_eq!(index.by_text("Total"), Some(2));
        }
    }

    mod row_tests {
        use super::*;

        #[test]
        fn test_row_values() {
            let values = parse_table_row(ROW).unwrap();
            assert_eq!(
                values,
                vec![Some("2".to_string()), Some("test Campaign".to_string()), None]
            );
        }

        #[test]
        fn test_row_requires_tr() {
            assert!(matches!(
                parse_table_row("<td>1</td>"),
                Err(PagesError::UnexpectedTag { .. })
            ));
        }

        #[test]
        fn test_cell_value() {
            assert_eq!(parse_table_cell("<td>  7 </td>").unwrap(), Some("7".to_string()));
            assert_eq!(parse_table_cell("<td><b>7</b></td>").unwrap(), None);
            assert_eq!(parse_table_cell("<td> </td>").unwrap(), Some(String::new()));
            assert!(parse_table_cell("<th>7</th>").is_err());
        }
    }

    fn header_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(("[A-Za-z][A-Za-z ]{0,8}", 1u32..4), 1..6).prop_map(|cells| {
            let mut seen = HashSet::new();
            let mut markup = String::from("<tr>");
            for (i, (text, span)) in cells.into_iter().enumerate() {
                let text = format!("{}{i}", text.trim());
                if !seen.insert(text.clone()) {
                    continue;
                }
                markup.push_str(&format!(r#"<th colspan="{span}" data-col="c{i}">{text}</th>"#));
            }
            markup.push_str("</tr>");
            markup
        })
    }

    proptest! {
        #[test]
        fn prop_header_parse_is_idempotent(markup in header_strategy()) {
            let attrs: HashSet<String> = ["data-col".to_string()].into_iter().collect();
            let first = parse_table_thead(&markup, TEXT_KEY, &attrs).unwrap();
            let second = parse_table_thead(&markup, TEXT_KEY, &attrs).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_group_cells_never_indexed(markup in header_strategy()) {
            let index = parse_table_thead(&markup, TEXT_KEY, &HashSet::new()).unwrap();
            let row = parse_element(&markup).unwrap();
            let mut expected = 1;
            for cell in row.elements() {
                let text = format_tag_text(cell.text().as_deref());
                if cell.attribute("colspan") == Some("1") {
                    prop_assert_eq!(index.by_text(&text), Some(expected));
                    expected += 1;
                } else {
                    prop_assert_eq!(index.by_text(&text), None);
                }
            }
            prop_assert_eq!(index.real_column_count(), expected - 1);
        }
    }
}
