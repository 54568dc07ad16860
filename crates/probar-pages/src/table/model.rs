use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::parsers::{
    parse_table_cell, parse_table_row, parse_table_thead, HeaderIndex, HEAD_COLUMN_TAG, TEXT_KEY,
};
use crate::config::Settings;
use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::{PagesError, PagesResult};

const XPATH_BODY: &str = "//tbody";
const XPATH_HEADER: &str = "//thead";
const XPATH_ROWS: &str = "//tr";
const XPATH_CELLS: &str = "/td";

fn xpath_row(index: usize) -> String {
    format!("{XPATH_ROWS}[{index}]")
}

fn xpath_column(index: usize) -> String {
    format!("{XPATH_ROWS}{XPATH_CELLS}[{index}]")
}

fn xpath_cell(row: usize, column: usize) -> String {
    format!("{}{XPATH_CELLS}[{column}]", xpath_row(row))
}

fn xpath_cells_containing(column: usize, text: &str) -> String {
    format!(r#"{XPATH_ROWS}{XPATH_CELLS}[contains(string(),"{text}") and position()={column}]"#)
}

fn xpath_body_row(index: usize) -> String {
    format!("{XPATH_BODY}{}", xpath_row(index))
}

fn xpath_header_row(index: usize) -> String {
    format!("{XPATH_HEADER}{}", xpath_row(index))
}

// =============================================================================
// COLUMNS
// =============================================================================

/// How a column is identified in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSearch {
    /// By the header's visible text
    VisibleName,
    /// By a header attribute; takes priority over the visible text
    Attribute {
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
}

/// Stateless descriptor of a table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    visible_name: String,
    search: ColumnSearch,
}

impl Column {
    /// Column found by its visible header text
    #[must_use]
    pub fn new(visible_name: impl Into<String>) -> Self {
        Self {
            visible_name: visible_name.into(),
            search: ColumnSearch::VisibleName,
        }
    }

    /// Column found by a header attribute, for headers whose text is not unique
    pub fn by_attribute(
        visible_name: impl Into<String>,
        name: &str,
        value: &str,
    ) -> PagesResult<Self> {
        if name.is_empty() || value.is_empty() {
            return Err(PagesError::table(
                "attribute name and value must both be set to search a column by attribute",
            ));
        }
        Ok(Self {
            visible_name: visible_name.into(),
            search: ColumnSearch::Attribute {
                name: name.to_string(),
                value: value.to_string(),
            },
        })
    }

    /// Visible header text
    #[must_use]
    pub fn visible_name(&self) -> &str {
        &self.visible_name
    }

    /// Search mode
    #[must_use]
    pub const fn search(&self) -> &ColumnSearch {
        &self.search
    }

    /// Xpath of the header cell, relative to the table root
    #[must_use]
    pub fn relative_xpath(&self) -> String {
        match &self.search {
            ColumnSearch::VisibleName => {
                format!(r#"//{HEAD_COLUMN_TAG}[contains(text(),"{}")]"#, self.visible_name)
            }
            ColumnSearch::Attribute { name, value } => {
                format!(r#"//{HEAD_COLUMN_TAG}[@{name}="{value}"]"#)
            }
        }
    }

    fn tracked_attribute(&self) -> Option<&str> {
        match &self.search {
            ColumnSearch::VisibleName => None,
            ColumnSearch::Attribute { name, .. } => Some(name),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({})", self.relative_xpath())
    }
}

// =============================================================================
// DECLARATIONS
// =============================================================================

/// Declaration of a table slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSpec {
    search_value: Option<String>,
    search_attribute: Option<String>,
    tag: Option<String>,
    columns: Vec<(String, Column)>,
}

impl TableSpec {
    /// The first table with the default tag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the table attribute identifying the table
    #[must_use]
    pub fn search_value(mut self, value: impl Into<String>) -> Self {
        self.search_value = Some(value.into());
        self
    }

    /// Attribute carrying the search value (defaults to the table attribute)
    #[must_use]
    pub fn search_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.search_attribute = Some(attribute.into());
        self
    }

    /// Tag the table is rendered as (defaults to the configured table tag)
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Declare a named column
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.columns.push((name.into(), column));
        self
    }

    fn locate(&self, tag: &str, settings: &Settings) -> String {
        match self.search_value.as_deref().filter(|v| !v.is_empty()) {
            Some(value) => {
                let attribute = self
                    .search_attribute
                    .as_deref()
                    .unwrap_or(settings.table_e2e_attribute.as_str());
                format!(r#"//{tag}[@{attribute}="{value}"]"#)
            }
            None => format!("//{tag}"),
        }
    }

    /// Absolute xpath of the table root
    #[must_use]
    pub fn root_xpath(&self, settings: &Settings) -> String {
        self.locate(
            self.tag.as_deref().unwrap_or(settings.default_table_tag.as_str()),
            settings,
        )
    }

    fn tracked_attributes(&self) -> HashSet<String> {
        self.columns
            .iter()
            .filter_map(|(_, column)| column.tracked_attribute())
            .map(str::to_string)
            .collect()
    }
}

/// Tables repeated inside the rows of a parent table, told apart by an index
/// suffix on their attribute value (`details_1`, `details_2`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedTables {
    parent: String,
    base_name: String,
    spec: TableSpec,
}

impl NestedTables {
    /// Tables named `{base_name}{index}` inside the rows of table slot `parent`
    #[must_use]
    pub fn new(parent: impl Into<String>, base_name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            base_name: base_name.into(),
            spec: TableSpec::new(),
        }
    }

    /// Tag of the nested tables (defaults to the configured nested table tag)
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec = self.spec.tag(tag);
        self
    }

    /// Attribute carrying the name (defaults to the table attribute)
    #[must_use]
    pub fn search_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.spec = self.spec.search_attribute(attribute);
        self
    }

    /// Declare a named column shared by all nested tables
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.spec = self.spec.column(name, column);
        self
    }

    /// Slot of the parent table
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub(crate) const fn table_spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Xpath of nested table `index`, anchored on the parent row containing it
    #[must_use]
    pub fn root_xpath(&self, parent_root: &str, index: usize, settings: &Settings) -> String {
        let tag = self
            .spec
            .tag
            .as_deref()
            .unwrap_or(settings.nested_table_tag.as_str());
        let attribute = self
            .spec
            .search_attribute
            .as_deref()
            .unwrap_or(settings.table_e2e_attribute.as_str());
        let own = format!(r#"{tag}[@{attribute}="{}{index}"]"#, self.base_name);
        format!("{parent_root}{XPATH_BODY}{XPATH_ROWS}[.//{own}]//{own}")
    }
}

// =============================================================================
// TABLE
// =============================================================================

/// A located table with its parsed header
pub struct Table {
    slot: String,
    root_xpath: String,
    root: Rc<ElementHandle>,
    header: HeaderIndex,
    columns: Vec<(String, Column)>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("slot", &self.slot)
            .field("root_xpath", &self.root_xpath)
            .field("columns", &self.header.real_column_count())
            .finish_non_exhaustive()
    }
}

impl Table {
    pub(crate) fn load(
        page: &Page,
        slot: &str,
        spec: &TableSpec,
        root_xpath: String,
    ) -> PagesResult<Self> {
        let locator = Locator::xpath(root_xpath.clone());
        let raw = page
            .session()
            .find_element(&locator)
            .map_err(|e| PagesError::from_driver(e, slot, "find_table"))?;
        let root = ElementHandle::new(
            raw,
            locator,
            Some(slot.to_string()),
            false,
            page.downgrade(),
        );

        let markup = root
            .find_element(&Locator::xpath(format!(".{XPATH_HEADER}")))?
            .inner_html()?;
        let header = parse_table_thead(&markup, TEXT_KEY, &spec.tracked_attributes())?;
        tracing::debug!(
            slot,
            columns = header.real_column_count(),
            "table header parsed"
        );

        Ok(Self {
            slot: slot.to_string(),
            root_xpath,
            root,
            header,
            columns: spec.columns.clone(),
        })
    }

    /// Slot the table was loaded for
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// The table element
    #[must_use]
    pub const fn root(&self) -> &Rc<ElementHandle> {
        &self.root
    }

    /// Absolute xpath of the table element
    #[must_use]
    pub fn root_xpath(&self) -> &str {
        &self.root_xpath
    }

    /// Parsed header
    #[must_use]
    pub const fn header(&self) -> &HeaderIndex {
        &self.header
    }

    /// Number of genuine columns
    #[must_use]
    pub fn real_column_count(&self) -> usize {
        self.header.real_column_count()
    }

    /// First element at `xpath` below the table root
    pub fn get_item_by_xpath(&self, xpath: &str) -> PagesResult<Rc<ElementHandle>> {
        let full = format!("{}{xpath}", self.root_xpath);
        self.root
            .find_element(&Locator::xpath(full.as_str()))
            .map_err(|e| match e {
                PagesError::ElementNotFound { .. } => PagesError::TableElementNotFound {
                    message: format!("Element not found by xpath value: {full:?}"),
                },
                other => other,
            })
    }

    /// All elements at `xpath` below the table root, possibly none
    pub fn get_items_by_xpath(&self, xpath: &str) -> PagesResult<Vec<Rc<ElementHandle>>> {
        let full = format!("{}{xpath}", self.root_xpath);
        self.root.find_elements(&Locator::xpath(full))
    }

    /// 1-based position of `column`
    pub fn column_index(&self, column: &Column) -> PagesResult<usize> {
        match &column.search {
            ColumnSearch::Attribute { name, value } => {
                self.header
                    .get(name, value)
                    .ok_or_else(|| PagesError::TableColumnNotFound {
                        message: format!("{column} not found in table {}", self.slot),
                    })
            }
            ColumnSearch::VisibleName => self
                .header
                .by_text(&column.visible_name)
                .ok_or_else(|| {
                    PagesError::table(format!(
                        "Cannot find index of {column} in table {}",
                        self.slot
                    ))
                }),
        }
    }

    /// Bind a declared column by name
    pub fn column(&self, name: &str) -> PagesResult<BoundColumn<'_>> {
        self.columns
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, column)| self.bind(column))
            .ok_or_else(|| {
                PagesError::table(format!("Table {} has no column {name:?}", self.slot))
            })
    }

    /// Bind an ad-hoc column
    #[must_use]
    pub const fn bind<'a>(&'a self, column: &'a Column) -> BoundColumn<'a> {
        BoundColumn { table: self, column }
    }

    /// The cell at `row`, `column`
    pub fn cell_element(&self, row: usize, column: usize) -> PagesResult<Rc<ElementHandle>> {
        match self.get_item_by_xpath(&xpath_cell(row, column)) {
            Err(e) if e.is_not_found() => {
                if let Err(row_missing) = self.get_item_by_xpath(&xpath_body_row(row)) {
                    if row_missing.is_not_found() {
                        return Err(PagesError::TableRowNotFound {
                            message: format!(
                                "Row with index {row} not found in table {}",
                                self.slot
                            ),
                        });
                    }
                    return Err(row_missing);
                }
                if column > self.real_column_count() {
                    return Err(PagesError::TableColumnNotFound {
                        message: format!(
                            "Column with index {column} not exists in table {}",
                            self.slot
                        ),
                    });
                }
                Err(e)
            }
            other => other,
        }
    }

    /// Visible value of the cell at `row`, `column`
    pub fn cell(&self, row: usize, column: usize) -> PagesResult<Option<String>> {
        parse_table_cell(&self.cell_element(row, column)?.outer_html()?)
    }

    fn row_values(&self, xpath: &str, row: usize) -> PagesResult<Vec<Option<String>>> {
        let element = self.get_item_by_xpath(xpath).map_err(|e| {
            if e.is_not_found() {
                PagesError::TableRowNotFound {
                    message: format!("Row with index {row} not found in table {}", self.slot),
                }
            } else {
                e
            }
        })?;
        parse_table_row(&element.outer_html()?)
    }

    /// Values of body row `row`
    pub fn row_values_by_index(&self, row: usize) -> PagesResult<Vec<Option<String>>> {
        self.row_values(&xpath_body_row(row), row)
    }

    /// Values of header row `row`
    pub fn header_values(&self, row: usize) -> PagesResult<Vec<Option<String>>> {
        self.row_values(&xpath_header_row(row), row)
    }

    /// Values of column `column` from top to bottom
    pub fn column_values_by_index(&self, column: usize) -> PagesResult<Vec<Option<String>>> {
        if column == 0 || column > self.real_column_count() {
            return Err(PagesError::TableColumnNotFound {
                message: format!("Column with index {column} not exists in table {}", self.slot),
            });
        }
        self.get_items_by_xpath(&xpath_column(column))?
            .iter()
            .map(|cell| parse_table_cell(&cell.outer_html()?))
            .collect()
    }
}

/// A column bound to a loaded table
#[derive(Debug, Clone, Copy)]
pub struct BoundColumn<'a> {
    table: &'a Table,
    column: &'a Column,
}

impl BoundColumn<'_> {
    /// 1-based position, read fresh from the header
    pub fn index(&self) -> PagesResult<usize> {
        self.table.column_index(self.column)
    }

    /// Values from top to bottom
    pub fn values(&self) -> PagesResult<Vec<Option<String>>> {
        self.table.column_values_by_index(self.index()?)
    }

    /// Row position of the first cell whose value equals `value`
    pub fn index_by_value(&self, value: &str) -> PagesResult<usize> {
        self.values()?
            .iter()
            .position(|cell| cell.as_deref() == Some(value))
            .map(|position| position + 1)
            .ok_or_else(|| PagesError::TableElementNotFound {
                message: format!("Cell with value {value:?} doesn't exist in {}", self.column),
            })
    }

    /// Values of the first row whose cell in this column equals `value`
    pub fn row_by_value(&self, value: &str) -> PagesResult<Vec<Option<String>>> {
        self.table.row_values_by_index(self.index_by_value(value)?)
    }

    /// Cells of this column whose text contains `text`
    pub fn cells_containing(&self, text: &str) -> PagesResult<Vec<Rc<ElementHandle>>> {
        self.table
            .get_items_by_xpath(&xpath_cells_containing(self.index()?, text))
    }

    /// Cell of this column in row `row` (1-based)
    pub fn cell(&self, row: usize) -> PagesResult<Rc<ElementHandle>> {
        if row < 1 {
            return Err(PagesError::table("Column item index must be >= 1"));
        }
        self.table.get_item_by_xpath(&xpath_cell(row, self.index()?))
    }

    /// Click the header cell (usually to sort) and wait for the loaders
    pub fn click(&self) -> PagesResult<()> {
        self.table
            .get_item_by_xpath(&self.column.relative_xpath())?
            .click_and_wait()
    }
}
