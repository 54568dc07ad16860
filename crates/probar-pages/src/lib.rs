//! Probar Pages: page objects for browser end-to-end tests
//!
//! A page is declared once as a [`PageSpec`]: its URL, the elements it exposes
//! under named slots, its data tables, and families of indexed elements. A [`Page`]
//! binds that declaration to a browser [`Session`] and resolves slots lazily, caching
//! every resolution until the next navigation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ PageSpec     │──►│ Page         │──►│ ElementHandle    │──►│ Session     │
//! │ slots, URL   │   │ cache, waits │   │ stale recovery   │   │ (driver)    │
//! └──────────────┘   └──────┬───────┘   └──────────────────┘   └─────────────┘
//!                           │
//!              ┌────────────┼─────────────┐
//!              ▼            ▼             ▼
//!          Table       ElementGroup   components
//! ```
//!
//! The automation client sits behind the [`Session`] and [`RawElement`] traits;
//! [`mock::MockSession`] implements them in memory for tests.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod binding;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod components;
mod config;
mod element;
mod group;
pub mod logging;
mod locator;
pub mod mock;
#[allow(clippy::missing_errors_doc)]
mod page;
mod result;
mod session;
#[allow(clippy::missing_errors_doc)]
pub mod table;
pub mod urls;
mod wait;

pub use binding::{Cardinality, ElementBinding, Resolved};
pub use config::{AppConfig, PageConfig, ResolvedPageConfig, Settings};
pub use element::{ElementHandle, ANONYMOUS_CONTEXT};
pub use group::{ElementGroup, GroupAccessor};
pub use locator::{xpath_from_parent, Locator, Strategy};
pub use page::{NavigationSpec, Page, PageObject, PageSpec, ScrollPosition, PAGE_READY_SCRIPT};
pub use result::{PagesError, PagesResult};
pub use session::{
    Cookie, DriverError, DriverResult, RawElement, ScriptArg, Session, SessionProvider,
};
pub use table::{BoundColumn, Column, ColumnSearch, NestedTables, Table, TableSpec};
pub use wait::{
    wait_until, WaitOptions, WaitResult, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS, ELEMENT_POLL_INTERVAL_MS,
};

/// Everything a page-object module usually needs
pub mod prelude {
    pub use super::components::*;
    pub use super::{
        AppConfig, BoundColumn, Column, ElementBinding, ElementGroup, ElementHandle, Locator,
        NavigationSpec, NestedTables, Page, PageObject, PageSpec, PagesError, PagesResult,
        Resolved, Session, SessionProvider, Settings, Strategy, TableSpec,
    };
}
