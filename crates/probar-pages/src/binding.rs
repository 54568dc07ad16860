//! Declared element bindings and their per-page memoization.
//!
//! A binding is declared once on a [`crate::page::PageSpec`] under a slot name.
//! The first resolution queries the session and memoizes the result in the page's
//! cache; later resolutions in the same navigation epoch return the memoized
//! handle unless it went stale.

use std::rc::Rc;

use crate::element::ElementHandle;
use crate::locator::{Locator, Strategy};
use crate::page::{Cached, Page};
use crate::result::{PagesError, PagesResult};

/// How many elements a binding resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// Exactly the first match
    #[default]
    One,
    /// All matches, at least one
    Many,
}

/// A lazily resolved element declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBinding {
    locator: Locator,
    cardinality: Cardinality,
}

/// Result of resolving a binding
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Single element
    One(Rc<ElementHandle>),
    /// Ordered, non-empty list of elements
    Many(Vec<Rc<ElementHandle>>),
}

impl Resolved {
    /// The single element, or the first of many; `None` for an empty list
    #[must_use]
    pub fn first(&self) -> Option<&Rc<ElementHandle>> {
        match self {
            Self::One(handle) => Some(handle),
            Self::Many(handles) => handles.first(),
        }
    }

    /// Like [`first`](Self::first), reporting an empty list as a miss
    pub fn head(&self) -> PagesResult<Rc<ElementHandle>> {
        self.first().cloned().ok_or_else(|| PagesError::ElementNotFound {
            locator: "<empty element list>".to_string(),
        })
    }

    /// All elements as a list
    #[must_use]
    pub fn into_vec(self) -> Vec<Rc<ElementHandle>> {
        match self {
            Self::One(handle) => vec![handle],
            Self::Many(handles) => handles,
        }
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(handles) => handles.len(),
        }
    }

    /// Whether there are no elements; resolution itself never yields an empty list
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_cache(cached: Cached) -> Option<Self> {
        match cached {
            Cached::One(handle) => Some(Self::One(handle)),
            Cached::Many(handles) => Some(Self::Many(handles)),
            Cached::Table(_) => None,
        }
    }

    fn is_stale(&self) -> bool {
        self.first().map_or(true, |handle| handle.is_stale())
    }
}

impl ElementBinding {
    /// Build a binding from optional locator parts; see [`Locator::new`]
    pub fn new(strategy: Option<Strategy>, value: Option<&str>, many: bool) -> PagesResult<Self> {
        Ok(Self {
            locator: Locator::new(strategy, value)?,
            cardinality: if many {
                Cardinality::Many
            } else {
                Cardinality::One
            },
        })
    }

    /// Binding to the first match of `locator`
    #[must_use]
    pub const fn one(locator: Locator) -> Self {
        Self {
            locator,
            cardinality: Cardinality::One,
        }
    }

    /// Binding to all matches of `locator`
    #[must_use]
    pub const fn many(locator: Locator) -> Self {
        Self {
            locator,
            cardinality: Cardinality::Many,
        }
    }

    /// The locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The cardinality
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Whether the binding resolves to a list
    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many)
    }

    /// Resolve under `slot` on `page`, using the page cache
    pub fn resolve(&self, page: &Page, slot: &str) -> PagesResult<Resolved> {
        page.check_opened()?;

        if let Some(hit) = page.cache_get(slot).and_then(Resolved::from_cache) {
            if !hit.is_stale() {
                tracing::trace!(slot, "binding cache hit");
                return Ok(hit);
            }
            tracing::debug!(slot, "memoized element went stale, querying again");
        } else {
            tracing::trace!(slot, "binding cache miss");
        }

        let resolved = self.query(page, Some(slot))?;
        page.cache_put(
            slot,
            match &resolved {
                Resolved::One(handle) => Cached::One(Rc::clone(handle)),
                Resolved::Many(handles) => Cached::Many(handles.clone()),
            },
        );
        Ok(resolved)
    }

    /// Query the session without touching the cache
    pub(crate) fn query(&self, page: &Page, slot: Option<&str>) -> PagesResult<Resolved> {
        let session = page.session();
        let context = slot.unwrap_or(crate::element::ANONYMOUS_CONTEXT);
        let slot_name = || slot.map(str::to_string);
        match self.cardinality {
            Cardinality::One => {
                let raw = session
                    .find_element(&self.locator)
                    .map_err(|e| PagesError::from_driver(e, context, "find_element"))?;
                Ok(Resolved::One(ElementHandle::new(
                    raw,
                    self.locator.clone(),
                    slot_name(),
                    slot.is_some(),
                    page.downgrade(),
                )))
            }
            Cardinality::Many => {
                let found = session
                    .find_elements(&self.locator)
                    .map_err(|e| PagesError::from_driver(e, context, "find_elements"))?;
                if found.is_empty() {
                    return Err(PagesError::ElementNotFound {
                        locator: self.locator.to_string(),
                    });
                }
                let handles = found
                    .into_iter()
                    .enumerate()
                    .map(|(position, raw)| {
                        ElementHandle::nth(
                            raw,
                            self.locator.clone(),
                            slot_name(),
                            position,
                            page.downgrade(),
                        )
                    })
                    .collect();
                Ok(Resolved::Many(handles))
            }
        }
    }
}
