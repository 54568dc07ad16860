//! Masked text input (`<p-inputmask>`).

use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::element::ElementHandle;
use crate::locator::Locator;
use crate::result::{PagesError, PagesResult};

use super::{ensure_tag, unexpected_tag};

const TAG_NAME: &str = "p-inputmask";
const INPUT_XPATH: &str = "./input";

const DIGITS: &[u8] = b"0123456789";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn pick(rng: &mut impl Rng, alphabet: &[u8]) -> char {
    alphabet.choose(rng).map_or('0', |b| char::from(*b))
}

fn letter(rng: &mut impl Rng, uppercase: Option<bool>) -> char {
    let upper = uppercase.unwrap_or_else(|| rng.gen_bool(0.5));
    pick(rng, if upper { UPPERCASE } else { LOWERCASE })
}

/// Produce a value accepted by `mask`.
///
/// Each digit in the mask becomes a random digit, each letter a random letter,
/// and `*` either. Other characters are literals the widget inserts itself and are
/// skipped. `uppercase` forces the letter case; `None` picks it per character.
pub fn generate_for_mask(mask: &str, uppercase: Option<bool>, rng: &mut impl Rng) -> String {
    mask.chars()
        .filter_map(|c| {
            if c.is_ascii_digit() {
                Some(pick(rng, DIGITS))
            } else if c.is_alphabetic() {
                Some(letter(rng, uppercase))
            } else if c == '*' {
                if rng.gen_bool(0.5) {
                    Some(pick(rng, DIGITS))
                } else {
                    Some(letter(rng, uppercase))
                }
            } else {
                None
            }
        })
        .collect()
}

/// Text input that only accepts values shaped by its `mask` attribute
#[derive(Debug, Clone)]
pub struct InputMask {
    container: Rc<ElementHandle>,
}

impl InputMask {
    /// Wrap a `<p-inputmask>` container
    pub fn new(container: Rc<ElementHandle>) -> PagesResult<Self> {
        ensure_tag(&container, TAG_NAME, unexpected_tag)?;
        Ok(Self { container })
    }

    fn input(&self) -> PagesResult<Rc<ElementHandle>> {
        self.container
            .find_element(&Locator::xpath(INPUT_XPATH))
            .map_err(|e| {
                if e.is_not_found() {
                    PagesError::InputMask {
                        message: format!("{} has no inner input", self.container.locator()),
                    }
                } else {
                    e
                }
            })
    }

    /// Replace the current value with `value`
    pub fn send_keys(&self, value: &str) -> PagesResult<()> {
        let input = self.input()?;
        input.clear()?;
        input.send_keys(value)
    }

    /// Current value of the inner input
    pub fn value(&self) -> PagesResult<Option<String>> {
        self.input()?.value()
    }

    /// The mask pattern
    pub fn mask(&self) -> PagesResult<Option<String>> {
        self.container.attribute("mask")
    }

    /// A random value matching the mask
    pub fn generate_valid_value(&self, uppercase: Option<bool>) -> PagesResult<String> {
        let mask = self.mask()?.ok_or_else(|| PagesError::InputMask {
            message: format!("{} has no mask attribute", self.container.locator()),
        })?;
        Ok(generate_for_mask(&mask, uppercase, &mut rand::thread_rng()))
    }
}
