//! # Button LED colors.
//!
//! The cabinet has 12 lit buttons, two players with six buttons each
//! (`P1A`..`P1F`, `P2A`..`P2F`). Color data comes in three shapes:
//!
//! ```text
//! "FF0000;0F0;..."                    up to 12 colors, in button order
//! ["FF0000", "0F0"]                   same, as a list
//! { "ALL": "000", "P1A": "FFF" }      ALL sets the base, P[12][A-F] single buttons
//! ```
//!
//! Colors are `RRGGBB` or `RGB` hex. Invalid entries are skipped with a warning;
//! buttons without a new value keep their current color.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Deserialize;
use tracing::{debug, info, warn};

/// Number of lit buttons.
pub const BUTTON_COUNT: usize = 12;

const BLACK: &str = "000000";
const BUTTON_LETTERS: &str = "ABCDEF";

/// Colors for all buttons, as uppercase `RRGGBB`.
pub type ButtonColors = [String; BUTTON_COUNT];

/// Color data as found in config files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColorData {
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl ColorData {
    /// All buttons black.
    pub fn black() -> Self {
        ColorData::Map(BTreeMap::from([("ALL".to_string(), BLACK.to_string())]))
    }
}

/// Current LED state of the cabinet buttons.
#[derive(Debug)]
pub struct ButtonController {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    current: ButtonColors,
    clear_queued: bool,
}

impl ButtonController {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: all(BLACK),
                clear_queued: false,
            }),
        }
    }

    /// Applies `data` on top of the current colors (or on black after
    /// [`queue_clear`](Self::queue_clear)) and returns the result.
    pub fn change_colors(&self, data: &ColorData) -> ButtonColors {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let base = if std::mem::take(&mut inner.clear_queued) {
            all(BLACK)
        } else {
            inner.current.clone()
        };
        inner.current = merge(base, data);
        info!(colors = %inner.current.join(";"), "button colors applied");
        inner.current.clone()
    }

    /// Sets every button to black now.
    pub fn clear(&self) -> ButtonColors {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.clear_queued = false;
        inner.current = all(BLACK);
        info!("button colors cleared");
        inner.current.clone()
    }

    /// Makes the next [`change_colors`](Self::change_colors) start from black.
    pub fn queue_clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.clear_queued = true;
    }

    pub fn current(&self) -> ButtonColors {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .current
            .clone()
    }
}

impl Default for ButtonController {
    fn default() -> Self {
        Self::new()
    }
}

fn all(color: &str) -> ButtonColors {
    std::array::from_fn(|_| color.to_string())
}

fn merge(mut colors: ButtonColors, data: &ColorData) -> ButtonColors {
    match data {
        ColorData::Text(text) => merge_list(&mut colors, text.split(';')),
        ColorData::List(list) => merge_list(&mut colors, list.iter().map(String::as_str)),
        ColorData::Map(map) => {
            if let Some(base) = map.get("ALL") {
                match hex_color(base) {
                    Some(c) => colors = all(&c),
                    None => warn!(value = %base, "invalid ALL color ignored"),
                }
            }
            for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "ALL") {
                let Some(pos) = button_index(key) else {
                    warn!(key = %key, "not a button name (P[12][A-F]); ignored");
                    continue;
                };
                match hex_color(value) {
                    Some(c) => colors[pos] = c,
                    None => warn!(key = %key, value = %value, "invalid color ignored"),
                }
            }
        }
    }
    colors
}

fn merge_list<'a>(colors: &mut ButtonColors, values: impl Iterator<Item = &'a str>) {
    for (i, value) in values.take(BUTTON_COUNT).enumerate() {
        match hex_color(value) {
            Some(c) => colors[i] = c,
            None => debug!(index = i, value, "invalid color ignored"),
        }
    }
}

/// `P1A` → 0 ... `P2F` → 11.
fn button_index(key: &str) -> Option<usize> {
    let mut chars = key.chars();
    if chars.next()? != 'P' {
        return None;
    }
    let player = match chars.next()? {
        '1' => 0,
        '2' => 1,
        _ => return None,
    };
    let button = BUTTON_LETTERS.find(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(6 * player + button)
}

/// Normalises `RRGGBB` / `RGB` hex (any case) to uppercase `RRGGBB`.
fn hex_color(value: &str) -> Option<String> {
    let value = value.trim();
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let upper = value.to_ascii_uppercase();
    match upper.len() {
        6 => Some(upper),
        3 => Some(upper.chars().flat_map(|c| [c, c]).collect()),
        _ => None,
    }
}
