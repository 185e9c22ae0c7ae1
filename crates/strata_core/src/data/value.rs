//! Property value parsing helpers.
//!
//! Every helper reports malformed input as [`GameError::Configuration`], which
//! the population pass logs and skips.

use crate::error::{GameError, Result};
use crate::math::Vec2i;

/// Parse `true`/`false` (also `yes`/`no`).
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        other => Err(GameError::configuration(format!(
            "Invalid boolean for \"{key}\": \"{other}\""
        ))),
    }
}

/// Parse a signed integer.
pub fn parse_int(key: &str, value: &str) -> Result<i32> {
    value.trim().parse::<i32>().map_err(|_| {
        GameError::configuration(format!("Invalid integer for \"{key}\": \"{value}\""))
    })
}

/// Parse a `"<width> <height>"` pair.
pub fn parse_size(key: &str, value: &str) -> Result<Vec2i> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [w, h] => Ok(Vec2i::new(parse_int(key, w)?, parse_int(key, h)?)),
        _ => Err(GameError::configuration(format!(
            "Invalid size for \"{key}\": expected \"<width> <height>\", got \"{value}\""
        ))),
    }
}

/// Parse a `"<r> <g> <b>"` colour with components in 0..=255.
pub fn parse_color(key: &str, value: &str) -> Result<[u8; 3]> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(GameError::configuration(format!(
            "Invalid color for \"{key}\": expected \"<r> <g> <b>\", got \"{value}\""
        )));
    };
    let component = |s: &str| {
        s.parse::<u8>().map_err(|_| {
            GameError::configuration(format!("Invalid color component for \"{key}\": \"{s}\""))
        })
    };
    Ok([component(r)?, component(g)?, component(b)?])
}

/// Split a whitespace-separated identifier list.
#[must_use]
pub fn parse_identifier_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
