//! Typed access to the preference keys the board UI stores.

use serde_json::Value;
use shared::store::{Result, SettingsStore, StoreError};

pub mod keys {
    pub const BACKGROUND_COLOR: &str = "backgroundColor";
    pub const BACKGROUND_IMAGE: &str = "backgroundImage";
    pub const WEEKLY_GOAL: &str = "weeklyGoal";
}

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffa500";

/// Named background colors offered by the picker.
pub const PALETTE: [(&str, &str); 5] = [
    ("blue", "#4285f4"),
    ("green", "#34a853"),
    ("pink", "#ff69b4"),
    ("orange", "#ffa500"),
    ("brown", "#8b4513"),
];

pub fn palette_name(color: &str) -> Option<&'static str> {
    PALETTE
        .iter()
        .find(|(_, hex)| hex.eq_ignore_ascii_case(color))
        .map(|(name, _)| *name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Image data URL; takes priority over any saved color.
    Image(String),
    Color(String),
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Resolves the saved background, storing the default color when nothing is set.
pub async fn load_background<S: SettingsStore + ?Sized>(store: &S) -> Result<Background> {
    if let Some(image) = non_empty_string(store.get(keys::BACKGROUND_IMAGE).await?) {
        return Ok(Background::Image(image));
    }
    if let Some(color) = non_empty_string(store.get(keys::BACKGROUND_COLOR).await?) {
        return Ok(Background::Color(color));
    }
    store
        .set(keys::BACKGROUND_COLOR, Value::from(DEFAULT_BACKGROUND_COLOR))
        .await?;
    Ok(Background::Color(DEFAULT_BACKGROUND_COLOR.to_string()))
}

pub async fn set_background_color<S: SettingsStore + ?Sized>(store: &S, color: &str) -> Result<()> {
    store.set(keys::BACKGROUND_COLOR, Value::from(color)).await
}

/// Saves the image and drops the color preference it replaces.
pub async fn set_background_image<S: SettingsStore + ?Sized>(
    store: &S,
    data_url: &str,
) -> Result<()> {
    store.set(keys::BACKGROUND_IMAGE, Value::from(data_url)).await?;
    store.remove(keys::BACKGROUND_COLOR).await
}

/// Drops the image and restores the default color.
pub async fn clear_background_image<S: SettingsStore + ?Sized>(store: &S) -> Result<()> {
    store.remove(keys::BACKGROUND_IMAGE).await?;
    set_background_color(store, DEFAULT_BACKGROUND_COLOR).await
}

/// Accepts a non-negative integer stored either as a number or as numeric text.
pub fn parse_goal(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn weekly_goal<S: SettingsStore + ?Sized>(store: &S) -> Result<Option<u32>> {
    Ok(store
        .get(keys::WEEKLY_GOAL)
        .await?
        .as_ref()
        .and_then(parse_goal))
}

pub async fn set_weekly_goal<S: SettingsStore + ?Sized>(store: &S, goal: i64) -> Result<u32> {
    let goal = u32::try_from(goal).map_err(|_| {
        StoreError::Validation(format!("weekly goal must be between 0 and {}", u32::MAX))
    })?;
    store.set(keys::WEEKLY_GOAL, Value::from(goal)).await?;
    Ok(goal)
}
