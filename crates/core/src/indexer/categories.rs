//! Search category selection.
//!
//! Category codes are opaque strings passed through to the indexer. The
//! policy for picking them: explicit caller categories win; otherwise the
//! indexer's configured codes are narrowed to the game-related subset;
//! otherwise (or when nothing survives the narrowing) a hard-coded default
//! game set is used.

use super::Indexer;

/// Default game categories: console (1000 branch) and PC/Games (4050).
pub const DEFAULT_GAME_CATEGORIES: &[&str] = &["1000", "4050"];

/// Heuristic for whether a category code or name looks game related.
pub fn is_game_category(code: &str) -> bool {
    let trimmed = code.trim();
    if trimmed.starts_with("40") || trimmed.starts_with("10") {
        return true;
    }
    let lower = trimmed.to_lowercase();
    lower.contains("game") || lower.contains("pc")
}

/// Resolve the category codes to send for a search against `indexer`.
pub fn resolve_categories(explicit: Option<&[String]>, indexer: &Indexer) -> Vec<String> {
    if let Some(explicit) = explicit {
        if !explicit.is_empty() {
            return explicit.to_vec();
        }
    }

    let configured: Vec<String> = indexer
        .categories
        .iter()
        .filter(|c| is_game_category(c))
        .cloned()
        .collect();

    if !configured.is_empty() {
        return configured;
    }

    DEFAULT_GAME_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .collect()
}
