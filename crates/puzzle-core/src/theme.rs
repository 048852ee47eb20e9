//! Tactical theme catalog.

use std::collections::HashMap;
use std::fmt;

use crate::error::{PuzzleError, PuzzleResult};

/// Theme tags used by the Lichess puzzle export.
pub const LICHESS_THEMES: &[&str] = &[
    "advancedPawn",
    "advantage",
    "anastasiaMate",
    "arabianMate",
    "attackingF2F7",
    "attraction",
    "backRankMate",
    "balestraMate",
    "bishopEndgame",
    "blindSwineMate",
    "bodenMate",
    "capturingDefender",
    "castling",
    "clearance",
    "cornerMate",
    "crushing",
    "defensiveMove",
    "deflection",
    "discoveredAttack",
    "discoveredCheck",
    "doubleBishopMate",
    "doubleCheck",
    "dovetailMate",
    "enPassant",
    "endgame",
    "epauletteMate",
    "equality",
    "exposedKing",
    "fork",
    "hangingPiece",
    "hookMate",
    "interference",
    "intermezzo",
    "killBoxMate",
    "kingsideAttack",
    "knightEndgame",
    "long",
    "master",
    "masterVsMaster",
    "mate",
    "mateIn1",
    "mateIn2",
    "mateIn3",
    "mateIn4",
    "mateIn5",
    "middlegame",
    "morphysMate",
    "oneMove",
    "opening",
    "operaMate",
    "pawnEndgame",
    "pillsburysMate",
    "pin",
    "promotion",
    "queenEndgame",
    "queenRookEndgame",
    "queensideAttack",
    "quietMove",
    "rookEndgame",
    "sacrifice",
    "short",
    "skewer",
    "smotheredMate",
    "superGM",
    "swallowstailMate",
    "trappedPiece",
    "triangleMate",
    "underPromotion",
    "veryLong",
    "vukovicMate",
    "xRayAttack",
    "zugzwang",
];

/// A recognised theme, always in its canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Theme(String);

impl Theme {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-insensitive lookup from tag to canonical theme.
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    by_key: HashMap<String, Theme>,
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self::lichess()
    }
}

impl ThemeCatalog {
    /// The Lichess theme list.
    pub fn lichess() -> Self {
        let mut by_key = HashMap::with_capacity(LICHESS_THEMES.len());
        for name in LICHESS_THEMES {
            by_key.insert(name.to_ascii_lowercase(), Theme((*name).to_owned()));
        }
        Self { by_key }
    }

    /// Lichess themes plus `extra`. Extra names become file names, so they are
    /// limited to ASCII alphanumerics, `_` and `-`.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> PuzzleResult<Self> {
        let mut catalog = Self::lichess();
        for name in extra {
            let name = name.as_ref().trim();
            if !is_valid_theme_name(name) {
                return Err(PuzzleError::Config(format!("invalid theme name: {name:?}")));
            }
            catalog
                .by_key
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| Theme(name.to_owned()));
        }
        Ok(catalog)
    }

    /// Resolves a tag; `None` means the tag is not recognised.
    pub fn resolve(&self, tag: &str) -> Option<&Theme> {
        self.by_key.get(&tag.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

fn is_valid_theme_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively_to_canonical_name() {
        let c = ThemeCatalog::lichess();
        assert_eq!(c.resolve("fork").map(Theme::as_str), Some("fork"));
        assert_eq!(c.resolve("BACKRANKMATE").map(Theme::as_str), Some("backRankMate"));
        assert!(c.resolve("notATheme").is_none());
    }

    #[test]
    fn catalog_has_no_duplicate_keys() {
        assert_eq!(ThemeCatalog::lichess().len(), LICHESS_THEMES.len());
    }

    #[test]
    fn extra_themes_are_added() {
        let c = ThemeCatalog::with_extra(&["greekGift"]).unwrap();
        assert_eq!(c.resolve("greekgift").map(Theme::as_str), Some("greekGift"));
        assert_eq!(c.len(), LICHESS_THEMES.len() + 1);
    }

    #[test]
    fn extra_theme_with_path_separator_is_rejected() {
        assert!(ThemeCatalog::with_extra(&["../evil"]).is_err());
        assert!(ThemeCatalog::with_extra(&[""]).is_err());
    }
}
