//! Puzzle records and their CSV / JSON-lines field mapping.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PuzzleError, PuzzleResult};

/// Output column order (Lichess export order).
pub const CSV_HEADER: [&str; 10] = [
    "PuzzleId",
    "FEN",
    "Moves",
    "Rating",
    "RatingDeviation",
    "Popularity",
    "NbPlays",
    "Themes",
    "GameUrl",
    "OpeningTags",
];

/// One puzzle. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleRecord {
    pub id: String,
    pub fen: String,
    /// UCI moves; the first one is the opponent move that sets up the puzzle
    pub moves: Vec<String>,
    pub rating: u32,
    /// Theme tags in source order, duplicates removed
    pub themes: Vec<String>,
    pub popularity: i32,
    pub rating_deviation: Option<u32>,
    pub nb_plays: Option<u32>,
    pub game_url: Option<String>,
    pub opening_tags: Vec<String>,
}

impl PuzzleRecord {
    /// Space-joined theme string, as it appears in the source `Themes` column.
    pub fn themes_field(&self) -> String {
        self.themes.join(" ")
    }

    /// Row values in `CSV_HEADER` order.
    pub fn csv_fields(&self) -> [String; 10] {
        [
            self.id.clone(),
            self.fen.clone(),
            self.moves.join(" "),
            self.rating.to_string(),
            self.rating_deviation.map(|v| v.to_string()).unwrap_or_default(),
            self.popularity.to_string(),
            self.nb_plays.map(|v| v.to_string()).unwrap_or_default(),
            self.themes_field(),
            self.game_url.clone().unwrap_or_default(),
            self.opening_tags.join(" "),
        ]
    }
}

/// Field values before validation, shared by the CSV and JSON-lines readers.
#[derive(Debug, Default)]
pub(crate) struct RawFields {
    pub id: Option<String>,
    pub fen: Option<String>,
    pub moves: Option<Vec<String>>,
    pub rating: Option<String>,
    pub themes: Option<Vec<String>>,
    pub popularity: Option<String>,
    pub rating_deviation: Option<String>,
    pub nb_plays: Option<String>,
    pub game_url: Option<String>,
    pub opening_tags: Option<Vec<String>>,
}

impl RawFields {
    /// Validates the fields; `line` is only used in the error.
    pub fn into_record(self, line: u64) -> PuzzleResult<PuzzleRecord> {
        let id = required_text(self.id, line, "id")?;
        let fen = required_text(self.fen, line, "fen")?;
        if !looks_like_fen(&fen) {
            return Err(PuzzleError::malformed(line, format!("invalid fen: {fen}")));
        }
        let moves = self.moves.unwrap_or_default();
        if moves.is_empty() {
            return Err(PuzzleError::malformed(line, "missing moves"));
        }
        let rating_raw = required_text(self.rating, line, "rating")?;
        let rating = parse_digits(&rating_raw)
            .ok_or_else(|| PuzzleError::malformed(line, format!("invalid rating: {rating_raw}")))?;
        let popularity = match non_empty(self.popularity) {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| PuzzleError::malformed(line, format!("invalid popularity: {raw}")))?,
            None => 0,
        };
        let rating_deviation = optional_u32(self.rating_deviation, line, "rating deviation")?;
        let nb_plays = optional_u32(self.nb_plays, line, "play count")?;

        let mut themes: Vec<String> = Vec::new();
        for t in self.themes.unwrap_or_default() {
            if !themes.contains(&t) {
                themes.push(t);
            }
        }

        Ok(PuzzleRecord {
            id,
            fen,
            moves,
            rating,
            themes,
            popularity,
            rating_deviation,
            nb_plays,
            game_url: non_empty(self.game_url),
            opening_tags: self.opening_tags.unwrap_or_default(),
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn required_text(v: Option<String>, line: u64, name: &str) -> PuzzleResult<String> {
    non_empty(v).ok_or_else(|| PuzzleError::malformed(line, format!("missing {name}")))
}

fn optional_u32(v: Option<String>, line: u64, name: &str) -> PuzzleResult<Option<u32>> {
    match non_empty(v) {
        Some(raw) => parse_digits(&raw)
            .map(Some)
            .ok_or_else(|| PuzzleError::malformed(line, format!("invalid {name}: {raw}"))),
        None => Ok(None),
    }
}

/// Plain decimal digits only; `u32::from_str` would also take a leading `+`.
fn parse_digits(raw: &str) -> Option<u32> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}

/// Cheap shape check: the placement field has 8 ranks.
fn looks_like_fen(fen: &str) -> bool {
    fen.split_whitespace()
        .next()
        .is_some_and(|placement| placement.split('/').count() == 8)
}

fn split_list(s: String) -> Vec<String> {
    s.split_whitespace().map(str::to_owned).collect()
}

/// One CSV row. Accepts both the short column names and the Lichess ones.
#[derive(Debug, Deserialize)]
pub(crate) struct CsvRow {
    #[serde(alias = "PuzzleId", alias = "puzzle_id", alias = "puzzleid")]
    id: Option<String>,
    #[serde(alias = "FEN", alias = "Fen")]
    fen: Option<String>,
    #[serde(alias = "Moves")]
    moves: Option<String>,
    #[serde(alias = "Rating")]
    rating: Option<String>,
    #[serde(alias = "Themes")]
    themes: Option<String>,
    #[serde(alias = "Popularity")]
    popularity: Option<String>,
    #[serde(alias = "RatingDeviation")]
    rating_deviation: Option<String>,
    #[serde(alias = "NbPlays")]
    nb_plays: Option<String>,
    #[serde(alias = "GameUrl")]
    game_url: Option<String>,
    #[serde(alias = "OpeningTags")]
    opening_tags: Option<String>,
}

impl From<CsvRow> for RawFields {
    fn from(r: CsvRow) -> Self {
        RawFields {
            id: r.id,
            fen: r.fen,
            moves: r.moves.map(split_list),
            rating: r.rating,
            themes: r.themes.map(split_list),
            popularity: r.popularity,
            rating_deviation: r.rating_deviation,
            nb_plays: r.nb_plays,
            game_url: r.game_url,
            opening_tags: r.opening_tags.map(split_list),
        }
    }
}

/// Builds `RawFields` from one JSON object. List fields may be arrays or
/// space-separated strings; numbers may be JSON numbers or strings.
pub(crate) fn raw_from_json(v: &Value, line: u64) -> PuzzleResult<RawFields> {
    let obj = v
        .as_object()
        .ok_or_else(|| PuzzleError::malformed(line, "expected a JSON object"))?;
    let scalar = |keys: &[&str]| json_scalar(json_field(obj, keys)?);
    let list = |keys: &[&str]| json_field(obj, keys).map(json_list);

    Ok(RawFields {
        id: scalar(&["id", "PuzzleId", "puzzle_id"]),
        fen: scalar(&["fen", "FEN"]),
        moves: list(&["moves", "Moves"]),
        rating: scalar(&["rating", "Rating"]),
        themes: list(&["themes", "Themes"]),
        popularity: scalar(&["popularity", "Popularity"]),
        rating_deviation: scalar(&["rating_deviation", "RatingDeviation"]),
        nb_plays: scalar(&["nb_plays", "NbPlays"]),
        game_url: scalar(&["game_url", "GameUrl"]),
        opening_tags: list(&["opening_tags", "OpeningTags"]),
    })
}

fn json_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

fn json_scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_list(v: &Value) -> Vec<String> {
    match v {
        Value::String(s) => split_list(s.clone()),
        Value::Array(items) => items.iter().filter_map(|i| i.as_str().map(str::to_owned)).collect(),
        _ => Vec::new(),
    }
}
