//! The parser's output: ordered headers plus string cells.

use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-.]+").expect("valid regex"));
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").expect("valid regex"));

/// Input encoding of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Json,
}

impl SourceKind {
    /// Guesses the kind from a file extension, defaulting to CSV.
    #[must_use]
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => SourceKind::Json,
            _ => SourceKind::Csv,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Csv => write!(f, "csv"),
            SourceKind::Json => write!(f, "json"),
        }
    }
}

/// A column header. Only `cleaned` takes part in alias matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub original: String,
    pub cleaned: String,
}

impl Header {
    #[must_use]
    pub fn new(original: &str) -> Self {
        Self {
            original: original.to_string(),
            cleaned: clean_header(original),
        }
    }
}

/// Parsed tabular input. Rows hold one cell per header, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<Header>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of the first header whose cleaned or original text equals `name`.
    #[must_use]
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.cleaned == name)
            .or_else(|| self.headers.iter().position(|h| h.original == name))
    }

    /// Cell at `row` under the header named `header`, if both exist.
    #[must_use]
    pub fn cell(&self, row: usize, header: &str) -> Option<&str> {
        let idx = self.header_index(header)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Cleaned header names in column order.
    #[must_use]
    pub fn cleaned_headers(&self) -> Vec<String> {
        self.headers.iter().map(|h| h.cleaned.clone()).collect()
    }

    /// Original header text for a cleaned header name.
    #[must_use]
    pub fn original_header(&self, cleaned: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.cleaned == cleaned)
            .map(|h| h.original.as_str())
    }
}

/// Normalizes a header for alias matching.
///
/// Trims, drops a leading BOM and wrapping quotes, lowercases, turns runs of
/// whitespace, hyphens and dots into one `_`, then removes any remaining
/// non-word character. `" \u{feff}\"Shop-Name\" "` becomes `"shop_name"`.
#[must_use]
pub fn clean_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();
    let unquoted = trimmed
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
        .trim();
    let lower = unquoted.to_lowercase();
    let underscored = SEPARATOR_RUN_RE.replace_all(&lower, "_");
    NON_WORD_RE.replace_all(&underscored, "").into_owned()
}
