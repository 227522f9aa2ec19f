//! Universe loading: the list of symbols a screen runs over.
//!
//! The universe comes from a CSV listing (a local file or a URL) with one
//! ticker per row in a named column, e.g. the ASX listed-companies file with
//! its `ASX code` column. Tickers are trimmed, blanks skipped, and duplicates
//! removed keeping the first occurrence.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::domain::Symbol;

/// Default ticker column of the ASX listed-companies CSV.
pub const ASX_CODE_COLUMN: &str = "ASX code";

/// Errors raised while building a universe. All are configuration errors:
/// they abort the run before any fetching begins.
#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download universe from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("parse universe CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{column}' not found in universe CSV (columns: {available})")]
    MissingColumn { column: String, available: String },

    #[error("universe is empty: no valid symbols found")]
    Empty,
}

/// An ordered, duplicate-free list of symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    symbols: Vec<Symbol>,
}

impl Universe {
    /// Build from raw tickers. Invalid and duplicate entries are dropped.
    pub fn from_symbols<I, S>(raw: I) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let symbols: Vec<Symbol> = raw
            .into_iter()
            .filter_map(|s| Symbol::parse(s.as_ref()))
            .filter(|s| seen.insert(s.clone()))
            .collect();

        if symbols.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(Self { symbols })
    }

    /// Read tickers from `column` of a CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R, column: &str) -> Result<Self, UniverseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let idx = headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(column))
            .ok_or_else(|| UniverseError::MissingColumn {
                column: column.to_string(),
                available: headers.iter().collect::<Vec<_>>().join(", "),
            })?;

        let mut tickers = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if let Some(value) = record.get(idx) {
                tickers.push(value.to_string());
            }
        }

        Self::from_symbols(tickers)
    }

    /// Load a universe CSV from disk.
    pub fn from_csv_file(path: &Path, column: &str) -> Result<Self, UniverseError> {
        let file = std::fs::File::open(path).map_err(|source| UniverseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv_reader(file, column)
    }

    /// Download a universe CSV over HTTP.
    pub fn from_url(url: &str, column: &str, timeout: Duration) -> Result<Self, UniverseError> {
        let download_err = |reason: String| UniverseError::Download {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| download_err(e.to_string()))?;
        let resp = client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(download_err(format!("HTTP {}", resp.status())));
        }
        let body = resp.text().map_err(|e| download_err(e.to_string()))?;

        Self::from_csv_reader(body.as_bytes(), column)
    }

    /// Resolve a source string: `http(s)://` URLs are downloaded, anything else is a file path.
    pub fn load(source: &str, column: &str, timeout: Duration) -> Result<Self, UniverseError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::from_url(source, column, timeout)
        } else {
            Self::from_csv_file(Path::new(source), column)
        }
    }

    /// Append the provider suffix (e.g. `.AX`) to every symbol.
    pub fn with_suffix(self, suffix: &str) -> Self {
        let mut seen = HashSet::new();
        let symbols = self
            .symbols
            .into_iter()
            .map(|s| s.with_suffix(suffix))
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ASX_CSV: &str = "\
Company name,ASX code,GICS industry group
BHP GROUP LIMITED,BHP,Materials
COMMONWEALTH BANK OF AUSTRALIA,CBA,Banks
 ,   ,Unknown
CSL LIMITED,CSL,Pharmaceuticals
BHP GROUP LIMITED,BHP,Materials
";

    fn tickers(u: &Universe) -> Vec<&str> {
        u.symbols().iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn reads_named_column_and_dedupes() {
        let u = Universe::from_csv_reader(ASX_CSV.as_bytes(), ASX_CODE_COLUMN).unwrap();
        assert_eq!(tickers(&u), vec!["BHP", "CBA", "CSL"]);
    }

    #[test]
    fn column_match_ignores_case() {
        let u = Universe::from_csv_reader(ASX_CSV.as_bytes(), "asx CODE").unwrap();
        assert_eq!(u.len(), 3);
    }

    #[test]
    fn missing_column_lists_available() {
        let err = Universe::from_csv_reader(ASX_CSV.as_bytes(), "Ticker").unwrap_err();
        match err {
            UniverseError::MissingColumn { column, available } => {
                assert_eq!(column, "Ticker");
                assert!(available.contains("ASX code"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_universe_is_an_error() {
        let csv = "ASX code\n \n\n";
        assert!(matches!(
            Universe::from_csv_reader(csv.as_bytes(), ASX_CODE_COLUMN),
            Err(UniverseError::Empty)
        ));
        assert!(matches!(
            Universe::from_symbols(Vec::<String>::new()),
            Err(UniverseError::Empty)
        ));
    }

    #[test]
    fn suffix_applied_once() {
        let u = Universe::from_symbols(["BHP", "BHP.AX", "CBA"]).unwrap().with_suffix(".AX");
        assert_eq!(tickers(&u), vec!["BHP.AX", "CBA.AX"]);
    }

    #[test]
    fn load_reads_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ASX_CSV.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let u = Universe::load(&path, ASX_CODE_COLUMN, Duration::from_secs(1)).unwrap();
        assert_eq!(u.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Universe::from_csv_file(Path::new("/nonexistent/universe.csv"), "x").unwrap_err();
        assert!(matches!(err, UniverseError::Io { .. }));
    }
}
