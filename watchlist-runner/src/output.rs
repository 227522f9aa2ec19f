//! Watchlist output: `ASX:BHP,ASX:CBA` text written to a file.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::Watchlist;
use crate::config::OutputSection;

#[derive(Debug, Error)]
#[error("write watchlist to {path}: {source}")]
pub struct OutputError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// How symbols are rendered in the watchlist file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    /// Written as `{tag}:` before each ticker; empty for no prefix.
    pub exchange_tag: String,
    /// Provider suffix stripped before writing (`.AX`).
    pub strip_suffix: String,
    pub sort: bool,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            exchange_tag: "ASX".into(),
            strip_suffix: ".AX".into(),
            sort: true,
        }
    }
}

impl OutputFormat {
    pub fn from_section(section: &OutputSection, provider_suffix: &str) -> Self {
        Self {
            exchange_tag: section.exchange_tag.clone(),
            strip_suffix: provider_suffix.to_string(),
            sort: section.sort,
        }
    }
}

/// Render the watchlist as a comma-separated line.
pub fn format_watchlist(watchlist: &Watchlist, format: &OutputFormat) -> String {
    let mut tickers: Vec<&str> = watchlist
        .symbols()
        .iter()
        .map(|s| s.without_suffix(&format.strip_suffix))
        .collect();
    if format.sort {
        tickers.sort_unstable();
    }

    tickers
        .into_iter()
        .map(|t| {
            if format.exchange_tag.is_empty() {
                t.to_string()
            } else {
                format!("{}:{t}", format.exchange_tag)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Write `contents` to `path`, creating the parent directory if needed.
pub fn write_watchlist(path: &Path, contents: &str) -> Result<(), OutputError> {
    let wrap = |source| OutputError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, contents).map_err(wrap)
}
