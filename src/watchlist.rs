// =============================================================================
// Watchlist: in-memory list backed by a durable store
// =============================================================================
//
// Persistence format: CSV with header `symbol,suggested_price`. Load happens
// once at startup (a missing file is an empty watchlist); every save rewrites
// the whole file through a tmp + rename so a crash never leaves it truncated.
//
// Adds are append-only. The in-memory append happens before the save and is
// kept even if the save fails; the caller receives the failure.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::WatchlistEntry;

const CSV_HEADER: [&str; 2] = ["symbol", "suggested_price"];

// =============================================================================
// Store
// =============================================================================

/// Durable home of the watchlist.
pub trait WatchlistStore: Send + Sync {
    fn load(&self) -> Result<Vec<WatchlistEntry>>;
    fn save(&self, entries: &[WatchlistEntry]) -> Result<()>;
}

/// CSV file store.
#[derive(Debug, Clone)]
pub struct CsvWatchlistStore {
    path: PathBuf,
}

impl CsvWatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatchlistStore for CsvWatchlistStore {
    fn load(&self) -> Result<Vec<WatchlistEntry>> {
        let path = &self.path;
        if !path.exists() {
            info!(path = %path.display(), "no watchlist file yet -- starting empty");
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open watchlist {}", path.display()))?;

        let mut entries = Vec::new();
        for (row, record) in reader.deserialize::<WatchlistEntry>().enumerate() {
            let raw = record
                .with_context(|| format!("failed to parse row {} of {}", row + 1, path.display()))?;
            match validate_entry(&raw.symbol, raw.reference_price) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %path.display(), row = row + 1, error = %e, "skipping invalid watchlist row"),
            }
        }

        info!(path = %path.display(), count = entries.len(), "watchlist loaded");
        Ok(entries)
    }

    fn save(&self, entries: &[WatchlistEntry]) -> Result<()> {
        let path = &self.path;
        let tmp_path = path.with_extension("csv.tmp");

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp_path)
                .with_context(|| format!("failed to create {}", tmp_path.display()))?;

            writer
                .write_record(CSV_HEADER)
                .context("failed to write watchlist header")?;
            for entry in entries {
                writer
                    .serialize(entry)
                    .with_context(|| format!("failed to write watchlist row for {}", entry.symbol))?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", tmp_path.display()))?;
        }

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp watchlist to {}", path.display()))?;

        info!(path = %path.display(), count = entries.len(), "watchlist saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("invalid symbol {0:?}: expected 1-20 characters from A-Z 0-9 . - ^ =")]
    InvalidSymbol(String),

    #[error("reference price must be a positive number, got {0}")]
    InvalidPrice(f64),

    /// The entry was added in memory but could not be written out.
    #[error("failed to persist watchlist: {0:#}")]
    Persist(anyhow::Error),
}

const MAX_SYMBOL_LEN: usize = 20;

/// Exchange-style tickers: `AAPL`, `BRK-B`, `0700.HK`, `^GSPC`, `EURUSD=X`.
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')
}

/// Normalise `symbol` (trimmed, upper-cased) and check both fields.
fn validate_entry(symbol: &str, reference_price: f64) -> Result<WatchlistEntry, WatchlistError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !symbol.chars().all(is_symbol_char) {
        return Err(WatchlistError::InvalidSymbol(symbol));
    }
    if !reference_price.is_finite() || reference_price <= 0.0 {
        return Err(WatchlistError::InvalidPrice(reference_price));
    }
    Ok(WatchlistEntry::new(symbol, reference_price))
}

// =============================================================================
// Watchlist
// =============================================================================

/// Process-wide watchlist: the in-memory list plus the store it came from.
pub struct Watchlist {
    entries: RwLock<Vec<WatchlistEntry>>,
    store: Box<dyn WatchlistStore>,
}

impl Watchlist {
    /// Load the list from `store`. A store that cannot be read is fatal for
    /// the caller.
    pub fn open(store: Box<dyn WatchlistStore>) -> Result<Self> {
        let entries = store.load().context("failed to load watchlist")?;
        Ok(Self {
            entries: RwLock::new(entries),
            store,
        })
    }

    /// Consistent copy of the current list.
    pub fn snapshot(&self) -> Vec<WatchlistEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Validate and append a new entry, then rewrite the store.
    ///
    /// Duplicate symbols are allowed. On [`WatchlistError::Persist`] the entry
    /// stays in memory for the rest of the process lifetime.
    pub fn add(&self, symbol: &str, reference_price: f64) -> Result<WatchlistEntry, WatchlistError> {
        let entry = validate_entry(symbol, reference_price)?;

        // Held across the save so concurrent adds are written in order and a
        // snapshot never sees a half-applied add.
        let mut entries = self.entries.write();
        entries.push(entry.clone());

        if let Err(e) = self.store.save(&entries) {
            warn!(symbol = %entry.symbol, error = %e, "watchlist save failed -- entry kept in memory");
            return Err(WatchlistError::Persist(e));
        }

        info!(symbol = %entry.symbol, reference_price, total = entries.len(), "watchlist entry added");
        Ok(entry)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Store that holds nothing and refuses to save.
    pub(crate) struct FailingStore {
        pub(crate) initial: Vec<WatchlistEntry>,
        pub(crate) save_attempts: Arc<AtomicUsize>,
    }

    impl WatchlistStore for FailingStore {
        fn load(&self) -> Result<Vec<WatchlistEntry>> {
            Ok(self.initial.clone())
        }

        fn save(&self, _entries: &[WatchlistEntry]) -> Result<()> {
            self.save_attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("disk full")
        }
    }

    fn csv_store(dir: &tempfile::TempDir) -> CsvWatchlistStore {
        CsvWatchlistStore::new(dir.path().join("stocks.csv"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(csv_store(&dir).load().unwrap().is_empty());
    }

    #[test]
    fn loads_existing_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = csv_store(&dir);
        std::fs::write(store.path(), "symbol,suggested_price\nAAPL,150.0\nMSFT, 300.5\n").unwrap();

        let entries = store.load().unwrap();
        assert_eq!(
            entries,
            vec![WatchlistEntry::new("AAPL", 150.0), WatchlistEntry::new("MSFT", 300.5)]
        );
    }

    #[test]
    fn malformed_row_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = csv_store(&dir);
        std::fs::write(store.path(), "symbol,suggested_price\nAAPL,not-a-number\n").unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn invalid_rows_are_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = csv_store(&dir);
        std::fs::write(
            store.path(),
            "symbol,suggested_price\nAAA,NaN\nBBB,-5\nCCC,inf\nDDD,0\nA?X,10\nmsft,300\n",
        )
        .unwrap();

        let entries = store.load().unwrap();
        assert_eq!(entries, vec![WatchlistEntry::new("MSFT", 300.0)]);
    }

    #[test]
    fn accepts_exchange_style_symbols() {
        for symbol in ["BRK-B", "0700.HK", "^GSPC", "EURUSD=X"] {
            assert_eq!(validate_entry(symbol, 1.0).unwrap().symbol, symbol);
        }
    }

    #[test]
    fn save_of_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = csv_store(&dir);
        let original = vec![
            WatchlistEntry::new("AAPL", 150.0),
            WatchlistEntry::new("TSLA", 212.37),
            WatchlistEntry::new("AAPL", 140.0),
        ];
        store.save(&original).unwrap();

        let first = store.load().unwrap();
        store.save(&first).unwrap();
        let second = store.load().unwrap();

        assert_eq!(first, original);
        assert_eq!(second, first);
        assert!(!dir.path().join("stocks.csv.tmp").exists());
    }

    #[test]
    fn empty_save_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = csv_store(&dir);
        store.save(&[]).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim(), "symbol,suggested_price");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn add_normalises_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = Watchlist::open(Box::new(csv_store(&dir))).unwrap();

        let entry = watchlist.add("  nvda ", 480.0).unwrap();
        assert_eq!(entry.symbol, "NVDA");

        let reloaded = csv_store(&dir).load().unwrap();
        assert_eq!(reloaded, vec![WatchlistEntry::new("NVDA", 480.0)]);
    }

    #[test]
    fn duplicates_are_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = Watchlist::open(Box::new(csv_store(&dir))).unwrap();
        watchlist.add("AMD", 100.0).unwrap();
        watchlist.add("AMD", 90.0).unwrap();
        assert_eq!(watchlist.len(), 2);
    }

    #[test]
    fn add_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = Watchlist::open(Box::new(csv_store(&dir))).unwrap();

        assert!(matches!(watchlist.add("   ", 10.0), Err(WatchlistError::InvalidSymbol(_))));
        assert!(matches!(watchlist.add("A?range=max", 10.0), Err(WatchlistError::InvalidSymbol(_))));
        assert!(matches!(watchlist.add("A#x", 10.0), Err(WatchlistError::InvalidSymbol(_))));
        assert!(matches!(watchlist.add("A/B", 10.0), Err(WatchlistError::InvalidSymbol(_))));
        assert!(matches!(watchlist.add("X", 0.0), Err(WatchlistError::InvalidPrice(_))));
        assert!(matches!(watchlist.add("X", -1.0), Err(WatchlistError::InvalidPrice(_))));
        assert!(matches!(watchlist.add("X", f64::NAN), Err(WatchlistError::InvalidPrice(_))));
        assert_eq!(watchlist.len(), 0);
    }

    #[test]
    fn failed_save_keeps_entry_in_memory() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let store = FailingStore {
            initial: vec![WatchlistEntry::new("AAPL", 150.0)],
            save_attempts: attempts.clone(),
        };
        let watchlist = Watchlist::open(Box::new(store)).unwrap();

        let err = watchlist.add("GOOG", 130.0).unwrap_err();
        assert!(matches!(err, WatchlistError::Persist(_)));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        let snapshot = watchlist.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].symbol, "GOOG");
    }
}
