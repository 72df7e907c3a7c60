use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use crate::models::{EventRecord, UNTITLED_EVENT};

use super::csv::{split_line, DEFAULT_DELIMITER};
use super::schema::{non_blank, parse_coordinate, parse_instant, Column, ColumnMap};

/// Sample schedule shipped with the binary, used when no feed is configured.
const BUNDLED_FEED: &[u8] = include_bytes!("../../assets/events_sample.csv");

/// Hex characters kept from the row digest when synthesizing an id.
const SYNTHETIC_ID_LEN: usize = 16;

/// Shared, immutable view of the current event set.
pub type EventSet = Arc<Vec<EventRecord>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Bundled,
    Path(PathBuf),
}

impl FeedSource {
    pub fn from_setting(path: Option<&Path>) -> Self {
        match path {
            Some(path) => FeedSource::Path(path.to_path_buf()),
            None => FeedSource::Bundled,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FeedSource::Bundled => "bundled sample feed".to_string(),
            FeedSource::Path(path) => path.display().to_string(),
        }
    }
}

/// Outcome of one successful ingestion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub parsed: usize,
    /// Non-blank data rows that could not be turned into a record.
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFeed {
    pub records: Vec<EventRecord>,
    pub dropped_rows: usize,
}

/// Parse a whole feed. Bad rows are skipped and counted, never fatal.
pub fn parse_feed(text: &str, delimiter: char) -> ParsedFeed {
    let mut lines = text.lines();
    let Some(header_line) = lines.next() else {
        return ParsedFeed::default();
    };

    let columns = ColumnMap::from_header(&split_line(header_line, delimiter));
    let mut feed = ParsedFeed::default();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let row = split_line(line, delimiter);
        match parse_row(&columns, &row) {
            Some(record) => feed.records.push(record),
            None => feed.dropped_rows += 1,
        }
    }

    feed
}

fn parse_row(columns: &ColumnMap, row: &[String]) -> Option<EventRecord> {
    let start_time = parse_instant(columns.get(row, Column::StartTime))?;

    let id = non_blank(columns.get(row, Column::Id))
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_id(row));
    let title = non_blank(columns.get(row, Column::Title))
        .unwrap_or(UNTITLED_EVENT)
        .to_string();

    Some(EventRecord {
        id,
        title,
        category: non_blank(columns.get(row, Column::Category)).map(str::to_string),
        venue: non_blank(columns.get(row, Column::Venue)).map(str::to_string),
        start_time,
        end_time: parse_instant(columns.get(row, Column::EndTime)),
        latitude: parse_coordinate(columns.get(row, Column::Latitude)),
        longitude: parse_coordinate(columns.get(row, Column::Longitude)),
    })
}

/// Deterministic for identical rows, not guaranteed unique across rows.
fn synthesize_id(row: &[String]) -> String {
    let digest = Sha256::digest(row.join("|").as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(SYNTHETIC_ID_LEN);
    id
}

/// Owns the canonical event set. Each successful ingestion replaces the set
/// wholesale; a failed one leaves it untouched.
#[derive(Clone)]
pub struct EventIngestor {
    events_tx: Arc<watch::Sender<EventSet>>,
    delimiter: char,
}

impl Default for EventIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIngestor {
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(delimiter: char) -> Self {
        let (events_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            events_tx: Arc::new(events_tx),
            delimiter,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<EventSet> {
        self.events_tx.subscribe()
    }

    pub fn events(&self) -> EventSet {
        self.events_tx.borrow().clone()
    }

    /// Read a feed to the end, parse it and publish the result.
    ///
    /// Blocking; async callers go through [`EventIngestor::ingest_path`] or
    /// [`EventIngestor::ingest_source`].
    pub fn ingest_reader<R: Read>(&self, mut reader: R) -> Result<IngestReport> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .context("failed to read event feed")?;
        let text = String::from_utf8_lossy(&bytes);

        let feed = parse_feed(&text, self.delimiter);
        let report = IngestReport {
            parsed: feed.records.len(),
            dropped_rows: feed.dropped_rows,
        };
        self.events_tx.send_replace(Arc::new(feed.records));

        if report.dropped_rows > 0 {
            debug!("dropped {} malformed event rows", report.dropped_rows);
        }
        Ok(report)
    }

    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let ingestor = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path)
                .with_context(|| format!("failed to open event feed {}", path.display()))?;
            ingestor.ingest_reader(file)
        })
        .await
        .context("event feed reader join failed")?
    }

    pub fn ingest_bundled(&self) -> Result<IngestReport> {
        self.ingest_reader(BUNDLED_FEED)
    }

    pub async fn ingest_source(&self, source: &FeedSource) -> Result<IngestReport> {
        let result = match source {
            FeedSource::Bundled => self.ingest_bundled(),
            FeedSource::Path(path) => self.ingest_path(path).await,
        };

        match &result {
            Ok(report) => info!(
                "ingested {} events from {} ({} rows dropped)",
                report.parsed,
                source.describe(),
                report.dropped_rows
            ),
            Err(err) => warn!("event ingestion from {} failed: {err:#}", source.describe()),
        }
        result
    }

    pub fn clear(&self) {
        self.events_tx.send_replace(Arc::new(Vec::new()));
    }
}
