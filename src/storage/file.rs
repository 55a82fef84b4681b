use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use csv::ByteRecord;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{BalanceReport, BalanceTally, HEADER, LedgerEntry, LedgerRow};

use super::{LedgerStore, UpdatableLedgerStore};

/// Ledger persisted as comma-separated rows under a fixed header.
///
/// Rows have no identifier of their own: an entry is addressed by its
/// zero-based position below the header. Appends never touch existing bytes;
/// updates and deletes rewrite the whole file through a temporary sibling that
/// is renamed over the original.
///
/// All mutations on one instance are serialized; reads may overlap each other
/// but never a rewrite.
pub struct FileLedgerStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents. A missing file reads as empty.
    async fn read_bytes(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read ledger {}", self.path.display()))
            }
        }
    }

    async fn read_rows(&self) -> Result<Vec<FileRow>> {
        parse_rows(&self.read_bytes().await?)
    }

    async fn list_rows(&self) -> Result<Vec<LedgerRow>> {
        Ok(self.read_rows().await?.into_iter().map(|r| r.row).collect())
    }

    async fn rewrite(&self, rows: &[LedgerRow]) -> Result<()> {
        let data = encode(true, rows.iter().map(LedgerRow::to_row))?;
        replace_atomically(&self.path, &data)
            .await
            .with_context(|| format!("Failed to rewrite ledger {}", self.path.display()))?;
        debug!(path = %self.path.display(), rows = rows.len(), "ledger rewritten");
        Ok(())
    }

    /// Append an entry and return the position it landed at.
    ///
    /// The position is taken under the same write guard as the append, so it
    /// stays valid until the next mutation.
    pub async fn append(&self, entry: LedgerEntry) -> Result<(usize, LedgerRow)> {
        let _guard = self.lock.write().await;

        let contents = self.read_bytes().await?;
        let position = parse_rows(&contents)?.len();
        // Whitespace-only content has no header yet.
        let needs_header = contents.trim_ascii().is_empty();
        let needs_newline = contents.last().is_some_and(|&last| last != b'\n');

        let mut data = Vec::new();
        if needs_newline {
            data.push(b'\n');
        }
        data.extend(encode(needs_header, std::iter::once(entry.to_row()))?);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open ledger {}", self.path.display()))?;
        file.write_all(&data)
            .await
            .context("Failed to append to ledger")?;
        file.flush().await.context("Failed to flush ledger")?;

        debug!(path = %self.path.display(), position, "entry appended");
        Ok((position, LedgerRow::from(&entry)))
    }
}

impl LedgerStore for FileLedgerStore {
    type Key = usize;
    type Record = LedgerRow;

    async fn save(&self, entry: LedgerEntry) -> Result<LedgerRow> {
        let (_, row) = self.append(entry).await?;
        Ok(row)
    }

    /// Rows that were not valid UTF-8 are returned with the bad bytes
    /// replaced, so positions stay aligned with the file.
    async fn list_all(&self) -> Result<Vec<LedgerRow>> {
        let _guard = self.lock.read().await;
        self.list_rows().await
    }

    async fn delete(&self, position: usize) -> Result<bool> {
        let _guard = self.lock.write().await;

        let mut rows = self.list_rows().await?;
        if position >= rows.len() {
            return Ok(false);
        }

        rows.remove(position);
        self.rewrite(&rows).await?;
        Ok(true)
    }

    async fn compute_balance(&self) -> Result<BalanceReport> {
        let _guard = self.lock.read().await;

        let mut tally = BalanceTally::default();
        for (position, file_row) in self.read_rows().await?.iter().enumerate() {
            if file_row.lossy {
                tally.skip();
                warn!(position, "skipping ledger row that is not valid UTF-8");
            } else if let Err(reason) = tally.add_row(&file_row.row) {
                warn!(position, %reason, "skipping ledger row");
            }
        }
        Ok(tally.finish())
    }
}

impl UpdatableLedgerStore for FileLedgerStore {
    async fn update(&self, position: usize, entry: LedgerEntry) -> Result<bool> {
        let _guard = self.lock.write().await;

        let mut rows = self.list_rows().await?;
        let Some(slot) = rows.get_mut(position) else {
            return Ok(false);
        };

        *slot = LedgerRow::from(&entry);
        self.rewrite(&rows).await?;
        Ok(true)
    }
}

/// A row as read from disk. `lossy` is set when a field was not valid UTF-8
/// and had its bad bytes replaced.
struct FileRow {
    row: LedgerRow,
    lossy: bool,
}

/// Column positions of the known fields, resolved from a header row whose
/// names may carry stray whitespace.
struct Columns([Option<usize>; 5]);

impl Columns {
    fn resolve(headers: &ByteRecord) -> Self {
        Self(HEADER.map(|name| headers.iter().position(|h| h.trim_ascii() == name.as_bytes())))
    }

    fn row(&self, record: &ByteRecord) -> FileRow {
        let mut lossy = false;
        let mut field = |i: usize| {
            let bytes = self.0[i].and_then(|col| record.get(col)).unwrap_or_default();
            match std::str::from_utf8(bytes) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    lossy = true;
                    String::from_utf8_lossy(bytes).into_owned()
                }
            }
        };
        let row = LedgerRow {
            date: field(0),
            category: field(1),
            description: field(2),
            transaction_type: field(3),
            amount: field(4),
        };
        FileRow { row, lossy }
    }
}

/// Parse the raw file. Every line is trimmed and blank lines are dropped
/// before the first remaining line is taken as the header.
fn parse_rows(contents: &[u8]) -> Result<Vec<FileRow>> {
    let cleaned = contents
        .split(|&b| b == b'\n')
        .map(<[u8]>::trim_ascii)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(&b'\n');

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(cleaned.as_slice());
    let columns = Columns::resolve(reader.byte_headers().context("Failed to read ledger header")?);

    let mut rows = Vec::new();
    for (position, record) in reader.byte_records().enumerate() {
        match record {
            Ok(record) => rows.push(columns.row(&record)),
            Err(err) => warn!(position, error = %err, "skipping unreadable ledger row"),
        }
    }
    Ok(rows)
}

fn encode<I, R>(with_header: bool, rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("Failed to encode ledger rows: {}", err.error()))
}

/// Write `data` to a temporary sibling, then rename it over `path`. The
/// temporary file is removed if any step fails.
async fn replace_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = async {
        let mut file = File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path).await;
    }
    result
}
