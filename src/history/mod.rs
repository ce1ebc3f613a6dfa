/// Append-only history log of server status snapshots
///
/// Each record is a `0x1E` byte, the millisecond timestamp as decimal text,
/// a newline, then the payload followed by a newline:
///
/// ```text
/// \x1E1700000000000\n# Server\r\nredis_version:7.2.0\r\n\n
/// ```
///
/// Reading is a single forward pass. A corrupt stamp (zero or not a number)
/// closes the current record and the lines after it are skipped until the
/// next valid stamp.
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Record separator byte opening every stamp line
pub const STAMP_MARKER: u8 = 0x1E;

/// One decoded history record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub timestamp_ms: i64,
    pub status: String,
}

/// Append-only log bound to one file
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl HistoryLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The file is opened lazily on first write.
    pub fn append(&mut self, timestamp_ms: i64, payload: &str) -> io::Result<()> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(&[STAMP_MARKER])?;
            writeln!(writer, "{}", timestamp_ms)?;
            writer.write_all(payload.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Read every valid record of the file. A missing file is `NotFound`.
    pub fn read_all(&mut self) -> io::Result<Vec<HistorySnapshot>> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        let file = File::open(&self.path)?;
        read_from(BufReader::new(file))
    }

    /// Drop the open handle and remove the file if it exists
    pub fn clear(&mut self) -> io::Result<()> {
        self.writer = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Decode records from any buffered reader
pub fn read_from<R: BufRead>(mut reader: R) -> io::Result<Vec<HistorySnapshot>> {
    let mut snapshots = Vec::new();
    let mut current: Option<HistorySnapshot> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        if line.first() == Some(&STAMP_MARKER) {
            if let Some(snapshot) = current.take() {
                push_record(&mut snapshots, snapshot);
            }
            let stamp = String::from_utf8_lossy(&line[1..]);
            match stamp.trim_end().parse::<i64>() {
                Ok(timestamp_ms) if timestamp_ms != 0 => {
                    current = Some(HistorySnapshot {
                        timestamp_ms,
                        status: String::new(),
                    });
                }
                _ => log::warn!("skipping history record with corrupt stamp {:?}", stamp),
            }
            continue;
        }

        if let Some(snapshot) = current.as_mut() {
            snapshot.status.push_str(&String::from_utf8_lossy(&line));
        }
    }

    if let Some(snapshot) = current.take() {
        push_record(&mut snapshots, snapshot);
    }
    Ok(snapshots)
}

fn push_record(snapshots: &mut Vec<HistorySnapshot>, mut snapshot: HistorySnapshot) {
    if snapshot.status.ends_with('\n') {
        snapshot.status.pop();
    }
    if !snapshot.status.is_empty() {
        snapshots.push(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_append_then_read() {
        let dir = TempDir::new().unwrap();
        let mut log = HistoryLog::new(dir.path().join("abc.red"));

        log.append(1_000, "# Server\r\nredis_version:7.2.0\r\n").unwrap();
        log.append(2_000, "line one\nline two").unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(
            records,
            vec![
                HistorySnapshot {
                    timestamp_ms: 1_000,
                    status: "# Server\r\nredis_version:7.2.0\r\n".to_string()
                },
                HistorySnapshot {
                    timestamp_ms: 2_000,
                    status: "line one\nline two".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut log = HistoryLog::new(dir.path().join("missing.red"));
        let err = log.read_all().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_corrupt_stamp_skips_record() {
        let data = b"\x1E100\nfirst\n\x1E0\nlost\n\x1Ebogus\nalso lost\n\x1E300\nthird\n";
        let records = read_from(Cursor::new(&data[..])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, "first");
        assert_eq!(records[1].timestamp_ms, 300);
        assert_eq!(records[1].status, "third");
    }

    #[test]
    fn test_leading_payload_and_trailing_stamp_ignored() {
        let data = b"orphan line\n\x1E100\nkept\n\x1E200\n";
        let records = read_from(Cursor::new(&data[..])).unwrap();
        assert_eq!(
            records,
            vec![HistorySnapshot {
                timestamp_ms: 100,
                status: "kept".to_string()
            }]
        );
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.emb");
        let mut log = HistoryLog::new(&path);

        log.append(1, "x").unwrap();
        assert!(path.exists());
        log.clear().unwrap();
        assert!(!path.exists());
        // Clearing twice is fine
        log.clear().unwrap();

        log.append(2, "y").unwrap();
        assert_eq!(log.read_all().unwrap().len(), 1);
    }
}
