use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::Record;

/// Encode one committed transaction to `[len][bincode][crc32]`.
fn encode_txn(writer: &mut impl Write, txn: &[Record]) -> io::Result<()> {
    let payload =
        bincode::serialize(txn).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "transaction too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Append-only Write-Ahead Log.
///
/// Format per entry: `[u32: len][bincode: Vec<Record>][u32: crc32]`
/// - One entry holds every record of one committed transaction, so a torn
///   tail drops the whole transaction, never half of it.
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - Truncated last entry (crash) is discarded via length-prefix + CRC check.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    /// Append one transaction and fsync. Test helper; the engine goes through
    /// `append_buffered` + `flush_sync` for group commit.
    #[cfg(test)]
    pub fn append(&mut self, txn: &[Record]) -> io::Result<()> {
        self.append_buffered(txn)?;
        self.flush_sync()
    }

    /// Buffer one transaction without flushing or syncing.
    pub fn append_buffered(&mut self, txn: &[Record]) -> io::Result<()> {
        encode_txn(&mut self.writer, txn)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    /// Flush the BufWriter and fsync the underlying file.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the compacted snapshot to a temp file and fsync.
    pub fn write_compact_file(path: &Path, snapshot: &[Record]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        encode_txn(&mut writer, snapshot)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Rename the temp file over the WAL and reopen it.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, snapshot: &[Record]) -> io::Result<()> {
        Self::write_compact_file(&self.path, snapshot)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replay the WAL, returning every intact transaction in commit order.
    /// Replay stops at the first truncated or corrupt entry.
    pub fn replay(path: &Path) -> io::Result<Vec<Vec<Record>>> {
        Ok(scan(path)?.0)
    }

    /// Replay, then cut the file back to its last intact entry so later
    /// appends are not stranded behind a torn tail.
    pub fn recover(path: &Path) -> io::Result<Vec<Vec<Record>>> {
        let (txns, intact) = scan(path)?;
        let on_disk = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(txns),
            Err(e) => return Err(e),
        };
        if on_disk > intact {
            warn!(
                "{}: truncating {} bytes of torn tail at byte {intact}",
                path.display(),
                on_disk - intact
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(intact)?;
            file.sync_all()?;
        }
        Ok(txns)
    }
}

/// Every intact transaction plus the byte length they occupy.
fn scan(path: &Path) -> io::Result<(Vec<Vec<Record>>, u64)> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut txns = Vec::new();
    let mut offset = 0u64;

    while let Some(frame) = read_frame(&mut reader)? {
        let size = frame.len() as u64 + 8;
        match frame.decode() {
            Some(txn) => txns.push(txn),
            None => {
                warn!("{}: discarding corrupt entry at byte {offset}", path.display());
                break;
            }
        }
        offset += size;
    }

    Ok((txns, offset))
}

/// A length-prefixed payload with its trailing checksum.
struct Frame {
    payload: Vec<u8>,
    crc: u32,
}

impl Frame {
    fn len(&self) -> usize {
        self.payload.len()
    }

    fn decode(&self) -> Option<Vec<Record>> {
        if self.crc != crc32fast::hash(&self.payload) {
            return None;
        }
        bincode::deserialize(&self.payload).ok()
    }
}

/// Read the next frame. `None` at a clean end of file or a torn tail.
fn read_frame(reader: &mut impl Read) -> io::Result<Option<Frame>> {
    let mut word = [0u8; 4];
    if !fill(reader, &mut word)? {
        return Ok(None);
    }
    let mut payload = vec![0u8; u32::from_le_bytes(word) as usize];
    if !fill(reader, &mut payload)? || !fill(reader, &mut word)? {
        return Ok(None);
    }
    Ok(Some(Frame {
        payload,
        crc: u32::from_le_bytes(word),
    }))
}

/// `read_exact`, mapping a short read to `false`.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Staff, StaffStatus, Venue, VenueStatus};
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("soiree_test_wal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn venue(name: &str) -> Record {
        Record::VenueSaved(Venue {
            id: Ulid::new(),
            company: "acme".into(),
            name: name.into(),
            capacity: 80,
            status: VenueStatus::Empty,
        })
    }

    #[test]
    fn append_and_replay_transactions() {
        let path = tmp_path("append_and_replay.wal");
        let first = vec![venue("Loft")];
        let staff_id = Ulid::new();
        let second = vec![
            Record::StaffSaved(Staff {
                id: staff_id,
                company: "acme".into(),
                name: "Jo".into(),
                role: Some("chef".into()),
                status: StaffStatus::Inactive,
            }),
            Record::StaffStatusProjected { id: staff_id, status: StaffStatus::Active },
        ];

        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&first).unwrap();
            wal.append(&second).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, vec![first, second]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn truncated_tail_drops_whole_transaction() {
        let path = tmp_path("truncation.wal");
        let kept = vec![venue("Loft")];
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&kept).unwrap();
        }
        // Half of a second entry: a length prefix and a few payload bytes.
        let partial = bincode::serialize(&vec![venue("Barn"), venue("Dock")]).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&(partial.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&partial[..partial.len() / 2]).unwrap();
        }

        assert_eq!(Wal::replay(&path).unwrap(), vec![kept]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn recover_cuts_torn_tail_before_new_appends() {
        let path = tmp_path("recover_torn.wal");
        let first = vec![venue("Loft")];
        let second = vec![venue("Barn")];
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&first).unwrap();
        }
        let intact = fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[200, 0, 0, 0, 1, 2, 3]).unwrap();
        }

        assert_eq!(Wal::recover(&path).unwrap(), vec![first.clone()]);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&second).unwrap();
        }
        assert_eq!(Wal::recover(&path).unwrap(), vec![first, second]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn recover_nonexistent_file() {
        let path = tmp_path("recover_missing.wal");
        assert!(Wal::recover(&path).unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        assert!(Wal::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn replay_stops_at_bad_crc() {
        let path = tmp_path("corrupt_crc.wal");
        let txn = vec![Record::VenueDeleted { id: Ulid::new() }];
        {
            let payload = bincode::serialize(&txn).unwrap();
            let mut f = File::create(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }
        assert!(Wal::replay(&path).unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_append.wal");
        let snapshot = vec![venue("Loft"), venue("Barn")];
        let after = vec![venue("Dock")];

        {
            let mut wal = Wal::open(&path).unwrap();
            for _ in 0..10 {
                wal.append(&[venue("churn")]).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 10);
            let before = fs::metadata(&path).unwrap().len();

            wal.compact(&snapshot).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
            assert!(fs::metadata(&path).unwrap().len() < before);

            wal.append(&after).unwrap();
        }

        assert_eq!(Wal::replay(&path).unwrap(), vec![snapshot, after]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn buffered_appends_land_after_flush() {
        let path = tmp_path("buffered_flush.wal");
        let txns: Vec<Vec<Record>> = (0..5).map(|i| vec![venue(&format!("v{i}"))]).collect();
        {
            let mut wal = Wal::open(&path).unwrap();
            for txn in &txns {
                wal.append_buffered(txn).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 5);
            wal.flush_sync().unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap(), txns);
        let _ = fs::remove_file(&path);
    }
}
