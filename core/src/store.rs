use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::block::BlockFS;
use crate::error::Result;
use crate::fs_layout::{block_db_path, init_data_dir_if_not_exists};
use crate::hash::Hash;

/// The append-only ledger file: one JSON `BlockFS` per line. Held open for
/// append for the lifetime of the store; reads reopen the file fresh so they
/// never race the writer's buffered position.
pub struct Store {
    path: PathBuf,
    file: File,
}

impl Store {
    pub fn open(data_dir: &Path) -> Result<Store> {
        init_data_dir_if_not_exists(data_dir)?;
        let path = block_db_path(data_dir);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Store { path, file })
    }

    /// Appends one record and flushes it to durable state before returning.
    pub fn append(&mut self, record: &BlockFS) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Streams every block whose parent chain starts after `parent_hash`.
    /// A zero hash yields every block in the file. If `parent_hash` never
    /// appears, the result is empty.
    pub fn scan_after(&self, parent_hash: Hash) -> Result<Vec<BlockFS>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut collecting = parent_hash.is_zero();
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: BlockFS = serde_json::from_str(&line)?;
            if collecting {
                out.push(record);
            } else if record.hash == parent_hash {
                collecting = true;
            }
        }
        Ok(out)
    }

    /// Streams every block in the file, in order.
    pub fn scan_all(&self) -> Result<Vec<BlockFS>> {
        self.scan_after(Hash::ZERO)
    }
}
