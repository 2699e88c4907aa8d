//! Append-only chunk log files
//!
//! A chunk log is a flat sequence of records:
//! ```text
//! { length: u32 little-endian; payload: [u8; length] } ...until EOF
//! ```
//! Each payload is one packed chunk. The file is only ever appended to,
//! or replaced wholesale by a copy.

use bz_core::{Error, Replica, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Size of the record length prefix
const LEN_PREFIX: usize = 4;

/// Handle to one chunk log file
#[derive(Debug, Clone)]
pub struct ChunkLog {
    path: PathBuf,
}

impl ChunkLog {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append raw records in order, creating the file and its parents
    ///
    /// Returns the number of bytes written. An empty slice leaves the
    /// filesystem untouched.
    pub fn append_records(&self, records: &[Vec<u8>]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::with_capacity(records.iter().map(|r| r.len() + LEN_PREFIX).sum());
        for record in records {
            let len = u32::try_from(record.len()).map_err(|_| {
                Error::InvalidArgument(format!("chunk of {} bytes exceeds u32 length", record.len()))
            })?;
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(record);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        file.write_all(&buf).map_err(|e| Error::io(&self.path, e))?;
        file.sync_data().map_err(|e| Error::io(&self.path, e))?;

        Ok(buf.len())
    }

    /// Read every record from offset 0 to EOF
    ///
    /// A missing file reads as an empty log.
    pub fn read_records(&self) -> Result<Vec<Vec<u8>>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let mut records = Vec::new();
        let mut offset = 0usize;

        while offset < bytes.len() {
            let remaining = bytes.len() - offset;
            if remaining < LEN_PREFIX {
                return Err(Error::corrupt(
                    &self.path,
                    format!("truncated length prefix at offset {offset} ({remaining} bytes left)"),
                ));
            }

            let mut prefix = [0u8; LEN_PREFIX];
            prefix.copy_from_slice(&bytes[offset..offset + LEN_PREFIX]);
            let len = u32::from_le_bytes(prefix) as usize;
            offset += LEN_PREFIX;

            if len > bytes.len() - offset {
                return Err(Error::corrupt(
                    &self.path,
                    format!(
                        "record at offset {} declares {} bytes, only {} remain",
                        offset - LEN_PREFIX,
                        len,
                        bytes.len() - offset
                    ),
                ));
            }

            records.push(bytes[offset..offset + len].to_vec());
            offset += len;
        }

        Ok(records)
    }

    /// Number of records in the log
    pub fn record_count(&self) -> Result<usize> {
        Ok(self.read_records()?.len())
    }

    /// Pack and append chunks in argument order
    pub fn append<D: Replica>(&self, chunks: &[D::Chunk]) -> Result<usize> {
        let records = chunks.iter().map(D::pack).collect::<Result<Vec<_>>>()?;
        self.append_records(&records)
    }

    /// Rebuild a document by applying every chunk in file order to a fresh one
    pub fn replay<D: Replica>(&self) -> Result<D> {
        let mut doc = D::default();
        for (index, record) in self.read_records()?.iter().enumerate() {
            let chunk = D::unpack(record).map_err(|e| {
                Error::corrupt(&self.path, format!("record {index} does not unpack: {e}"))
            })?;
            doc.apply(std::slice::from_ref(&chunk));
        }
        Ok(doc)
    }

    /// Replace `target` with a full copy of this log
    pub fn copy_to(&self, target: &Path) -> Result<u64> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        // std::fs::copy lets the kernel clone or offload the copy where the
        // filesystem supports it
        std::fs::copy(&self.path, target).map_err(|e| Error::io(&self.path, e))
    }
}
