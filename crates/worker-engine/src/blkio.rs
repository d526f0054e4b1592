//! Block I/O load generator

use crate::{check_rounds, LoadError, Result};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use worker_core::{BlockIoConfig, BlockIoRequest};

const CHUNK_SIZE: usize = 64 * 1024;
const TEMP_PREFIX: &str = "rws";

pub fn validate(request: &BlockIoRequest) -> Result<()> {
    if request.read_size < 0 || request.write_size < 0 {
        return Err(LoadError::Validation(
            "Sizes of a blkio request cannot be negative!".to_string(),
        ));
    }
    check_rounds(request.rounds())
}

/// Bytes moved by one block I/O request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockIoStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Reads a pre-existing data file and writes throwaway temp files
#[derive(Debug, Clone)]
pub struct BlockIoLoad {
    data_file: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl BlockIoLoad {
    pub fn new(config: &BlockIoConfig) -> Self {
        Self {
            data_file: config.data_file.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Run every round of the request; blocking
    pub fn run(&self, request: &BlockIoRequest) -> Result<BlockIoStats> {
        validate(request)?;

        let mut stats = BlockIoStats::default();
        for _ in 0..request.rounds() {
            if request.read_size > 0 {
                stats.bytes_read += self.read(request.read_size as u64)?;
            }
            if request.write_size > 0 {
                stats.bytes_written += self.write(request.write_size as u64)?;
            }
        }

        debug!(
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            "Block I/O request complete"
        );
        Ok(stats)
    }

    /// Read `size` bytes from the data file, wrapping to the start on EOF
    fn read(&self, size: u64) -> Result<u64> {
        let path = &self.data_file;
        let mut file = File::open(path).map_err(|source| LoadError::FileOpenFailure {
            path: path.clone(),
            source,
        })?;

        let metadata = file.metadata().map_err(|source| LoadError::FileStatFailure {
            path: path.clone(),
            source,
        })?;
        let read_failure = |source: io::Error| LoadError::ReadFailure {
            path: path.clone(),
            source,
        };
        if metadata.len() == 0 {
            return Err(read_failure(io::Error::new(
                ErrorKind::UnexpectedEof,
                "data file is empty",
            )));
        }

        let mut buffer = vec![0u8; CHUNK_SIZE.min(size as usize)];
        let mut remaining = size;
        while remaining > 0 {
            let want = buffer.len().min(remaining as usize);
            match file.read(&mut buffer[..want]) {
                Ok(0) => {
                    file.seek(SeekFrom::Start(0)).map_err(read_failure)?;
                }
                Ok(n) => remaining -= n as u64,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_failure(e)),
            }
        }

        Ok(size)
    }

    /// Write `size` zero bytes to a fresh temp file, removed before returning
    fn write(&self, size: u64) -> Result<u64> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);

        let created = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let temp = created.map_err(|source| LoadError::FileOpenFailure {
            path: self
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        // The path guard deletes the file when dropped, on every exit path
        let (mut file, temp_path) = temp.into_parts();
        let path = temp_path.to_path_buf();

        let chunk = vec![0u8; CHUNK_SIZE.min(size as usize)];
        let mut remaining = size;
        while remaining > 0 {
            let n = chunk.len().min(remaining as usize);
            file.write_all(&chunk[..n])
                .map_err(|source| LoadError::WriteFailure {
                    path: path.clone(),
                    source,
                })?;
            remaining -= n as u64;
        }

        file.sync_all().map_err(|source| LoadError::FileCloseFailure {
            path: path.clone(),
            source,
        })?;
        drop(file);

        temp_path
            .close()
            .map_err(|source| LoadError::FileCloseFailure { path, source })?;

        Ok(size)
    }
}
