//! Length-prefixed frame files.
//!
//! Frames are stored back to back:
//! ```text
//! [u32 LE length][bincode serialized T]
//! [u32 LE length][bincode serialized T]
//! ...
//! ```
//! [`FrameLog`] appends, [`FrameReader`] walks the frames from the start.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use super::{RepositoryError, Result};

/// Size of the length prefix in front of every frame.
const PREFIX_LEN: u64 = 4;

/// Append-only writer of frames of type `T`.
pub struct FrameLog<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    current_offset: u64,
    _phantom: PhantomData<T>,
}

impl<T> FrameLog<T>
where
    T: Serialize,
{
    /// Creates a new log file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns error if the file already exists (prevents accidental overwrites).
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            return Err(RepositoryError::LogAlreadyExists(
                path.display().to_string(),
            ));
        }

        let file = OpenOptions::new().create_new(true).write(true).open(path)?;
        tracing::debug!("Created frame log: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_offset: 0,
            _phantom: PhantomData,
        })
    }

    /// Appends one frame and returns the byte offset it was written at.
    pub fn append(&mut self, item: &T) -> Result<u64> {
        let offset = self.current_offset;

        let bytes =
            bincode::serialize(item).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let len = u32::try_from(bytes.len()).map_err(|_| {
            RepositoryError::Serialization(format!("frame of {} bytes is too large", bytes.len()))
        })?;

        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        self.current_offset += PREFIX_LEN + bytes.len() as u64;

        Ok(offset)
    }

    /// Flushes and syncs the file to disk, consuming the log.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.path.clone())
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.current_offset
    }
}

impl<T> Drop for FrameLog<T> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(
                "Failed to flush frame log '{}' on drop: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Sequential reader over the frames of a log file.
pub struct FrameReader<T> {
    reader: BufReader<File>,
    offset: u64,
    file_size: u64,
    _phantom: PhantomData<T>,
}

impl<T> FrameReader<T>
where
    T: DeserializeOwned,
{
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            offset: 0,
            file_size,
            _phantom: PhantomData,
        })
    }

    /// Reads the next frame, returning it with the offset it started at.
    ///
    /// Returns `None` at a clean end of file. A frame cut short is reported as
    /// [`RepositoryError::PartialWrite`].
    pub fn next_frame(&mut self) -> Result<Option<(u64, T)>> {
        let offset = self.offset;
        let remaining = self.file_size.saturating_sub(offset);
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < PREFIX_LEN {
            return Err(RepositoryError::PartialWrite {
                offset,
                expected: PREFIX_LEN as usize,
                actual: remaining as usize,
            });
        }

        let mut len_bytes = [0u8; PREFIX_LEN as usize];
        self.reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        let available = remaining - PREFIX_LEN;
        if (len as u64) > available {
            return Err(RepositoryError::PartialWrite {
                offset,
                expected: len,
                actual: available as usize,
            });
        }

        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data)?;
        let item = bincode::deserialize(&data)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        self.offset = offset + PREFIX_LEN + len as u64;
        Ok(Some((offset, item)))
    }
}
