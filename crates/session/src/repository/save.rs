//! Save-file layout.
//!
//! A save is a frame log whose records come in a fixed order: one header
//! carrying the initial configuration, the committed action log, trailing
//! annotations, and a closing checksum of the resulting state. Loading reads
//! the records strictly in that order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::log::{FrameLog, FrameReader};
use super::{RepositoryError, Result};

/// Version written into every header; loading refuses any other.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader<C> {
    pub format_version: u32,
    pub session_id: String,
    pub config: C,
}

/// One entry of the committed action log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry<A> {
    Action(A),
    /// History was cleared here; replay clears it again.
    Barrier,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveRecord<C, A> {
    Header(SaveHeader<C>),
    Entry(LogEntry<A>),
    Annotation(String),
    Checksum(String),
}

/// Decoded contents of a save file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveFile<C, A> {
    pub header: SaveHeader<C>,
    pub entries: Vec<LogEntry<A>>,
    pub annotations: Vec<String>,
    pub checksum: String,
}

/// Writes `save` to `path`.
///
/// Frames go to a sibling temporary file that replaces `path` once fully
/// synced, so an interrupted save never clobbers the previous one.
pub fn write<C, A>(path: impl AsRef<Path>, save: &SaveFile<C, A>) -> Result<u64>
where
    C: Serialize + Clone,
    A: Serialize + Clone,
{
    let path = path.as_ref();
    let staging = staging_path(path);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }

    let mut log = FrameLog::<SaveRecord<C, A>>::create(&staging)?;
    log.append(&SaveRecord::Header(save.header.clone()))?;
    for entry in &save.entries {
        log.append(&SaveRecord::Entry(entry.clone()))?;
    }
    for note in &save.annotations {
        log.append(&SaveRecord::Annotation(note.clone()))?;
    }
    log.append(&SaveRecord::Checksum(save.checksum.clone()))?;
    let size = log.size();
    let staging = log.finish()?;

    std::fs::rename(&staging, path)?;
    tracing::debug!(
        path = %path.display(),
        entries = save.entries.len(),
        bytes = size,
        "save written"
    );
    Ok(size)
}

/// Reads a save file, enforcing record order.
pub fn read<C, A>(path: impl AsRef<Path>) -> Result<SaveFile<C, A>>
where
    C: DeserializeOwned,
    A: DeserializeOwned,
{
    let mut reader = FrameReader::<SaveRecord<C, A>>::open(path)?;

    let header = match reader.next_frame()? {
        Some((_, SaveRecord::Header(header))) => header,
        Some((offset, _)) => {
            return Err(RepositoryError::UnexpectedRecord {
                offset,
                expected: "header",
            });
        }
        None => return Err(RepositoryError::CorruptedData("empty save file".into())),
    };
    if header.format_version != FORMAT_VERSION {
        return Err(RepositoryError::UnsupportedVersion {
            found: header.format_version,
            supported: FORMAT_VERSION,
        });
    }

    let mut entries = Vec::new();
    let mut annotations = Vec::new();
    let checksum = loop {
        match reader.next_frame()? {
            Some((offset, SaveRecord::Entry(entry))) => {
                if !annotations.is_empty() {
                    return Err(RepositoryError::UnexpectedRecord {
                        offset,
                        expected: "annotation or checksum",
                    });
                }
                entries.push(entry);
            }
            Some((_, SaveRecord::Annotation(note))) => annotations.push(note),
            Some((_, SaveRecord::Checksum(checksum))) => break checksum,
            Some((offset, SaveRecord::Header(_))) => {
                return Err(RepositoryError::UnexpectedRecord {
                    offset,
                    expected: "entry, annotation or checksum",
                });
            }
            None => {
                return Err(RepositoryError::CorruptedData(
                    "save file ends without a checksum".into(),
                ));
            }
        }
    };

    if let Some((offset, _)) = reader.next_frame()? {
        return Err(RepositoryError::UnexpectedRecord {
            offset,
            expected: "end of file",
        });
    }

    Ok(SaveFile {
        header,
        entries,
        annotations,
        checksum,
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
