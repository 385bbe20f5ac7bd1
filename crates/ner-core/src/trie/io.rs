use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{EntityTrie, TrieNode};
use crate::normalize::CharClasses;

pub(super) const MAGIC: &[u8; 4] = b"NTRI";
pub(super) const VERSION: u8 = 1;
// magic + version + reserved(3) + payload_len + payload_crc
pub(super) const HEADER_SIZE: usize = 4 + 1 + 3 + 4 + 4;

#[derive(Debug, thiserror::Error)]
pub enum TrieIoError {
    #[error("I/O: {0}")]
    Io(#[from] io::Error),

    #[error("truncated NTRI header or payload")]
    InvalidHeader,

    #[error("not a compiled trie (missing NTRI magic)")]
    InvalidMagic,

    #[error("NTRI version {0} is not supported")]
    UnsupportedVersion(u8),

    #[error("NTRI payload does not match its CRC-32")]
    ChecksumMismatch,

    #[error("cannot encode trie: {0}")]
    Serialize(bincode::Error),

    #[error("cannot decode trie: {0}")]
    Deserialize(bincode::Error),
}

#[derive(Serialize)]
struct TrieDataRef<'a> {
    word_chars: String,
    key_count: u64,
    root: &'a TrieNode,
}

#[derive(Deserialize)]
struct TrieData {
    word_chars: String,
    key_count: u64,
    root: TrieNode,
}

impl EntityTrie {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TrieIoError> {
        let data = TrieDataRef {
            word_chars: self.word_chars(),
            key_count: self.key_count as u64,
            root: &self.root,
        };
        let payload = bincode::serialize(&data).map_err(TrieIoError::Serialize)?;
        let payload_len: u32 = payload.len().try_into().map_err(|_| {
            TrieIoError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "trie payload exceeds u32::MAX",
            ))
        })?;

        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[VERSION, 0, 0, 0]);
        out.extend_from_slice(&payload_len.to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// `data` begins like a compiled trie file.
    pub fn is_compiled(data: &[u8]) -> bool {
        data.starts_with(MAGIC)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, TrieIoError> {
        let stored: TrieData =
            bincode::deserialize(checked_payload(data)?).map_err(TrieIoError::Deserialize)?;
        Ok(Self {
            root: stored.root,
            classes: CharClasses::with_word_chars(&stored.word_chars),
            key_count: stored.key_count as usize,
        })
    }

    pub fn open(path: &Path) -> Result<Self, TrieIoError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Written to a sibling `.tmp` file first, then renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<(), TrieIoError> {
        let bytes = self.to_bytes()?;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

/// Check magic, version, length and checksum; returns the payload.
fn checked_payload(data: &[u8]) -> Result<&[u8], TrieIoError> {
    match data.get(..5) {
        None => return Err(TrieIoError::InvalidHeader),
        Some(head) if &head[..4] != MAGIC => return Err(TrieIoError::InvalidMagic),
        Some(head) if head[4] != VERSION => return Err(TrieIoError::UnsupportedVersion(head[4])),
        Some(_) => {}
    }
    let header = data.get(..HEADER_SIZE).ok_or(TrieIoError::InvalidHeader)?;
    let payload_len = le_u32(&header[8..12]) as usize;
    let checksum = le_u32(&header[12..16]);
    let payload = data
        .get(HEADER_SIZE..HEADER_SIZE + payload_len)
        .ok_or(TrieIoError::InvalidHeader)?;
    if crc32fast::hash(payload) != checksum {
        return Err(TrieIoError::ChecksumMismatch);
    }
    Ok(payload)
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut le = [0u8; 4];
    le.copy_from_slice(bytes);
    u32::from_le_bytes(le)
}
