//! The auxiliary file index: a chain of `(name, offset)` pairs mapping tar
//! member pathnames to their header's byte offset in the uncompressed tar
//! stream, serialized as the payload of one extra XZ block appended after
//! the data blocks.

use crate::error::Result;
use crate::lzma::StreamingBlockEncoder;

const CHUNK_SIZE: usize = 64 * 1024;

/// One entry in the chain. `name = None` marks the sentinel, which is
/// always last and carries the total uncompressed tar size as its offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub name: Option<String>,
    pub offset: u64,
}

/// Builds the file-index chain while the tar stream is read, applying the
/// AppleDouble multi-header collapse rule: a run of `._`-prefixed members
/// immediately preceding a real member collapses into one entry carrying
/// the *first* fragment's offset and the real member's name.
#[derive(Default)]
pub struct FileIndexBuilder {
    entries: Vec<FileIndexEntry>,
    pending_offset: Option<u64>,
}

fn is_multi_header(name: &str) -> bool {
    name.rsplit('/').next().unwrap_or(name).starts_with("._")
}

impl FileIndexBuilder {
    pub fn new() -> Self {
        FileIndexBuilder::default()
    }

    /// Registers the header of a tar member observed at `offset`.
    pub fn add_header(&mut self, name: &str, offset: u64) {
        if is_multi_header(name) {
            if self.pending_offset.is_none() {
                self.pending_offset = Some(offset);
            }
            return;
        }

        let entry_offset = self.pending_offset.take().unwrap_or(offset);
        self.entries.push(FileIndexEntry {
            name: Some(name.to_string()),
            offset: entry_offset,
        });
    }

    /// Closes the chain with the sentinel entry. `total_read` is the total
    /// number of bytes the reader observed on the raw tar stream, used as
    /// the sentinel's `offset` when there is no fragment run still pending.
    ///
    /// A fragment run with no following real member (a multi-header run
    /// that is truncated at end-of-archive) is flushed into the sentinel
    /// instead: the sentinel's `offset` becomes the *first* fragment's
    /// offset rather than `total_read`, so the orphaned run is not
    /// discarded silently.
    pub fn finish(mut self, total_read: u64) -> Vec<FileIndexEntry> {
        let offset = self.pending_offset.take().unwrap_or(total_read);
        self.entries.push(FileIndexEntry { name: None, offset });
        self.entries
    }
}

/// Appends one entry's serialized form to `buf`: `name` as NUL-terminated
/// UTF-8 (the sentinel's name is empty, i.e. a lone `0x00`) followed by the
/// 8-byte little-endian offset.
fn serialize_entry(entry: &FileIndexEntry, buf: &mut Vec<u8>) {
    if let Some(name) = &entry.name {
        buf.extend_from_slice(name.as_bytes());
    }
    buf.push(0);
    buf.extend_from_slice(&entry.offset.to_le_bytes());
}

/// Serializes the whole file-index chain at once. Used where the caller
/// already needs the full payload in memory (the test round-trip below);
/// [`compress_payload`] does not use this, to avoid materializing the whole
/// index for large archives.
#[cfg(test)]
fn serialize(entries: &[FileIndexEntry]) -> Vec<u8> {
    let mut buf = Vec::new();
    for entry in entries {
        serialize_entry(entry, &mut buf);
    }
    buf
}

/// Streams the serialized file-index payload through the LZMA2 encoder in
/// fixed-size chunks: each entry is serialized into a small scratch buffer
/// that is flushed to the encoder once it reaches `CHUNK_SIZE`, so the full
/// uncompressed payload is never held in memory at once.
pub fn compress_payload(entries: &[FileIndexEntry], preset: u32) -> Result<Vec<u8>> {
    let mut encoder = StreamingBlockEncoder::new(preset);
    let mut chunk = Vec::with_capacity(CHUNK_SIZE);
    for entry in entries {
        serialize_entry(entry, &mut chunk);
        if chunk.len() >= CHUNK_SIZE {
            encoder.write(&chunk)?;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        encoder.write(&chunk)?;
    }
    encoder.finish()
}

/// Parses a file-index payload back into its entries, the inverse of
/// [`serialize`]. Used by the lister.
pub fn parse_payload(mut buf: &[u8]) -> std::io::Result<Vec<FileIndexEntry>> {
    let mut entries = Vec::new();
    loop {
        let nul = buf
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "missing NUL"))?;
        let name_bytes = &buf[..nul];
        buf = &buf[nul + 1..];
        if buf.len() < 8 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "truncated file index offset",
            ));
        }
        let offset = u64::from_le_bytes(buf[..8].try_into().unwrap());
        buf = &buf[8..];

        let name = if name_bytes.is_empty() {
            None
        } else {
            Some(
                String::from_utf8(name_bytes.to_vec())
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            )
        };
        let is_sentinel = name.is_none();
        entries.push(FileIndexEntry { name, offset });
        if is_sentinel {
            break;
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_produces_name_then_sentinel() {
        let mut b = FileIndexBuilder::new();
        b.add_header("hello.txt", 0);
        let entries = b.finish(512);
        assert_eq!(
            entries,
            vec![
                FileIndexEntry { name: Some("hello.txt".into()), offset: 0 },
                FileIndexEntry { name: None, offset: 512 },
            ]
        );
    }

    #[test]
    fn apple_double_pair_collapses_to_one_entry() {
        let mut b = FileIndexBuilder::new();
        b.add_header("._foo", 0);
        b.add_header("foo", 1536);
        let entries = b.finish(3072);
        assert_eq!(
            entries,
            vec![
                FileIndexEntry { name: Some("foo".into()), offset: 0 },
                FileIndexEntry { name: None, offset: 3072 },
            ]
        );
    }

    #[test]
    fn multi_header_run_truncated_at_eof_is_not_lost() {
        let mut b = FileIndexBuilder::new();
        b.add_header("._orphan", 0);
        let entries = b.finish(512);
        assert_eq!(entries, vec![FileIndexEntry { name: None, offset: 0 }]);
    }

    #[test]
    fn empty_archive_has_only_the_sentinel() {
        let b = FileIndexBuilder::new();
        let entries = b.finish(1024);
        assert_eq!(entries, vec![FileIndexEntry { name: None, offset: 1024 }]);
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let mut b = FileIndexBuilder::new();
        b.add_header("a/b.txt", 0);
        b.add_header("c.txt", 1024);
        let entries = b.finish(2048);

        let bytes = serialize(&entries);
        let parsed = parse_payload(&bytes).unwrap();
        assert_eq!(parsed, entries);
    }
}
