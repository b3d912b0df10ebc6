//! Reader for reduced-sample artifacts.

use crate::format::{EventBatch, EventRecord, SampleHeader, FORMAT_MAGIC, FORMAT_VERSION};
use crate::{BundleError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};
use zstd::stream::read::Decoder;

/// Sanity cap on a single block's declared size. A batch of 20k events with
/// a few dozen slots each stays well under this; anything larger means a
/// corrupt or hostile length prefix.
const MAX_BLOCK_BYTES: usize = 256 * 1024 * 1024;

/// A fully-loaded reduced-sample artifact.
#[derive(Debug)]
pub struct LoadedSample {
    pub header: SampleHeader,
    pub batches: Vec<EventBatch>,
}

impl LoadedSample {
    /// Total number of events across all batches.
    pub fn event_count(&self) -> usize {
        self.batches.iter().map(|batch| batch.events.len()).sum()
    }

    /// Look up an event by its position in the concatenated batches.
    pub fn event(&self, mut index: usize) -> Option<&EventRecord> {
        for batch in &self.batches {
            if index < batch.events.len() {
                return Some(&batch.events[index]);
            }
            index -= batch.events.len();
        }
        None
    }
}

/// Reads reduced-sample artifacts written by [`crate::SampleWriter`].
pub struct SampleReader;

impl SampleReader {
    /// Load an artifact from a file.
    pub fn open(path: &Path) -> Result<LoadedSample> {
        debug!(path = %path.display(), "opening reduced-sample artifact");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load an artifact from any byte source.
    ///
    /// Checks the magic string and format version before decompressing
    /// anything, then reads length-prefixed blocks until the stream ends:
    /// the header first, then every event batch.
    pub fn from_reader(mut source: impl Read) -> Result<LoadedSample> {
        let mut magic = [0u8; FORMAT_MAGIC.len()];
        source
            .read_exact(&mut magic)
            .map_err(|_| BundleError::BadMagic)?;
        if &magic != FORMAT_MAGIC {
            return Err(BundleError::BadMagic);
        }

        let mut version_bytes = [0u8; 4];
        source
            .read_exact(&mut version_bytes)
            .map_err(|_| BundleError::BadMagic)?;
        let version = u32::from_le_bytes(version_bytes);
        if version > FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let mut decoder = Decoder::new(source)?;

        let header_bytes = read_block(&mut decoder)?.ok_or(BundleError::MissingHeader)?;
        let header: SampleHeader = bincode::deserialize(&header_bytes)?;

        let mut batches = Vec::new();
        while let Some(block) = read_block(&mut decoder)? {
            let batch: EventBatch = bincode::deserialize(&block)?;
            batches.push(batch);
        }

        let loaded = LoadedSample { header, batches };
        info!(
            triggers = loaded.header.triggers.len(),
            batches = loaded.batches.len(),
            events = loaded.event_count(),
            "reduced-sample artifact loaded"
        );
        Ok(loaded)
    }
}

/// Read one length-prefixed block, or None at a clean end of stream.
fn read_block(source: &mut impl Read) -> Result<Option<Vec<u8>>> {
    let mut length_bytes = [0u8; 4];
    match source.read_exact(&mut length_bytes) {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error.into()),
    }

    let length = u32::from_le_bytes(length_bytes) as usize;
    if length > MAX_BLOCK_BYTES {
        return Err(BundleError::OversizedBlock {
            size: length,
            limit: MAX_BLOCK_BYTES,
        });
    }

    let mut block = vec![0u8; length];
    let mut read = 0;
    while read < length {
        let n = source.read(&mut block[read..])?;
        if n == 0 {
            return Err(BundleError::TruncatedBlock {
                expected: length,
                read,
            });
        }
        read += n;
    }
    Ok(Some(block))
}
