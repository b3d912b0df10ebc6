//! Streaming writer for reduced-sample artifacts.

use crate::format::{EventBatch, SampleHeader, FORMAT_MAGIC, FORMAT_VERSION};
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};
use zstd::stream::write::Encoder;

/// Compression level for the block stream. Zstd's default strikes the
/// balance the artifact needs: fast enough to write per-event data inline,
/// small enough to keep multi-million-event samples portable.
const COMPRESSION_LEVEL: i32 = 0;

/// Writes a reduced-sample artifact block by block.
///
/// The magic string and format version go out uncompressed when the writer
/// is created; the header and every batch go through the compressed stream.
/// Call [`SampleWriter::finish`] to flush the compressor frame — dropping
/// the writer without finishing leaves a truncated file.
pub struct SampleWriter<W: Write> {
    encoder: Encoder<'static, W>,
    batches_written: usize,
    events_written: usize,
}

impl SampleWriter<File> {
    /// Create an artifact file and write the preamble and header.
    pub fn create(path: &Path, header: &SampleHeader) -> Result<Self> {
        let file = File::create(path)?;
        let writer = Self::new(file, header)?;
        debug!(path = %path.display(), "created reduced-sample artifact");
        Ok(writer)
    }
}

impl<W: Write> SampleWriter<W> {
    /// Start an artifact on an arbitrary sink and write the preamble and
    /// header.
    pub fn new(mut sink: W, header: &SampleHeader) -> Result<Self> {
        sink.write_all(FORMAT_MAGIC)?;
        sink.write_all(&FORMAT_VERSION.to_le_bytes())?;

        let mut writer = SampleWriter {
            encoder: Encoder::new(sink, COMPRESSION_LEVEL)?,
            batches_written: 0,
            events_written: 0,
        };
        writer.write_block(header)?;
        Ok(writer)
    }

    /// Append one event batch as a length-prefixed block.
    pub fn write_batch(&mut self, batch: &EventBatch) -> Result<()> {
        self.write_block(batch)?;
        self.batches_written += 1;
        self.events_written += batch.events.len();
        Ok(())
    }

    /// Flush the compressed stream and return the underlying sink.
    pub fn finish(self) -> Result<W> {
        let sink = self.encoder.finish()?;
        info!(
            batches = self.batches_written,
            events = self.events_written,
            "reduced-sample artifact written"
        );
        Ok(sink)
    }

    fn write_block<T: serde::Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        let length = bytes.len() as u32;
        self.encoder.write_all(&length.to_le_bytes())?;
        self.encoder.write_all(&bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EventRecord;
    use crate::reader::SampleReader;

    fn header() -> SampleHeader {
        SampleHeader::new(vec![], 1.0)
    }

    #[test]
    fn preamble_is_uncompressed() {
        let writer = SampleWriter::new(Vec::new(), &header()).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(&bytes[..FORMAT_MAGIC.len()], FORMAT_MAGIC);
        let version = u32::from_le_bytes(
            bytes[FORMAT_MAGIC.len()..FORMAT_MAGIC.len() + 4]
                .try_into()
                .unwrap(),
        );
        assert_eq!(version, FORMAT_VERSION);
    }

    #[test]
    fn write_and_reload_batches() {
        let mut writer = SampleWriter::new(Vec::new(), &header()).unwrap();
        for start in [0, 3] {
            let batch = EventBatch {
                events: (start..start + 3)
                    .map(|i| EventRecord {
                        thresholds: vec![i as f32],
                        weight: None,
                    })
                    .collect(),
            };
            writer.write_batch(&batch).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let loaded = SampleReader::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(loaded.batches.len(), 2);
        assert_eq!(loaded.event_count(), 6);
        assert_eq!(loaded.event(4).unwrap().thresholds, vec![4.0]);
    }
}
