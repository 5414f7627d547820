//! Reader for recorded placement runs.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::format::{FrameIndex, RecordHeader, decode_record};
use crate::compute::placement::GenerationRecord;

/// Random access to the generations of a `.wgen` file.
///
/// Usage:
/// ```ignore
/// let mut reader = RecordReader::open("run.wgen")?;
/// let last = reader.read(reader.generation_count() - 1)?;
/// for record in reader.records() {
///     let record = record?;
///     println!("{}: {:.3}", record.generation, record.stats.best_fitness);
/// }
/// ```
pub struct RecordReader {
    reader: BufReader<File>,
    header: RecordHeader,
    frame_indices: Vec<FrameIndex>,
}

impl RecordReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let header = RecordHeader::read_from(&mut reader)?;

        // The index table sits at the end of the file.
        let index_bytes = header
            .generation_count
            .checked_mul(FrameIndex::SIZE as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Corrupt frame count"))?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        let index_start = file_len
            .checked_sub(index_bytes)
            .filter(|&start| start >= RecordHeader::SIZE as u64)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "Truncated frame index table")
            })?;
        reader.seek(SeekFrom::Start(index_start))?;

        // Every frame must lie between the header and the index table.
        let mut frame_indices = Vec::with_capacity(header.generation_count as usize);
        for i in 0..header.generation_count {
            let entry = FrameIndex::read_from(&mut reader)?;
            let in_bounds = entry.offset >= RecordHeader::SIZE as u64
                && entry
                    .offset
                    .checked_add(entry.size)
                    .is_some_and(|end| end <= index_start);
            if !in_bounds {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Frame {} at offset {} with {} bytes lies outside the data section",
                        i, entry.offset, entry.size
                    ),
                ));
            }
            frame_indices.push(entry);
        }

        Ok(Self {
            reader,
            header,
            frame_indices,
        })
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Number of recorded generations.
    pub fn generation_count(&self) -> u64 {
        self.header.generation_count
    }

    pub fn field_size(&self) -> usize {
        self.header.field_size as usize
    }

    pub fn wells(&self) -> usize {
        self.header.wells as usize
    }

    /// Read the `index`-th stored frame.
    pub fn read(&mut self, index: u64) -> io::Result<GenerationRecord> {
        let entry = self
            .frame_indices
            .get(index as usize)
            .copied()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "Frame index {} out of range ({} frames)",
                        index, self.header.generation_count
                    ),
                )
            })?;

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut data = vec![0u8; entry.size as usize];
        self.reader.read_exact(&mut data)?;

        decode_record(&self.header.compression.unpack(data)?)
    }

    /// Iterate over every stored frame in order.
    pub fn records(&mut self) -> RecordIterator<'_> {
        RecordIterator {
            reader: self,
            current: 0,
        }
    }
}

/// Iterator over recorded generations.
pub struct RecordIterator<'a> {
    reader: &'a mut RecordReader,
    current: u64,
}

impl Iterator for RecordIterator<'_> {
    type Item = io::Result<GenerationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.reader.generation_count() {
            return None;
        }
        let result = self.reader.read(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.reader.generation_count() - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Field;
    use crate::compute::Point;
    use crate::compute::placement::{GenerationStats, Individual, PlacementEngine};
    use crate::record::{Compression, GenerationRecorder, RecorderConfig};
    use crate::schema::{HeatmapConfig, Scenario};
    use tempfile::tempdir;

    fn sample_record(generation: usize) -> GenerationRecord {
        let breeding = vec![
            Individual::new(Point::new(generation, 0), 1.0 / (1 + generation) as f64),
            Individual::new(Point::new(0, generation), 0.25),
        ];
        GenerationRecord {
            generation,
            offspring: vec![Individual::new(Point::new(generation, generation), 0.5)],
            stats: GenerationStats::from_population(&breeding),
            breeding,
        }
    }

    fn write(path: &Path, records: &[GenerationRecord], config: RecorderConfig) {
        let mut recorder = GenerationRecorder::create(path, 16, 2, config).unwrap();
        for record in records {
            recorder.record(record).unwrap();
        }
        recorder.finalize().unwrap();
    }

    #[test]
    fn test_reader_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.wgen");
        let records: Vec<_> = (0..5).map(sample_record).collect();
        write(&path, &records, RecorderConfig::default());

        let mut reader = RecordReader::open(&path).unwrap();
        assert_eq!(reader.generation_count(), 5);
        assert_eq!(reader.field_size(), 16);
        assert_eq!(reader.wells(), 2);

        for (i, expected) in records.iter().enumerate() {
            let loaded = reader.read(i as u64).unwrap();
            assert_eq!(loaded.generation, expected.generation);
            assert_eq!(loaded.breeding, expected.breeding);
            assert_eq!(loaded.offspring, expected.offspring);
            assert_eq!(loaded.stats, expected.stats);
        }
    }

    #[test]
    fn test_reader_compressed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lz4.wgen");
        let records: Vec<_> = (0..3).map(sample_record).collect();
        let config = RecorderConfig {
            compression: Compression::Lz4,
            ..Default::default()
        };
        write(&path, &records, config);

        let mut reader = RecordReader::open(&path).unwrap();
        assert_eq!(reader.header().compression, Compression::Lz4);
        let loaded = reader.read(2).unwrap();
        assert_eq!(loaded.offspring, records[2].offspring);
    }

    #[test]
    fn test_reader_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("range.wgen");
        write(&path, &[sample_record(0)], RecorderConfig::default());

        let mut reader = RecordReader::open(&path).unwrap();
        let err = reader.read(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_reader_iterator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iter.wgen");
        let records: Vec<_> = (0..4).map(sample_record).collect();
        write(&path, &records, RecorderConfig::default());

        let mut reader = RecordReader::open(&path).unwrap();
        let iter = reader.records();
        assert_eq!(iter.len(), 4);
        let generations: Vec<usize> = iter.map(|r| r.unwrap().generation).collect();
        assert_eq!(generations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("truncated.wgen");
        let records: Vec<_> = (0..3).map(sample_record).collect();
        write(&path, &records, RecorderConfig::default());

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..RecordHeader::SIZE + 8]).unwrap();
        assert!(RecordReader::open(&path).is_err());
    }

    #[test]
    fn test_corrupt_frame_index_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.wgen");
        let records: Vec<_> = (0..2).map(sample_record).collect();
        write(&path, &records, RecorderConfig::default());
        let bytes = std::fs::read(&path).unwrap();
        let n = bytes.len();

        // Size of the last frame.
        let mut huge = bytes.clone();
        huge[n - 8..].copy_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, &huge).unwrap();
        let err = RecordReader::open(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // Offset of the last frame, pointing into the header.
        let mut early = bytes.clone();
        early[n - 16..n - 8].copy_from_slice(&4u64.to_le_bytes());
        std::fs::write(&path, &early).unwrap();
        let err = RecordReader::open(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // Frame running into the index table.
        let mut overlap = bytes;
        let size = u64::from_le_bytes(overlap[n - 8..].try_into().unwrap());
        overlap[n - 8..].copy_from_slice(&(size + 1).to_le_bytes());
        std::fs::write(&path, &overlap).unwrap();
        let err = RecordReader::open(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_records_engine_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.wgen");

        let scenario = Scenario {
            field: HeatmapConfig {
                size: 12,
                ..Default::default()
            },
            wells: 6,
            generations: 4,
            random_seed: Some(3),
            ..Default::default()
        };
        let field = Field::from_fn(12, |r, c| (r + c) as f64 / 22.0);

        let mut recorder =
            GenerationRecorder::create(&path, 12, scenario.wells, Default::default()).unwrap();
        let mut seen = Vec::new();
        let mut engine = PlacementEngine::new(scenario, field).unwrap();
        engine
            .run_with_callback(|record, _| {
                recorder.record(record).unwrap();
                seen.push(record.clone());
            })
            .unwrap();
        recorder.finalize().unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        assert_eq!(reader.generation_count(), 4);
        for (loaded, expected) in reader.records().zip(&seen) {
            let loaded = loaded.unwrap();
            assert_eq!(loaded.generation, expected.generation);
            assert_eq!(loaded.breeding, expected.breeding);
            assert_eq!(loaded.offspring, expected.offspring);
        }
    }
}
