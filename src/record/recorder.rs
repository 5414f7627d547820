//! Generation recorder for capturing placement runs.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::format::{Compression, FrameIndex, RecordHeader, encode_record};
use crate::compute::placement::GenerationRecord;

/// Configuration for generation recording.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub compression: Compression,
    /// Record every Nth generation (1 = every generation).
    pub every: u32,
    /// Maximum generations to record (0 = unlimited).
    pub max_generations: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            every: 1,
            max_generations: 0,
        }
    }
}

/// Writes [`GenerationRecord`]s to a `.wgen` file.
///
/// Usage:
/// ```ignore
/// let mut recorder = GenerationRecorder::create("run.wgen", 200, 90, Default::default())?;
/// engine.run_with_callback(|record, _| {
///     recorder.record(record).ok();
/// })?;
/// recorder.finalize()?;
/// ```
pub struct GenerationRecorder {
    writer: BufWriter<File>,
    header: RecordHeader,
    frame_indices: Vec<FrameIndex>,
    config: RecorderConfig,
    counter: u32,
}

impl GenerationRecorder {
    /// Create a record file for a run of `wells` wells on a `field_size` grid.
    pub fn create<P: AsRef<Path>>(
        path: P,
        field_size: usize,
        wells: usize,
        config: RecorderConfig,
    ) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);

        let header = RecordHeader {
            field_size: field_size as u32,
            wells: wells as u32,
            generation_count: 0,
            compression: config.compression,
        };
        // Placeholder; rewritten with the final count.
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            header,
            frame_indices: Vec::new(),
            config,
            counter: 0,
        })
    }

    /// Append a generation.
    ///
    /// Returns true if the generation was written (skipped per config otherwise).
    pub fn record(&mut self, record: &GenerationRecord) -> io::Result<bool> {
        self.counter += 1;
        if self.counter < self.config.every.max(1) {
            return Ok(false);
        }
        self.counter = 0;

        if self.config.max_generations > 0
            && self.frame_indices.len() as u64 >= self.config.max_generations
        {
            return Ok(false);
        }

        let offset = self.writer.stream_position()?;
        let data = self.header.compression.pack(encode_record(record));
        self.writer.write_all(&data)?;
        self.frame_indices.push(FrameIndex {
            offset,
            size: data.len() as u64,
        });

        Ok(true)
    }

    /// Generations written so far.
    pub fn generations_written(&self) -> u64 {
        self.frame_indices.len() as u64
    }

    /// Write the index table and the final header.
    pub fn finalize(mut self) -> io::Result<RecordStats> {
        let index_offset = self.writer.stream_position()?;
        for index in &self.frame_indices {
            index.write_to(&mut self.writer)?;
        }

        self.header.generation_count = self.frame_indices.len() as u64;
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.writer)?;
        self.writer.flush()?;

        let frames = self.header.generation_count;
        let data_bytes = index_offset.saturating_sub(RecordHeader::SIZE as u64);
        Ok(RecordStats {
            generation_count: frames,
            total_bytes: index_offset + frames * FrameIndex::SIZE as u64,
            average_frame_size: if frames > 0 { data_bytes / frames } else { 0 },
            compression: self.header.compression,
        })
    }
}

/// Statistics from a recording session.
#[derive(Debug, Clone)]
pub struct RecordStats {
    pub generation_count: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    pub average_frame_size: u64,
    pub compression: Compression,
}

impl std::fmt::Display for RecordStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} generations, {} bytes total, {} bytes/generation avg ({:?} compression)",
            self.generation_count, self.total_bytes, self.average_frame_size, self.compression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Point;
    use crate::compute::placement::{GenerationStats, Individual};
    use std::fs;
    use tempfile::tempdir;

    fn sample_record(generation: usize) -> GenerationRecord {
        let breeding = vec![
            Individual::new(Point::new(generation, 1), 1.0),
            Individual::new(Point::new(2, generation), 0.5),
        ];
        GenerationRecord {
            generation,
            offspring: vec![Individual::new(Point::new(1, 1), 0.75)],
            stats: GenerationStats::from_population(&breeding),
            breeding,
        }
    }

    #[test]
    fn test_recorder_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.wgen");

        let mut recorder = GenerationRecorder::create(&path, 10, 4, Default::default()).unwrap();
        for g in 0..10 {
            assert!(recorder.record(&sample_record(g)).unwrap());
        }
        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.generation_count, 10);

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), stats.total_bytes);
        assert!(metadata.len() > RecordHeader::SIZE as u64);
    }

    #[test]
    fn test_recorder_every() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("every.wgen");
        let config = RecorderConfig {
            every: 5,
            ..Default::default()
        };

        let mut recorder = GenerationRecorder::create(&path, 10, 4, config).unwrap();
        // 20 generations, kept at 5, 10, 15, 20
        for g in 0..20 {
            recorder.record(&sample_record(g)).unwrap();
        }
        assert_eq!(recorder.finalize().unwrap().generation_count, 4);
    }

    #[test]
    fn test_recorder_max_generations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("max.wgen");
        let config = RecorderConfig {
            max_generations: 3,
            ..Default::default()
        };

        let mut recorder = GenerationRecorder::create(&path, 10, 4, config).unwrap();
        for g in 0..50 {
            recorder.record(&sample_record(g)).unwrap();
        }
        assert_eq!(recorder.generations_written(), 3);
        assert_eq!(recorder.finalize().unwrap().generation_count, 3);
    }

    #[test]
    fn test_empty_recording() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wgen");

        let recorder = GenerationRecorder::create(&path, 10, 4, Default::default()).unwrap();
        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.generation_count, 0);
        assert_eq!(stats.average_frame_size, 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), RecordHeader::SIZE as u64);
    }
}
