//! Binary layouts for field caches and generation records.

use std::io::{self, Read, Write};

use crate::compute::Point;
use crate::compute::placement::{GenerationRecord, GenerationStats, Individual};

/// Magic bytes identifying a field cache file.
pub const FIELD_MAGIC: &[u8; 4] = b"WFLD";

/// Magic bytes identifying a generation record file.
pub const RECORD_MAGIC: &[u8; 4] = b"WGEN";

/// Current version of both formats.
pub const FORMAT_VERSION: u16 = 1;

/// Compression applied to payload blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Compression {
    /// Raw little-endian data.
    #[default]
    None = 0,
    /// LZ4 block compression. Without the `lz4` feature data is stored raw.
    Lz4 = 1,
}

impl Compression {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Compression::None),
            1 => Some(Compression::Lz4),
            _ => None,
        }
    }

    pub fn to_flags(self) -> u16 {
        self as u16
    }

    pub fn from_flags(flags: u16) -> Self {
        Self::from_u8((flags & 0x0F) as u8).unwrap_or_default()
    }

    /// Compress a payload block.
    pub fn pack(self, data: Vec<u8>) -> Vec<u8> {
        match self {
            Compression::None => data,
            Compression::Lz4 => compress_lz4(&data),
        }
    }

    /// Reverse [`Compression::pack`].
    pub fn unpack(self, data: Vec<u8>) -> io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data),
            Compression::Lz4 => decompress_lz4(&data),
        }
    }

    /// Largest payload that `stored` bytes can unpack to.
    pub fn max_unpacked_len(self, stored: u64) -> u64 {
        match self {
            Compression::None => stored,
            Compression::Lz4 => stored.saturating_mul(LZ4_MAX_RATIO).saturating_add(16),
        }
    }
}

/// Upper bound on the LZ4 block expansion ratio.
const LZ4_MAX_RATIO: u64 = 255;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_magic<R: Read>(r: &mut R, expected: &[u8; 4]) -> io::Result<()> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != expected {
        return Err(invalid(format!(
            "Invalid magic bytes, expected {}",
            String::from_utf8_lossy(expected)
        )));
    }

    let mut buf2 = [0u8; 2];
    r.read_exact(&mut buf2)?;
    let version = u16::from_le_bytes(buf2);
    if version != FORMAT_VERSION {
        return Err(invalid(format!(
            "Unsupported {} version: {}",
            String::from_utf8_lossy(expected),
            version
        )));
    }
    Ok(())
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Header of a `.wfld` field cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldHeader {
    /// Grid edge length.
    pub size: u32,
    pub compression: Compression,
}

impl FieldHeader {
    /// Magic(4) + Version(2) + Flags(2) + Size(4) + Reserved(8) = 20
    pub const SIZE: usize = 20;

    /// Uncompressed payload size in bytes.
    ///
    /// Fails with `InvalidData` when the size does not fit in memory.
    pub fn payload_size(&self) -> io::Result<usize> {
        let size = self.size as usize;
        size.checked_mul(size)
            .and_then(|cells| cells.checked_mul(8))
            .ok_or_else(|| invalid(format!("Field size {} overflows", self.size)))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(FIELD_MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&self.compression.to_flags().to_le_bytes())?;
        w.write_all(&self.size.to_le_bytes())?;
        w.write_all(&[0u8; 8])?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        read_magic(r, FIELD_MAGIC)?;
        let compression = Compression::from_flags(read_u16(r)?);
        let size = read_u32(r)?;
        let mut reserved = [0u8; 8];
        r.read_exact(&mut reserved)?;
        Ok(Self { size, compression })
    }
}

/// Header of a `.wgen` generation record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    /// Edge length of the field the run was placed on.
    pub field_size: u32,
    /// Target well count of the run.
    pub wells: u32,
    /// Frames stored in the file.
    pub generation_count: u64,
    pub compression: Compression,
}

impl RecordHeader {
    /// Magic(4) + Version(2) + Flags(2) + FieldSize(4) + Wells(4) +
    /// GenerationCount(8) + Reserved(8) = 32
    pub const SIZE: usize = 32;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(RECORD_MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&self.compression.to_flags().to_le_bytes())?;
        w.write_all(&self.field_size.to_le_bytes())?;
        w.write_all(&self.wells.to_le_bytes())?;
        w.write_all(&self.generation_count.to_le_bytes())?;
        w.write_all(&[0u8; 8])?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        read_magic(r, RECORD_MAGIC)?;
        let compression = Compression::from_flags(read_u16(r)?);
        let field_size = read_u32(r)?;
        let wells = read_u32(r)?;
        let generation_count = read_u64(r)?;
        let mut reserved = [0u8; 8];
        r.read_exact(&mut reserved)?;
        Ok(Self {
            field_size,
            wells,
            generation_count,
            compression,
        })
    }
}

/// Index entry locating one generation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    /// Byte offset from start of file.
    pub offset: u64,
    /// Stored size in bytes (after compression).
    pub size: u64,
}

impl FrameIndex {
    pub const SIZE: usize = 16;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.offset.to_le_bytes())?;
        w.write_all(&self.size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let offset = read_u64(r)?;
        let size = read_u64(r)?;
        Ok(Self { offset, size })
    }
}

/// Encode field values as little-endian f64.
pub fn encode_values(data: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 8);
    for v in data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f64 values, which must fill `output` exactly.
pub fn decode_values(bytes: &[u8], output: &mut [f64]) -> io::Result<()> {
    if bytes.len() != output.len() * 8 {
        return Err(invalid(format!(
            "Field size mismatch: {} bytes vs {} values",
            bytes.len(),
            output.len()
        )));
    }
    for (v, chunk) in output.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        *v = f64::from_le_bytes(buf);
    }
    Ok(())
}

// Individual: row u32, col u32, fitness f64.
const INDIVIDUAL_SIZE: usize = 16;

// Generation, three fitness stats, population and the two set counts.
const FRAME_FIXED_SIZE: usize = 8 + 3 * 8 + 4 + 2 * 4;

fn write_individuals(out: &mut Vec<u8>, individuals: &[Individual]) {
    out.extend_from_slice(&(individuals.len() as u32).to_le_bytes());
    for ind in individuals {
        out.extend_from_slice(&(ind.point.row as u32).to_le_bytes());
        out.extend_from_slice(&(ind.point.col as u32).to_le_bytes());
        out.extend_from_slice(&ind.fitness.to_le_bytes());
    }
}

fn read_individuals<R: Read>(r: &mut R) -> io::Result<Vec<Individual>> {
    let count = read_u32(r)? as usize;
    let mut individuals = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        let row = read_u32(r)? as usize;
        let col = read_u32(r)? as usize;
        let fitness = read_f64(r)?;
        individuals.push(Individual::new(Point::new(row, col), fitness));
    }
    Ok(individuals)
}

/// Serialize one generation frame (uncompressed).
///
/// Layout: generation u64, best/worst/mean fitness f64, population u32, then
/// the breeding and offspring sets, each a u32 count followed by individuals.
pub fn encode_record(record: &GenerationRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        FRAME_FIXED_SIZE + (record.breeding.len() + record.offspring.len()) * INDIVIDUAL_SIZE,
    );
    out.extend_from_slice(&(record.generation as u64).to_le_bytes());
    out.extend_from_slice(&record.stats.best_fitness.to_le_bytes());
    out.extend_from_slice(&record.stats.worst_fitness.to_le_bytes());
    out.extend_from_slice(&record.stats.mean_fitness.to_le_bytes());
    out.extend_from_slice(&(record.stats.population as u32).to_le_bytes());
    write_individuals(&mut out, &record.breeding);
    write_individuals(&mut out, &record.offspring);
    out
}

/// Parse a frame produced by [`encode_record`].
pub fn decode_record(bytes: &[u8]) -> io::Result<GenerationRecord> {
    let mut r = bytes;
    let generation = read_u64(&mut r)? as usize;
    let stats = GenerationStats {
        best_fitness: read_f64(&mut r)?,
        worst_fitness: read_f64(&mut r)?,
        mean_fitness: read_f64(&mut r)?,
        population: read_u32(&mut r)? as usize,
    };
    let breeding = read_individuals(&mut r)?;
    let offspring = read_individuals(&mut r)?;
    if !r.is_empty() {
        return Err(invalid(format!(
            "{} trailing bytes after generation {}",
            r.len(),
            generation
        )));
    }
    Ok(GenerationRecord {
        generation,
        breeding,
        offspring,
        stats,
    })
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4 data.
///
/// The prepended size must be reachable from the compressed length.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    let prefix: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid("Truncated LZ4 block"))?;
    let claimed = u64::from(u32::from_le_bytes(prefix));
    if claimed > Compression::Lz4.max_unpacked_len(data.len() as u64) {
        return Err(invalid(format!(
            "LZ4 block of {} bytes claims {} bytes uncompressed",
            data.len(),
            claimed
        )));
    }
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    Ok(data.to_vec())
}
