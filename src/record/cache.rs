//! On-disk cache for synthesized fields.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::format::{Compression, FieldHeader, decode_values, encode_values};
use crate::compute::{Field, heatmap};
use crate::schema::HeatmapConfig;

/// Write `field` to a `.wfld` file.
pub fn save_field<P: AsRef<Path>>(
    path: P,
    field: &Field,
    compression: Compression,
) -> io::Result<()> {
    let size = u32::try_from(field.size()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Field size {} does not fit the cache header", field.size()),
        )
    })?;
    let header = FieldHeader { size, compression };

    let mut writer = BufWriter::new(File::create(path)?);
    header.write_to(&mut writer)?;
    writer.write_all(&compression.pack(encode_values(field.values())))?;
    writer.flush()
}

/// Read a field written by [`save_field`].
///
/// A missing file surfaces as [`io::ErrorKind::NotFound`].
pub fn load_field<P: AsRef<Path>>(path: P) -> io::Result<Field> {
    let file = File::open(path)?;
    let stored = file.metadata()?.len().saturating_sub(FieldHeader::SIZE as u64);
    let mut reader = BufReader::new(file);
    let header = FieldHeader::read_from(&mut reader)?;

    // Nothing is allocated for a header the file cannot back.
    let expected = header.payload_size()?;
    if expected as u64 > header.compression.max_unpacked_len(stored) {
        return Err(corrupt(&header, stored));
    }

    let mut data = Vec::with_capacity(stored as usize);
    reader.read_to_end(&mut data)?;
    let raw = header.compression.unpack(data)?;
    if raw.len() != expected {
        return Err(corrupt(&header, stored));
    }

    let size = header.size as usize;
    let mut values = vec![0.0; size * size];
    decode_values(&raw, &mut values)?;

    Field::from_values(size, values)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Corrupt field payload"))
}

fn corrupt(header: &FieldHeader, stored: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
            "Field header claims {}x{} cells but payload is {} bytes",
            header.size, header.size, stored
        ),
    )
}

/// Load the cached field for `config`, synthesizing and caching it when absent.
///
/// A cache whose size disagrees with `config.size` is regenerated. Without a
/// cache path the field is always synthesized.
pub fn load_or_generate(config: &HeatmapConfig, seed: u64) -> io::Result<Field> {
    let Some(path) = config.cache.as_deref() else {
        return Ok(heatmap::generate(config, seed));
    };

    match load_field(path) {
        Ok(field) if field.size() == config.size => {
            log::info!("Loaded cached field from {}", path.display());
            return Ok(field);
        }
        Ok(field) => log::warn!(
            "Cached field {} is {}x{}, expected {}x{}; regenerating",
            path.display(),
            field.size(),
            field.size(),
            config.size,
            config.size
        ),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No cached field at {}", path.display());
        }
        Err(e) => return Err(e),
    }

    let field = heatmap::generate(config, seed);
    let compression = if cfg!(feature = "lz4") {
        Compression::Lz4
    } else {
        Compression::None
    };
    save_field(path, &field, compression)?;
    log::info!("Cached field to {}", path.display());
    Ok(field)
}
