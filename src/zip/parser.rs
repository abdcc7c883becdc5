//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! The whole Central Directory is read before anything is returned.

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::DateTime;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::error::ArchiveError;
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so tests can feed it in-memory archives.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// [`ArchiveError::NotAZipFile`] if no EOCD can be found.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), ArchiveError> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ArchiveError::NotAZipFile);
        }

        // Common case first: no archive comment.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        // Search backwards for PK\x05\x06 whose comment length reaches exactly
        // to the end of the file.
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ArchiveError::NotAZipFile)
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD has fields saturated to 0xFFFF or
    /// 0xFFFFFFFF.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD, ArchiveError> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ArchiveError::Truncated("missing ZIP64 locator".to_string()))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        if locator.eocd64_offset.saturating_add(Zip64EOCD::MIN_SIZE as u64) > self.size {
            return Err(ArchiveError::Truncated(
                "ZIP64 end of central directory lies past end of file".to_string(),
            ));
        }

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read every record of the Central Directory, in archive order.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotAZipFile`] when there is no EOCD
    /// - [`ArchiveError::Truncated`] when the directory extends past the file
    /// - [`ArchiveError::CentralDirectoryCorrupt`] when a record cannot be parsed
    pub async fn list_entries(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|&end| end <= self.size)
            .ok_or_else(|| {
                ArchiveError::Truncated(format!(
                    "central directory ({cd_size} bytes at offset {cd_offset}) exceeds archive size {}",
                    self.size
                ))
            })?;
        tracing::trace!(cd_offset, cd_end, total_entries, "reading central directory");

        // Each record is at least CDFH_MIN_SIZE bytes; a larger count cannot fit.
        if total_entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd_size {
            return Err(ArchiveError::CentralDirectoryCorrupt(format!(
                "{total_entries} entries cannot fit in {cd_size} bytes"
            )));
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data).await?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor).map_err(|e| {
                ArchiveError::CentralDirectoryCorrupt(format!("record {index}: {e}"))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Get the offset where an entry's compressed data begins.
    ///
    /// The Local File Header has its own filename and extra field lengths,
    /// which may differ from the Central Directory copy, so it is read here.
    pub async fn get_data_offset(&self, entry: &ArchiveEntry) -> io::Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(invalid_data("invalid local file header"));
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Parse one Central Directory File Header at the cursor position.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> io::Result<ArchiveEntry> {
    let data_len = cursor.get_ref().len() as u64;

    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(invalid_data("bad central directory header signature"));
    }

    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Lossy conversion keeps non-UTF8 names listable
    let path = String::from_utf8_lossy(&file_name_bytes).to_string();
    if path.is_empty() {
        return Err(invalid_data("empty file name"));
    }

    let mut modified_at = decode_dos_datetime(last_mod_date, last_mod_time);

    let extra_field_end = cursor.position() + extra_field_length as u64;
    if extra_field_end > data_len {
        return Err(invalid_data("extra field runs past central directory"));
    }

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = (cursor.position() + field_size as u64).min(extra_field_end);

        match header_id {
            ZIP64_EXTRA_ID => {
                // Fields are present only if the header field is saturated
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            EXTENDED_TIMESTAMP_EXTRA_ID => {
                // Central directory copies only ever carry the mtime
                if cursor.position() + 5 <= field_end {
                    let ts_flags = cursor.read_u8()?;
                    if ts_flags & 0x01 != 0 {
                        let mtime = cursor.read_i32::<LittleEndian>()?;
                        if let Some(ts) = DateTime::from_timestamp(mtime as i64, 0) {
                            modified_at = ts;
                        }
                    }
                }
            }
            _ => {}
        }

        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end);

    let comment_end = extra_field_end + file_comment_length as u64;
    if comment_end > data_len {
        return Err(invalid_data("file comment runs past central directory"));
    }
    cursor.set_position(comment_end);

    let mode = unix_mode(version_made_by, external_attrs);
    let is_directory = is_directory(&path, mode, external_attrs);

    Ok(ArchiveEntry {
        path,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        flags,
        modified_at,
        mode,
        is_directory,
    })
}
