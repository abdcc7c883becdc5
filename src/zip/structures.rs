use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Cursor;

use crate::error::ArchiveError;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ArchiveError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::NotAZipFile);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ArchiveError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::CentralDirectoryCorrupt(
                "invalid ZIP64 end of central directory locator".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ArchiveError> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ArchiveError::CentralDirectoryCorrupt(
                "invalid ZIP64 end of central directory record".to_string(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra field carrying 64-bit sizes and offsets
pub const ZIP64_EXTRA_ID: u16 = 0x0001;
/// Extended timestamp extra field ("UT")
pub const EXTENDED_TIMESTAMP_EXTRA_ID: u16 = 0x5455;

/// General purpose flag bit 0
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Host systems in the upper byte of "version made by" whose external
/// attributes carry a POSIX mode
pub const HOST_UNIX: u8 = 3;
pub const HOST_OSX: u8 = 19;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const DOS_DIRECTORY_ATTR: u32 = 0x10;

/// One record of the central directory
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Stored name, forward-slash separated
    pub path: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub flags: u16,
    pub modified_at: DateTime<Utc>,
    /// POSIX mode, when the archive was written on a Unix-like host
    pub mode: Option<u32>,
    pub is_directory: bool,
}

impl ArchiveEntry {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Permission bits worth applying to an extracted file
    pub fn permissions(&self) -> Option<u32> {
        self.mode.map(|m| m & 0o7777).filter(|&m| m != 0)
    }

    /// Date column as shown in listings
    pub fn date_string(&self) -> String {
        self.modified_at.format("%Y-%m-%d").to_string()
    }

    /// Time column as shown in listings
    pub fn time_string(&self) -> String {
        self.modified_at.format("%H:%M:%S").to_string()
    }
}

/// Extract the POSIX mode from the external attributes, if the host stores one
pub fn unix_mode(version_made_by: u16, external_attrs: u32) -> Option<u32> {
    let host = (version_made_by >> 8) as u8;
    let mode = external_attrs >> 16;
    if (host == HOST_UNIX || host == HOST_OSX) && mode != 0 {
        Some(mode)
    } else {
        None
    }
}

/// Whether a record names a directory rather than a file
pub fn is_directory(name: &str, mode: Option<u32>, external_attrs: u32) -> bool {
    name.ends_with('/')
        || mode.is_some_and(|m| m & S_IFMT == S_IFDIR)
        || external_attrs & DOS_DIRECTORY_ATTR != 0
}

/// The earliest instant a DOS timestamp can express
pub fn dos_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Decode a DOS date/time pair into UTC.
///
/// DOS timestamps carry no zone and are read as UTC. Fields that do not form
/// a real calendar date decode to 1980-01-01T00:00:00Z.
pub fn decode_dos_datetime(date: u16, time: u16) -> DateTime<Utc> {
    let day = (date & 0x1F) as u32;
    let month = ((date >> 5) & 0x0F) as u32;
    let year = ((date >> 9) & 0x7F) as i32 + 1980;

    let second = ((time & 0x1F) * 2) as u32;
    let minute = ((time >> 5) & 0x3F) as u32;
    let hour = ((time >> 11) & 0x1F) as u32;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(dos_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dos(year: u16, month: u16, day: u16, hour: u16, minute: u16, second: u16) -> (u16, u16) {
        let date = ((year - 1980) << 9) | (month << 5) | day;
        let time = (hour << 11) | (minute << 5) | (second / 2);
        (date, time)
    }

    #[test]
    fn decodes_dos_timestamp_as_utc() {
        let (date, time) = dos(2024, 1, 1, 13, 45, 30);
        assert_eq!(
            decode_dos_datetime(date, time),
            Utc.with_ymd_and_hms(2024, 1, 1, 13, 45, 30).unwrap()
        );
    }

    #[test]
    fn invalid_dos_fields_fall_back_to_dos_epoch() {
        assert_eq!(decode_dos_datetime(0, 0), dos_epoch());
        // month 13
        let (date, time) = dos(2020, 13, 1, 0, 0, 0);
        assert_eq!(decode_dos_datetime(date, time), dos_epoch());
    }

    #[test]
    fn directory_detection() {
        assert!(is_directory("dir/", None, 0));
        assert!(is_directory("dir", Some(0o040755), 0));
        assert!(is_directory("DIR", None, 0x10));
        assert!(!is_directory("file.txt", Some(0o100644), 0x20));
    }

    #[test]
    fn unix_mode_only_from_unix_hosts() {
        let attrs = 0o100755u32 << 16;
        assert_eq!(unix_mode(3 << 8 | 20, attrs), Some(0o100755));
        assert_eq!(unix_mode(19 << 8 | 20, attrs), Some(0o100755));
        assert_eq!(unix_mode(20, attrs), None);
        assert_eq!(unix_mode(3 << 8, 0), None);
    }
}
