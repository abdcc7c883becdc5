//! Shared fixtures: a minimal ZIP writer and an in-memory archive reader.
#![allow(dead_code)]

use async_trait::async_trait;
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::path::Path;

use zipfresh::ReadAt;

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
}

/// Stamp a file's modification time
pub fn set_mtime(path: &Path, ts: DateTime<Utc>) {
    let ft = filetime::FileTime::from_unix_time(ts.timestamp(), ts.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, ft).unwrap();
}

pub fn mtime(path: &Path) -> DateTime<Utc> {
    DateTime::<Utc>::from(std::fs::metadata(path).unwrap().modified().unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Stored,
    Deflate,
}

#[derive(Debug, Clone)]
struct TestEntry {
    name: String,
    data: Vec<u8>,
    method: Method,
    modified: DateTime<Utc>,
    mode: Option<u32>,
    extended_mtime: Option<i32>,
    flags: u16,
    crc_override: Option<u32>,
}

/// Writes archives byte by byte so tests control every field, including
/// duplicate names and hostile paths.
#[derive(Debug, Default, Clone)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, data: &[u8], method: Method, modified: DateTime<Utc>) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            modified,
            mode: None,
            extended_mtime: None,
            flags: 0,
            crc_override: None,
        });
        self
    }

    /// Deflated file entry
    pub fn file(self, name: &str, data: impl AsRef<[u8]>, modified: DateTime<Utc>) -> Self {
        self.push(name, data.as_ref(), Method::Deflate, modified)
    }

    /// Stored (uncompressed) file entry
    pub fn stored(self, name: &str, data: impl AsRef<[u8]>, modified: DateTime<Utc>) -> Self {
        self.push(name, data.as_ref(), Method::Stored, modified)
    }

    /// Directory marker; `name` should end in `/`
    pub fn dir(self, name: &str, modified: DateTime<Utc>) -> Self {
        self.push(name, b"", Method::Stored, modified)
    }

    /// Set a POSIX mode on the last entry
    pub fn mode(mut self, mode: u32) -> Self {
        self.last().mode = Some(mode);
        self
    }

    /// Attach an extended timestamp extra field to the last entry
    pub fn extended_mtime(mut self, unix_secs: i32) -> Self {
        self.last().extended_mtime = Some(unix_secs);
        self
    }

    /// Mark the last entry as encrypted
    pub fn encrypted(mut self) -> Self {
        self.last().flags |= 0x0001;
        self
    }

    /// Record a wrong CRC-32 for the last entry
    pub fn bad_crc(mut self) -> Self {
        self.last().crc_override = Some(0xDEADBEEF);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    fn last(&mut self) -> &mut TestEntry {
        self.entries.last_mut().expect("no entry to modify")
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = out.len() as u32;
            let payload = match entry.method {
                Method::Stored => entry.data.clone(),
                Method::Deflate => {
                    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                    enc.write_all(&entry.data).unwrap();
                    enc.finish().unwrap()
                }
            };
            let method: u16 = match entry.method {
                Method::Stored => 0,
                Method::Deflate => 8,
            };
            let mut crc = flate2::Crc::new();
            crc.update(&entry.data);
            let crc = entry.crc_override.unwrap_or(crc.sum());
            let (date, time) = dos_datetime(entry.modified);

            let mut extra = Vec::new();
            if let Some(secs) = entry.extended_mtime {
                extra.write_u16::<LittleEndian>(0x5455).unwrap();
                extra.write_u16::<LittleEndian>(5).unwrap();
                extra.write_u8(0x01).unwrap();
                extra.write_i32::<LittleEndian>(secs).unwrap();
            }

            // Local file header
            out.write_all(b"PK\x03\x04").unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(entry.flags).unwrap();
            out.write_u16::<LittleEndian>(method).unwrap();
            out.write_u16::<LittleEndian>(time).unwrap();
            out.write_u16::<LittleEndian>(date).unwrap();
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            out.write_all(entry.name.as_bytes()).unwrap();
            out.write_all(&extra).unwrap();
            out.write_all(&payload).unwrap();

            let version_made_by: u16 = if entry.mode.is_some() { (3 << 8) | 20 } else { 20 };
            let mut external = entry.mode.map(|m| m << 16).unwrap_or(0);
            if entry.name.ends_with('/') {
                external |= 0x10;
            }

            // Central directory header
            central.write_all(b"PK\x01\x02").unwrap();
            central.write_u16::<LittleEndian>(version_made_by).unwrap();
            central.write_u16::<LittleEndian>(20).unwrap();
            central.write_u16::<LittleEndian>(entry.flags).unwrap();
            central.write_u16::<LittleEndian>(method).unwrap();
            central.write_u16::<LittleEndian>(time).unwrap();
            central.write_u16::<LittleEndian>(date).unwrap();
            central.write_u32::<LittleEndian>(crc).unwrap();
            central.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
            central.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
            central.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u16::<LittleEndian>(0).unwrap();
            central.write_u32::<LittleEndian>(external).unwrap();
            central.write_u32::<LittleEndian>(offset).unwrap();
            central.write_all(entry.name.as_bytes()).unwrap();
            central.write_all(&extra).unwrap();
        }

        let cd_offset = out.len() as u32;
        out.write_all(&central).unwrap();

        // End of central directory
        out.write_all(b"PK\x05\x06").unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(central.len() as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.write_all(&self.comment).unwrap();

        out
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

fn dos_datetime(ts: DateTime<Utc>) -> (u16, u16) {
    let date = (((ts.year() - 1980) as u16) << 9) | ((ts.month() as u16) << 5) | ts.day() as u16;
    let time = ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2);
    (date, time)
}

/// Archive bytes held in memory
pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = (offset as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
