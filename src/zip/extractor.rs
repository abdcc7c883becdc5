use flate2::Crc;
use flate2::write::DeflateDecoder;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ExtractionError;
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{ArchiveEntry, CompressionMethod};

/// Compressed bytes read from the archive per step
const CHUNK_SIZE: u64 = 64 * 1024;

/// Streams entry payloads out of an archive
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

enum Decoder {
    Stored,
    Deflate(DeflateDecoder<Vec<u8>>),
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    pub fn parser(&self) -> &ZipParser<R> {
        &self.parser
    }

    /// Decompress an entry into memory
    pub async fn extract_to_memory(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, ExtractionError> {
        let mut buf = Vec::with_capacity(entry.uncompressed_size.min(CHUNK_SIZE) as usize);
        self.stream_entry(entry, &mut buf, Path::new(&entry.path))
            .await?;
        Ok(buf)
    }

    /// Decompress an entry into a newly created or truncated file.
    ///
    /// Parent directories must already exist. Returns the number of bytes
    /// written.
    pub async fn extract_to_file(
        &self,
        entry: &ArchiveEntry,
        output_path: &Path,
    ) -> Result<u64, ExtractionError> {
        let io_err = |source| ExtractionError::Io {
            entry: entry.path.clone(),
            path: output_path.to_path_buf(),
            source,
        };

        let mut file = fs::File::create(output_path).await.map_err(io_err)?;
        let written = self.stream_entry(entry, &mut file, output_path).await?;
        file.flush().await.map_err(io_err)?;

        Ok(written)
    }

    /// Copy an entry's payload through the matching decoder into `writer`,
    /// checking the size and CRC-32 recorded in the central directory.
    async fn stream_entry<W>(
        &self,
        entry: &ArchiveEntry,
        writer: &mut W,
        output_path: &Path,
    ) -> Result<u64, ExtractionError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if entry.is_encrypted() {
            return Err(ExtractionError::Encrypted {
                entry: entry.path.clone(),
            });
        }

        let mut decoder = match entry.compression_method {
            CompressionMethod::Stored => Decoder::Stored,
            CompressionMethod::Deflate => {
                Decoder::Deflate(DeflateDecoder::new(Vec::with_capacity(CHUNK_SIZE as usize)))
            }
            CompressionMethod::Unknown(method) => {
                return Err(ExtractionError::UnsupportedMethod {
                    entry: entry.path.clone(),
                    method,
                });
            }
        };

        let corrupt = |reason: String| ExtractionError::CorruptData {
            entry: entry.path.clone(),
            reason,
        };
        let write_err = |source| ExtractionError::Io {
            entry: entry.path.clone(),
            path: output_path.to_path_buf(),
            source,
        };

        let reader = self.parser.reader();
        let data_offset = self
            .parser
            .get_data_offset(entry)
            .await
            .map_err(|e| corrupt(e.to_string()))?;
        if data_offset.saturating_add(entry.compressed_size) > reader.size() {
            return Err(corrupt("entry data runs past end of archive".to_string()));
        }

        let mut crc = Crc::new();
        let mut written = 0u64;
        let mut offset = data_offset;
        let mut remaining = entry.compressed_size;
        let mut chunk = vec![0u8; remaining.min(CHUNK_SIZE) as usize];

        while remaining > 0 {
            let n = remaining.min(CHUNK_SIZE) as usize;
            reader
                .read_exact_at(offset, &mut chunk[..n])
                .await
                .map_err(|e| corrupt(e.to_string()))?;
            offset += n as u64;
            remaining -= n as u64;

            match &mut decoder {
                Decoder::Stored => {
                    crc.update(&chunk[..n]);
                    writer.write_all(&chunk[..n]).await.map_err(write_err)?;
                    written += n as u64;
                }
                Decoder::Deflate(inflater) => {
                    inflater
                        .write_all(&chunk[..n])
                        .map_err(|e| corrupt(e.to_string()))?;
                    let out = std::mem::take(inflater.get_mut());
                    crc.update(&out);
                    writer.write_all(&out).await.map_err(write_err)?;
                    written += out.len() as u64;
                }
            }
        }

        if let Decoder::Deflate(inflater) = decoder {
            let tail = inflater.finish().map_err(|e| corrupt(e.to_string()))?;
            crc.update(&tail);
            writer.write_all(&tail).await.map_err(write_err)?;
            written += tail.len() as u64;
        }

        if written != entry.uncompressed_size {
            return Err(corrupt(format!(
                "expected {} bytes, decoded {written}",
                entry.uncompressed_size
            )));
        }
        if crc.sum() != entry.crc32 {
            return Err(ExtractionError::ChecksumMismatch {
                entry: entry.path.clone(),
                expected: entry.crc32,
                actual: crc.sum(),
            });
        }

        Ok(written)
    }
}
