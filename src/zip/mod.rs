//! ZIP archive parsing and extraction.
//!
//! This module reads ZIP archives and streams entry payloads out of them,
//! supporting both the standard format and ZIP64 extensions.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: Payload streaming, decompression and CRC checking
//! - [`catalog`]: [`ArchiveCatalog`], the open archive plus its entry list
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED and DEFLATE compression methods
//! - Extended timestamp extra field (0x5455)
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod catalog;
mod extractor;
mod parser;
mod structures;

pub use catalog::{ArchiveCatalog, CatalogTotals, totals};
pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
