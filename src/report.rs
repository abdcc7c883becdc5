//! Listing-mode table.

use std::fmt::Write;

use crate::zip::{ArchiveEntry, totals};

const RULE_WIDTH: usize = 75;

/// Render every record, duplicates and directories included, followed by a
/// totals row of compressed size, uncompressed size and record count.
pub fn format(entries: &[ArchiveEntry]) -> String {
    let mut out = String::new();
    let rule = "-".repeat(RULE_WIDTH);

    let _ = writeln!(
        out,
        "{:2}Compressed{:1}Uncompressed{:6}Date{:7}Time{:8}Name",
        "", "", "", "", ""
    );
    let _ = writeln!(out, "{rule}");

    for entry in entries {
        let _ = writeln!(
            out,
            "{:>12} {:>11} {:>12}  {:<7}  {:<10}",
            entry.compressed_size,
            entry.uncompressed_size,
            entry.date_string(),
            entry.time_string(),
            entry.path
        );
    }

    let totals = totals(entries);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:>12}{:>12}{:>27}",
        totals.compressed, totals.uncompressed, totals.count
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::CompressionMethod;
    use chrono::{TimeZone, Utc};

    fn entry(path: &str, compressed: u64, uncompressed: u64) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: compressed,
            uncompressed_size: uncompressed,
            crc32: 0,
            lfh_offset: 0,
            flags: 0,
            modified_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            mode: None,
            is_directory: path.ends_with('/'),
        }
    }

    #[test]
    fn table_rows_and_totals() {
        let mut b = entry("dir/b.txt", 10, 10);
        b.modified_at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let entries = vec![entry("a.txt", 60, 100), b];

        let text = format(&entries);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "  Compressed Uncompressed      Date       Time        Name"
        );
        assert_eq!(lines[1], "-".repeat(75));
        assert_eq!(
            lines[2],
            "          60         100   2024-01-01  00:00:00  a.txt     "
        );
        assert_eq!(
            lines[3],
            "          10          10   2023-06-01  00:00:00  dir/b.txt "
        );
        assert_eq!(
            lines[5],
            format!("{:>12}{:>12}{:>27}", 70, 110, 2)
        );
    }

    #[test]
    fn duplicates_are_listed_every_time() {
        let entries = vec![entry("a.txt", 1, 1), entry("a.txt", 2, 2)];
        let text = format(&entries);
        assert_eq!(text.matches("a.txt").count(), 2);
        assert!(text.ends_with(&format!("{:>12}{:>12}{:>27}\n", 3, 3, 2)));
    }
}
