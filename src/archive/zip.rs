//! Store-only ZIP record encoding
//!
//! Every entry is written with general-purpose flag bit 3, so the CRC and
//! sizes follow the payload in a data descriptor and nothing has to be
//! known before the first byte goes out. Bit 11 marks names as UTF-8.
//!
//! # Not Supported
//! - Zip64: entries, offsets and the central directory must stay below 4 GiB.
//! - Compression: method 0 (stored) only.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::time::SystemTime;

pub const SIG_LOCAL_FILE: u32 = 0x0403_4b50;
pub const SIG_DATA_DESCRIPTOR: u32 = 0x0807_4b50;
pub const SIG_CENTRAL_DIR: u32 = 0x0201_4b50;
pub const SIG_END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;

/// ZIP format version 2.0: enough for stored entries with data descriptors
const VERSION: u16 = 20;
/// Bit 3 (data descriptor) | bit 11 (UTF-8 names)
const FLAGS: u16 = 0x0808;
const METHOD_STORED: u16 = 0;

/// Largest size or offset a Zip32 record can hold; `0xFFFFFFFF` marks Zip64
pub const ZIP32_LIMIT: u64 = u32::MAX as u64 - 1;

/// MS-DOS packed date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Convert a UTC timestamp, clamping to the DOS range
    pub fn from_utc(ts: DateTime<Utc>) -> Self {
        let year = ts.year();
        if year < 1980 {
            return Self::EPOCH;
        }
        let year = (year.min(2107) - 1980) as u16;
        Self {
            time: ((ts.hour() as u16) << 11) | ((ts.minute() as u16) << 5) | (ts.second() as u16 / 2),
            date: (year << 9) | ((ts.month() as u16) << 5) | ts.day() as u16,
        }
    }

    /// Convert a file modification time
    pub fn from_system_time(modified: Option<SystemTime>) -> Self {
        modified
            .map(|t| Self::from_utc(DateTime::<Utc>::from(t)))
            .unwrap_or(Self::EPOCH)
    }
}

/// What the central directory needs to know about a written entry
#[derive(Debug, Clone)]
pub struct CentralRecord {
    pub name: String,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub size: u32,
    pub local_header_offset: u32,
}

struct RecordWriter(Vec<u8>);

impl RecordWriter {
    fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.0.extend_from_slice(b);
        self
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

/// Local file header; CRC and sizes are zero and come in the descriptor
pub fn local_header(name: &str, modified: DosDateTime) -> Vec<u8> {
    RecordWriter::with_capacity(30 + name.len())
        .u32(SIG_LOCAL_FILE)
        .u16(VERSION)
        .u16(FLAGS)
        .u16(METHOD_STORED)
        .u16(modified.time)
        .u16(modified.date)
        .u32(0) // crc32
        .u32(0) // compressed size
        .u32(0) // uncompressed size
        .u16(name.len() as u16)
        .u16(0) // extra length
        .bytes(name.as_bytes())
        .finish()
}

/// Data descriptor following an entry's payload
pub fn data_descriptor(crc32: u32, size: u32) -> Vec<u8> {
    RecordWriter::with_capacity(16)
        .u32(SIG_DATA_DESCRIPTOR)
        .u32(crc32)
        .u32(size) // compressed size
        .u32(size) // uncompressed size
        .finish()
}

/// Central directory file header for one entry
pub fn central_header(record: &CentralRecord) -> Vec<u8> {
    RecordWriter::with_capacity(46 + record.name.len())
        .u32(SIG_CENTRAL_DIR)
        .u16(VERSION) // version made by
        .u16(VERSION) // version needed
        .u16(FLAGS)
        .u16(METHOD_STORED)
        .u16(record.modified.time)
        .u16(record.modified.date)
        .u32(record.crc32)
        .u32(record.size)
        .u32(record.size)
        .u16(record.name.len() as u16)
        .u16(0) // extra length
        .u16(0) // comment length
        .u16(0) // disk number start
        .u16(0) // internal attributes
        .u32(0) // external attributes
        .u32(record.local_header_offset)
        .bytes(record.name.as_bytes())
        .finish()
}

/// End of central directory record
pub fn end_of_central_directory(entries: u16, dir_size: u32, dir_offset: u32) -> Vec<u8> {
    RecordWriter::with_capacity(22)
        .u32(SIG_END_OF_CENTRAL_DIR)
        .u16(0) // this disk
        .u16(0) // disk with central directory
        .u16(entries)
        .u16(entries)
        .u32(dir_size)
        .u32(dir_offset)
        .u16(0) // comment length
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dos_time_packs_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 31).unwrap();
        let dos = DosDateTime::from_utc(ts);

        assert_eq!(dos.time >> 11, 13);
        assert_eq!((dos.time >> 5) & 0x3f, 45);
        assert_eq!((dos.time & 0x1f) * 2, 30);
        assert_eq!((dos.date >> 9) + 1980, 2024);
        assert_eq!((dos.date >> 5) & 0x0f, 3);
        assert_eq!(dos.date & 0x1f, 15);
    }

    #[test]
    fn dos_time_clamps_before_1980() {
        let ts = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(DosDateTime::from_utc(ts), DosDateTime::EPOCH);
        assert_eq!(DosDateTime::from_system_time(None), DosDateTime::EPOCH);
    }

    #[test]
    fn local_header_layout() {
        let header = local_header("a.pkl", DosDateTime::EPOCH);
        assert_eq!(header.len(), 30 + 5);
        assert_eq!(&header[..4], &SIG_LOCAL_FILE.to_le_bytes());
        assert_eq!(u16::from_le_bytes([header[6], header[7]]), FLAGS);
        assert_eq!(u16::from_le_bytes([header[26], header[27]]), 5);
        assert_eq!(&header[30..], b"a.pkl");
    }

    #[test]
    fn end_record_layout() {
        let eocd = end_of_central_directory(3, 100, 2000);
        assert_eq!(eocd.len(), 22);
        assert_eq!(u16::from_le_bytes([eocd[10], eocd[11]]), 3);
        assert_eq!(u32::from_le_bytes([eocd[12], eocd[13], eocd[14], eocd[15]]), 100);
        assert_eq!(u32::from_le_bytes([eocd[16], eocd[17], eocd[18], eocd[19]]), 2000);
    }
}
