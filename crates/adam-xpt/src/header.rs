//! Transport header records.
//!
//! A V5 file with one member is laid out as:
//!
//! 1. Library header, real header, modified header
//! 2. Member header, DSCRPTR header, member data, member second
//! 3. NAMESTR header, then one 140-byte NAMESTR per variable
//! 4. OBS header, then observations
//!
//! Every section is padded with spaces to a multiple of 80 bytes.
//!
//! # NAMESTR layout (140 bytes, big-endian integers)
//!
//! | Offset | Field   | Description                    |
//! |--------|---------|--------------------------------|
//! | 0-1    | ntype   | 1=NUMERIC, 2=CHAR              |
//! | 2-3    | nhfun   | Hash (always 0)                |
//! | 4-5    | nlng    | Variable length in observation |
//! | 6-7    | nvar0   | Variable number                |
//! | 8-15   | nname   | Variable name                  |
//! | 16-55  | nlabel  | Variable label                 |
//! | 56-63  | nform   | Format name                    |
//! | 64-65  | nfl     | Format length                  |
//! | 66-67  | nfd     | Format decimals                |
//! | 68-69  | nfj     | Justification                  |
//! | 72-79  | niform  | Informat name                  |
//! | 80-83  | nifl/d  | Informat length and decimals   |
//! | 84-87  | npos    | Position in observation        |

use crate::error::{Result, XptError};
use crate::types::{XptColumn, XptDataset, XptType, XptWriterOptions};

pub const RECORD_LEN: usize = 80;
pub const NAMESTR_LEN: usize = 140;

pub const LIBRARY_HEADER_PREFIX: &str = "HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!";
pub const MEMBER_HEADER_PREFIX: &str = "HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!";
pub const DSCRPTR_HEADER_PREFIX: &str = "HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!";
pub const NAMESTR_HEADER_PREFIX: &str = "HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!";
pub const OBS_HEADER_PREFIX: &str = "HEADER RECORD*******OBS     HEADER RECORD!!!!!!!";

const DATASET_TYPE: &str = "DATA";

fn write_string(record: &mut [u8], offset: usize, value: &str, width: usize) {
    let bytes = value.as_bytes();
    for (idx, slot) in record[offset..offset + width].iter_mut().enumerate() {
        *slot = bytes.get(idx).copied().filter(u8::is_ascii).unwrap_or(b' ');
    }
}

pub(crate) fn read_string(record: &[u8], offset: usize, width: usize) -> String {
    record
        .get(offset..offset + width)
        .map(|bytes| String::from_utf8_lossy(bytes).trim_end().to_string())
        .unwrap_or_default()
}

fn write_i16(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

fn read_i16(buf: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// A fixed header: prefix, `0` fill to byte 78, two spaces.
fn build_fixed_header(prefix: &str) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    let prefix = prefix.as_bytes();
    let len = prefix.len().min(48);
    record[..len].copy_from_slice(&prefix[..len]);
    record[48..78].fill(b'0');
    record
}

fn validate_prefix(record: &[u8], prefix: &str, expected: &'static str) -> Result<()> {
    if record.len() < RECORD_LEN {
        return Err(XptError::invalid_format("record too short"));
    }
    if !record.starts_with(prefix.as_bytes()) {
        return Err(XptError::missing_header(expected));
    }
    Ok(())
}

#[must_use]
pub fn build_library_header() -> [u8; RECORD_LEN] {
    build_fixed_header(LIBRARY_HEADER_PREFIX)
}

/// Real header: SAS symbols, version, OS and created stamp.
#[must_use]
pub fn build_real_header(options: &XptWriterOptions) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, "SAS", 8);
    write_string(&mut record, 8, "SAS", 8);
    write_string(&mut record, 16, "SASLIB", 8);
    write_string(&mut record, 24, &options.sas_version, 8);
    write_string(&mut record, 32, &options.os_name, 8);
    write_string(&mut record, 64, &options.timestamp, 16);
    record
}

/// Second header: modified stamp.
#[must_use]
pub fn build_second_header(options: &XptWriterOptions) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, &options.timestamp, 16);
    record
}

#[must_use]
pub fn build_member_header() -> [u8; RECORD_LEN] {
    let mut record = build_fixed_header(MEMBER_HEADER_PREFIX);
    write_string(&mut record, 64, "0160", 4);
    write_string(&mut record, 74, &format!("{NAMESTR_LEN:04}"), 4);
    record
}

#[must_use]
pub fn build_dscrptr_header() -> [u8; RECORD_LEN] {
    build_fixed_header(DSCRPTR_HEADER_PREFIX)
}

#[must_use]
pub fn build_member_data(dataset: &XptDataset, options: &XptWriterOptions) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, "SAS", 8);
    write_string(&mut record, 8, &dataset.name.to_uppercase(), 8);
    write_string(&mut record, 16, "SASDATA", 8);
    write_string(&mut record, 24, &options.sas_version, 8);
    write_string(&mut record, 32, &options.os_name, 8);
    write_string(&mut record, 64, &options.timestamp, 16);
    record
}

/// Member second record: modified stamp, dataset label and type.
#[must_use]
pub fn build_member_second(dataset: &XptDataset, options: &XptWriterOptions) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    write_string(&mut record, 0, &options.timestamp, 16);
    write_string(&mut record, 32, &dataset.label, 40);
    write_string(&mut record, 72, DATASET_TYPE, 8);
    record
}

#[must_use]
pub fn build_namestr_header(var_count: usize) -> [u8; RECORD_LEN] {
    let mut record = build_fixed_header(NAMESTR_HEADER_PREFIX);
    write_string(&mut record, 54, &format!("{var_count:04}"), 4);
    record
}

#[must_use]
pub fn build_obs_header() -> [u8; RECORD_LEN] {
    build_fixed_header(OBS_HEADER_PREFIX)
}

/// NAMESTR for `column`, numbered from 1, starting at byte `position` of the
/// observation.
#[must_use]
pub fn build_namestr(column: &XptColumn, varnum: u16, position: u32) -> [u8; NAMESTR_LEN] {
    let mut buf = [0u8; NAMESTR_LEN];
    write_i16(&mut buf, 0, column.data_type.to_ntype());
    write_i16(&mut buf, 4, column.length as i16);
    write_i16(&mut buf, 6, varnum as i16);
    write_string(&mut buf, 8, &column.name.to_uppercase(), 8);
    write_string(&mut buf, 16, &column.label, 40);
    write_string(&mut buf, 56, column.format.as_deref().unwrap_or(""), 8);
    write_i16(&mut buf, 64, column.format_length as i16);
    write_i16(&mut buf, 66, column.format_decimals as i16);
    // Numerics right-justified, text left.
    let justification = if column.data_type == XptType::Num { 1 } else { 0 };
    write_i16(&mut buf, 68, justification);
    write_string(&mut buf, 72, "", 8);
    buf[84..88].copy_from_slice(&(position as i32).to_be_bytes());
    buf
}

pub fn validate_library_header(record: &[u8]) -> Result<()> {
    validate_prefix(record, LIBRARY_HEADER_PREFIX, "LIBRARY HEADER")
}

pub fn validate_member_header(record: &[u8]) -> Result<()> {
    validate_prefix(record, MEMBER_HEADER_PREFIX, "MEMBER HEADER")
}

pub fn validate_dscrptr_header(record: &[u8]) -> Result<()> {
    validate_prefix(record, DSCRPTR_HEADER_PREFIX, "DSCRPTR HEADER")
}

pub fn validate_namestr_header(record: &[u8]) -> Result<()> {
    validate_prefix(record, NAMESTR_HEADER_PREFIX, "NAMESTR HEADER")
}

pub fn validate_obs_header(record: &[u8]) -> Result<()> {
    validate_prefix(record, OBS_HEADER_PREFIX, "OBS HEADER")
}

fn parse_digits(record: &[u8], offset: usize, field: &str) -> Result<usize> {
    read_string(record, offset, 4)
        .trim()
        .parse()
        .map_err(|_| XptError::invalid_format(format!("unreadable {field}")))
}

/// NAMESTR length from the member header (140, or 136 on VAX/VMS).
pub fn parse_namestr_len(record: &[u8]) -> Result<usize> {
    parse_digits(record, 74, "NAMESTR length")
}

pub fn parse_variable_count(record: &[u8]) -> Result<usize> {
    parse_digits(record, 54, "variable count")
}

pub fn parse_namestr(data: &[u8], index: usize) -> Result<XptColumn> {
    let invalid = |message: String| XptError::InvalidNamestr { index, message };
    if data.len() < 88 {
        return Err(invalid(format!("data too short: {} bytes", data.len())));
    }
    let ntype = read_i16(data, 0);
    let data_type =
        XptType::from_ntype(ntype).ok_or_else(|| invalid(format!("invalid ntype: {ntype}")))?;
    let length = read_i16(data, 4);
    if length <= 0 {
        return Err(invalid("variable length is zero".to_string()));
    }
    let name = read_string(data, 8, 8);
    if name.is_empty() {
        return Err(invalid("empty variable name".to_string()));
    }
    let format = read_string(data, 56, 8);
    Ok(XptColumn {
        name,
        label: read_string(data, 16, 40),
        data_type,
        length: length as u16,
        format: (!format.is_empty()).then_some(format),
        format_length: read_i16(data, 64).max(0) as u16,
        format_decimals: read_i16(data, 66).max(0) as u16,
    })
}

/// Rounds `len` up to a whole number of records.
pub fn align_to_record(len: usize) -> usize {
    len.div_ceil(RECORD_LEN) * RECORD_LEN
}
