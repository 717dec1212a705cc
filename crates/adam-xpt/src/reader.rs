//! Transport file reader for single-member V5 files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, XptError};
use crate::float::{NUMERIC_LEN, ibm_to_ieee};
use crate::header::{
    RECORD_LEN, align_to_record, parse_namestr, parse_namestr_len, parse_variable_count,
    read_string, validate_dscrptr_header, validate_library_header, validate_member_header,
    validate_namestr_header, validate_obs_header,
};
use crate::types::{XptColumn, XptDataset, XptType, XptValue};

pub fn read_xpt(path: &Path) -> Result<XptDataset> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            XptError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            XptError::Io(e)
        }
    })?;
    let mut data = Vec::new();
    BufReader::new(file).read_to_end(&mut data)?;
    parse_xpt_bytes(&data)
}

fn record(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..offset + RECORD_LEN)
        .ok_or_else(|| XptError::invalid_format(format!("truncated at offset {offset}")))
}

/// Parses the first member of an in-memory transport file.
pub fn parse_xpt_bytes(data: &[u8]) -> Result<XptDataset> {
    if data.len() < RECORD_LEN * 8 {
        return Err(XptError::invalid_format("file too small"));
    }
    if !data.len().is_multiple_of(RECORD_LEN) {
        return Err(XptError::invalid_format("file length is not a multiple of 80"));
    }

    validate_library_header(record(data, 0)?)?;
    let mut offset = RECORD_LEN * 3;

    let member = record(data, offset)?;
    validate_member_header(member)?;
    let namestr_len = parse_namestr_len(member)?;
    offset += RECORD_LEN;
    validate_dscrptr_header(record(data, offset)?)?;
    offset += RECORD_LEN;
    let name = read_string(record(data, offset)?, 8, 8);
    offset += RECORD_LEN;
    let label = read_string(record(data, offset)?, 32, 40);
    offset += RECORD_LEN;

    let namestr_header = record(data, offset)?;
    validate_namestr_header(namestr_header)?;
    let var_count = parse_variable_count(namestr_header)?;
    offset += RECORD_LEN;

    let block = align_to_record(var_count * namestr_len);
    let namestrs = data
        .get(offset..offset + block)
        .ok_or_else(|| XptError::invalid_format("truncated NAMESTR records"))?;
    let columns = (0..var_count)
        .map(|idx| parse_namestr(&namestrs[idx * namestr_len..(idx + 1) * namestr_len], idx))
        .collect::<Result<Vec<XptColumn>>>()?;
    offset += block;

    validate_obs_header(record(data, offset)?)?;
    offset += RECORD_LEN;

    let mut dataset = XptDataset::with_columns(name, columns).with_label(label);
    let obs_len = dataset.observation_length();
    if obs_len == 0 {
        return Ok(dataset);
    }
    let observations = &data[offset..];
    let mut count = observations.len() / obs_len;
    // Trailing record padding is spaces; drop blank pseudo-observations.
    let is_blank = |idx: usize| {
        observations[idx * obs_len..(idx + 1) * obs_len]
            .iter()
            .all(|&b| b == b' ')
    };
    while count > 0 && is_blank(count - 1) {
        count -= 1;
    }
    for idx in 0..count {
        let obs = &observations[idx * obs_len..(idx + 1) * obs_len];
        dataset.add_row(decode_observation(obs, &dataset.columns));
    }
    Ok(dataset)
}

fn decode_observation(obs: &[u8], columns: &[XptColumn]) -> Vec<XptValue> {
    let mut pos = 0usize;
    columns
        .iter()
        .map(|column| {
            let length = usize::from(column.length);
            let bytes = &obs[pos..pos + length];
            pos += length;
            match column.data_type {
                XptType::Char => XptValue::Char(
                    String::from_utf8_lossy(bytes).trim_end().to_string(),
                ),
                XptType::Num => {
                    let mut full = [0u8; NUMERIC_LEN];
                    let take = length.min(NUMERIC_LEN);
                    full[..take].copy_from_slice(&bytes[..take]);
                    XptValue::Num(ibm_to_ieee(full))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_input() {
        assert!(matches!(
            parse_xpt_bytes(&[b' '; 80]),
            Err(XptError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn rejects_unaligned_input() {
        assert!(parse_xpt_bytes(&[b' '; 81 * 8]).is_err());
    }
}
