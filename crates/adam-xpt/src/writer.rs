//! Transport file writer.
//!
//! Output depends only on the dataset and the options, so rewriting an
//! unchanged dataset with the same timestamp reproduces the file byte for byte.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, XptError};
use crate::float::{encode_missing, ieee_to_ibm};
use crate::header::{
    RECORD_LEN, build_dscrptr_header, build_library_header, build_member_data,
    build_member_header, build_member_second, build_namestr, build_namestr_header,
    build_obs_header, build_real_header, build_second_header,
};
use crate::types::{XptColumn, XptDataset, XptType, XptValue, XptWriterOptions};

pub struct XptWriter<W: Write> {
    writer: BufWriter<W>,
    options: XptWriterOptions,
}

impl<W: Write> XptWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XptWriterOptions::default())
    }

    pub fn with_options(writer: W, options: XptWriterOptions) -> Self {
        Self {
            writer: BufWriter::new(writer),
            options,
        }
    }

    /// Writes `dataset` as the only member of the file.
    pub fn write_dataset(mut self, dataset: &XptDataset) -> Result<()> {
        validate_dataset(dataset)?;

        self.writer.write_all(&build_library_header())?;
        self.writer.write_all(&build_real_header(&self.options))?;
        self.writer.write_all(&build_second_header(&self.options))?;

        self.writer.write_all(&build_member_header())?;
        self.writer.write_all(&build_dscrptr_header())?;
        self.writer
            .write_all(&build_member_data(dataset, &self.options))?;
        self.writer
            .write_all(&build_member_second(dataset, &self.options))?;

        self.writer
            .write_all(&build_namestr_header(dataset.columns.len()))?;
        self.write_namestr_records(&dataset.columns)?;

        self.writer.write_all(&build_obs_header())?;
        self.write_observations(dataset)?;

        self.writer.flush()?;
        Ok(())
    }

    fn write_namestr_records(&mut self, columns: &[XptColumn]) -> Result<()> {
        let mut records = RecordWriter::new(&mut self.writer);
        let mut position = 0u32;
        for (idx, column) in columns.iter().enumerate() {
            records.write_bytes(&build_namestr(column, (idx + 1) as u16, position))?;
            position = position.saturating_add(u32::from(column.length));
        }
        records.finish()
    }

    fn write_observations(&mut self, dataset: &XptDataset) -> Result<()> {
        let obs_len = dataset.observation_length();
        let mut records = RecordWriter::new(&mut self.writer);
        for (row_idx, row) in dataset.rows.iter().enumerate() {
            let mut obs = Vec::with_capacity(obs_len);
            for (value, column) in row.iter().zip(&dataset.columns) {
                obs.extend(encode_value(value, column, row_idx)?);
            }
            records.write_bytes(&obs)?;
        }
        records.finish()
    }
}

impl XptWriter<File> {
    pub fn create(path: &Path, options: XptWriterOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_options(file, options))
    }
}

pub fn write_xpt(path: &Path, dataset: &XptDataset, options: &XptWriterOptions) -> Result<()> {
    XptWriter::create(path, options.clone())?.write_dataset(dataset)
}

/// Encodes `dataset` into memory.
pub fn write_xpt_bytes(dataset: &XptDataset, options: &XptWriterOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    XptWriter::with_options(&mut out, options.clone()).write_dataset(dataset)?;
    Ok(out)
}

fn validate_dataset(dataset: &XptDataset) -> Result<()> {
    let name = dataset.name.trim();
    if name.is_empty() || name.len() > 8 {
        return Err(XptError::invalid_dataset_name(&dataset.name));
    }
    if dataset.label.len() > 40 {
        return Err(XptError::DatasetLabelTooLong {
            label: dataset.label.clone(),
        });
    }

    let mut seen = BTreeSet::new();
    for column in &dataset.columns {
        let column_name = column.name.trim().to_uppercase();
        if column_name.is_empty() || column_name.len() > 8 {
            return Err(XptError::invalid_variable_name(&column.name));
        }
        if column.label.len() > 40 {
            return Err(XptError::VariableLabelTooLong {
                name: column.name.clone(),
            });
        }
        if !seen.insert(column_name) {
            return Err(XptError::duplicate_variable(&column.name));
        }
        if column.length == 0 {
            return Err(XptError::zero_length(&column.name));
        }
    }

    for row in &dataset.rows {
        if row.len() != dataset.columns.len() {
            return Err(XptError::RowLengthMismatch {
                expected: dataset.columns.len(),
                actual: row.len(),
            });
        }
    }
    Ok(())
}

fn encode_value(value: &XptValue, column: &XptColumn, row: usize) -> Result<Vec<u8>> {
    let length = usize::from(column.length);
    match (value, column.data_type) {
        (XptValue::Char(text), XptType::Char) => Ok(encode_char(text, length)),
        (XptValue::Num(number), XptType::Num) => {
            let bytes = match number {
                Some(v) if v.is_finite() => ieee_to_ibm(*v),
                _ => encode_missing(),
            };
            Ok(bytes[..length.min(bytes.len())].to_vec())
        }
        _ => Err(XptError::TypeMismatch {
            name: column.name.clone(),
            row,
        }),
    }
}

/// Space-padded ASCII; other characters become `?`.
fn encode_char(value: &str, length: usize) -> Vec<u8> {
    let mut out: Vec<u8> = value
        .chars()
        .take(length)
        .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
        .collect();
    out.resize(length, b' ');
    out
}

/// Packs bytes into space-padded 80-byte records.
struct RecordWriter<'a, W: Write> {
    writer: &'a mut W,
    record: [u8; RECORD_LEN],
    pos: usize,
}

impl<'a, W: Write> RecordWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            record: [b' '; RECORD_LEN],
            pos: 0,
        }
    }

    fn write_bytes(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let take = (RECORD_LEN - self.pos).min(bytes.len());
            self.record[self.pos..self.pos + take].copy_from_slice(&bytes[..take]);
            self.pos += take;
            bytes = &bytes[take..];
            if self.pos == RECORD_LEN {
                self.writer.write_all(&self.record)?;
                self.record = [b' '; RECORD_LEN];
                self.pos = 0;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.pos > 0 {
            self.record[self.pos..].fill(b' ');
            self.writer.write_all(&self.record)?;
            self.pos = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_char_with_padding_and_truncation() {
        assert_eq!(encode_char("hello", 8), b"hello   ");
        assert_eq!(encode_char("verylongstring", 5), b"veryl");
        assert_eq!(encode_char("Zürich", 6), b"Z?rich");
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let column = XptColumn::numeric("AGE");
        let err = encode_value(&XptValue::Char("x".to_string()), &column, 2).unwrap_err();
        assert!(matches!(err, XptError::TypeMismatch { row: 2, .. }));
    }

    #[test]
    fn validates_names_and_lengths() {
        assert!(validate_dataset(&XptDataset::new("")).is_err());
        assert!(validate_dataset(&XptDataset::new("VERYLONGNAME")).is_err());
        let duplicate = XptDataset::with_columns(
            "ADSL",
            vec![XptColumn::numeric("AGE"), XptColumn::numeric("age")],
        );
        assert!(matches!(
            validate_dataset(&duplicate),
            Err(XptError::DuplicateVariable { .. })
        ));
        let mut zero = XptColumn::character("SEX", 1);
        zero.length = 0;
        assert!(validate_dataset(&XptDataset::with_columns("ADSL", vec![zero])).is_err());
    }

    #[test]
    fn record_writer_pads_the_last_record() {
        let mut output = Vec::new();
        {
            let mut writer = RecordWriter::new(&mut output);
            writer.write_bytes(&[b'A'; 50]).unwrap();
            writer.write_bytes(&[b'B'; 50]).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(output.len(), 160);
        assert_eq!(&output[50..80], &[b'B'; 30]);
        assert_eq!(&output[100..], &[b' '; 60]);
    }
}
