//! Recognizes the in-band seek directive and converts it to
//! `(record_index, byte_offset)`.

use thiserror::Error;

/// Literal prefix that marks a record as a seek directive rather than log
/// content.
pub const SEEK_PREFIX: &[u8] = b"AESDCHAR_IOCSEEKTO:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeekError {
    #[error("malformed seek directive: {0}")]
    Malformed(String),
    #[error("seek directive addresses record {record_index} of {present} present records, or an offset past its end")]
    OutOfRange {
        record_index: usize,
        present: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekDirective {
    pub record_index: usize,
    pub byte_offset: usize,
}

/// Whether `record` (a complete, newline-terminated record) is a seek
/// directive rather than ordinary log content.
pub fn is_seek_directive(record: &[u8]) -> bool {
    record.starts_with(SEEK_PREFIX)
}

/// Parses the text following the prefix: two base-10 unsigned integers
/// separated by a single comma. Does not validate the parsed indices
/// against any ring state; see [`crate::facade::LogFacade::apply_seek`].
pub fn parse_seek_directive(record: &[u8]) -> Result<SeekDirective, SeekError> {
    debug_assert!(is_seek_directive(record));
    let rest = &record[SEEK_PREFIX.len()..];
    let rest = rest.strip_suffix(b"\n").unwrap_or(rest);
    let text = std::str::from_utf8(rest)
        .map_err(|_| SeekError::Malformed("seek payload is not valid UTF-8".to_string()))?;

    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 2 {
        return Err(SeekError::Malformed(format!(
            "expected exactly one comma, found {}",
            fields.len().saturating_sub(1)
        )));
    }

    let record_index: usize = fields[0]
        .parse()
        .map_err(|_| SeekError::Malformed(format!("write_cmd {:?} is not a valid integer", fields[0])))?;
    let byte_offset: usize = fields[1]
        .parse()
        .map_err(|_| SeekError::Malformed(format!("write_cmd_offset {:?} is not a valid integer", fields[1])))?;

    Ok(SeekDirective {
        record_index,
        byte_offset,
    })
}
