//! Accumulates bytes until a newline, then promotes the prefix to a record.

use crate::facade::FacadeError;

/// Growable byte buffer holding the tail of a record not yet
/// newline-terminated.
#[derive(Default)]
pub struct PartialAssembler {
    buf: Vec<u8>,
}

impl PartialAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` verbatim. A no-op for an empty slice.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), FacadeError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.buf
            .try_reserve(bytes.len())
            .map_err(|_| FacadeError::ResourceExhausted)?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the shortest prefix ending at the first newline, retaining
    /// everything after it as the new partial state. `None` if no newline
    /// is present yet.
    pub fn extract_record(&mut self) -> Option<Vec<u8>> {
        let newline_at = self.buf.iter().position(|&b| b == b'\n')?;
        let record = self.buf[..=newline_at].to_vec();
        self.buf.drain(..=newline_at);
        Some(record)
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_feed_is_noop() {
        let mut p = PartialAssembler::new();
        p.feed(b"").unwrap();
        assert_eq!(p.pending_len(), 0);
        assert!(p.extract_record().is_none());
    }

    #[test]
    fn extracts_one_record_per_newline() {
        let mut p = PartialAssembler::new();
        p.feed(b"hello\n").unwrap();
        assert_eq!(p.extract_record(), Some(b"hello\n".to_vec()));
        assert!(p.extract_record().is_none());
    }

    #[test]
    fn no_newline_leaves_buffer_grown() {
        let mut p = PartialAssembler::new();
        p.feed(b"partial").unwrap();
        assert!(p.extract_record().is_none());
        assert_eq!(p.pending_len(), 7);
        p.feed(b" more").unwrap();
        assert_eq!(p.pending_len(), 12);
    }

    #[test]
    fn trailing_bytes_after_newline_stay_partial() {
        let mut p = PartialAssembler::new();
        p.feed(b"hello\nwo").unwrap();
        assert_eq!(p.extract_record(), Some(b"hello\n".to_vec()));
        assert!(p.extract_record().is_none());
        assert_eq!(p.pending_len(), 2);
        p.feed(b"rld\n").unwrap();
        assert_eq!(p.extract_record(), Some(b"world\n".to_vec()));
    }

    #[test]
    fn one_write_completes_multiple_records() {
        let mut p = PartialAssembler::new();
        p.feed(b"a\nb\nc\n").unwrap();
        assert_eq!(p.extract_record(), Some(b"a\n".to_vec()));
        assert_eq!(p.extract_record(), Some(b"b\n".to_vec()));
        assert_eq!(p.extract_record(), Some(b"c\n".to_vec()));
        assert!(p.extract_record().is_none());
    }

    #[test]
    fn single_byte_newline_record_is_permitted() {
        let mut p = PartialAssembler::new();
        p.feed(b"\n").unwrap();
        assert_eq!(p.extract_record(), Some(b"\n".to_vec()));
    }
}
