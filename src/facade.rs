//! Mutex-guarded aggregate exposing append, seek, snapshot, and timestamp
//! operations over the ring log and the shared partial-record buffer.

use std::sync::Mutex;

use chrono::Local;
use log::warn;
use thiserror::Error;

use crate::metrics::Metrics;
use crate::partial::PartialAssembler;
use crate::ring::RingLog;
use crate::seek::{SeekDirective, SeekError, is_seek_directive, parse_seek_directive};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FacadeError {
    #[error("resource exhausted while growing the log")]
    ResourceExhausted,
}

/// Outcome of a single complete record extracted during `append_bytes`.
#[derive(Debug)]
pub enum RecordEvent {
    /// The record was ordinary content and was added to the ring.
    Appended { overwrote: bool },
    /// The record was a seek directive and the connection's cursor was
    /// repositioned to the returned absolute offset.
    Sought { new_cursor: usize },
    /// The record looked like a seek directive but failed to parse or
    /// validate. It is never appended or echoed.
    SeekRejected(SeekError),
}

struct FacadeState {
    ring: RingLog,
    partial: PartialAssembler,
}

/// The single shared resource in this server: one mutex guarding both the
/// ring log and the partial-record buffer (intentionally shared across
/// connections — see spec.md §9 on the shared Partial Entry).
pub struct LogFacade {
    state: Mutex<FacadeState>,
}

impl LogFacade {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(FacadeState {
                ring: RingLog::new(capacity),
                partial: PartialAssembler::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FacadeState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("log facade mutex was poisoned by a panicking thread; recovering");
            poisoned.into_inner()
        })
    }

    /// Feeds `bytes` into the shared partial buffer and processes every
    /// complete record it yields, in order. Never blocks on I/O.
    pub fn append_bytes(&self, bytes: &[u8]) -> Result<Vec<RecordEvent>, FacadeError> {
        let mut events = Vec::new();
        let mut state = self.lock();
        state.partial.feed(bytes)?;
        while let Some(record) = state.partial.extract_record() {
            if is_seek_directive(&record) {
                let outcome = match parse_seek_directive(&record) {
                    Ok(directive) => match Self::resolve_seek(&state.ring, directive) {
                        Ok(new_cursor) => RecordEvent::Sought { new_cursor },
                        Err(e) => RecordEvent::SeekRejected(e),
                    },
                    Err(e) => RecordEvent::SeekRejected(e),
                };
                events.push(outcome);
            } else {
                let overwrote = state.ring.add(record);
                events.push(RecordEvent::Appended { overwrote });
            }
        }
        Ok(events)
    }

    /// Pure validation + translation of a seek directive to an absolute
    /// offset; does not mutate the ring.
    fn resolve_seek(ring: &RingLog, directive: SeekDirective) -> Result<usize, SeekError> {
        let present = ring.present_count();
        let record = ring.addressable(directive.record_index).ok_or(SeekError::OutOfRange {
            record_index: directive.record_index,
            present,
        })?;
        if directive.byte_offset >= record.len() {
            return Err(SeekError::OutOfRange {
                record_index: directive.record_index,
                present,
            });
        }
        let base = ring
            .logical_offset_of(directive.record_index)
            .expect("record_index validated addressable above");
        Ok(base + directive.byte_offset)
    }

    /// Copies out the logical byte range `[cursor, total_bytes)` under the
    /// lock so the caller can send it without holding the mutex during I/O.
    pub fn snapshot_from(&self, cursor: usize) -> Vec<u8> {
        self.lock().ring.copy_range_from(cursor)
    }

    /// Appends one record containing the formatted local time, as if
    /// received on a client connection. Never interacts with the partial
    /// buffer: timestamps are always complete.
    pub fn append_timestamp(&self) -> Result<(), FacadeError> {
        let line = Local::now()
            .format("timestamp:%a, %d %b %Y %T %z\n")
            .to_string();
        self.lock().ring.add(line.into_bytes());
        Ok(())
    }

    pub fn record_metrics_snapshot(&self, metrics: &Metrics) {
        let state = self.lock();
        metrics.set_ring_bytes(state.ring.total_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_echo_full_log() {
        let facade = LogFacade::new(10);
        let events = facade.append_bytes(b"hello\n").unwrap();
        assert!(matches!(events[0], RecordEvent::Appended { overwrote: false }));
        assert_eq!(facade.snapshot_from(0), b"hello\n");
    }

    #[test]
    fn multiple_records_from_one_write() {
        let facade = LogFacade::new(10);
        facade.append_bytes(b"a\n").unwrap();
        facade.append_bytes(b"b\n").unwrap();
        facade.append_bytes(b"c\n").unwrap();
        assert_eq!(facade.snapshot_from(0), b"a\nb\nc\n");
    }

    #[test]
    fn seek_directive_never_appended_or_echoed() {
        let facade = LogFacade::new(10);
        facade.append_bytes(b"a\n").unwrap();
        facade.append_bytes(b"b\n").unwrap();
        facade.append_bytes(b"c\n").unwrap();
        let events = facade.append_bytes(b"AESDCHAR_IOCSEEKTO:1,0\n").unwrap();
        let new_cursor = match &events[0] {
            RecordEvent::Sought { new_cursor } => *new_cursor,
            other => panic!("expected Sought, got {other:?}"),
        };
        assert_eq!(new_cursor, 2); // offset of "b\n"
        facade.append_bytes(b"d\n").unwrap();
        assert_eq!(facade.snapshot_from(new_cursor), b"b\nc\nd\n");
        // the directive bytes themselves never show up anywhere in the log
        let full = facade.snapshot_from(0);
        assert!(!full.windows(SEEK_PREFIX_LEN).any(|w| w == crate::seek::SEEK_PREFIX));
    }

    const SEEK_PREFIX_LEN: usize = crate::seek::SEEK_PREFIX.len();

    #[test]
    fn malformed_seek_is_rejected_and_connection_state_unaffected() {
        let facade = LogFacade::new(10);
        facade.append_bytes(b"a\n").unwrap();
        let events = facade.append_bytes(b"AESDCHAR_IOCSEEKTO:9,0\n").unwrap();
        assert!(matches!(events[0], RecordEvent::SeekRejected(_)));
        // dropped, not appended
        assert_eq!(facade.snapshot_from(0), b"a\n");
    }

    #[test]
    fn seek_offset_equal_to_length_is_out_of_range() {
        let facade = LogFacade::new(10);
        facade.append_bytes(b"ab\n").unwrap(); // length 3
        let events = facade.append_bytes(b"AESDCHAR_IOCSEEKTO:0,3\n").unwrap();
        assert!(matches!(events[0], RecordEvent::SeekRejected(_)));
    }

    #[test]
    fn ring_overflow_scenario() {
        let facade = LogFacade::new(10);
        for c in "0123456789a".chars() {
            facade.append_bytes(format!("{c}\n").as_bytes()).unwrap();
        }
        assert_eq!(facade.snapshot_from(0), b"1\n2\n3\n4\n5\n6\n7\n8\n9\na\n");
    }

    #[test]
    fn timestamp_is_appended_as_a_complete_record() {
        let facade = LogFacade::new(10);
        facade.append_timestamp().unwrap();
        let out = facade.snapshot_from(0);
        assert!(String::from_utf8(out).unwrap().starts_with("timestamp:"));
    }
}
