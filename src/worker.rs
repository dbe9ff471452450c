//! Per-connection state machine: receive, feed the assembler, and on each
//! completed record either reposition the cursor (seek) or append and
//! echo the log from the connection's current read cursor.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use crate::facade::{LogFacade, RecordEvent};
use crate::metrics::Metrics;

/// Per-connection receive buffer size. The buffer grows by this many
/// bytes whenever a read fills it completely.
pub const READ_SIZE: usize = 1024;
/// Suggested (not required) echo frame size.
pub const WRITE_SIZE: usize = 1024;

/// Owned per-connection state: the socket, a human-readable peer label,
/// and the read cursor into the logical log.
struct ConnectionState {
    stream: TcpStream,
    peer: String,
    cursor: usize,
    read_buf: Vec<u8>,
}

pub fn spawn(stream: TcpStream, facade: Arc<LogFacade>, metrics: Arc<Metrics>) -> JoinHandle<()> {
    thread::spawn(move || run(stream, facade, metrics))
}

fn run(stream: TcpStream, facade: Arc<LogFacade>, metrics: Arc<Metrics>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    info!("connection accepted from {peer}");
    metrics.connections_total.fetch_add(1, Ordering::Relaxed);
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);

    let mut conn = ConnectionState {
        stream,
        peer: peer.clone(),
        cursor: 0,
        read_buf: vec![0u8; READ_SIZE],
    };

    if let Err(reason) = serve(&mut conn, &facade, &metrics) {
        debug!("connection with {peer} ended: {reason}");
    }

    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
    let _ = conn.stream.shutdown(std::net::Shutdown::Both);
    info!("connection with {peer} closed");
}

/// Drives one connection until the peer closes or an unrecoverable I/O
/// error occurs. Errors here never escape the worker thread; the caller
/// only logs them.
fn serve(conn: &mut ConnectionState, facade: &LogFacade, metrics: &Metrics) -> io::Result<()> {
    loop {
        let n = match conn.stream.read(&mut conn.read_buf) {
            Ok(0) => return Ok(()), // peer closed, orderly
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if n == conn.read_buf.len() {
            conn.read_buf.resize(conn.read_buf.len() + READ_SIZE, 0);
        }

        let events = match facade.append_bytes(&conn.read_buf[..n]) {
            Ok(events) => events,
            Err(e) => {
                error!("{} exhausted log resources: {e}", conn.peer);
                return Ok(());
            }
        };

        for event in events {
            match event {
                RecordEvent::Appended { overwrote } => {
                    metrics.records_appended_total.fetch_add(1, Ordering::Relaxed);
                    if overwrote {
                        metrics.records_overwritten_total.fetch_add(1, Ordering::Relaxed);
                    }
                    echo_from_cursor(conn, facade, metrics)?;
                }
                RecordEvent::Sought { new_cursor } => {
                    metrics.seek_ok_total.fetch_add(1, Ordering::Relaxed);
                    conn.cursor = new_cursor;
                }
                RecordEvent::SeekRejected(reason) => {
                    metrics.seek_malformed_total.fetch_add(1, Ordering::Relaxed);
                    warn!("malformed seek directive from {}: {reason}", conn.peer);
                }
            }
        }
    }
}

/// Sends `[cursor, total_bytes)` of the log to the client. The cursor
/// itself is left untouched here: per the §8 literal scenarios it is
/// repositioned only by a seek directive, never advanced by an echo, so a
/// connection that hasn't sought keeps re-echoing the full log from its
/// (default zero) cursor on every record.
fn echo_from_cursor(conn: &mut ConnectionState, facade: &LogFacade, metrics: &Metrics) -> io::Result<()> {
    let bytes = facade.snapshot_from(conn.cursor);
    for chunk in bytes.chunks(WRITE_SIZE) {
        conn.stream.write_all(chunk)?;
    }
    metrics.bytes_echoed_total.fetch_add(bytes.len() as u64, Ordering::Relaxed);
    Ok(())
}
