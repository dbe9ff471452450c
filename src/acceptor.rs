//! Binds the listening socket, spawns a worker per accepted connection,
//! reaps finished workers, and honors the shutdown latch.

use std::net::TcpListener;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use log::{info, warn};

use crate::facade::LogFacade;
use crate::metrics::Metrics;
use crate::worker;

pub struct Acceptor {
    listener: TcpListener,
    facade: Arc<LogFacade>,
    metrics: Arc<Metrics>,
    shutdown: Arc<AtomicBool>,
}

impl Acceptor {
    pub fn new(
        listener: TcpListener,
        facade: Arc<LogFacade>,
        metrics: Arc<Metrics>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            listener,
            facade,
            metrics,
            shutdown,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// A raw, `Copy` handle to the listening socket that a signal handler
    /// can use to force a half-close and unblock a pending `accept()`.
    pub fn shutdown_fd(&self) -> i32 {
        self.listener.as_raw_fd()
    }

    /// Runs the accept loop until the shutdown latch is cleared. Returns
    /// once every spawned worker has been joined.
    pub fn run(&self) {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while self.shutdown.load(Ordering::SeqCst) {
            reap_finished(&mut workers);

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if !self.shutdown.load(Ordering::SeqCst) {
                        // Shutdown was signaled concurrently with this accept;
                        // drop the connection rather than serve it.
                        let _ = stream.shutdown(std::net::Shutdown::Both);
                        break;
                    }
                    info!("accepted connection from {addr}");
                    let handle = worker::spawn(stream, Arc::clone(&self.facade), Arc::clone(&self.metrics));
                    workers.push(handle);
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::SeqCst) {
                        info!("listening socket shut down, stopping accept loop");
                        break;
                    }
                    warn!("transient accept error: {e}");
                }
            }
        }

        info!("joining {} live worker(s)", workers.len());
        for handle in workers {
            let _ = handle.join();
        }
    }
}

fn reap_finished(workers: &mut Vec<JoinHandle<()>>) {
    let mut i = 0;
    while i < workers.len() {
        if workers[i].is_finished() {
            let handle = workers.swap_remove(i);
            let _ = handle.join();
        } else {
            i += 1;
        }
    }
}

/// Performs the half-close (`shutdown(2)`, both directions) on the
/// listening socket described in spec.md §4.F/§5, unblocking a thread
/// currently parked in a blocking `accept()` call.
pub fn force_unblock_accept(raw_fd: i32) {
    // SAFETY: raw_fd was obtained from a live TcpListener via as_raw_fd()
    // and the listener is not dropped before this call completes.
    unsafe {
        libc::shutdown(raw_fd, libc::SHUT_RDWR);
    }
}
