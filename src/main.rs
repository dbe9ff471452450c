use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use ringlogd::{Acceptor, Args, LogFacade, Metrics, ShutdownLatch};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let shutdown = ShutdownLatch::new();
    shutdown
        .install_signal_handler()
        .context("failed to install SIGINT/SIGTERM handler")?;

    let bind_addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&bind_addr)
        .with_context(|| format!("failed to bind listening socket on {bind_addr}"))?;
    info!("ringlogd listening on {bind_addr}");

    // Daemonize only after the bind succeeds, so setup failures still
    // surface to the caller (spec.md §4.F).
    if args.daemon {
        daemonize().context("failed to daemonize")?;
    }

    let facade = Arc::new(LogFacade::new(args.capacity));
    let metrics = Arc::new(Metrics::new());

    let timestamp_handle = ringlogd::timestamp::spawn(
        Arc::clone(&facade),
        Arc::clone(&metrics),
        shutdown.handle(),
    );

    let acceptor = Acceptor::new(listener, Arc::clone(&facade), Arc::clone(&metrics), shutdown.handle());
    let shutdown_fd = acceptor.shutdown_fd();
    let latch_for_signal = shutdown.clone();
    let unblock_handler_installed = install_unblock_on_shutdown(latch_for_signal, shutdown_fd);

    acceptor.run();

    // If the accept loop exited for a reason other than the latch (it
    // shouldn't, but be defensive), make sure every other loop also stops.
    shutdown.stop();
    let _ = timestamp_handle.join();
    let _ = unblock_handler_installed;

    metrics.log_summary();
    info!("ringlogd shut down cleanly");
    Ok(())
}

/// Spawns a tiny watcher thread that, once the shutdown latch clears,
/// performs the forced half-close on the listening socket described in
/// spec.md §4.F/§5 so a thread blocked in `accept()` wakes up promptly.
fn install_unblock_on_shutdown(latch: ShutdownLatch, raw_fd: i32) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while latch.is_running() {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        ringlogd::acceptor::force_unblock_accept(raw_fd);
    })
}

/// Forks once; the parent exits with success immediately, the child
/// continues as the server after detaching from its controlling terminal.
fn daemonize() -> anyhow::Result<()> {
    // SAFETY: fork() is called before any additional threads exist in this
    // process, and the child only calls async-signal-safe functions
    // (setsid) before returning to ordinary Rust code.
    let pid = unsafe { libc::fork() };
    match pid.cmp(&0) {
        std::cmp::Ordering::Less => anyhow::bail!("fork() failed"),
        std::cmp::Ordering::Greater => std::process::exit(0),
        std::cmp::Ordering::Equal => {
            // SAFETY: setsid() is async-signal-safe and called once, before
            // any other threads are spawned in the child.
            unsafe {
                libc::setsid();
            }
            Ok(())
        }
    }
}
