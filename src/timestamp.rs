//! Periodic RFC-2822-style timestamp record emitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::facade::LogFacade;
use crate::metrics::Metrics;

pub const INTERVAL: Duration = Duration::from_secs(10);

pub fn spawn(facade: Arc<LogFacade>, metrics: Arc<Metrics>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while shutdown.load(Ordering::SeqCst) {
            thread::sleep(INTERVAL);
            if !shutdown.load(Ordering::SeqCst) {
                break;
            }
            match facade.append_timestamp() {
                Ok(()) => {
                    metrics.timestamps_emitted_total.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => error!("failed to append timestamp record: {e}"),
            }
        }
        info!("timestamp emitter stopped");
    })
}
