//! Periodic progress logging for long-running stages.

use std::time::Instant;

use log::{debug, info};

/// Counts processed items and logs every `interval` of them.
#[derive(Debug)]
pub(crate) struct Progress {
    stage: &'static str,
    total: usize,
    interval: usize,
    done: usize,
    started: Instant,
}

impl Progress {
    pub(crate) fn start(stage: &'static str, total: usize, interval: usize) -> Self {
        info!("{stage}: processing {total} items");
        Self {
            stage,
            total,
            interval: interval.max(1),
            done: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn tick(&mut self) {
        self.done += 1;
        if self.done.is_multiple_of(self.interval) {
            debug!(
                "{}: {}/{} after {:.1?}",
                self.stage,
                self.done,
                self.total,
                self.started.elapsed()
            );
        }
    }

    pub(crate) fn finish(self) {
        info!(
            "{}: finished {} items in {:.1?}",
            self.stage,
            self.done,
            self.started.elapsed()
        );
    }
}
