use indicatif::{ProgressBar, ProgressStyle};
use log::log_enabled;

use crate::time::Jiffies;

const K_PROGRESS_TIMES: u64 = 20;

pub(crate) struct Bar {
    bar: ProgressBar,
    prev_log: u64,
    delta: u64,
}

impl Bar {
    pub(crate) fn new(total: Jiffies) -> Self {
        let bar = if log_enabled!(log::Level::Info) {
            let bar = ProgressBar::new(total.0);
            if let Ok(style) = ProgressStyle::default_bar().template("{spinner} [{bar:50.cyan}] {pos}/{len} jiffies ({eta})") {
                bar.set_style(style);
            }
            bar.set_position(0);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            bar,
            prev_log: 0,
            delta: (total.0 / K_PROGRESS_TIMES).max(1),
        }
    }

    pub(crate) fn make_progress(&mut self, time: Jiffies) {
        let d = time.0 / self.delta;
        if d > self.prev_log {
            self.prev_log = d;
            self.bar.set_position(time.0)
        }
    }

    pub(crate) fn finish(&mut self) {
        self.bar.finish();
    }
}
