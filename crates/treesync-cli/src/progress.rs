//! Live progress display for scan and transfer walkers

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use treesync_core::{ScanProgress, TransferProgress};
use treesync_types::ProgressSnapshot;

/// Two spinners, one per walker, refreshed by polling the progress handles
pub struct RunProgressDisplay {
    _multi: MultiProgress,
    scan_bar: ProgressBar,
    transfer_bar: Option<ProgressBar>,
}

impl RunProgressDisplay {
    /// Create the display; nothing is drawn when `visible` is false
    pub fn new(visible: bool, with_transfer: bool, tick: Duration) -> Self {
        let multi = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let scan_bar = multi.add(spinner("green", tick));
        scan_bar.set_message("Scanning...");

        let transfer_bar = with_transfer.then(|| {
            let bar = multi.add(spinner("cyan", tick));
            bar.set_message("Waiting for folders...");
            bar
        });

        Self {
            _multi: multi,
            scan_bar,
            transfer_bar,
        }
    }

    /// Refresh both spinners from the current counters
    pub fn update(&self, scan: &ScanProgress, transfer: Option<&TransferProgress>) {
        let snapshot = scan.snapshot();
        self.scan_bar
            .set_message(describe("Scanned", "found", &snapshot));
        if snapshot.done && !self.scan_bar.is_finished() {
            self.scan_bar.finish();
        }

        if let (Some(bar), Some(transfer)) = (&self.transfer_bar, transfer) {
            let snapshot = transfer.snapshot();
            bar.set_message(describe("Transferred", "copied", &snapshot));
            if snapshot.done && !bar.is_finished() {
                bar.finish();
            }
        }
    }

    /// Show a status line above the spinners
    pub fn note(&self, message: &str) {
        self.scan_bar.println(message);
    }

    /// Stop drawing, leaving the last messages on screen
    pub fn finish(&self) {
        self.scan_bar.finish();
        if let Some(bar) = &self.transfer_bar {
            bar.finish();
        }
    }
}

fn spinner(color: &str, tick: Duration) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    bar.set_style(
        ProgressStyle::default_spinner()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(tick);
    bar
}

fn describe(label: &str, file_verb: &str, snapshot: &ProgressSnapshot) -> String {
    format!(
        "{}: {} folders, {} files {}{}",
        label,
        snapshot.folder_count,
        snapshot.file_count,
        file_verb,
        if snapshot.done { " (done)" } else { "" }
    )
}
