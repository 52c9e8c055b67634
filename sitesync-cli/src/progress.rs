use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sitesync::{ProgressEvent, ProgressSink, TransferEvent};
use std::sync::Mutex;

/// Renders step and download progress with indicatif.
pub struct ConsoleProgress {
    multi: MultiProgress,
    steps: ProgressBar,
    download: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let steps = multi.add(ProgressBar::new(0));
        steps.set_style(
            ProgressStyle::with_template(
                " {pos}/{len} [{bar:28.cyan/blue}] {percent:>3}% {msg:.green}",
            )
            .unwrap()
            .progress_chars("#>-"),
        );

        Self {
            multi,
            steps,
            download: Mutex::new(None),
        }
    }

    fn byte_bar(&self, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "   {msg} [{bar:28.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
                    )
                    .unwrap()
                    .progress_chars("#>-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("   {spinner:.green} {msg} {bytes} ({bytes_per_sec})")
                        .unwrap(),
                );
                bar
            }
        };
        self.multi.add(bar)
    }

    fn on_transfer(&self, event: &TransferEvent) {
        let mut slot = self.download.lock().unwrap_or_else(|e| e.into_inner());
        match event {
            TransferEvent::SizeKnown { kind, total } => {
                if let Some(old) = slot.take() {
                    old.finish_and_clear();
                }
                let bar = self.byte_bar(Some(*total));
                bar.set_message(kind.to_string());
                *slot = Some(bar);
            }
            TransferEvent::Progress { kind, transferred } => {
                let bar = slot.get_or_insert_with(|| {
                    let bar = self.byte_bar(None);
                    bar.set_message(kind.to_string());
                    bar
                });
                bar.set_position(*transferred);
            }
            TransferEvent::Completed { .. } => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
            TransferEvent::Redirected { kind, location } => {
                let _ = self
                    .multi
                    .println(format!("   {} redirected to {}", kind, location));
            }
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Begin { total_steps } => self.steps.set_length(*total_steps),
            ProgressEvent::Step { message } => self.steps.set_message(message.clone()),
            ProgressEvent::Advance => self.steps.inc(1),
            ProgressEvent::Transfer(transfer) => self.on_transfer(transfer),
            ProgressEvent::Finish { .. } => self.steps.finish(),
        }
    }
}
