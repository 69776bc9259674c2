use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while polling cluster readiness. Long waits are normal
/// here (up to several minutes for a large cluster), so the message carries
/// the phase being waited on.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"])
            .template("{spinner:.cyan} {wide_msg} [{elapsed}]")
            .expect("Invalid spinner template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
