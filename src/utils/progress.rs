/// Progress bars for long-running per-genome stages
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Counter-style bar: "[00:00:03] [████░░] 12/40 (30%) bins"
pub fn create_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Build a progress bar for `total` items, drawn to stderr unless hidden
pub fn create_progress_bar(total: usize, message: &str, visible: bool) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if visible {
        bar.set_draw_target(ProgressDrawTarget::stderr());
    } else {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    bar.set_style(create_progress_style());
    bar.set_message(message.to_string());
    bar
}

/// Progress is shown only when stderr logging is at info or more verbose
pub fn progress_visible() -> bool {
    tracing::enabled!(tracing::Level::INFO)
}
