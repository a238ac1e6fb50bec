//! Terminal rendering for transfer progress.
//!
//! The single consumer of the progress channel. Keeps one `indicatif`
//! bar per task, keyed by task id, created lazily on the task's first
//! event. Renders to stderr so piped output stays clean.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::progress::ProgressEvent;

fn task_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {prefix:30!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}",
    )
    .unwrap()
    .progress_chars("=>-")
}

/// Drain the progress channel until every reporter has dropped.
///
/// `labels` maps task ids to display names (usually the remote path).
/// In quiet mode nothing is rendered but the channel is still drained so
/// workers never observe a full pipe.
pub fn render(rx: Receiver<ProgressEvent>, labels: &HashMap<u64, String>, quiet: bool) {
    let multi = if quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
    };
    let mut bars: HashMap<u64, ProgressBar> = HashMap::new();

    for event in rx.iter() {
        let bar = bars.entry(event.task_id).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(event.total.unwrap_or(0)));
            bar.set_style(task_bar_style());
            let label = labels
                .get(&event.task_id)
                .cloned()
                .unwrap_or_else(|| format!("task {}", event.task_id));
            bar.set_prefix(label);
            bar
        });

        if let Some(total) = event.total {
            bar.set_length(total);
        }
        bar.set_position(event.bytes);

        if event.terminal {
            bar.finish_with_message(event.message);
        }
    }
}
