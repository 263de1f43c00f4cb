//! Progress reporting for plan execution
//!
//! Execution reports through the [`ProgressReporter`] trait so the library
//! stays silent by default and the binary can show `indicatif` bars.
//! Reporters are called from worker threads.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for plan execution
pub trait ProgressReporter: Send + Sync {
    /// A component's files are about to be written
    fn component_started(&self, name: &str, current: usize, total: usize);

    /// One file operation finished (written, skipped or failed)
    fn file_done(&self, relative_destination: &str);

    /// A component finished
    fn component_done(&self);

    /// Execution completed
    fn finish(&self);

    /// Execution stopped early
    fn abandon(&self);
}

/// No-op reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn component_started(&self, _name: &str, _current: usize, _total: usize) {}

    fn file_done(&self, _relative_destination: &str) {}

    fn component_done(&self) {}

    fn finish(&self) {}

    fn abandon(&self) {}
}

fn style(template: &str, chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(chars)
}

/// Interactive reporter with a component bar and a file bar
pub struct InteractiveProgress {
    _multi: indicatif::MultiProgress,
    component_pb: ProgressBar,
    file_pb: ProgressBar,
}

impl InteractiveProgress {
    pub fn new(total_components: u64, total_files: u64) -> Self {
        let multi = indicatif::MultiProgress::new();

        let component_pb = multi.add(ProgressBar::new(total_components));
        component_pb.set_style(style("[{bar:40.cyan/blue}] {pos}/{len} {msg}", "#>-"));

        let file_pb = multi.add(ProgressBar::new(total_files));
        file_pb.set_style(style(
            "  [{bar:40.green/yellow}] {pos}/{len} files {msg}",
            "█▉▊▋▌▍▎▏  ",
        ));

        Self {
            _multi: multi,
            component_pb,
            file_pb,
        }
    }
}

/// Keep the tail of long paths visible
fn shorten(path: &str) -> String {
    const MAX: usize = 50;
    let count = path.chars().count();
    if count <= MAX {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (MAX - 3)).collect();
    format!("...{tail}")
}

impl ProgressReporter for InteractiveProgress {
    fn component_started(&self, name: &str, current: usize, total: usize) {
        self.component_pb
            .set_message(format!("({current}/{total}) {name}"));
    }

    fn file_done(&self, relative_destination: &str) {
        self.file_pb.set_message(shorten(relative_destination));
        self.file_pb.inc(1);
    }

    fn component_done(&self) {
        self.component_pb.inc(1);
    }

    fn finish(&self) {
        self.file_pb.finish_and_clear();
        self.component_pb.finish_and_clear();
    }

    fn abandon(&self) {
        self.file_pb.abandon();
        self.component_pb.abandon();
    }
}
