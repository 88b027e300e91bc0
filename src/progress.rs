use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner style used during ongoing operations.
/// - Yellow spinner with animated braille-style frames.
/// - Displays the current message (`{wide_msg}`) next to the spinner.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Style used when an operation finishes successfully.
/// - Green check mark followed by the final message.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

/// Style used when an operation finished but needs the user's attention.
pub fn warn_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m!\x1b[0m {wide_msg}").unwrap()
}

/// Style used when an operation fails with an error.
/// - Red cross followed by the error message.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

/// A column of spinners, one per procedure step.
///
/// `Steps::hidden()` draws nothing and is used by tests.
pub struct Steps {
    mp: MultiProgress,
}

impl Steps {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            mp: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Start a spinner for a new step.
    pub fn start(&self, msg: impl Into<String>) -> Step {
        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.set_message(msg.into());
        pb.enable_steady_tick(Duration::from_millis(80));
        Step { pb }
    }
}

impl Default for Steps {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Step {
    pb: ProgressBar,
}

impl Step {
    pub fn ok(self, msg: impl Into<String>) {
        self.pb.set_style(ok_style());
        self.pb.finish_with_message(msg.into());
    }

    pub fn warn(self, msg: impl Into<String>) {
        self.pb.set_style(warn_style());
        self.pb.finish_with_message(msg.into());
    }

    pub fn fail(self, msg: impl Into<String>) {
        self.pb.set_style(err_style());
        self.pb.finish_with_message(msg.into());
    }
}
