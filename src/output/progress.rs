use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{done, heading, pending};

const TOTAL_PHASES: usize = 4;

/// Progress tracking for the collection phases
pub struct PhaseProgress {
    pb: ProgressBar,
    phase: usize,
}

impl PhaseProgress {
    pub fn start(message: &str) -> Self {
        eprintln!("⚙️  {}", heading("Phases"));
        Self::spawn(1, message)
    }

    /// Marks the current phase done and starts the next one.
    pub fn advance(self, completed: String, next: &str) -> Self {
        self.complete(&completed);
        Self::spawn(self.phase + 1, next)
    }

    pub fn finish(self, completed: String) {
        self.complete(&completed);
        eprintln!();
    }

    fn spawn(phase: usize, message: &str) -> Self {
        let pb = create_spinner(
            pending(format!("Phase {phase}/{TOTAL_PHASES}: {message}")).to_string(),
        );
        Self { pb, phase }
    }

    fn complete(&self, completed: &str) {
        self.pb.finish_with_message(
            done(format!("Phase {}/{TOTAL_PHASES}: {completed} ✓", self.phase)).to_string(),
        );
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
