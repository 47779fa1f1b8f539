//! Terminal output for the worker — spinner and colored result lines.
//!
//! Uses `indicatif` for the run spinner and `console` for color styling.
//! [`RunProgress`] tracks a discovery run visually in the terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::model::{DiscoveryResult, Outcome, RunSummary};

/// Visual progress indicator for a discovery run.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl RunProgress {
    /// Start the spinner for a run over `total` job postings.
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Discovering recruiters across {total} postings"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }

    /// Print a one-line colored summary of a single job's result.
    pub fn print_result(&self, result: &DiscoveryResult) {
        let line = match result.outcome {
            Outcome::Success => {
                let recruiter = result
                    .recruiter
                    .as_ref()
                    .map(|r| r.display_name.as_str())
                    .unwrap_or("unknown");
                format!(
                    "  {} job {}: {} ({})",
                    self.green.apply_to("✓"),
                    result.job_id,
                    recruiter,
                    result.reason
                )
            }
            Outcome::PartialSuccess => format!(
                "  {} job {}: recruiter located, capture failed — {}",
                self.yellow.apply_to("◐"),
                result.job_id,
                result.reason
            ),
            Outcome::NotFound => format!(
                "  {} job {}: no recruiter found",
                self.dim.apply_to("–"),
                result.job_id
            ),
            Outcome::RateLimited => format!(
                "  {} job {}: {}",
                self.yellow.apply_to("⏸"),
                result.job_id,
                result.reason
            ),
            Outcome::Failed => format!(
                "  {} job {}: {}",
                self.red.apply_to("✗"),
                result.job_id,
                result.reason
            ),
        };
        self.pb.println(line);
    }

    /// Print the run summary as styled, pretty JSON.
    pub fn print_summary(&self, summary: &RunSummary) {
        let status_style = if summary.failed > 0 {
            &self.red
        } else if summary.rate_limited > 0 {
            &self.yellow
        } else {
            &self.green
        };
        println!();
        println!("{}", status_style.apply_to("─── Run Summary ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
    }
}
