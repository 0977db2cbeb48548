use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::models::QueryOutput;
use crate::query::QueryDepth;

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Spinner shown on stderr while a query runs
pub struct QueryProgress {
    pb: ProgressBar,
}

impl QueryProgress {
    pub fn start(system: &str, depth: QueryDepth) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Query").underlined());
        let pb = create_spinner(
            bright_yellow(format!("Querying '{system}' down to {depth}")).to_string(),
        );
        Self { pb }
    }

    pub fn finish(self, output: &QueryOutput) {
        let message = if output.is_partial() {
            bright_yellow(format!(
                "Queried {} tenants, {} branches failed",
                output.tenants.len(),
                output.errors.len()
            ))
        } else {
            bright_green(format!("Queried {} tenants ✓", output.tenants.len()))
        };
        self.pb.finish_with_message(message.to_string());
        eprintln!();
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(bright_red("Query failed ✗").to_string());
        eprintln!();
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
