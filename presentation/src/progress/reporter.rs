//! Progress reporting for annotation runs

use celltype_application::ProgressNotifier;
use celltype_domain::{ClusterId, ConsensusResult, OracleName, Phase};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress with one progress bar per phase
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: &Phase, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(phase.display_name());
        pb.set_message("Starting...");

        if let Ok(mut bar) = self.phase_bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_task_complete(&self, _phase: &Phase, oracle: &OracleName, success: bool) {
        if let Ok(bar) = self.phase_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            let status = if success {
                format!("{} {}", "v".green(), oracle)
            } else {
                format!("{} {}", "x".red(), oracle)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, phase: &Phase) {
        if let Ok(mut bar) = self.phase_bar.lock()
            && let Some(pb) = bar.take()
        {
            pb.finish_with_message(format!("{} complete!", phase.display_name().green()));
        }
    }

    fn on_cluster_resolved(&self, cluster: &ClusterId, consensus: &ConsensusResult, round: usize) {
        let _ = self.multi.println(format!(
            "  {} cluster {} agreed on {} in round {}",
            "v".green(),
            cluster,
            consensus.label.bold(),
            round
        ));
    }
}

/// Plain line-based progress on stderr, for non-interactive terminals
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: &Phase, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            phase.display_name().bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _phase: &Phase, oracle: &OracleName, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), oracle);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), oracle);
        }
    }

    fn on_phase_complete(&self, _phase: &Phase) {
        eprintln!();
    }

    fn on_cluster_resolved(&self, cluster: &ClusterId, consensus: &ConsensusResult, round: usize) {
        eprintln!(
            "  {} cluster {} agreed on {} in round {}",
            "v".green(),
            cluster,
            consensus.label,
            round
        );
    }
}
