use std::path::Path;

use clap::Parser;
use doables::{DoableType, Status as DoableStatus, Workspace};
use tracing::instrument;

use super::{
    OutputFormat,
    terminal::{Colorize, is_narrow},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show doable counts and allocation totals")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

/// Counts of doables, keyed by type and then by status.
#[derive(Debug, Default, serde::Serialize)]
struct Summary {
    tasks: StatusCounts,
    emails: StatusCounts,
    cases: usize,
    users: usize,
    allocations: usize,
}

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
struct StatusCounts {
    pending: usize,
    allocated: usize,
    completed: usize,
}

impl StatusCounts {
    const fn total(self) -> usize {
        self.pending + self.allocated + self.completed
    }

    const fn add(&mut self, status: DoableStatus) {
        match status {
            DoableStatus::Pending => self.pending += 1,
            DoableStatus::Allocated => self.allocated += 1,
            DoableStatus::Completed => self.completed += 1,
        }
    }
}

impl Summary {
    fn of(workspace: &Workspace) -> Self {
        let mut summary = Self {
            cases: workspace.doables().grouped_by_case().len(),
            users: workspace.users().len(),
            allocations: workspace.allocations().len(),
            ..Self::default()
        };
        for doable in workspace.doables().iter() {
            match doable.doable_type() {
                DoableType::Task => summary.tasks.add(doable.status()),
                DoableType::Email => summary.emails.add(doable.status()),
            }
        }
        summary
    }

    const fn total(&self) -> usize {
        self.tasks.total() + self.emails.total()
    }

    const fn pending(&self) -> usize {
        self.tasks.pending + self.emails.pending
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let summary = Summary::of(&workspace);

        if summary.total() == 0 && matches!(self.output, OutputFormat::Table) && !self.quiet {
            println!("No doables found yet. Create one with 'doable create'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&summary);
                } else {
                    Self::output_table(&summary);
                }
            }
        }
        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        println!(
            "total={} pending={} allocations={}",
            summary.total(),
            summary.pending(),
            summary.allocations
        );
    }

    fn output_table(summary: &Summary) {
        let narrow = is_narrow();

        println!("Doable counts");
        println!("{}", "─────────────".dim());

        let rows = [("Tasks", summary.tasks), ("Emails", summary.emails)];
        if narrow {
            for (label, counts) in rows {
                println!(
                    "{label}: {} pending, {} allocated, {} completed",
                    counts.pending, counts.allocated, counts.completed
                );
            }
        } else {
            println!(
                "{:<8} {:<8} {:<10} {:<10} Total",
                "", "Pending", "Allocated", "Completed"
            );
            for (label, counts) in rows {
                println!(
                    "{label:<8} {:<8} {:<10} {:<10} {}",
                    counts.pending,
                    counts.allocated,
                    counts.completed,
                    counts.total()
                );
            }
        }
        println!("Total: {} in {} cases", summary.total(), summary.cases);

        println!();

        if summary.pending() == 0 {
            println!("Queue: {} ✅", "empty".success());
        } else {
            println!(
                "Queue: {} waiting",
                summary.pending().to_string().warning()
            );
            println!("{}", "Run 'doable allocate <USER>' to hand out work.".dim());
        }

        println!(
            "Allocations: {} across {} users",
            summary.allocations.to_string().info(),
            summary.users
        );
    }
}
