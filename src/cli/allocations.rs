use std::path::Path;

use clap::Parser;
use doables::{AllocationView, Workspace};
use tracing::instrument;

use super::{
    OutputFormat,
    terminal::{self, Colorize, is_narrow},
};

#[derive(Debug, Parser, Default)]
#[command(about = "List active allocations, highest priority and oldest first")]
pub struct Allocations {
    /// Only show allocations held by this user
    #[arg(long, value_name = "USER")]
    user: Option<String>,

    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl Allocations {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;

        let view: Vec<AllocationView<'_>> = workspace
            .allocation_view()
            .into_iter()
            .filter(|row| self.user.as_deref().is_none_or(|user| row.user_id == user))
            .collect();

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            OutputFormat::Table => Self::output_table(&view),
        }
        Ok(())
    }

    fn output_table(view: &[AllocationView<'_>]) {
        if view.is_empty() {
            println!("No active allocations.");
            return;
        }

        if is_narrow() {
            for row in view {
                println!("{} {}", row.doable_id, row.doable_title.dim());
                println!(
                    "  {} · {} · {}",
                    row.user_name,
                    terminal::priority(row.priority, 0),
                    terminal::status(row.status, 0)
                );
            }
            return;
        }

        println!(
            "{:<20} {:<6} {:<8} {:<10} {:<12} {:<16} {:<5} Title",
            "Doable", "Type", "Priority", "Status", "Case", "User", "Whole"
        );
        for row in view {
            println!(
                "{:<20} {:<6} {} {} {:<12} {:<16} {:<5} {}",
                row.doable_id,
                row.doable_type.as_str(),
                terminal::priority(row.priority, 8),
                terminal::status(row.status, 10),
                row.case_id.unwrap_or("-"),
                row.user_name,
                if row.is_case_allocation { "yes" } else { "" },
                row.doable_title,
            );
        }
    }
}
