use std::path::Path;

use clap::Parser;
use doables::{
    Workspace,
    domain::{Allocation, Doable, DoableType, User},
    storage::records::AllocationRecord,
};
use tracing::instrument;

use super::OutputFormat;

#[derive(Debug, Parser)]
#[command(about = "Allocate the next doable, or a whole case, to a user")]
pub struct Allocate {
    /// The user to allocate work to
    user: String,

    /// Only consider doables of this type (defaults to the user's preferred
    /// type)
    #[arg(long = "type", value_name = "TYPE")]
    doable_type: Option<DoableType>,

    /// Allocate every doable of the oldest untouched case
    #[arg(long, conflicts_with = "case_id")]
    case: bool,

    /// Allocate the pending doables of a specific case
    #[arg(long, value_name = "CASE")]
    case_id: Option<String>,

    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl Allocate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;

        let doable_type = self.doable_type.or_else(|| {
            workspace
                .users()
                .get(&self.user)
                .and_then(User::preferred_doable_type)
        });

        let mut allocator = workspace.allocator();
        let allocations = if let Some(case_id) = &self.case_id {
            allocator.allocate_related(&self.user, case_id)?
        } else if self.case {
            allocator.allocate_case(&self.user, doable_type)?
        } else {
            allocator
                .allocate_single(&self.user, doable_type)?
                .into_iter()
                .collect()
        };

        if !allocations.is_empty() {
            workspace.flush()?;
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&allocations)?,
            OutputFormat::Table => Self::output_table(&workspace, &allocations),
        }
        Ok(())
    }

    fn output_json(allocations: &[Allocation]) -> anyhow::Result<()> {
        let records: Vec<AllocationRecord> = allocations.iter().map(AllocationRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        Ok(())
    }

    fn output_table(workspace: &Workspace, allocations: &[Allocation]) {
        if allocations.is_empty() {
            println!("Nothing to allocate");
            return;
        }

        for allocation in allocations {
            let title = workspace
                .doables()
                .get(allocation.doable_id())
                .map_or("", Doable::title);
            println!(
                "Allocated {} to {}: {title}",
                allocation.doable_id(),
                allocation.user_id()
            );
        }
    }
}
