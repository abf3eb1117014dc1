use std::path::Path;

use clap::Parser;
use doables::{Doable, Workspace, domain::CaseId, storage::records::DoableRecord};
use tracing::instrument;

use super::{
    OutputFormat,
    terminal::{self, Colorize, is_narrow},
};

#[derive(Debug, Parser)]
#[command(about = "List the unfinished doables allocated to a user")]
pub struct UserDoables {
    /// The user whose doables are listed
    user: String,

    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl UserDoables {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let doables = workspace.user_doables(&self.user)?;

        match self.output {
            OutputFormat::Json => {
                let records: Vec<DoableRecord> =
                    doables.iter().copied().map(DoableRecord::from).collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            OutputFormat::Table => Self::output_table(&self.user, &doables),
        }
        Ok(())
    }

    fn output_table(user: &str, doables: &[&Doable]) {
        if doables.is_empty() {
            println!("Nothing allocated to {user}.");
            return;
        }

        if is_narrow() {
            for doable in doables {
                println!("{} {}", doable.id(), doable.title().dim());
                println!("  {}", terminal::status(doable.status(), 0));
            }
            return;
        }

        println!(
            "{:<20} {:<6} {:<8} {:<10} {:<12} Title",
            "ID", "Type", "Priority", "Status", "Case"
        );
        for doable in doables {
            println!(
                "{:<20} {:<6} {} {} {:<12} {}",
                doable.id(),
                doable.doable_type(),
                terminal::priority(doable.priority(), 8),
                terminal::status(doable.status(), 10),
                doable.case_id().map_or("-", CaseId::as_str),
                doable.title(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn unknown_user_is_an_error() {
        let tmp = tempdir().unwrap();

        let error = UserDoables {
            user: "ghost".to_string(),
            output: OutputFormat::Table,
        }
        .run(tmp.path())
        .unwrap_err();

        assert!(error.to_string().contains("ghost"));
    }

    #[test]
    fn known_user_without_work_succeeds() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join("users.json"),
            r#"[{"id": "u1", "user_name": "ada", "first_name": "Ada"}]"#,
        )
        .unwrap();

        UserDoables {
            user: "u1".to_string(),
            output: OutputFormat::Json,
        }
        .run(tmp.path())
        .unwrap();
    }
}
