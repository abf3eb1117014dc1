use std::path::Path;

use clap::Parser;
use doables::{User, Workspace, storage::records::UserRecord};
use tracing::instrument;

use super::{OutputFormat, terminal::Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "List users, sorted by first name")]
pub struct Users {
    /// Output format (table, json)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

impl Users {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let users = sorted_by_first_name(workspace.users().list());

        match self.output {
            OutputFormat::Json => {
                let records: Vec<UserRecord> = users.iter().copied().map(UserRecord::from).collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
            OutputFormat::Table => Self::output_table(&users),
        }
        Ok(())
    }

    fn output_table(users: &[&User]) {
        if users.is_empty() {
            println!("No users found. Add them to the users file.");
            return;
        }

        println!("{:<38} {:<16} {:<24} Prefers", "ID", "User name", "Name");
        for user in users {
            let preferred = user
                .preferred_doable_type()
                .map_or_else(|| "-".dim(), |t| t.as_str().to_string());
            println!(
                "{:<38} {:<16} {:<24} {preferred}",
                user.id(),
                user.user_name(),
                user.display_name(),
            );
        }
    }
}

/// Users ordered by first name, ignoring case. Equal names keep stored order.
fn sorted_by_first_name(users: &[User]) -> Vec<&User> {
    let mut sorted: Vec<&User> = users.iter().collect();
    sorted.sort_by_cached_key(|user| user.first_name().to_lowercase());
    sorted
}

#[cfg(test)]
mod tests {
    use doables::domain::UserId;

    use super::*;

    fn user(id: &str, first_name: &str) -> User {
        User::new(id, first_name)
            .unwrap()
            .with_id(UserId::new(id).unwrap())
    }

    #[test]
    fn users_sort_case_insensitively() {
        let users = [user("u1", "bob"), user("u2", "Alice"), user("u3", "alan")];

        let sorted = sorted_by_first_name(&users);

        let names: Vec<_> = sorted.iter().map(|u| u.first_name()).collect();
        assert_eq!(names, ["alan", "Alice", "bob"]);
    }

    #[test]
    fn run_succeeds_on_empty_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        Users::default().run(tmp.path()).unwrap();
    }
}
