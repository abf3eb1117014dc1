use std::path::{Path, PathBuf};

mod allocate;
mod allocations;
mod status;
mod terminal;
mod user_doables;
mod users;

use allocate::Allocate;
use allocations::Allocations;
use clap::ArgAction;
use doables::{
    Workspace,
    domain::{CaseId, DoablePatch, DoableType, NewDoable, Priority},
};
use status::Status;
use tracing::instrument;
use user_doables::UserDoables;
use users::Users;

/// How listing commands print their results.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the workspace
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show workspace status (default)
    Status(Status),

    /// Initialize a new workspace
    Init,

    /// List users
    Users(Users),

    /// List the unfinished doables allocated to a user
    Doables(UserDoables),

    /// Allocate work to a user
    ///
    /// By default the next doable in the queue is allocated, restricted to the
    /// user's preferred type.
    Allocate(Allocate),

    /// List active allocations
    Allocations(Allocations),

    /// Release an allocation, returning the doable to the queue
    Release(Release),

    /// Create a new doable
    Create(Create),

    /// Update a doable
    Update(Update),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(root)?,
            Self::Users(command) => command.run(root)?,
            Self::Doables(command) => command.run(root)?,
            Self::Allocate(command) => command.run(root)?,
            Self::Allocations(command) => command.run(root)?,
            Self::Release(command) => command.run(root)?,
            Self::Create(command) => command.run(root)?,
            Self::Update(command) => command.run(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        Workspace::init(root)?;

        println!("Initialized workspace in {}", root.display());
        println!();
        println!("Next steps:");
        println!("  add users to users.json");
        println!("  doable create \"Reply to client\" --type email");
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
#[command(group(clap::ArgGroup::new("target").required(true)))]
pub struct Release {
    /// The doable whose allocation is released
    #[arg(group = "target")]
    doable: Option<String>,

    /// Release every doable in a case instead
    ///
    /// Either every doable in the case is released, or none is.
    #[arg(long, value_name = "CASE", group = "target")]
    case: Option<String>,

    /// Skip the confirmation prompt when releasing a case
    #[arg(long, short)]
    yes: bool,
}

impl Release {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;

        let released = match (self.doable, self.case) {
            (Some(doable), _) => vec![workspace.allocator().release(&doable)?],
            (None, Some(case)) => {
                if !self.yes && !confirm(&format!("Release every allocation in case {case}?"))? {
                    println!("Cancelled");
                    return Ok(());
                }
                workspace.allocator().release_case(&case)?
            }
            (None, None) => anyhow::bail!("nothing to release"),
        };
        workspace.flush()?;

        if released.is_empty() {
            println!("Nothing to release");
        }
        for allocation in &released {
            println!(
                "Released {} from {}",
                allocation.doable_id(),
                allocation.user_id()
            );
        }
        Ok(())
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

#[derive(Debug, clap::Parser)]
pub struct Create {
    /// The title of the doable
    title: String,

    /// Task or email
    #[arg(long = "type", value_name = "TYPE")]
    doable_type: DoableType,

    /// The case the doable belongs to (required for tasks)
    #[arg(long, value_name = "CASE")]
    case: Option<String>,

    /// Defaults to medium
    #[arg(long)]
    priority: Option<Priority>,
}

impl Create {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;

        let doable = workspace.create_doable(NewDoable {
            title: self.title,
            doable_type: self.doable_type,
            case_id: self.case.map(CaseId::new).transpose()?,
            priority: self.priority,
        })?;
        let id = doable.id().clone();
        workspace.flush()?;

        println!("Created doable {id}");
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Update {
    /// The doable to update
    doable: String,

    /// The new status
    #[arg(long)]
    status: Option<doables::Status>,

    /// Other fields to change, as FIELD=VALUE
    ///
    /// Updatable fields are title, case_id, type, priority and status. An
    /// empty case_id removes the doable from its case.
    #[arg(value_name = "FIELD=VALUE")]
    changes: Vec<String>,
}

impl Update {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let pairs = self
            .changes
            .iter()
            .map(|change| {
                change
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("expected FIELD=VALUE, got '{change}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut patch = DoablePatch::from_pairs(pairs)?;
        if let Some(status) = self.status {
            patch = patch.with_status(status);
        }
        if patch.is_empty() {
            anyhow::bail!("nothing to update: pass --status or FIELD=VALUE");
        }

        let mut workspace = Workspace::open(root)?;
        let doable = workspace.update_doable(&self.doable, &patch)?;
        println!("Updated {} ({})", doable.id(), doable.status());
        workspace.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use doables::domain::Status as DoableStatus;
    use tempfile::tempdir;

    use super::*;

    const USERS: &str = r#"[
        {"id": "u1", "user_name": "ada", "first_name": "Ada", "preferred_doable_type": "email"}
    ]"#;

    fn workspace() -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("users.json"), USERS).unwrap();
        tmp
    }

    fn create(root: &Path, title: &str, doable_type: DoableType, case: Option<&str>) {
        Create {
            title: title.to_string(),
            doable_type,
            case: case.map(ToString::to_string),
            priority: None,
        }
        .run(root)
        .expect("create command should succeed");
    }

    #[test]
    fn create_run_writes_doable() {
        let tmp = workspace();

        create(tmp.path(), "Draft letter", DoableType::Task, Some("case_3"));

        let workspace = Workspace::open(tmp.path()).unwrap();
        let doable = workspace.doables().get("draft_letter_3").unwrap();
        assert_eq!(doable.case_id().unwrap().as_str(), "case_3");
    }

    #[test]
    fn create_run_rejects_task_without_case() {
        let tmp = workspace();

        let result = Create {
            title: "Draft letter".to_string(),
            doable_type: DoableType::Task,
            case: None,
            priority: None,
        }
        .run(tmp.path());

        assert!(result.is_err());
        assert!(Workspace::open(tmp.path()).unwrap().doables().is_empty());
    }

    #[test]
    fn allocate_then_release_round_trips_status() {
        let tmp = workspace();
        create(tmp.path(), "Reply", DoableType::Email, None);

        {
            let mut workspace = Workspace::open(tmp.path()).unwrap();
            workspace.allocator().allocate_single("u1", None).unwrap();
            workspace.flush().unwrap();
        }
        let workspace = Workspace::open(tmp.path()).unwrap();
        assert_eq!(
            workspace.doables().get("message_1").unwrap().status(),
            DoableStatus::Allocated
        );

        Release {
            doable: Some("message_1".to_string()),
            case: None,
            yes: false,
        }
        .run(tmp.path())
        .unwrap();

        let workspace = Workspace::open(tmp.path()).unwrap();
        assert!(workspace.allocations().is_empty());
        assert_eq!(
            workspace.doables().get("message_1").unwrap().status(),
            DoableStatus::Pending
        );
    }

    #[test]
    fn release_case_with_yes_releases_everything() {
        let tmp = workspace();
        create(tmp.path(), "Review", DoableType::Task, Some("case_1"));
        create(tmp.path(), "Set up the case", DoableType::Task, Some("case_1"));
        {
            let mut workspace = Workspace::open(tmp.path()).unwrap();
            workspace.allocator().allocate_case("u1", None).unwrap();
            workspace.flush().unwrap();
        }

        Release {
            doable: None,
            case: Some("case_1".to_string()),
            yes: true,
        }
        .run(tmp.path())
        .unwrap();

        let workspace = Workspace::open(tmp.path()).unwrap();
        assert!(workspace.allocations().is_empty());
    }

    #[test]
    fn release_without_allocation_fails() {
        let tmp = workspace();
        create(tmp.path(), "Reply", DoableType::Email, None);

        let result = Release {
            doable: Some("message_1".to_string()),
            case: None,
            yes: false,
        }
        .run(tmp.path());

        assert!(result.is_err());
    }

    #[test]
    fn update_run_applies_status_and_fields() {
        let tmp = workspace();
        create(tmp.path(), "Reply", DoableType::Email, None);

        Update {
            doable: "message_1".to_string(),
            status: Some(DoableStatus::Completed),
            changes: vec!["priority=high".to_string(), "title=Reply now".to_string()],
        }
        .run(tmp.path())
        .unwrap();

        let workspace = Workspace::open(tmp.path()).unwrap();
        let doable = workspace.doables().get("message_1").unwrap();
        assert_eq!(doable.status(), DoableStatus::Completed);
        assert_eq!(doable.priority(), Priority::High);
        assert_eq!(doable.title(), "Reply now");
    }

    #[test]
    fn update_run_rejects_unknown_field() {
        let tmp = workspace();
        create(tmp.path(), "Reply", DoableType::Email, None);

        let error = Update {
            doable: "message_1".to_string(),
            status: None,
            changes: vec!["colour=red".to_string()],
        }
        .run(tmp.path())
        .unwrap_err();

        assert!(error.to_string().contains("colour"));
    }

    #[test]
    fn update_run_requires_a_change() {
        let tmp = workspace();
        create(tmp.path(), "Reply", DoableType::Email, None);

        let result = Update {
            doable: "message_1".to_string(),
            status: None,
            changes: Vec::new(),
        }
        .run(tmp.path());

        assert!(result.is_err());
    }

    #[test]
    fn status_run_succeeds_on_empty_workspace() {
        let tmp = workspace();
        Status::default()
            .run(tmp.path())
            .expect("status should succeed on an empty workspace");
    }
}
