//! Command-line definitions. Each pipeline is a subcommand group; credentials
//! come from the environment (after `.env`) unless a flag overrides them.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

use crate::core::totango::{ScimResource, UpdateMethod};

pub const DEFAULT_TOTANGO_URL: &str = "https://api.totango.com";

/// Automation hub - Notion, Discord, Reddit, Drive, S3, ads and commerce pipelines
#[derive(Parser, Debug)]
#[command(name = "automation-hub")]
#[command(about = "Content and ad automation pipelines", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Notion project logging and Markdown uploads
    #[command(subcommand)]
    Notion(NotionCommand),

    /// Project kickoff workflow
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Discord bot and Notion webhook relay
    #[command(subcommand)]
    Discord(DiscordCommand),

    /// Reddit cross-posting
    #[command(subcommand)]
    Reddit(RedditCommand),

    /// Google Drive uploads
    #[command(subcommand)]
    Drive(DriveCommand),

    /// S3 maintenance
    #[command(subcommand)]
    S3(S3Command),

    /// Shopify and Squarespace product sync
    #[command(subcommand)]
    Shop(ShopCommand),

    /// Totango REST operations
    Totango(TotangoArgs),

    /// Run the ad studio HTTP API with its in-process job worker
    Serve {
        /// Address to bind (defaults to BIND_ADDR, then 0.0.0.0:8000)
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Columns of a project row in the tracking database.
#[derive(Args, Debug, Clone)]
pub struct ProjectRow {
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub status: String,
    #[arg(long)]
    pub link: String,
    #[arg(long)]
    pub budget: i64,
    #[arg(long)]
    pub drive: Option<String>,
    #[arg(long)]
    pub webmaster: Option<String>,
    #[arg(long)]
    pub codex: Option<String>,
    #[arg(long)]
    pub gpts: Option<String>,
    #[arg(long)]
    pub library: Option<String>,
    #[arg(long)]
    pub registry: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum NotionCommand {
    /// Log one project row
    CreatePage {
        #[command(flatten)]
        row: ProjectRow,
        /// Target database (defaults to NOTION_DATABASE_ID)
        #[arg(long)]
        database_id: Option<String>,
    },

    /// Create the projects database under a page
    CreateDatabase {
        /// Parent page (defaults to NOTION_PARENT_PAGE_ID)
        #[arg(long)]
        parent_page: Option<String>,
    },

    /// Create a child page holding a Markdown file
    SendMarkdown {
        file: PathBuf,
        /// Page title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        parent_page: Option<String>,
    },

    /// Upload every Markdown file in a directory as a database row
    BatchMarkdown {
        dir: PathBuf,
        #[arg(long)]
        database_id: Option<String>,
    },

    /// Log one project per line of a JSONL file
    BatchProjects {
        file: PathBuf,
        #[arg(long)]
        database_id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Log a project, gather GPT notes and optionally sync to Sora
    Kickoff {
        #[arg(long)]
        project: String,
        #[arg(long)]
        status: String,
        #[arg(long)]
        link: String,
        #[arg(long)]
        budget: f64,
        #[arg(long)]
        drive: String,
        #[arg(long)]
        webmaster: String,
        #[arg(long)]
        codex: String,
        /// Comma-separated GPT ids
        #[arg(long, default_value = "")]
        gpts: String,
        /// Create the projects database under NOTION_PARENT_PAGE_ID first
        #[arg(long)]
        create_db: bool,
        /// Push the project to Sora (needs SORA_API_KEY)
        #[arg(long)]
        sora: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiscordCommand {
    /// Run the `/imagine` bot
    Bot,
    /// Post new Notion entries to the Discord webhook
    Relay,
}

#[derive(Subcommand, Debug)]
pub enum RedditCommand {
    /// Submit the latest published Notion post
    Post,
}

#[derive(Subcommand, Debug)]
pub enum DriveCommand {
    /// Summarise and upload the Markdown logs in `chats/`
    UploadChats {
        #[arg(long)]
        folder_id: String,
        #[arg(long)]
        openai_key: Option<String>,
        #[arg(long, default_value = "chats")]
        dir: PathBuf,
    },

    /// Mirror a directory tree into Drive and write a manifest
    UploadLibrary {
        folder: PathBuf,
        #[arg(long)]
        dry_run: bool,
        /// Root Drive folder (defaults to DRIVE_ROOT_FOLDER_ID, then DRIVE_FOLDER_ID)
        #[arg(long)]
        folder_id: Option<String>,
        /// Service account key file
        #[arg(long)]
        creds: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum S3Command {
    /// Upload every .mp4 in a directory to placeholders/
    UploadPlaceholders { dir: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ShopCommand {
    /// Create a Shopify product per CSV row
    Migrate { csv: PathBuf },
    /// Write AI product descriptions to Squarespace
    Describe { csv: PathBuf },
}

#[derive(Args, Debug)]
pub struct TotangoArgs {
    #[arg(long, env = "TOTANGO_BASE_URL", default_value = DEFAULT_TOTANGO_URL)]
    pub base_url: String,
    #[arg(long, env = "TOTANGO_API_TOKEN", hide_env_values = true)]
    pub token: String,
    #[command(subcommand)]
    pub operation: TotangoOperation,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScimKind {
    Users,
    Groups,
}

impl From<ScimKind> for ScimResource {
    fn from(kind: ScimKind) -> Self {
        match kind {
            ScimKind::Users => ScimResource::Users,
            ScimKind::Groups => ScimResource::Groups,
        }
    }
}

pub fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum TotangoOperation {
    TouchpointTypes,
    PostAccount {
        #[arg(value_parser = parse_json)]
        account: Value,
    },
    AuditLog,
    Events {
        account_id: String,
    },
    ObjectiveStatus,
    ObjectiveCategory,
    PlanSummary {
        account_id: String,
    },
    OutcomeReport {
        sbid: String,
        account_id: String,
    },
    RunSuccessplay {
        #[arg(value_parser = parse_json)]
        payload: Value,
    },
    ScimList {
        service_id: String,
        #[arg(value_enum)]
        resource: ScimKind,
    },
    ScimGet {
        service_id: String,
        #[arg(value_enum)]
        resource: ScimKind,
        id: String,
    },
    ScimCreateUser {
        service_id: String,
        #[arg(value_parser = parse_json)]
        user: Value,
    },
    ScimUpdate {
        service_id: String,
        #[arg(value_enum)]
        resource: ScimKind,
        id: String,
        #[arg(value_parser = parse_json)]
        payload: Value,
        /// PUT replaces, PATCH applies a partial change
        #[arg(long, default_value = "PUT")]
        method: UpdateMethod,
    },
    ScimDelete {
        service_id: String,
        #[arg(value_enum)]
        resource: ScimKind,
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn library_upload_flags_parse() {
        let cli = Cli::try_parse_from([
            "automation-hub",
            "drive",
            "upload-library",
            "docs",
            "--dry-run",
            "--folder-id",
            "root",
        ])
        .unwrap();
        match cli.command {
            Command::Drive(DriveCommand::UploadLibrary {
                folder,
                dry_run,
                folder_id,
                creds,
            }) => {
                assert_eq!(folder, PathBuf::from("docs"));
                assert!(dry_run);
                assert_eq!(folder_id.as_deref(), Some("root"));
                assert!(creds.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn kickoff_requires_every_column_but_gpts() {
        let missing_codex = Cli::try_parse_from([
            "automation-hub",
            "project",
            "kickoff",
            "--project",
            "Launch",
            "--status",
            "In Queue",
            "--link",
            "https://x",
            "--budget",
            "100",
            "--drive",
            "https://d",
            "--webmaster",
            "sam",
        ]);
        assert!(missing_codex.is_err());

        let cli = Cli::try_parse_from([
            "automation-hub",
            "project",
            "kickoff",
            "--project",
            "Launch",
            "--status",
            "In Queue",
            "--link",
            "https://x",
            "--budget",
            "99.5",
            "--drive",
            "https://d",
            "--webmaster",
            "sam",
            "--codex",
            "PenAI Assistant",
            "--sora",
        ])
        .unwrap();
        match cli.command {
            Command::Project(ProjectCommand::Kickoff {
                budget,
                gpts,
                create_db,
                sora,
                ..
            }) => {
                assert_eq!(budget, 99.5);
                assert_eq!(gpts, "");
                assert!(!create_db);
                assert!(sora);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn totango_update_parses_method_and_payload() {
        let cli = Cli::try_parse_from([
            "automation-hub",
            "totango",
            "--token",
            "t",
            "scim-update",
            "svc",
            "groups",
            "g1",
            r#"{"displayName":"Ops"}"#,
            "--method",
            "patch",
        ])
        .unwrap();
        let Command::Totango(args) = cli.command else {
            panic!("expected totango");
        };
        assert_eq!(args.base_url, DEFAULT_TOTANGO_URL);
        match args.operation {
            TotangoOperation::ScimUpdate {
                resource,
                payload,
                method,
                ..
            } => {
                assert_eq!(resource, ScimKind::Groups);
                assert_eq!(payload["displayName"], "Ops");
                assert_eq!(method, UpdateMethod::Patch);
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_payload_is_rejected() {
        assert!(parse_json("{not json").is_err());
        let parsed = Cli::try_parse_from(["automation-hub", "totango", "--token", "t", "post-account", "{oops"]);
        assert!(parsed.is_err());
    }
}
