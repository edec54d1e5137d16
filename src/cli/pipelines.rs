// One runner per subcommand group. Every runner resolves its typed config
// first, so a missing variable fails before any client is built.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use super::commands::{
    DiscordCommand, DriveCommand, NotionCommand, ProjectCommand, ProjectRow, RedditCommand, S3Command,
    ShopCommand, TotangoArgs, TotangoOperation,
};
use crate::core::ai::AiService;
use crate::core::commerce::{
    describe_products, migrate_to_shopify, read_rows, ShopifyConfig, SquarespaceConfig,
};
use crate::core::config::{log_presence, require, EnvSource};
use crate::core::drive::{library_folder_id, openai_key, write_manifest, ChatUploader, LibraryUploader, MANIFEST_FILE};
use crate::core::notion::{NotionConfig, NotionLogger, ProjectEntry};
use crate::core::projects::{projects_database_request, Kickoff, KickoffConfig, ProjectKickoff, SoraSync};
use crate::core::reddit::{CrossPostConfig, CrossPostOutcome, CrossPoster, REQUIRED_VARS};
use crate::core::relay::{FileMirror, NotionRelay, RelayConfig};
use crate::core::storage::{upload_placeholders, S3Config};
use crate::core::totango::TotangoApi;
use crate::infra::ai::OpenAiClient;
use crate::infra::commerce::{ShopifyClient, SquarespaceClient};
use crate::infra::google::{GoogleDriveClient, ServiceAccountAuth};
use crate::infra::media::{HttpDownloader, S3Store};
use crate::infra::notion::NotionClient;
use crate::infra::projects::SoraClient;
use crate::infra::reddit::RedditClient;
use crate::infra::relay::{DiscordWebhook, DriveMirror};
use crate::infra::totango::TotangoClient;

impl From<ProjectRow> for ProjectEntry {
    fn from(row: ProjectRow) -> Self {
        ProjectEntry {
            project: row.project,
            status: row.status,
            link: row.link,
            budget: row.budget,
            drive: row.drive,
            webmaster: row.webmaster,
            codex: row.codex,
            gpts: row.gpts,
            library: row.library,
            registry: row.registry,
        }
    }
}

/// File stem used as the page title when `--title` is not given.
pub fn markdown_title(file: &Path, title: Option<String>) -> String {
    title.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string())
    })
}

pub async fn run_notion(command: NotionCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    let config = NotionConfig::from_env(env)?;
    let logger = NotionLogger::new(NotionClient::new(config.token.clone()));

    match command {
        NotionCommand::CreatePage { row, database_id } => {
            let database_id = config.database(database_id)?;
            let page = logger.log_project(&database_id, &row.into()).await?;
            println!("Created page {}", page.id);
        }
        NotionCommand::CreateDatabase { parent_page } => {
            let parent = config.parent_page(parent_page)?;
            let id = logger.create_database(&projects_database_request(&parent)).await?;
            println!("Created database {id}");
        }
        NotionCommand::SendMarkdown {
            file,
            title,
            parent_page,
        } => {
            let parent = config.parent_page(parent_page)?;
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let title = markdown_title(&file, title);
            let page = logger.send_markdown(&parent, &title, &content).await?;
            println!("Created page {}", page.id);
        }
        NotionCommand::BatchMarkdown { dir, database_id } => {
            let database_id = config.database(database_id)?;
            let summary = logger.upload_markdown_dir(&database_id, &dir).await;
            println!("Uploaded {} Markdown files, {} failed", summary.uploaded, summary.failed);
        }
        NotionCommand::BatchProjects { file, database_id } => {
            let database_id = config.database(database_id)?;
            let jsonl = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let summary = logger.upload_project_batch(&database_id, &jsonl).await;
            println!("Logged {} projects, {} failed", summary.uploaded, summary.failed);
        }
    }
    Ok(())
}

pub async fn run_project(command: ProjectCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    let ProjectCommand::Kickoff {
        project,
        status,
        link,
        budget,
        drive,
        webmaster,
        codex,
        gpts,
        create_db,
        sora,
    } = command;

    let config = KickoffConfig::from_env(env)?;
    let parent = if create_db {
        Some(config.parent_page()?.to_string())
    } else {
        None
    };
    let sora: Option<Box<dyn SoraSync>> = if sora {
        Some(Box::new(SoraClient::new(config.sora_key()?)))
    } else {
        None
    };

    let kickoff = Kickoff {
        project,
        status,
        link,
        budget,
        drive,
        webmaster,
        codex,
        gpts,
    };
    let workflow = ProjectKickoff::new(
        NotionLogger::new(NotionClient::new(config.notion_token.clone())),
        AiService::new(OpenAiClient::new(config.openai_key.clone())),
        sora,
    );
    let report = workflow
        .run(&config.database_id, &kickoff, parent.as_deref())
        .await?;

    if let Some(id) = &report.database_id {
        println!("Created database {id}");
    }
    println!("Logged project page {}", report.page_id);
    for note in &report.notes {
        println!("--- {} ---\n{}", note.gpt_id, note.notes);
    }
    if !report.failed_gpts.is_empty() {
        println!("No notes for: {}", report.failed_gpts.join(", "));
    }
    Ok(())
}

pub async fn run_discord(command: DiscordCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    match command {
        DiscordCommand::Bot => {
            let token = require(env, "DISCORD_BOT_TOKEN")?;
            crate::discord::run_bot(&token).await
        }
        DiscordCommand::Relay => {
            let config = RelayConfig::from_env(env)?;
            let mirror: Option<Box<dyn FileMirror>> = match &config.drive_folder_id {
                Some(folder_id) => {
                    let auth = ServiceAccountAuth::from_env(env, None).await?;
                    Some(Box::new(DriveMirror::new(
                        GoogleDriveClient::new(auth),
                        Arc::new(HttpDownloader::default()),
                        folder_id.clone(),
                    )))
                }
                None => None,
            };
            let relay = NotionRelay::new(
                NotionClient::new(config.notion_token.clone()),
                DiscordWebhook::new(config.webhook_url.clone()),
                mirror,
            );
            let summary = relay.run(&config.database_id).await?;
            println!("Relayed {} entries, {} failed", summary.sent, summary.failed);
            Ok(())
        }
    }
}

pub async fn run_reddit(command: RedditCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    let RedditCommand::Post = command;
    log_presence(env, &REQUIRED_VARS);
    let config = CrossPostConfig::from_env(env)?;
    let poster = CrossPoster::new(
        NotionClient::new(config.notion_token.clone()),
        RedditClient::new(config.reddit.clone()),
    );

    match poster.post_latest(&config.database_id, &config.subreddit).await {
        CrossPostOutcome::NothingToPost => println!("No published posts found."),
        CrossPostOutcome::Posted { title, .. } => println!("Posted to r/{}: {title}", config.subreddit),
        CrossPostOutcome::StatusUpdateFailed { page_id, error } => {
            println!("Posted, but page {page_id} was not marked Posted: {error}")
        }
        CrossPostOutcome::QueryFailed(e) | CrossPostOutcome::SubmitFailed(e) => {
            anyhow::bail!("cross-post failed: {e}")
        }
    }
    Ok(())
}

pub async fn run_drive(command: DriveCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    match command {
        DriveCommand::UploadChats {
            folder_id,
            openai_key: key_flag,
            dir,
        } => {
            let key = openai_key(key_flag, env)?;
            let auth = ServiceAccountAuth::from_env(env, None).await?;
            let uploader = ChatUploader::new(
                GoogleDriveClient::new(auth),
                AiService::new(OpenAiClient::new(key)),
            );
            let summary = uploader.upload_dir(&dir, &folder_id).await?;
            println!(
                "Uploaded {} chat logs ({} summarised), {} failed",
                summary.uploaded, summary.summarized, summary.failed
            );
        }
        DriveCommand::UploadLibrary {
            folder,
            dry_run,
            folder_id,
            creds,
        } => {
            if !folder.is_dir() {
                anyhow::bail!("{} is not a directory", folder.display());
            }
            let root_id = library_folder_id(folder_id, env)?;
            let auth = ServiceAccountAuth::from_env(env, creds.as_deref()).await?;
            let mut uploader = LibraryUploader::new(GoogleDriveClient::new(auth));
            let manifest = uploader.upload_tree(&folder, &root_id, dry_run).await?;
            write_manifest(Path::new(MANIFEST_FILE), &manifest).await?;
            println!("{} files listed in {MANIFEST_FILE}", manifest.len());
        }
    }
    Ok(())
}

pub async fn run_s3(command: S3Command, env: &dyn EnvSource) -> anyhow::Result<()> {
    let S3Command::UploadPlaceholders { dir } = command;
    let config = S3Config::from_env(env)?;
    let store = S3Store::new(config);
    let summary = upload_placeholders(&store, &dir).await?;
    println!("Uploaded {} placeholders, {} failed", summary.uploaded, summary.failed);
    Ok(())
}

pub async fn run_shop(command: ShopCommand, env: &dyn EnvSource) -> anyhow::Result<()> {
    let summary = match command {
        ShopCommand::Migrate { csv } => {
            let config = ShopifyConfig::from_env(env)?;
            let batch = read_rows(&csv)?;
            migrate_to_shopify(&ShopifyClient::new(config), &batch.rows)
                .await
                .with_unreadable(batch.unreadable)
        }
        ShopCommand::Describe { csv } => {
            let config = SquarespaceConfig::from_env(env)?;
            let batch = read_rows(&csv)?;
            let ai = AiService::new(OpenAiClient::new(config.openai_key.clone()));
            describe_products(&ai, &SquarespaceClient::new(&config), &batch.rows)
                .await
                .with_unreadable(batch.unreadable)
        }
    };
    println!(
        "Processed {}: {} succeeded, {} skipped, {} failed",
        summary.processed, summary.succeeded, summary.skipped, summary.failed
    );
    Ok(())
}

pub async fn run_totango(args: TotangoArgs) -> anyhow::Result<()> {
    let api = TotangoApi::new(TotangoClient::new(&args.base_url, &args.token));

    let response = match args.operation {
        TotangoOperation::TouchpointTypes => api.get_touchpoint_types().await?,
        TotangoOperation::PostAccount { account } => api.post_account(&account).await?,
        TotangoOperation::AuditLog => api.get_audit_log().await?,
        TotangoOperation::Events { account_id } => api.get_events(&account_id).await?,
        TotangoOperation::ObjectiveStatus => api.get_objective_status().await?,
        TotangoOperation::ObjectiveCategory => api.get_objective_category().await?,
        TotangoOperation::PlanSummary { account_id } => api.get_plan_summary(&account_id).await?,
        TotangoOperation::OutcomeReport { sbid, account_id } => {
            api.get_outcome_report(&sbid, &account_id).await?
        }
        TotangoOperation::RunSuccessplay { payload } => api.run_successplay(&payload).await?,
        TotangoOperation::ScimList {
            service_id,
            resource,
        } => api.list_scim(&service_id, resource.into()).await?,
        TotangoOperation::ScimGet {
            service_id,
            resource,
            id,
        } => api.get_scim(&service_id, resource.into(), &id).await?,
        TotangoOperation::ScimCreateUser { service_id, user } => {
            api.create_scim_user(&service_id, &user).await?
        }
        TotangoOperation::ScimUpdate {
            service_id,
            resource,
            id,
            payload,
            method,
        } => {
            api.update_scim(&service_id, resource.into(), &id, &payload, method)
                .await?
        }
        TotangoOperation::ScimDelete {
            service_id,
            resource,
            id,
        } => {
            api.delete_scim(&service_id, resource.into(), &id).await?;
            println!("Deleted {id}");
            return Ok(());
        }
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
