//! Docgate CLI: resolve folders, manage files and move candidates between
//! stages of a board file.
//!
//! Remote store settings come from DRIVE_* environment variables.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use docgate_cli::{init_tracing, load_board, save_board, DriveContext};
use docgate_core::{DocgateConfig, ErrorMetadata};
use docgate_drive::{download_url, view_url, DriveError, FolderSpec};
use docgate_pipeline::{
    AttachmentService, CandidateStore, DocumentCategoryModel, MemoryCandidateStore, MoveRequest,
    PipelineError, StageGate, StoreAttachmentSource, TransitionCoordinator,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "docgate", about = "Document-gated stage pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Folder operations on the remote store
    Folder {
        #[command(subcommand)]
        sub: FolderCommands,
    },
    /// File operations on the remote store
    File {
        #[command(subcommand)]
        sub: FileCommands,
    },
    /// Upload a document and attach it to a candidate
    Attach {
        /// Board JSON file
        #[arg(long)]
        board: PathBuf,
        /// Candidate id
        candidate: String,
        /// Path to the document
        file: PathBuf,
        /// Document category id
        #[arg(long)]
        category: Option<String>,
    },
    /// Check whether a candidate may enter a stage
    Gate {
        /// Board JSON file
        #[arg(long)]
        board: PathBuf,
        /// Candidate id
        candidate: String,
        /// Target stage id
        #[arg(long)]
        stage: String,
    },
    /// Move candidates into a stage
    Move {
        /// Board JSON file
        #[arg(long)]
        board: PathBuf,
        /// Candidate ids, in selection order
        #[arg(required = true)]
        candidates: Vec<String>,
        /// Target stage id
        #[arg(long)]
        to: String,
        /// Acting user recorded in the history
        #[arg(long, default_value = "cli")]
        user: String,
    },
}

#[derive(Subcommand)]
enum FolderCommands {
    /// Get or create the top-level folder
    Root {
        /// Folder name (defaults to DRIVE_ROOT_FOLDER_NAME)
        name: Option<String>,
    },
    /// Get or create a section folder
    Section {
        name: String,
        /// Parent folder id
        #[arg(long)]
        parent: String,
    },
    /// Get or create an entity folder
    Entity {
        name: String,
        /// Parent folder id
        #[arg(long)]
        parent: String,
        /// Previously stored folder id
        #[arg(long)]
        known_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// Upload a local file into a folder
    Upload {
        file: PathBuf,
        /// Parent folder id
        #[arg(long)]
        folder: String,
        /// Remote name (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
        /// Content type (guessed from the name when omitted)
        #[arg(long)]
        mime_type: Option<String>,
        /// Reuse a file with the same name instead of uploading
        #[arg(long)]
        if_absent: bool,
    },
    /// Find the most recently modified file with a name
    Find {
        name: String,
        #[arg(long)]
        folder: String,
    },
    /// List files in a folder
    List {
        #[arg(long)]
        folder: String,
    },
    /// Delete a file by id
    Delete { id: String },
    /// Print view and download URLs for a file id
    Url { id: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn file_name(path: &std::path::Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", path.display()))
}

async fn read_file(path: &std::path::Path) -> anyhow::Result<Bytes> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Bytes::from(content))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        if let Some(drive) = err.downcast_ref::<DriveError>() {
            drive.log();
            if let Some(action) = drive.suggested_action() {
                eprintln!("{}", action);
            }
        } else if let Some(pipeline) = err.downcast_ref::<PipelineError>() {
            pipeline.log();
            if let Some(action) = pipeline.suggested_action() {
                eprintln!("{}", action);
            }
        }
        return Err(err);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Folder { sub } => {
            let config = DocgateConfig::from_env().context("Failed to load configuration")?;
            let drive = DriveContext::from_config(&config)?;
            let spec = match sub {
                FolderCommands::Root { name } => FolderSpec::Root {
                    name: name.unwrap_or_else(|| config.root_folder_name.clone()),
                },
                FolderCommands::Section { name, parent } => FolderSpec::Section {
                    name,
                    parent_id: parent,
                },
                FolderCommands::Entity {
                    name,
                    parent,
                    known_id,
                } => FolderSpec::Entity {
                    name,
                    parent_id: parent,
                    known_id,
                },
            };
            let folder = drive.folders.resolve(&spec).await;
            report_rotation(&drive).await;
            print_json(&folder?)?;
        }
        Commands::File { sub } => {
            let config = DocgateConfig::from_env().context("Failed to load configuration")?;
            let drive = DriveContext::from_config(&config)?;
            let result = run_file(&drive, sub).await;
            report_rotation(&drive).await;
            result?;
        }
        Commands::Attach {
            board,
            candidate,
            file,
            category,
        } => {
            let config = DocgateConfig::from_env().context("Failed to load configuration")?;
            let drive = DriveContext::from_config(&config)?;
            let store = Arc::new(MemoryCandidateStore::new(load_board(&board)?));
            let service = AttachmentService::new(
                store.clone(),
                drive.folders.clone(),
                drive.files.clone(),
                config.root_folder_name.clone(),
                config.root_folder_id().map(str::to_string),
            );

            let name = file_name(&file)?;
            let content = read_file(&file).await?;
            let attachment = service.attach(&candidate, content, &name, category).await;
            report_rotation(&drive).await;
            let attachment = attachment?;

            save_board(&board, &store.snapshot().await)?;
            print_json(&attachment)?;
        }
        Commands::Gate {
            board,
            candidate,
            stage,
        } => {
            let store = MemoryCandidateStore::new(load_board(&board)?);
            let found = store
                .get_candidate(&candidate)
                .await?
                .ok_or_else(|| PipelineError::CandidateNotFound(candidate.clone()))?;
            let process = store
                .get_process(&found.process_id)
                .await?
                .ok_or_else(|| PipelineError::ProcessNotFound(found.process_id.clone()))?;
            if !process.has_stage(&stage) {
                return Err(PipelineError::StageNotInProcess {
                    process_id: process.id.clone(),
                    stage_id: stage,
                }
                .into());
            }

            let model = DocumentCategoryModel::from_process(&process);
            let result =
                StageGate::evaluate(&found.attachments, Some(model.requirements_for(&stage)));
            print_json(&serde_json::json!({
                "candidate_id": found.id,
                "stage_id": stage,
                "satisfied": result.satisfied,
                "missing": result.missing,
                "missing_categories": model.labels(&result.missing),
                "process_required_categories": model
                    .required_categories()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>(),
            }))?;
        }
        Commands::Move {
            board,
            candidates,
            to,
            user,
        } => {
            let store = Arc::new(MemoryCandidateStore::new(load_board(&board)?));
            let coordinator = TransitionCoordinator::new(
                store.clone(),
                Arc::new(StoreAttachmentSource::new(store.clone())),
                store.clone(),
            );

            let request = MoveRequest::new(candidates, to, user);
            let report = coordinator.attempt_move(&request).await?;

            save_board(&board, &store.snapshot().await)?;
            print_json(&report)?;
            if let Some(summary) = report.summary() {
                eprintln!("{}", summary);
            }
        }
    }

    Ok(())
}

/// Print a rotated refresh token so it can be saved for the next run.
async fn report_rotation(drive: &DriveContext) {
    if let Some(token) = drive.rotated_refresh_token().await {
        tracing::warn!("Refresh token rotated, update DRIVE_REFRESH_TOKEN");
        eprintln!("DRIVE_REFRESH_TOKEN={}", token);
    }
}

async fn run_file(drive: &DriveContext, sub: FileCommands) -> anyhow::Result<()> {
    match sub {
        FileCommands::Upload {
            file,
            folder,
            name,
            mime_type,
            if_absent,
        } => {
            let name = match name {
                Some(name) => name,
                None => file_name(&file)?,
            };
            let content = read_file(&file).await?;
            if if_absent {
                let (remote, created) = drive
                    .files
                    .upload_if_absent(content, &folder, &name, mime_type.as_deref())
                    .await?;
                print_json(&serde_json::json!({ "file": remote, "created": created }))?;
            } else {
                let remote = drive
                    .files
                    .upload(content, &folder, &name, mime_type.as_deref())
                    .await?;
                print_json(&remote)?;
            }
        }
        FileCommands::Find { name, folder } => {
            let found = drive.files.find_by_name(&name, &folder).await;
            print_json(&found)?;
        }
        FileCommands::List { folder } => {
            let files = drive.files.list_in_folder(&folder).await?;
            print_json(&files)?;
        }
        FileCommands::Delete { id } => {
            drive.files.delete(&id).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("File {} deleted", id) }),
            )?;
        }
        FileCommands::Url { id } => {
            print_json(&serde_json::json!({
                "view_url": view_url(&id),
                "download_url": download_url(&id),
            }))?;
        }
    }
    Ok(())
}
