//! ClaimDesk command line.
//!
//! Usage:
//!   claimdesk ingest --claim claim.png --approval approval.png [--query query.png]
//!   claimdesk ingest --pre-extracted --claim claim.json --approval approval.json
//!   claimdesk list | show <CLAIM_ID> | summary
//!   claimdesk action <CLAIM_ID> deny --item LAB01 --comment "insufficient documentation"
//!   claimdesk delete <CLAIM_ID>

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use claimdesk_lib::config::{self, ExtractorConfig};
use claimdesk_lib::db::{open_database, DatabaseError, SqliteClaimRepository};
use claimdesk_lib::engine::ReviewAction;
use claimdesk_lib::extraction::{
    DocumentPayload, ExtractionError, FieldExtractor, OllamaFieldExtractor, PreExtractedJson,
};
use claimdesk_lib::models::{ActionKind, DocumentKind};
use claimdesk_lib::service::{ClaimDesk, ClaimDeskError, DocumentSetUpload};

#[derive(Parser, Debug)]
#[command(name = "claimdesk", version)]
#[command(about = "Merge prior-authorization claim documents and review claims")]
struct Args {
    /// Claims database file
    #[arg(long, env = "CLAIMDESK_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a document set and merge it into the claims
    Ingest {
        /// Claim form (image, or JSON with --pre-extracted)
        #[arg(long)]
        claim: PathBuf,

        /// Approval form
        #[arg(long)]
        approval: Option<PathBuf>,

        /// Query form
        #[arg(long)]
        query: Option<PathBuf>,

        /// Inputs are extractor JSON replies, not images
        #[arg(long)]
        pre_extracted: bool,
    },

    /// List every claim
    List,

    /// Show one claim
    Show { claim_id: String },

    /// Apply a reviewer action (approve, deny, query, sendToDoctor,
    /// sendToMedicalRecords, requestDocuments)
    Action {
        claim_id: String,
        action: String,

        /// Apply to one line item instead of the whole claim
        #[arg(long)]
        item: Option<String>,

        #[arg(long)]
        comment: Option<String>,

        /// Reviewer name recorded on the timeline
        #[arg(long, env = "CLAIMDESK_USER")]
        user: Option<String>,
    },

    /// Delete a claim
    Delete { claim_id: String },

    /// Dashboard totals
    Summary,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Desk(#[from] ClaimDeskError),

    #[error("Cannot open database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot start extractor: {0}")]
    Extractor(#[from] ExtractionError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Cannot start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Cannot print result: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    claimdesk_lib::init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let db_path = args.db.unwrap_or_else(config::database_path);
    tracing::info!("{} v{} using {}", config::APP_NAME, config::APP_VERSION, db_path.display());
    let repository = SqliteClaimRepository::new(open_database(&db_path)?);

    match args.command {
        Command::Ingest {
            claim,
            approval,
            query,
            pre_extracted,
        } => {
            let extractor: Arc<dyn FieldExtractor> = if pre_extracted {
                Arc::new(PreExtractedJson)
            } else {
                Arc::new(OllamaFieldExtractor::from_config(&ExtractorConfig::from_env())?)
            };
            let mut desk = ClaimDesk::new(extractor, repository);

            let mut upload = DocumentSetUpload::new(read_payload(DocumentKind::Claim, &claim)?);
            if let Some(path) = approval {
                upload = upload.with_approval(read_payload(DocumentKind::Approval, &path)?);
            }
            if let Some(path) = query {
                upload = upload.with_query(read_payload(DocumentKind::Query, &path)?);
            }

            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            let outcome = runtime.block_on(desk.ingest_document_set(upload))?;

            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning.message);
            }
            print_json(&outcome.claim)
        }
        Command::List => print_json(&offline_desk(repository).list_claims()?),
        Command::Show { claim_id } => print_json(&offline_desk(repository).get_claim(&claim_id)?),
        Command::Action {
            claim_id,
            action,
            item,
            comment,
            user,
        } => {
            let kind: ActionKind = action
                .parse()
                .map_err(|_| CliError::UnknownAction(action.clone()))?;
            let review = ReviewAction {
                claim_id,
                action: kind,
                comment,
                item_code: item,
                user,
            };
            match offline_desk(repository).submit_action(&review)? {
                Some(claim) => print_json(&claim),
                None => {
                    println!("deleted {}", review.claim_id);
                    Ok(())
                }
            }
        }
        Command::Delete { claim_id } => {
            offline_desk(repository).delete_claim(&claim_id)?;
            println!("deleted {claim_id}");
            Ok(())
        }
        Command::Summary => print_json(&offline_desk(repository).dashboard_summary()?),
    }
}

/// Desk for commands that never extract.
fn offline_desk(repository: SqliteClaimRepository) -> ClaimDesk<SqliteClaimRepository> {
    ClaimDesk::new(Arc::new(PreExtractedJson), repository)
}

fn read_payload(kind: DocumentKind, path: &Path) -> Result<DocumentPayload, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(DocumentPayload::new(kind, name, vec![bytes])
        .with_url(Some(path.display().to_string())))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
