use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prepclass_cli::GenerationPipeline;
use prepclass_core::auth::UserDirectory;
use prepclass_core::config::PrepclassConfig;
use prepclass_core::export::{ExportFormat, Exporter};
use prepclass_core::store::SessionStore;
use prepclass_core::types::{Difficulty, DocumentType, GenerationRequest, RecordId};
use prepclass_llm::{ClientConfig, GenerationClient};

#[derive(Parser, Debug)]
#[command(
    name = "prepclass",
    version,
    about = "Generate pre-class, in-class and post-class teaching materials for a topic"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "prepclass.toml")]
    config: PathBuf,

    /// Environment variable holding the completion API key
    #[arg(long, global = true, default_value = "OPENAI_API_KEY")]
    api_key_env: String,

    /// Acting username (owner of generated documents)
    #[arg(long, short, global = true, default_value = "mentor")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate materials for a topic (all three documents by default)
    Generate {
        /// The technical topic, e.g. "Dynamic Programming"
        topic: String,

        /// Target student level
        #[arg(long, default_value_t = Difficulty::Beginner)]
        difficulty: Difficulty,

        /// Generate only one document type instead of the full bundle
        #[arg(long)]
        doc_type: Option<DocumentType>,
    },

    /// List previously generated documents, newest first
    History,

    /// Print one stored document by record ID
    Show {
        /// Record ID from `history`
        id: i64,
    },

    /// Export a stored document to a file
    Export {
        /// Record ID from `history`
        id: i64,

        /// Output format: pdf or markdown
        #[arg(long, default_value = "markdown")]
        format: ExportFormat,

        /// Output path; defaults to a name derived from the record
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Download the full history as JSON
    ExportHistory {
        /// Output path
        #[arg(long, short, default_value = "prepclass_history.json")]
        output: PathBuf,
    },

    /// Delete all of the acting user's stored documents
    ClearHistory,

    /// Create a mentor account
    Register {
        /// New username (3-20 chars: letters, digits, underscore)
        username: String,
    },

    /// Check a mentor account's credentials
    Login {
        /// Username to check
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        PrepclassConfig::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        PrepclassConfig::default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let store = SessionStore::open(&config.persistence.db_path, &config.persistence)?;

    match cli.command {
        Commands::Generate {
            topic,
            difficulty,
            doc_type,
        } => {
            let api_key = std::env::var(&cli.api_key_env)
                .with_context(|| format!("set {} in your environment", cli.api_key_env))?;

            let client_config = ClientConfig::new(api_key, config.llm.model.clone())
                .with_base_url(config.llm.base_url.clone())
                .with_timeout(Duration::from_millis(config.llm.request_timeout_ms))
                .with_max_retries(config.llm.max_retries);
            let client = GenerationClient::new(client_config);
            let pipeline = GenerationPipeline::new(&client, &store);

            let generated = match doc_type {
                Some(doc_type) => {
                    let request = GenerationRequest::new(topic, difficulty, doc_type)?;
                    vec![pipeline.generate_one(&cli.user, request).await?]
                }
                None => pipeline.generate_bundle(&cli.user, &topic, difficulty).await?,
            };

            for (id, result) in &generated {
                println!();
                println!(
                    "=== {} — {} (record {id}) ===",
                    result.request.document_type.title(),
                    result.request.topic
                );
                println!();
                println!("{}", result.generated_text);
            }
        }

        Commands::History => {
            let records = store.list_with_ids(&cli.user)?;
            if records.is_empty() {
                println!("No generation history yet");
            } else {
                for (id, result) in records {
                    println!(
                        "{:>5}  {}  {:<12}  {:<10}  {}",
                        id.0,
                        result.created_at.format("%Y-%m-%d %H:%M"),
                        result.request.difficulty.to_string(),
                        result.request.document_type.to_string(),
                        result.request.topic
                    );
                }
            }
        }

        Commands::Show { id } => {
            let result = store.get_by_id(RecordId(id))?;
            println!(
                "{} — {} ({}, {})",
                result.request.document_type.title(),
                result.request.topic,
                result.request.difficulty,
                result.created_at.format("%Y-%m-%d %H:%M")
            );
            println!();
            println!("{}", result.generated_text);
        }

        Commands::Export { id, format, output } => {
            let record_id = RecordId(id);
            let result = store.get_by_id(record_id)?;
            let exporter = Exporter::with_default_renderers();
            let artifact = exporter.export(&result, record_id, format)?;

            let path = output.unwrap_or_else(|| PathBuf::from(&artifact.filename));
            std::fs::write(&path, &artifact.bytes)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Exported record {record_id} as {} to {} ({} bytes)",
                format,
                path.display(),
                artifact.bytes.len()
            );
        }

        Commands::ExportHistory { output } => {
            let json = store.history_json(&cli.user)?;
            std::fs::write(&output, json)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("History written to {}", output.display());
        }

        Commands::ClearHistory => {
            let deleted = store.clear_owner(&cli.user)?;
            println!("Deleted {deleted} stored document(s)");
        }

        Commands::Register { username } => {
            let directory = UserDirectory::open(&config.persistence.db_path)?;
            let password = prompt_line("Enter password")?;
            let confirm = prompt_line("Confirm password")?;
            if password != confirm {
                bail!("passwords don't match");
            }
            directory.register(&username, &password)?;
            println!("Account created: {username}");
        }

        Commands::Login { username } => {
            let directory = UserDirectory::open(&config.persistence.db_path)?;
            let password = prompt_line("Enter password")?;
            if directory.verify(&username, &password)? {
                println!("Credentials OK");
            } else {
                bail!("invalid credentials");
            }
        }
    }

    Ok(())
}

fn prompt_line(question: &str) -> Result<String> {
    print!("{question}: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
