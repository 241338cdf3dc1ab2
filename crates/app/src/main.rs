use chrono::Utc;
use clap::{Parser, Subcommand};
use rag_agent_core::{
    build_chat_model, convert_batch_summary, create_agent, discover_documents, run_repl,
    AgentError, ChatModel, ConversionEvent, IngestionReport, LopdfConverter, RagConfig,
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rag-agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// YAML configuration file layered over the built-in defaults.
    #[arg(long, global = true, env = "RAG_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Ollama base URL for chat and embeddings.
    #[arg(long, global = true)]
    ollama_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every PDF in a folder into Markdown files.
    Convert {
        /// Folder containing the PDFs. Prompted for when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Folder receiving the Markdown files. Prompted for when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load the Markdown knowledge base and chat with the agent.
    Chat {
        /// Folder of Markdown documents; defaults to `docs_dir` from the config.
        #[arg(long)]
        docs: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let cli = Cli::parse();

    // Validation is deferred to `chat`; `convert` only reads the log level.
    let loaded = RagConfig::extract(cli.config.as_deref());
    let log_level = loaded
        .as_ref()
        .map(|config| config.log_level.as_str())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "rag-agent boot"
    );

    match cli.command {
        Command::Convert { input, output } => {
            if let Err(error) = &loaded {
                warn!(%error, "configuration ignored by convert");
            }
            let mut stdin = BufReader::new(tokio::io::stdin());
            let input = match input {
                Some(path) => path,
                None => {
                    prompt_path(&mut stdin, "Please enter the input path for the pdf documents: ")
                        .await?
                }
            };
            let output = match output {
                Some(path) => path,
                None => {
                    prompt_path(
                        &mut stdin,
                        "Please enter the output path for the markdown documents: ",
                    )
                    .await?
                }
            };

            let summary = tokio::task::spawn_blocking(move || {
                convert_batch_summary(&input, &output, LopdfConverter::new, print_event)
            })
            .await?;

            println!("\n{}", "=".repeat(40));
            println!("{summary}");
            println!("{}", "=".repeat(40));
        }
        Command::Chat { docs } => {
            let mut config = loaded?;
            if let Some(ollama_url) = cli.ollama_url {
                config.ollama_url = ollama_url;
            }
            config.validate()?;

            let docs_dir = docs.unwrap_or_else(|| config.docs_dir.clone());
            let file_paths = discover_documents(&docs_dir, config.docs_extension.as_deref());
            info!(folder = %docs_dir.display(), files = file_paths.len(), "discovered documents");

            let model = build_chat_model(&config)?;
            info!(model = model.model_name(), "creating agent");
            let (mut agent, report) = match create_agent(&config, model, &file_paths).await {
                Ok(built) => built,
                Err(AgentError::EmptyKnowledgeBase(report)) => {
                    print_report(&report);
                    return Err(AgentError::EmptyKnowledgeBase(report).into());
                }
                Err(error) => return Err(error.into()),
            };
            print_report(&report);

            let mut stdout = tokio::io::stdout();
            let turns = run_repl(&mut agent, BufReader::new(tokio::io::stdin()), &mut stdout).await?;
            info!(turns, "chat session ended");
        }
    }

    Ok(())
}

async fn prompt_path<R>(reader: &mut R, question: &str) -> anyhow::Result<PathBuf>
where
    R: AsyncBufRead + Unpin,
{
    print!("{question}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(PathBuf::from(line.trim_end_matches(['\n', '\r'])))
}

fn print_event(event: &ConversionEvent) {
    match event {
        ConversionEvent::Started { input, output } => println!(
            "\n--- Starting Batch Conversion from {} to {} ---",
            input.display(),
            output.display()
        ),
        ConversionEvent::Converted {
            source_name,
            output_name,
        } => println!("  [SUCCESS] Converted {source_name} to {output_name}"),
        ConversionEvent::Failed(failure) => println!("  [ERROR] {}", failure.message()),
    }
}

fn print_report(report: &IngestionReport) {
    for (path, chunks) in &report.loaded {
        println!("Loaded {chunks} chunks from {}", path.display());
    }
    for skipped in &report.skipped {
        println!("Failed to load {}: {}", skipped.path.display(), skipped.reason);
    }
    println!("Total chunks added: {}", report.chunk_count);
}
