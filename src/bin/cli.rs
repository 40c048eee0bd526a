//! Chinook CLI - ask the music catalogue questions

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chinook_bridge::assistant::{
    extract_vocabulary, save_vocabulary, Assistant, FuzzyScorer, KeywordScorer, PlainGenerator,
    RelevanceScorer,
};
use chinook_bridge::{Session, SessionHandle, Store, StoreConfig, WorkerConfig};

#[derive(Parser)]
#[command(name = "chinook")]
#[command(about = "Natural-language search over the Chinook music catalogue")]
#[command(version)]
struct Cli {
    /// Database path
    #[arg(long, env = "CHINOOK_DB_PATH", default_value = "chinook.db")]
    db_path: String,

    /// Worker executable
    #[arg(long, env = "CHINOOK_WORKER", default_value = "chinook-worker")]
    worker: String,

    /// Seconds to wait for a worker response (0 = wait forever)
    #[arg(long, env = "CHINOOK_READ_TIMEOUT_SECS", default_value = "30")]
    read_timeout_secs: u64,

    /// Vocabulary file for fuzzy relevance scoring (keywords are used when unset)
    #[arg(long, env = "CHINOOK_VOCABULARY")]
    vocabulary: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat
    Chat,
    /// Answer one question
    Ask {
        question: String,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the search tool directly, skipping the relevance check
    Search { query: String },
    /// List the worker's tools
    Tools,
    /// Extract a vocabulary file from the catalogue
    Vocab {
        /// Output file
        #[arg(short, long, default_value = "vocabulary.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Expand ~ in paths
    let db_path = shellexpand::tilde(&cli.db_path).to_string();

    let mut worker = WorkerConfig::new(shellexpand::tilde(&cli.worker).to_string());
    worker.args = vec!["--db-path".to_string(), db_path.clone()];
    worker.read_timeout_secs = Some(cli.read_timeout_secs);

    // The worker is only spawned by the first call
    let (session, task) = SessionHandle::spawn(Session::spawn(worker));

    let result = run(&cli, &db_path, &session).await;

    session.close().await;
    drop(session);
    let _ = task.await;
    result
}

async fn run(cli: &Cli, db_path: &str, session: &SessionHandle) -> Result<()> {
    match &cli.command {
        Commands::Tools => {
            let tools = session.list_tools().await.context("listing tools")?;
            for tool in tools {
                println!("{} - {}", tool.name, tool.description);
            }
        }

        Commands::Search { query } => {
            let text = session.search(query).await.context("searching")?;
            println!("{}", text);
        }

        Commands::Ask { question, json } => {
            let assistant = assistant(cli, session.clone())?;
            let answer = assistant.answer(question).await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.text);
            }
        }

        Commands::Chat => {
            let assistant = assistant(cli, session.clone())?;
            println!("Ask about artists, albums, songs or genres. Type 'quit' to exit.");

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                print!("\nYou: ");
                std::io::stdout().flush()?;

                let Some(line) = lines.next_line().await? else {
                    break;
                };
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "bye") {
                    break;
                }

                let answer = assistant.answer(question).await;
                println!("Assistant: {}", answer.text);
            }
        }

        Commands::Vocab { output } => {
            let store = Store::new(StoreConfig::new(db_path));
            store.check()?;
            let vocabulary = extract_vocabulary(&store)?;
            save_vocabulary(output, &vocabulary)?;
            println!("Saved {} vocabulary terms to {}", vocabulary.len(), output);
        }
    }
    Ok(())
}

fn assistant(cli: &Cli, session: SessionHandle) -> Result<Assistant> {
    let scorer: Box<dyn RelevanceScorer> = match &cli.vocabulary {
        Some(path) => Box::new(FuzzyScorer::from_file(shellexpand::tilde(path).to_string())?),
        None => Box::new(KeywordScorer::default()),
    };
    Ok(Assistant::new(session, scorer, Box::new(PlainGenerator)))
}
