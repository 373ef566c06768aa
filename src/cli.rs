use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use essay_grader::client::{render_markdown, FileStore, GraderSession, HttpGradeApi};
use essay_grader::model::LetterGrade;
use essay_grader::protocol::{self, AppState};
use essay_grader::services::ai::{
    AiConfig, Backoff, ChatCompletionClient, RetryPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use essay_grader::services::{encoding, verdict};

#[derive(Parser, Debug)]
#[command(name = "essay-grader", version, about = "Grade essays with a language model")]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the grading endpoint
    Serve(ServeArgs),
    /// Submit an essay to a running endpoint and print the feedback
    Grade(GradeArgs),
    /// Edit the stored few-shot samples
    #[command(subcommand)]
    Samples(SamplesCommand),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "GRADER_BIND", default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Model provider API key
    #[arg(long, env = "GPT4_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GRADER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completion URL of the model provider
    #[arg(long, env = "GRADER_PROVIDER_URL", default_value = DEFAULT_ENDPOINT)]
    pub provider_url: String,

    /// Retries after a rate-limited call before giving up
    #[arg(long, env = "GRADER_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: u32,

    #[arg(long, env = "GRADER_RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// fixed | exponential
    #[arg(long, env = "GRADER_BACKOFF", default_value = "fixed")]
    pub backoff: Backoff,

    #[arg(long, env = "GRADER_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Storage file holding the sample list
    #[arg(long, env = "GRADER_STORE")]
    pub store: Option<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> FileStore {
        FileStore::new(self.store.clone().unwrap_or_else(FileStore::default_path))
    }
}

#[derive(Args, Debug)]
pub struct GradeArgs {
    /// Base URL of the grading endpoint
    #[arg(long, env = "GRADER_SERVER", default_value = "http://127.0.0.1:3000")]
    pub server: String,

    /// The assignment the essay answers
    #[arg(long)]
    pub prompt: String,

    #[arg(long, conflicts_with = "essay_file", required_unless_present = "essay_file")]
    pub essay: Option<String>,

    #[arg(long)]
    pub essay_file: Option<PathBuf>,

    /// Print the feedback markdown as-is instead of styling it
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Subcommand, Debug)]
pub enum SamplesCommand {
    List {
        #[command(flatten)]
        store: StoreArgs,
    },
    Add {
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,
        #[arg(long)]
        text_file: Option<PathBuf>,
        #[arg(long)]
        grade: Option<LetterGrade>,
        #[command(flatten)]
        store: StoreArgs,
    },
    Delete {
        index: usize,
        #[command(flatten)]
        store: StoreArgs,
    },
    SetGrade {
        index: usize,
        grade: LetterGrade,
        #[command(flatten)]
        store: StoreArgs,
    },
    SetText {
        index: usize,
        text: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Grade(args) => grade(args).await,
        Command::Samples(cmd) => samples(cmd),
    }
}

fn ai_config(args: &ServeArgs) -> AiConfig {
    let config = AiConfig::default()
        .with_model(&args.model)
        .with_endpoint(&args.provider_url)
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_retry(RetryPolicy {
            max_retries: args.max_retries,
            delay: Duration::from_millis(args.retry_delay_ms),
            backoff: args.backoff,
        });

    match &args.api_key {
        Some(key) => config.with_api_key(key),
        None => config,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = ai_config(&args);
    if config.api_key.is_none() {
        warn!("GPT4_API_KEY is not set; every grading request will fail");
    }

    let model = ChatCompletionClient::new(config).context("failed to build model client")?;
    let app = protocol::router(AppState::new(Arc::new(model)));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %listener.local_addr()?, "grading endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("grading endpoint stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn grade(args: GradeArgs) -> Result<()> {
    let essay = match (args.essay, &args.essay_file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            encoding::read_text_file(path)
                .with_context(|| format!("failed to read {}", path.display()))?
                .text
        }
        (None, None) => bail!("either --essay or --essay-file is required"),
    };

    let mut session = GraderSession::hydrate(args.store.open());
    session.set_essay_prompt(args.prompt);
    session.set_essay_text(essay);

    let api = HttpGradeApi::new(&args.server)?;
    let output = session.grade_essay(&api).await?;

    if args.raw || !std::io::stdout().is_terminal() {
        println!("{output}");
    } else {
        println!("{}", render_markdown(output));
    }
    if let Some(letter) = verdict::extract_letter_grade(output) {
        println!("\nLetter grade: {letter}");
    }
    Ok(())
}

fn samples(cmd: SamplesCommand) -> Result<()> {
    match cmd {
        SamplesCommand::List { store } => {
            let session = GraderSession::hydrate(store.open());
            if session.samples().is_empty() {
                println!("no samples stored");
            }
            for (i, s) in session.samples().iter().enumerate() {
                let grade = if s.grade.is_empty() { "-" } else { s.grade.as_str() };
                println!("{i}\t{grade}\t{}", preview(&s.text));
            }
        }
        SamplesCommand::Add {
            text,
            text_file,
            grade,
            store,
        } => {
            let text = match (text, text_file) {
                (Some(t), _) => t,
                (None, Some(path)) => {
                    encoding::read_text_file(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?
                        .text
                }
                (None, None) => String::new(),
            };

            let mut session = GraderSession::hydrate(store.open());
            session.add_sample()?;
            let index = session.samples().len() - 1;
            if !text.is_empty() {
                session.set_sample_text(index, text)?;
            }
            if let Some(g) = grade {
                session.set_sample_grade(index, g)?;
            }
            println!("added sample {index}");
        }
        SamplesCommand::Delete { index, store } => {
            let mut session = GraderSession::hydrate(store.open());
            session.delete_sample(index)?;
            println!("deleted sample {index}");
        }
        SamplesCommand::SetGrade {
            index,
            grade,
            store,
        } => {
            let mut session = GraderSession::hydrate(store.open());
            session.set_sample_grade(index, grade)?;
        }
        SamplesCommand::SetText { index, text, store } => {
            let mut session = GraderSession::hydrate(store.open());
            session.set_sample_text(index, text)?;
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() > MAX || text.lines().nth(1).is_some() {
        let cut: String = first.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}
