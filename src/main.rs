use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

use notarize_lite::capture::{select_target, CaptureLog, RequestSource};
use notarize_lite::config::{ConfigReader, ControllerConfig, FileConfigReader, NotaryConfig};
use notarize_lite::controller::{ControlCommand, Controller};
use notarize_lite::engine::LoopbackEngine;
use notarize_lite::notarize::{prepare, NotarizationJob};
use notarize_lite::notify::{Notice, Notifier, RecordingNotifier, Tee, TracingNotifier};
use notarize_lite::shutdown::cancel_on_ctrl_c;

#[derive(Parser, Debug)]
#[command(name = "notarize-lite")]
#[command(version)]
#[command(about = "Select a captured GraphQL request and notarize it")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// JSON file with the captured requests, in capture order
    #[arg(long, short = 'r', global = true, default_value = "requests.json")]
    requests: PathBuf,

    /// JSON settings file (maxSentData, maxRecvData, notaryUrl, websocketProxyUrl).
    /// Built-in defaults are used when omitted.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show which captured request would be notarized
    Select,
    /// Build the notarization job without submitting it
    Prepare,
    /// Submit the job to the local loopback engine and wait for the outcome
    Run {
        /// Simulated engine latency in milliseconds
        #[arg(long, default_value = "500")]
        delay_ms: u64,

        /// Make the engine report an error with this detail
        #[arg(long)]
        fail: Option<String>,

        /// Also write every user notice to the log as it is delivered
        #[arg(long)]
        log_notices: bool,
    },
}

#[derive(Serialize)]
struct NoticeOutput {
    kind: &'static str,
    text: String,
}

#[derive(Serialize)]
struct RunOutput {
    job_id: Option<String>,
    notices: Vec<NoticeOutput>,
    finished: Vec<NotarizationJob>,
}

fn notice_output(notice: &Notice) -> NoticeOutput {
    NoticeOutput {
        kind: if notice.is_error() { "error" } else { "alert" },
        text: notice.text().to_string(),
    }
}

fn settings_reader(path: &Option<PathBuf>) -> Arc<dyn ConfigReader> {
    match path {
        Some(path) => Arc::new(FileConfigReader::new(path)),
        None => Arc::new(NotaryConfig::default()),
    }
}

async fn run_select(
    inputs: &InputArgs,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = CaptureLog::load(&inputs.requests).await?;
    let requests = log.requests().await;
    let target = select_target(&requests)?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(target)?),
        OutputFormat::Table => {
            println!("{:<14} {}", "REQUEST ID", target.request_id);
            println!("{:<14} {}", "METHOD", target.method);
            println!("{:<14} {}", "URL", target.url);
            println!("{:<14} {}", "HEADERS", target.request_headers.len());
        }
    }
    Ok(())
}

async fn run_prepare(
    inputs: &InputArgs,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = CaptureLog::load(&inputs.requests).await?;
    let requests = log.requests().await;
    let target = select_target(&requests)?;
    let settings = settings_reader(&inputs.config);
    let job = prepare(target, settings.as_ref()).await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&job)?),
        OutputFormat::Table => println!("{}", job.http_dump()),
    }
    Ok(())
}

async fn run_pipeline(
    inputs: &InputArgs,
    output: &OutputFormat,
    delay_ms: u64,
    fail: Option<String>,
    log_notices: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = CaptureLog::load(&inputs.requests).await?;
    let mut engine = LoopbackEngine::new(Duration::from_millis(delay_ms));
    if let Some(detail) = fail {
        engine = engine.failing_with(detail);
    }
    let notifier = RecordingNotifier::new();
    let sink: Arc<dyn Notifier> = if log_notices {
        Arc::new(Tee(notifier.clone(), TracingNotifier))
    } else {
        Arc::new(notifier.clone())
    };

    let controller = Controller::new(
        ControllerConfig::default(),
        Arc::new(source),
        settings_reader(&inputs.config),
        Arc::new(engine),
        sink,
    );

    let (commands_tx, commands_rx) = mpsc::channel(4);
    let shutdown = cancel_on_ctrl_c();
    let controller_task = tokio::spawn(controller.run(commands_rx, shutdown));

    let (respond_to, response) = oneshot::channel();
    commands_tx
        .send(ControlCommand::Trigger { respond_to })
        .await
        .map_err(|_| "controller stopped before the trigger was sent")?;
    let job_id = response.await?.ok();
    drop(commands_tx);

    let finished = controller_task.await?;
    let notices = notifier.take();

    match output {
        OutputFormat::Json => {
            let out = RunOutput {
                job_id,
                notices: notices.iter().map(notice_output).collect(),
                finished,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            if let Some(id) = &job_id {
                println!("Submitted job {}", id);
            }
            for notice in &notices {
                let kind = if notice.is_error() { "ERROR" } else { "ALERT" };
                println!("[{}]\n{}\n", kind, notice.text());
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Select => run_select(&args.inputs, &args.output).await,
        Commands::Prepare => run_prepare(&args.inputs, &args.output).await,
        Commands::Run {
            delay_ms,
            fail,
            log_notices,
        } => run_pipeline(&args.inputs, &args.output, delay_ms, fail, log_notices).await,
    }
}
