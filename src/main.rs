// Tue Jan 13 2026 - Alex

use ack_aggregator::{
    config::EngineConfig,
    engine::{AckEngine, Dispatch},
    message::SessionMessage,
    model::{
        Acknowledgement, AcknowledgementLabel, AggregationResult, Channel, CommandResponse, Headers, Signal,
        SignalKind, StatusCode,
    },
    namespace::ActorRef,
    utils::{format_duration, pluralize, LoggingUtils},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

const RESULT_SLACK: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Simulates one request and prints the aggregated acknowledgements", long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value = "modify")]
    kind: CliKind,

    #[arg(short, long, value_enum, default_value = "twin")]
    channel: CliChannel,

    /// Requested acknowledgement labels; omit to let the header policy decide.
    #[arg(short, long, value_delimiter = ',')]
    acks: Option<Vec<String>>,

    /// A responder to simulate, as `label[:status]`. Repeatable.
    #[arg(short, long)]
    respond: Vec<String>,

    #[arg(short, long)]
    timeout_ms: Option<u64>,

    #[arg(long, default_value = "thing:demo")]
    entity: String,

    #[arg(long)]
    correlation_id: Option<String>,

    #[arg(long)]
    no_response_required: bool,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKind {
    Modify,
    Query,
    Message,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliChannel {
    Twin,
    Live,
}

fn main() {
    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "[!]".red(), e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the delivered status was a success.
fn run(args: Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let base_level = LoggingUtils::level_from_str(&config.log_level);
    LoggingUtils::init_from_env_or(LoggingUtils::level_from_verbosity(base_level, args.verbose));

    let responders = args
        .respond
        .iter()
        .map(|spec| parse_responder(spec))
        .collect::<Result<Vec<_>>>()?;

    let signal = build_signal(&args)?;
    let engine = AckEngine::new(config);

    println!(
        "{} Dispatching {:?} for {} on the {} channel",
        "[*]".blue(),
        signal.kind,
        signal.entity_id,
        signal.channel()
    );

    let (sender, results) = channel();
    let dispatched = engine.dispatch(signal, move |result| {
        let _ = sender.send(result);
    })?;

    let (signal, session) = match dispatched {
        Dispatch::PassThrough(signal) => {
            println!("{} Nothing to aggregate, the request goes out as is", "[+]".green());
            println!("{}", serde_json::to_string_pretty(&signal.headers)?);
            return Ok(true);
        }
        Dispatch::Aggregating { signal, session } => (signal, session),
    };

    let correlation_id = signal.correlation_id().unwrap_or_default().to_string();
    println!(
        "{} Session {} waiting for [{}]",
        "[+]".green(),
        session.name().cyan(),
        signal.headers.ack_labels().iter().map(|label| label.to_string()).collect::<Vec<_>>().join(", ")
    );

    start_forwarder(&engine, &signal, &session);
    simulate_responders(&engine, &signal, &session, &responders);

    let wait = effective_deadline(&engine, &signal) + RESULT_SLACK;
    let result = await_result(&results, wait, args.no_progress)
        .ok_or_else(|| anyhow!("no result for {} within {}", correlation_id, format_duration(wait)))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    print_summary(&result);

    Ok(result.status().is_success())
}

fn build_signal(args: &Args) -> Result<Signal> {
    let mut headers = Headers::new().with_channel(match args.channel {
        CliChannel::Twin => Channel::Twin,
        CliChannel::Live => Channel::Live,
    });

    if let Some(id) = &args.correlation_id {
        headers = headers.with_correlation_id(id);
    }
    if let Some(ms) = args.timeout_ms {
        headers = headers.with_timeout(Duration::from_millis(ms));
    }
    if args.no_response_required {
        headers = headers.with_response_required(false);
    }
    if let Some(acks) = &args.acks {
        let labels = acks
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| raw.parse::<AcknowledgementLabel>().map_err(|e| anyhow!(e)))
            .collect::<Result<Vec<_>>>()?;
        headers = headers.with_requested_acks(labels);
    }

    let kind = match args.kind {
        CliKind::Modify => SignalKind::ModifyCommand,
        CliKind::Query => SignalKind::QueryCommand,
        CliKind::Message => SignalKind::MessageCommand,
    };
    Ok(Signal::new(kind, &args.entity, headers))
}

fn parse_responder(spec: &str) -> Result<(AcknowledgementLabel, StatusCode)> {
    let (label, status) = match spec.rsplit_once(':') {
        Some((label, code)) => {
            let code: u16 = code.parse().with_context(|| format!("invalid status in '{}'", spec))?;
            if !(100..=599).contains(&code) {
                bail!("status {} in '{}' is not an HTTP status", code, spec);
            }
            (label, StatusCode::new(code))
        }
        None => (spec, StatusCode::OK),
    };
    let label = label.parse::<AcknowledgementLabel>().map_err(|e| anyhow!(e))?;
    Ok((label, status))
}

/// External labels reach the session through a forwarder. On the twin channel
/// they ride on the event the persistence emits.
fn start_forwarder(engine: &AckEngine, signal: &Signal, session: &ActorRef) {
    let carrier = if signal.is_twin_modify_command() {
        Signal::new(SignalKind::Event, &signal.entity_id, signal.headers.clone())
    } else {
        signal.clone()
    };

    match engine.forwarder_starter(&carrier, session.clone(), |_| true).get() {
        Some(forwarder) => println!("{} Forwarder {} ready", "[+]".green(), forwarder.name().cyan()),
        None => log::debug!("No forwarder needed for {}", signal.entity_id),
    }
}

fn simulate_responders(
    engine: &AckEngine,
    signal: &Signal,
    session: &ActorRef,
    responders: &[(AcknowledgementLabel, StatusCode)],
) {
    let plain_label = if signal.channel().is_live() || signal.is_message_command() {
        AcknowledgementLabel::LiveResponse
    } else {
        AcknowledgementLabel::Persisted
    };
    let ack_headers = signal.headers.clone();

    for (label, status) in responders {
        let delivered = if *label == plain_label {
            let response = CommandResponse::new(&signal.entity_id, *status, Headers::new());
            let message = if signal.is_message_command() {
                SessionMessage::MessageResponse {
                    response,
                    message_headers: ack_headers.clone(),
                }
            } else {
                SessionMessage::PersistenceResponse(response)
            };
            session.tell(message)
        } else if label.is_built_in() {
            let ack = Acknowledgement::new(label.clone(), &signal.entity_id, *status, ack_headers.clone());
            session.tell(SessionMessage::Acknowledgement(ack))
        } else {
            let ack = Acknowledgement::new(label.clone(), &signal.entity_id, *status, ack_headers.clone());
            engine.route_acknowledgement(ack)
        };

        if delivered {
            println!("{} {} answered {}", "[>]".blue(), label.to_string().yellow(), status);
        } else {
            println!("{} {} could not be delivered", "[!]".red(), label.to_string().yellow());
        }
    }
}

fn effective_deadline(engine: &AckEngine, signal: &Signal) -> Duration {
    let fallback = engine.config().forwarder_fallback_timeout();
    signal.headers.timeout().map_or(fallback, |timeout| timeout.min(fallback))
}

fn await_result(
    results: &std::sync::mpsc::Receiver<AggregationResult>,
    wait: Duration,
    no_progress: bool,
) -> Option<AggregationResult> {
    let spinner = if no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Waiting for acknowledgements...");
        Some(pb)
    };

    let started = Instant::now();
    let result = loop {
        let remaining = wait.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            break None;
        }
        match results.recv_timeout(remaining.min(Duration::from_millis(80))) {
            Ok(result) => break Some(result),
            Err(RecvTimeoutError::Timeout) => {
                if let Some(pb) = &spinner {
                    pb.tick();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break None,
        }
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

fn print_summary(result: &AggregationResult) {
    let status = result.status();
    let status_text = if status.is_success() {
        status.to_string().green()
    } else {
        status.to_string().red()
    };

    println!();
    println!("{}", "Result".cyan().bold());
    println!("{}", "-".repeat(40).cyan());

    match result {
        AggregationResult::Response(response) => {
            println!("  Plain response for {}: {}", response.entity_id, status_text);
        }
        AggregationResult::Error(error) => {
            println!("  Error {}: {} ({})", error.error_code.red(), error.message, status_text);
        }
        AggregationResult::Acknowledgements(envelope) => {
            println!(
                "  {} for {}: {}",
                pluralize(envelope.acknowledgements.len(), "acknowledgement", "acknowledgements"),
                envelope.entity_id,
                status_text
            );
            for ack in &envelope.acknowledgements {
                let code = if ack.is_success() {
                    ack.status.to_string().green()
                } else {
                    ack.status.to_string().red()
                };
                println!("    {:<24} {}", ack.label.to_string(), code);
            }
            let missing = envelope.missing();
            if !missing.is_empty() {
                println!("  {} {} timed out", "[!]".yellow(), pluralize(missing.len(), "label", "labels"));
            }
        }
    }
}
