//! # Disque CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Add a job, retrying every 30 seconds until acknowledged
//! disque push emails '{"to":"a@b.c"}' --retry 30
//!
//! # Fetch up to ten jobs, waiting at most one second
//! disque pull emails --timeout 1000 --count 10
//!
//! # Acknowledge them
//! disque ack D-dcb833cf-8YL1NT17e9+wsA/09NqxscQI-05a1
//!
//! # Run any command with JSON arguments
//! disque -s 10.0.0.1:7711 -s 10.0.0.2:7711 call QSCAN 0 '{"count":100}'
//! ```
//!
//! Every result is printed as one line of JSON on stdout.

use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use disque_cli::{call_arguments, job_options, JobOptions, Settings};
use disque_client::Client;
use serde_json::{json, Value};

#[derive(FromArgs)]
/// Disque job queue client
struct Cli {
    /// server address as host:port, may be repeated
    ///
    /// Falls back to DISQUE_SERVERS (comma separated), then 127.0.0.1:7711.
    #[argh(option, short = 's', long = "server")]
    servers: Vec<String>,

    /// password sent with AUTH, falls back to DISQUE_PASSWORD
    #[argh(option, short = 'p')]
    password: Option<String>,

    /// connect timeout in milliseconds
    #[argh(option, long = "connect-timeout")]
    connect_timeout_ms: Option<u64>,

    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Push(PushArgs),
    Pull(PullArgs),
    Ack(AckArgs),
    Qlen(QlenArgs),
    Qscan(QscanArgs),
    Show(ShowArgs),
    Hello(HelloArgs),
    Info(InfoArgs),
    Call(CallArgs),
}

/// Adds one job. Prints the assigned job ID.
#[derive(FromArgs)]
#[argh(subcommand, name = "push")]
/// add a job to a queue
struct PushArgs {
    /// queue name
    #[argh(positional)]
    queue: String,

    /// job payload, sent as is
    #[argh(positional)]
    payload: String,

    /// milliseconds to wait for replication before failing
    #[argh(option)]
    timeout: Option<u64>,

    /// number of nodes the job is replicated to
    #[argh(option)]
    replicate: Option<u64>,

    /// seconds before the job is queued
    #[argh(option)]
    delay: Option<u64>,

    /// seconds before an unacknowledged job is queued again
    #[argh(option)]
    retry: Option<u64>,

    /// seconds the job may live
    #[argh(option)]
    ttl: Option<u64>,

    /// refuse the job when the queue already holds this many
    #[argh(option)]
    maxlen: Option<u64>,

    /// replicate asynchronously
    #[argh(switch, long = "async")]
    asynchronous: bool,
}

/// Fetches jobs. `--timeout 0` (the default) returns at once.
#[derive(FromArgs)]
#[argh(subcommand, name = "pull")]
/// fetch jobs from one or more queues
struct PullArgs {
    /// queues to fetch from
    #[argh(positional)]
    queues: Vec<String>,

    /// milliseconds to block waiting for a job
    #[argh(option, short = 't', default = "0")]
    timeout: u64,

    /// maximum number of jobs to return
    #[argh(option, short = 'c', default = "1")]
    count: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ack")]
/// acknowledge processed jobs
struct AckArgs {
    /// job IDs
    #[argh(positional)]
    ids: Vec<String>,

    /// use FASTACK instead of ACKJOB
    #[argh(switch)]
    fast: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "qlen")]
/// print the length of a queue
struct QlenArgs {
    /// queue name
    #[argh(positional)]
    queue: String,
}

/// One page of queue names, or every page with `--all`.
#[derive(FromArgs)]
#[argh(subcommand, name = "qscan")]
/// list queues
struct QscanArgs {
    /// cursor returned by the previous page
    #[argh(option, default = "0")]
    cursor: u64,

    /// queue names per page hint
    #[argh(option)]
    count: Option<u64>,

    /// only queues with at least this many jobs
    #[argh(option)]
    minlen: Option<u64>,

    /// only queues with at most this many jobs
    #[argh(option)]
    maxlen: Option<u64>,

    /// follow cursors until the scan finishes
    #[argh(switch)]
    all: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "show")]
/// describe a job
struct ShowArgs {
    /// job ID
    #[argh(positional)]
    id: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "hello")]
/// print the cluster layout seen by the connected node
struct HelloArgs {}

#[derive(FromArgs)]
#[argh(subcommand, name = "info")]
/// print node information
struct InfoArgs {}

/// Arguments that parse as JSON are passed as JSON values, anything else as
/// a string.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// run a command by name
struct CallArgs {
    /// command name, case insensitive
    #[argh(positional)]
    command: String,

    /// command arguments
    #[argh(positional)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Logs stay on stderr so stdout is pure JSON
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::from_env(cli.servers, cli.password);
    if let Some(ms) = cli.connect_timeout_ms {
        settings = settings.with_connect_timeout(Duration::from_millis(ms));
    }
    let mut client = settings.build()?;

    let output = run(&mut client, cli.command)?;
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

fn run(client: &mut Client, command: Commands) -> Result<Value> {
    let output = match command {
        Commands::Push(args) => {
            let options = job_options(&JobOptions {
                timeout: args.timeout,
                replicate: args.replicate,
                delay: args.delay,
                retry: args.retry,
                ttl: args.ttl,
                maxlen: args.maxlen,
                asynchronous: args.asynchronous,
            });
            json!(client.add_job(&args.queue, &args.payload, options)?)
        }
        Commands::Pull(args) => {
            let queues: Vec<&str> = args.queues.iter().map(String::as_str).collect();
            let options = match args.timeout {
                0 => json!({"nohang": true, "count": args.count}),
                ms => json!({"timeout": ms, "count": args.count}),
            };
            json!(client.get_job(&queues, Some(options))?)
        }
        Commands::Ack(args) => {
            let ids: Vec<&str> = args.ids.iter().map(String::as_str).collect();
            let acknowledged = if args.fast { client.fast_ack(&ids)? } else { client.ack_job(&ids)? };
            json!(acknowledged)
        }
        Commands::Qlen(args) => json!(client.qlen(&args.queue)?),
        Commands::Qscan(args) => run_qscan(client, args)?,
        Commands::Show(args) => json!(client.show(&args.id)?),
        Commands::Hello(_) => json!(client.hello()?),
        Commands::Info(_) => json!(client.info()?),
        Commands::Call(args) => {
            let response = client.invoke(&args.command, call_arguments(&args.args))?;
            serde_json::to_value(response)?
        }
    };
    Ok(output)
}

fn run_qscan(client: &mut Client, args: QscanArgs) -> Result<Value> {
    let mut options = serde_json::Map::new();
    for (key, value) in [("count", args.count), ("minlen", args.minlen), ("maxlen", args.maxlen)] {
        if let Some(value) = value {
            options.insert(key.to_string(), json!(value));
        }
    }
    let options = (!options.is_empty()).then_some(Value::Object(options));

    let mut page = client.qscan(args.cursor, options.clone())?;
    if !args.all {
        return Ok(json!(page));
    }

    let mut queues = std::mem::take(&mut page.queues);
    while !page.finished {
        tracing::debug!(cursor = page.next_cursor, "Fetching next QSCAN page");
        page = client.qscan(page.next_cursor, options.clone())?;
        queues.append(&mut page.queues);
    }
    Ok(json!(queues))
}
