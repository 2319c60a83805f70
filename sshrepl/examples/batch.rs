//! Batch example: run a script file through a remote interpreter
//!
//! Each line of the script is sent at the interpreter prompt in order and
//! the per-line results are printed as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example batch -- --host localhost --user admin --password secret \
//!     --interpreter python3 --script ./session.py
//! ```
//!
//! Use `--interpreter irb` for Ruby. `--error-marker` overrides the
//! interpreter's own error marker, e.g. `--error-marker Traceback`.

use std::env;
use std::fs;
use std::time::Duration;

use sshrepl::{CommandBatch, HostKeyVerification, RunOptions, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let Some(script) = &args.script else {
        eprintln!("Error: --script is required");
        std::process::exit(1);
    };
    let batch = CommandBatch::from(fs::read_to_string(script)?);

    let mut defaults = RunOptions::new().timeout(Duration::from_secs(args.timeout));
    if let Some(marker) = &args.error_marker {
        defaults = defaults.error_marker(marker.as_str());
    }

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .interpreter(&args.interpreter)
        .defaults(defaults);
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    if args.insecure {
        builder = builder.host_key_verification(HostKeyVerification::Disabled);
    }

    let mut session = builder.connect().await?;
    session.login().await?;

    let outcome = session.run(batch).await;
    let closed = session.logout().await;

    let results = outcome?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    let failed = results.iter().filter(|r| r.failed).count();
    eprintln!(
        "{} command(s), {} failed, {} logout issue(s)",
        results.len(),
        failed,
        closed.errors.len()
    );
    if failed > 0 {
        std::process::exit(2);
    }
    Ok(())
}

struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    interpreter: String,
    script: Option<String>,
    error_marker: Option<String>,
    timeout: u64,
    insecure: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            interpreter: "python3".to_string(),
            script: None,
            error_marker: None,
            timeout: 30,
            insecure: false,
        };

        let mut i = 1;
        while i < args.len() {
            if args[i] == "--insecure" {
                parsed.insecure = true;
                i += 1;
                continue;
            }
            let Some(value) = args.get(i + 1).cloned() else {
                eprintln!("Missing value for {}", args[i]);
                break;
            };
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value,
                "--port" | "-p" => parsed.port = value.parse().unwrap_or(22),
                "--user" | "-u" => parsed.user = value,
                "--password" | "-P" => parsed.password = Some(value),
                "--interpreter" | "-i" => parsed.interpreter = value,
                "--script" | "-s" => parsed.script = Some(value),
                "--error-marker" | "-e" => parsed.error_marker = Some(value),
                "--timeout" | "-t" => parsed.timeout = value.parse().unwrap_or(30),
                other => eprintln!("Unknown argument: {}", other),
            }
            i += 2;
        }
        parsed
    }
}
