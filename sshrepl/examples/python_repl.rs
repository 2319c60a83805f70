//! Python REPL example: log in, start `python3`, run a few statements
//!
//! Shows the full session lifecycle, including how an error report from the
//! interpreter is surfaced as a failed result without aborting the batch.
//!
//! # Prerequisites
//!
//! - SSH server with `python3` on the PATH
//! - Valid credentials (username/password or SSH key)
//!
//! # Usage
//!
//! ```bash
//! cargo run --example python_repl -- --host localhost --user your_username --password your_password
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use sshrepl::{RunOptions, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .interpreter("python3")
        .timeout(Duration::from_secs(args.timeout));

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.connect().await?;

    println!("Logging in...");
    let ready = session.login().await?;
    println!("Interpreter ready at {:?}", ready.prompt);

    let statements = "import platform\nplatform.python_version()\n1/0\nsum(range(10))";
    for result in session.run(statements).await? {
        println!("{}", "-".repeat(50));
        println!(">>> {}", result.command);
        print!("{}", result.output);
        if result.failed {
            println!("[failed: matched {:?}]", result.error_match);
        }
    }

    // Indented blocks need the continuation prompt as an extra ready marker
    println!("{}", "-".repeat(50));
    let block = RunOptions::new().marker([">>>", "..."]);
    let results = session
        .run_with(["for i in range(3):", "    print(i * i)", ""], block)
        .await?;
    if let Some(last) = results.last() {
        print!("{}", last.output);
    }

    println!("\nLogging out...");
    let closed = session.logout().await;
    for e in &closed.errors {
        eprintln!("logout: {}", e);
    }
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut host = "localhost".to_string();
        let mut port = 22u16;
        let mut user = env::var("USER").unwrap_or_else(|_| "root".to_string());
        let mut password = None;
        let mut key = None;
        let mut timeout = 30u64;

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => host = value.unwrap_or(host),
                "--port" | "-p" => port = value.and_then(|v| v.parse().ok()).unwrap_or(22),
                "--user" | "-u" => user = value.unwrap_or(user),
                "--password" | "-P" => password = value,
                "--key" | "-k" => key = value.map(PathBuf::from),
                "--timeout" | "-t" => timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30),
                "--help" => {
                    println!(
                        "USAGE: cargo run --example python_repl -- [--host H] [--port P] \
                         [--user U] [--password PASS | --key PATH] [--timeout SECS]"
                    );
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {}", other);
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        Self {
            host,
            port,
            user,
            password,
            key,
            timeout,
        }
    }
}
