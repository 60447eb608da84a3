//! queryassert - run a single query assertion from the command line
//!
//! The actual logic is in the library modules for better testability.

use anyhow::Result;
use clap::Parser;
use queryassert::{Config, assert_that};
use tracing_subscriber::EnvFilter;

/// Check one query against a configured backend
#[derive(Debug, Parser)]
#[command(name = "queryassert", version, about)]
struct Args {
    /// Backend to run against
    #[arg(short, long, value_enum, default_value_t = Config::Regular)]
    config: Config,

    /// Expected rows, exactly (`\n` separates rows)
    #[arg(long, conflicts_with_all = ["expect_error", "print"])]
    expect: Option<String>,

    /// Text the failure message must contain
    #[arg(long, conflicts_with = "print")]
    expect_error: Option<String>,

    /// Print the rows in canonical form instead of checking them
    #[arg(long)]
    print: bool,

    /// Query text
    sql: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let query = assert_that().with(args.config).query(args.sql);

    let outcome = if args.print {
        query.fetch().map(|text| print!("{}", text))
    } else if let Some(expected) = args.expect {
        query.try_returns(&unescape(&expected))
    } else if let Some(substring) = args.expect_error {
        query.try_throws(&substring)
    } else {
        query.try_runs()
    };

    match outcome {
        Ok(()) => {
            if !args.print {
                println!("ok");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

/// Turn `\n` and `\t` escapes typed on a shell into real characters
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
