//! GraphQL cost analysis CLI.
//!
//! Run with: `graphql-cost --config config.yaml --query '{ users { name } }'`
//!
//! The query is taken from `--query`, `--file`, or stdin, in that order. With
//! `--request` the input is a GraphQL-over-HTTP JSON body instead of raw text.

use anyhow::{Context, Result};
use clap::Parser;
use graphql_cost_analysis::config::Config;
use graphql_cost_analysis::error::graphql_error_response;
use graphql_cost_analysis::CostMiddleware;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Estimate the cost of a GraphQL query before executing it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Query text to analyze
    #[arg(short, long, conflicts_with = "file")]
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Treat the input as a JSON request body (`{"query": ...}` or a batch)
    #[arg(long)]
    request: bool,

    /// Override the configured cost ceiling
    #[arg(long)]
    max_cost: Option<f64>,

    /// Override the configured depth ceiling
    #[arg(long)]
    max_depth: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!("graphql-cost v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    let input = read_input(&args).await?;
    let middleware = CostMiddleware::new(config);

    info!(
        max_cost = ?middleware.config().cost.max_cost,
        max_depth = ?middleware.config().cost.max_depth,
        "Analyzing GraphQL input"
    );

    let (output, blocked) = run(&middleware, &input, args.request)?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if blocked {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Load the config file (defaults when missing) and apply command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if args.config.exists() {
        info!("Config file: {}", args.config.display());
        Config::from_file(&args.config).context("Failed to load config file")?
    } else {
        debug!("Config file not found, using defaults");
        Config::default()
    };

    if let Some(max_cost) = args.max_cost {
        config.cost.max_cost = Some(max_cost);
    }
    if let Some(max_depth) = args.max_depth {
        config.cost.max_depth = Some(max_depth);
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Analyze `input` and return the JSON to print and whether it was blocked.
fn run(middleware: &CostMiddleware, input: &str, request: bool) -> Result<(Value, bool)> {
    if request {
        let outcome = middleware.check_request(input.as_bytes());
        let output = match outcome.error_response() {
            Some(errors) => errors,
            None => serde_json::to_value(&outcome.results)?,
        };
        return Ok((output, outcome.is_blocked()));
    }

    Ok(match middleware.analyze(input) {
        Ok(result) => (serde_json::to_value(&result)?, false),
        Err(error) => (graphql_error_response(&[error.to_violation()]), true),
    })
}

async fn read_input(args: &Args) -> Result<String> {
    if let Some(query) = &args.query {
        return Ok(query.clone());
    }

    if let Some(path) = &args.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read query from stdin")?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("graphql-cost").chain(argv.iter().copied()))
    }

    #[test]
    fn test_args_defaults() {
        let args = args(&[]);
        assert_eq!(args.config, PathBuf::from("config.yaml"));
        assert!(args.query.is_none());
        assert!(!args.request);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_query_conflicts_with_file() {
        let result = Args::try_parse_from(["graphql-cost", "--query", "{ a }", "--file", "q.graphql"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_input_from_query() {
        let args = args(&["--query", "{ version }"]);
        assert_eq!(read_input(&args).await.unwrap(), "{ version }");
    }

    #[tokio::test]
    async fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "query {{ user {{ name }} }}").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = args(&["--file", path.as_str()]);
        assert_eq!(read_input(&args).await.unwrap(), "query { user { name } }");
    }

    #[test]
    fn test_limit_overrides_reach_middleware() {
        let args = args(&[
            "--config",
            "/nonexistent/config.yaml",
            "--max-depth",
            "2",
            "--max-cost",
            "50",
        ]);
        let middleware = CostMiddleware::new(load_config(&args).unwrap());

        assert_eq!(middleware.config().cost.max_depth, Some(2));
        assert_eq!(middleware.config().cost.max_cost, Some(50.0));

        let (output, blocked) = run(&middleware, "{ a { b { c } } }", false).unwrap();
        assert!(blocked);
        assert_eq!(output["errors"][0]["extensions"]["code"], "DEPTH_EXCEEDED");
    }

    #[test]
    fn test_overrides_replace_config_file_values() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "cost:\n  max_cost: 5\n  max_depth: 9").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = args(&["--config", path.as_str(), "--max-cost", "100"]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.cost.max_cost, Some(100.0));
        assert_eq!(config.cost.max_depth, Some(9));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = args(&["--config", "/nonexistent/config.yaml", "--max-cost=-1"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_run_query_text() {
        let middleware = CostMiddleware::new(Config::default());
        let (output, blocked) = run(&middleware, "query { user { name email } }", false).unwrap();

        assert!(!blocked);
        assert_eq!(output["cost"], 3.0);
        assert_eq!(output["depth"], 2);
    }

    #[test]
    fn test_run_request_body() {
        let args = args(&["--config", "/nonexistent/config.yaml", "--max-cost", "3"]);
        let middleware = CostMiddleware::new(load_config(&args).unwrap());

        let (output, blocked) = run(&middleware, r#"[{"query": "{ a b }"}]"#, true).unwrap();
        assert!(!blocked);
        assert_eq!(output[0]["cost"], 2.0);

        let (output, blocked) = run(&middleware, r#"{"query": "{ a b c d e }"}"#, true).unwrap();
        assert!(blocked);
        assert_eq!(output["errors"][0]["extensions"]["code"], "COST_EXCEEDED");
        assert_eq!(output["errors"][0]["extensions"]["actual"], 5.0);
    }
}
