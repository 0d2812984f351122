//! TemplateRT CLI - Bridge interface for template toolchains
//!
//! Commands: escape, filter, dir, bidi
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a filter rejects its input

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use templatert_core::{
    bidi, filters, ContentKind, Dir, EscapeContext, FilterContext, RenderRuntime, RuntimeConfig,
    SanitizedContent, TableGeneration,
};

#[derive(Parser)]
#[command(name = "templatert-cli")]
#[command(about = "TemplateRT CLI - escaping, filtering and bidi helpers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a runtime config JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Escape a value for an output context
    Escape {
        #[arg(short = 'x', long)]
        context: EscapeContext,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Run a filter over a value
    Filter {
        #[arg(short = 'x', long)]
        context: FilterContext,

        /// Use the legacy filter tables regardless of config
        #[arg(long)]
        legacy: bool,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Estimate text direction
    Dir {
        /// Ignore markup and entities
        #[arg(long)]
        html: bool,

        #[arg(allow_hyphen_values = true)]
        text: String,
    },

    /// Format text for a page of a given direction
    Bidi {
        /// Page direction (-1, 0 or 1); defaults to the config's globalDir
        #[arg(short, long, allow_hyphen_values = true, value_parser = clap::value_parser!(i8).range(-1..=1))]
        global_dir: Option<i8>,

        #[arg(long, value_enum)]
        op: BidiOp,

        /// Treat the text as HTML
        #[arg(long)]
        html: bool,

        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BidiOp {
    Attr,
    MarkAfter,
    SpanWrap,
    UnicodeWrap,
}

fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match &cli.config {
        Some(path) => match RuntimeConfig::load_from_path(path) {
            Ok(c) => c,
            Err(e) => {
                let output = json!({ "error": format!("Failed to load config: {}", e) });
                println!("{}", output);
                return ExitCode::FAILURE;
            }
        },
        None => RuntimeConfig::default(),
    };
    debug!(?config, "Using runtime config");

    let runtime = RenderRuntime::new(config);

    match cli.command {
        Commands::Escape { context, value } => {
            let output = json!({
                "context": context.name(),
                "output": runtime.escape(context, value.as_str()),
            });
            println!("{:#}", output);
            ExitCode::SUCCESS
        }

        Commands::Filter { context, legacy, value } => {
            let outcome = if legacy {
                filters::evaluate(context.rule(TableGeneration::Legacy), value.as_str())
            } else {
                runtime.evaluate_filter(context, value.as_str())
            };
            let rejected = outcome.is_rejected();
            let output = json!({
                "context": context.name(),
                "output": outcome.into_output(),
                "rejected": rejected,
            });
            println!("{:#}", output);
            if rejected {
                ExitCode::from(2) // Filter rejected the value
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Dir { html, text } => {
            let dir = bidi::text_dir(text.as_str(), html);
            println!("{:#}", json!({ "dir": dir.as_i8() }));
            ExitCode::SUCCESS
        }

        Commands::Bidi { global_dir, op, html, text } => {
            let global_dir = global_dir
                .map(|d| Dir::from_sign(i64::from(d)))
                .unwrap_or_else(|| runtime.global_dir());
            let formatters = runtime.bidi();
            let value = if html {
                SanitizedContent::html(text)
            } else {
                SanitizedContent::new(text, ContentKind::Text)
            };

            let output = match op {
                BidiOp::Attr => formatters.dir_attr(global_dir, &value, html).into_text(),
                BidiOp::MarkAfter => formatters.mark_after(global_dir, &value, html),
                BidiOp::SpanWrap => formatters.span_wrap(global_dir, &value),
                BidiOp::UnicodeWrap => formatters.unicode_wrap(global_dir, &value).into_text(),
            };
            println!("{:#}", json!({ "output": output }));
            ExitCode::SUCCESS
        }
    }
}
