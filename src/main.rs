use clap::{Parser as ClapParser, Subcommand};
use jsonsieve::EngineConfig;
use jsonsieve::cli::{self, CliError, PatchOptions, QueryOptions, SelectOptions};
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "sieve")]
#[command(about = "Sieve - filter, select from and patch JSON documents in a single pass")]
#[command(version)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test documents against a boolean expression
    Filter {
        /// Expression, e.g. "o => o.tags.Any(t => t == 'b')"
        expr: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Expression is operation wire JSON
        #[arg(long)]
        wire: bool,

        /// One document per line; print the ones that pass
        #[arg(long)]
        lines: bool,
    },

    /// Evaluate an expression and print its value
    Eval {
        /// Expression, e.g. "o.items.Sum(i => i.price * i.qty)"
        expr: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Expression is operation wire JSON
        #[arg(long)]
        wire: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Extract several paths in one pass
    Select {
        /// Paths, e.g. "name" "items[*].price"
        #[arg(required = true)]
        paths: Vec<String>,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Apply a JSON Patch
    Patch {
        /// Patch document, e.g. '[{"op":"replace","path":"/a","value":1}]'
        patch: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Show the compiled form of an expression
    Explain {
        expr: String,

        /// Expression is operation wire JSON
        #[arg(long)]
        wire: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref().map(|path| EngineConfig::from_file(path)).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Commands::Filter {
            expr,
            input,
            wire,
            lines,
        } => read_input(input).and_then(|input| {
            run_filter(QueryOptions {
                expr,
                input,
                wire,
                lines,
                config,
            })
        }),
        Commands::Eval {
            expr,
            input,
            wire,
            pretty,
        } => read_input(input).and_then(|input| {
            let options = QueryOptions {
                expr,
                input,
                wire,
                lines: false,
                config,
            };
            print_json(&cli::execute_eval(&options)?, pretty)
        }),
        Commands::Select {
            paths,
            input,
            pretty,
        } => read_input(input).and_then(|input| {
            let options = SelectOptions {
                paths,
                input,
                config,
            };
            print_json(&cli::execute_select(&options)?, pretty)
        }),
        Commands::Patch { patch, input } => read_input(input).and_then(|input| {
            let options = PatchOptions {
                patch,
                input,
                config,
            };
            println!("{}", cli::execute_patch(&options)?);
            Ok(())
        }),
        Commands::Explain { expr, wire } => {
            let options = QueryOptions {
                expr,
                wire,
                config,
                ..QueryOptions::default()
            };
            cli::execute_explain(&options).and_then(|out| print_json(&out, true))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(config: &EngineConfig) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    Ok(match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    })
}

fn run_filter(options: QueryOptions) -> Result<(), CliError> {
    if !options.lines {
        println!("{}", cli::execute_filter(&options)?);
        return Ok(());
    }
    let outcome = cli::execute_filter_lines(&options)?;
    for line in &outcome.matched {
        println!("{}", line);
    }
    if outcome.failed > 0 {
        eprintln!("{} document(s) skipped", outcome.failed);
    }
    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}
