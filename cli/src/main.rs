use clap::{ArgAction, Parser};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kproto::file_to_json;
use kproto_compiler::error::KprotoError;
use kproto_compiler::{default_output_path, generate_source, load_schema, BackendRegistry, CodegenOptions, ParseOptions};

/// Exit status for an unknown backend or a missing schema argument.
const EXIT_USAGE: u8 = 1;
/// Exit status for parse, codegen and I/O failures.
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "kprotoc")]
#[command(about = "Compile KProto schemas into Go or Rust source", long_about = None)]
struct Cli {
    /// Input `.kproto` schema file
    schema: Option<PathBuf>,

    /// Target language of the generated source
    #[arg(short, long, default_value = "go")]
    lang: String,

    /// Output file (defaults to the schema path plus the language's extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the generated source instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Do not generate service interfaces for `rpc` blocks
    #[arg(long)]
    skip_rpc: bool,

    /// Report messages declared before any `package` line
    #[arg(long)]
    strict_package: bool,

    /// Import path of the runtime codec used by generated code
    #[arg(long)]
    runtime: Option<String>,

    /// Print the parsed schema as JSON instead of generating source
    #[arg(long)]
    dump_json: bool,

    /// List the available languages and exit
    #[arg(long)]
    list_backends: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, schema: &Path, registry: &BackendRegistry) -> Result<(), KprotoError> {
    let parse_options = ParseOptions { strict_package: cli.strict_package };
    let file = load_schema(schema, &parse_options)?;

    if cli.dump_json {
        println!("{}", file_to_json(&file)?);
        return Ok(());
    }

    let backend = registry.require(&cli.lang)?;
    let codegen_options = CodegenOptions {
        skip_rpc: cli.skip_rpc,
        runtime:  cli.runtime.clone(),
    };
    let code = generate_source(backend, file, &codegen_options)?;

    if cli.stdout {
        print!("{}", code);
    } else {
        let out_path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(schema, backend));
        fs::write(&out_path, &code)?;
        info!(path = %out_path.display(), "wrote generated source");
        println!("Compiled {} → {}", schema.display(), out_path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = BackendRegistry::with_defaults();

    if cli.list_backends {
        for name in registry.names() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let Some(schema) = cli.schema.clone() else {
        eprintln!("kprotoc: missing schema file (see --help)");
        return ExitCode::from(EXIT_USAGE);
    };

    // Reject an unknown language before touching the schema.
    if !cli.dump_json && registry.get(&cli.lang).is_none() {
        eprintln!("kprotoc: unknown language {:?} (available: {})", cli.lang, registry.names().join(", "));
        return ExitCode::from(EXIT_USAGE);
    }

    match run(&cli, &schema, &registry) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# {}", schema.display());
            eprintln!("{}", err);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
