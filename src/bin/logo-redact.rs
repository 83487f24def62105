use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use logo_redaction::{default_output_path, ProcessResult, RedactOptions, RedactionEngine};

#[derive(Parser)]
#[command(
    name = "logo-redact",
    about = "Find a known logo or stamp on document pages and paint it over",
    version,
    after_help = "Simple usage: logo-redact <page.png>  (writes page_redacted.png)\n\
                  Directory usage: logo-redact <pages_dir> -o <out_dir>  (one document, page per file)"
)]
struct Cli {
    /// Input page image or directory of page images
    input: String,

    /// Output file or directory (default: {name}_redacted[.{ext}])
    #[arg(short, long)]
    output: Option<String>,

    /// Template image of the logo to remove
    #[arg(long, env = "LOGO_REDACT_TEMPLATE", default_value = "image/1.png")]
    template: PathBuf,

    /// Minimum correlation score for a match (-1.0 to 1.0)
    #[arg(short, long, default_value = "0.8", allow_negative_numbers = true)]
    threshold: f32,

    /// Border sampling distance, in half-template steps
    #[arg(short = 'd', long, default_value = "5")]
    border_distance: u32,

    /// Detect and report matches without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let opts = RedactOptions {
        threshold: cli.threshold,
        border_distance: cli.border_distance,
        dry_run: cli.dry_run,
    };

    let engine = match RedactionEngine::from_path(&cli.template, opts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to initialize engine: {e}");
            process::exit(1);
        }
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !cli.quiet {
        let template = engine.template();
        eprintln!(
            "Template {}x{}, threshold {:.2}, border distance {}{}",
            template.width(),
            template.height(),
            engine.options().threshold,
            engine.options().border_distance,
            if cli.dry_run { " (dry run)" } else { "" },
        );
        eprintln!();
    }

    let output_path = match &cli.output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(input_path),
    };
    let result = engine.process_path(input_path, &output_path);

    print_result(&result, &output_path, &cli);

    if !result.success {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, output: &Path, cli: &Cli) {
    let name = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if !result.success {
        eprintln!("[FAIL] {name}: {}", result.message);
        return;
    }
    if cli.quiet {
        return;
    }

    if cli.dry_run {
        eprintln!("[DRY] {name}: {}", result.message);
    } else {
        eprintln!("[OK] {name}: {}", result.message);
    }

    if cli.verbose && !cli.dry_run {
        eprintln!("  -> {}", output.display());
    }
}
