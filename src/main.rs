use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use officeconv::task::same_file;
use officeconv::{DocumentConverter, Error, FormatRegistry, OfficeConfig, SofficeContext};

const DEFAULT_FORMAT: &str = "pdf";

#[derive(Parser)]
#[command(name = "officeconv", about = "Convert office documents with LibreOffice")]
struct Args {
    /// Input document
    input: PathBuf,
    /// Output file (defaults to the input with the extension of --format)
    output: Option<PathBuf>,
    /// Output format extension; taken from the output file when omitted,
    /// pdf when neither is given
    #[arg(short, long)]
    format: Option<String>,
    /// Number every line of text documents
    #[arg(long)]
    line_numbers: bool,
    /// Office installation directory (overrides OFFICE_HOME)
    #[arg(long)]
    office_home: Option<PathBuf>,
    /// Path to the soffice executable
    #[arg(long)]
    soffice: Option<PathBuf>,
    /// Seconds to wait for the office process
    #[arg(long, default_value_t = 120)]
    timeout: u64,
    /// JSON file with a custom format registry
    #[arg(long)]
    formats: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = OfficeConfig::from_env().with_task_timeout(Duration::from_secs(args.timeout));
    if let Some(home) = &args.office_home {
        config = config.with_office_home(home);
    }
    if let Some(exe) = &args.soffice {
        config = config.with_executable(exe);
    }

    let registry = match &args.formats {
        Some(path) => FormatRegistry::from_json_file(path)?,
        None => FormatRegistry::standard(),
    };

    let format = args.format.as_deref().map(|f| f.trim_start_matches('.'));
    let output = args.output.clone().unwrap_or_else(|| {
        args.input.with_extension(format.unwrap_or(DEFAULT_FORMAT))
    });
    if same_file(&args.input, &output) {
        return Err(Error::OutputIsInput(output));
    }

    let output_format = match format {
        Some(ext) => Some(
            registry
                .format_by_extension(ext)
                .cloned()
                .ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))?,
        ),
        None => None,
    };

    let context = SofficeContext::new(&config)?;
    let mut converter = DocumentConverter::new(context)
        .with_registry(registry)
        .with_line_numbering(args.line_numbers);
    match output_format {
        Some(output_format) => converter.convert_to(&args.input, &output, &output_format),
        None => converter.convert(&args.input, &output),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("Error: file not found: {}", args.input.display());
        std::process::exit(1);
    }
    if !args.input.is_file() {
        eprintln!("Error: not a file: {}", args.input.display());
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
