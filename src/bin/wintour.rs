//! wintour - converts one travel-service export into Wintour XML vouchers.
//!
//! Prints the batch result as JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wintour_xml::{
    Delimiter, FatalResponse, ProcessorBuilder, ServiceType, TextEncoding, WintourError,
    DEFAULT_AGENCY_NAME, DEFAULT_OUTPUT_DIR,
};

#[derive(Parser, Debug)]
#[command(
    name = "wintour",
    version,
    about = "Convert travel-service spreadsheets into Wintour XML vouchers",
    long_about = "Convert one spreadsheet (xlsx, xls, ods) or CSV export of air, hotel, \
                  car rental or bus transactions into one Wintour XML voucher per row.\n\n\
                  The batch result is printed to stdout as JSON. Rows that fail are \
                  reported in the `errors` array and do not stop the batch."
)]
struct Cli {
    /// Service type of every row in the file (air, hotel, carro, onibus).
    #[arg(value_name = "SERVICE", value_parser = parse_service)]
    service: ServiceType,

    /// Input file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory receiving the XML vouchers.
    #[arg(
        long = "out-dir",
        value_name = "DIR",
        env = "WINTOUR_XML_DIR",
        default_value = DEFAULT_OUTPUT_DIR
    )]
    out_dir: PathBuf,

    /// Field delimiter for CSV input.
    #[arg(long, value_enum, default_value_t = DelimiterArg::Auto)]
    delimiter: DelimiterArg,

    /// Character encoding of the generated XML.
    #[arg(long, value_enum, default_value_t = EncodingArg::Latin1)]
    encoding: EncodingArg,

    /// Agency name written into every voucher.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_AGENCY_NAME)]
    agency: String,

    /// Map rows on all cores.
    #[arg(long)]
    parallel: bool,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DelimiterArg {
    Auto,
    Comma,
    Semicolon,
    Tab,
}

impl From<DelimiterArg> for Delimiter {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Auto => Delimiter::Auto,
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Semicolon => Delimiter::Semicolon,
            DelimiterArg::Tab => Delimiter::Tab,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    Latin1,
    Windows1252,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Latin1 => TextEncoding::Latin1,
            EncodingArg::Windows1252 => TextEncoding::Windows1252,
        }
    }
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn parse_service(value: &str) -> Result<ServiceType, String> {
    value.parse().map_err(|error: WintourError| error.to_string())
}

/// `RUST_LOG` takes precedence over the command-line level.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn
        EnvFilter::new(format!("warn,wintour={level},wintour_xml={level}"))
    })
}

fn init_logging(level: Level) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(level))
        .with(layer)
        .init();
}

fn run(cli: &Cli) -> Result<String, WintourError> {
    let processor = ProcessorBuilder::new()
        .with_output_dir(&cli.out_dir)
        .with_agency_name(&cli.agency)
        .with_delimiter(cli.delimiter.into())
        .with_text_encoding(cli.encoding.into())
        .parallel(cli.parallel)
        .build()?;

    let result = processor.process_file(&cli.input, cli.service)?;
    if !result.errors.is_empty() {
        tracing::warn!(failed = result.errors.len(), "some rows were not converted");
    }
    // serde_json errors convert into io::Error
    result.to_json().map_err(|error| WintourError::Io(error.into()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    match run(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, input = %cli.input.display(), "batch aborted");
            let response = FatalResponse::from_error(&error);
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(_) => eprintln!("error: {}", response.error),
            }
            ExitCode::FAILURE
        }
    }
}
