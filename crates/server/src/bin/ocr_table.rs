//! Converts table-shaped OCR text read from a file or stdin into markdown

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use shared::{configure_cli_tracing, load_dotenv, table};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// The markdown table, or the input unchanged when no table was found
    Markdown,
    /// The input as read, no conversion
    Text,
    /// Json object with the markdown and whether a table was found
    Json,
}

#[derive(Debug, Parser)]
#[clap(name = "ocr-table")]
struct Cli {
    /// File holding the OCR output, stdin when omitted
    input: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "markdown")]
    format: Format,
    /// Write the result here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Exit with an error when no table structure was found
    #[arg(long, default_value = "false")]
    strict: bool,
}

fn main() -> Result<(), anyhow::Error> {
    load_dotenv()?;
    configure_cli_tracing();

    let args = Cli::parse();
    debug!(?args);

    let text = match &args.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("reading stdin")?;
            text
        }
    };

    let mut rendered = if args.format == Format::Text {
        text
    } else {
        let response = table::convert(&text);
        info!(converted = response.converted, "conversion finished");
        if args.strict && !response.converted {
            anyhow::bail!("no table structure found in the input");
        }

        match args.format {
            Format::Json => serde_json::to_string_pretty(&response)?,
            _ => response.markdown,
        }
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
