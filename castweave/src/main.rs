mod convert;
mod index;
mod jobs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use castweave_html::{DocumentConfig, Palette};

use crate::convert::InputFormat;

/// Convert recorded terminal sessions into formatted HTML transcripts.
#[derive(Parser, Debug)]
#[command(name = "castweave", version, about)]
struct Cli {
    /// Terminal log or asciinema recording to convert; with --list, a
    /// JSON job list describing multiple conversions
    infile: PathBuf,

    /// HTML file to write to; standard output when omitted
    outfile: Option<PathBuf>,

    /// Color palette for the generated stylesheet
    #[arg(long, default_value = "MyDracula")]
    palette: String,

    /// Treat the input as an asciinema v2 recording instead of a raw
    /// terminal byte log
    #[arg(long)]
    asciinema: bool,

    /// The input file is a JSON job list with files to convert and
    /// their options
    #[arg(long, short = 'l')]
    list: bool,

    /// Reveal review-only elements (frame timestamps, session dumps,
    /// attention hops) in the generated pages
    #[arg(long, short = 'w')]
    review: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        return jobs::process_list(&cli.infile, cli.review, &cli.palette);
    }

    let palette = Palette::from_name(&cli.palette)
        .with_context(|| format!("unknown palette {:?}", cli.palette))?;
    let config = DocumentConfig {
        palette,
        review: cli.review,
        ..DocumentConfig::default()
    };
    let format = if cli.asciinema {
        InputFormat::Asciinema
    } else {
        InputFormat::Terminal
    };

    convert::convert_file(&cli.infile, cli.outfile.as_deref(), format, config)
}
