//! Single-file conversion drivers for both input formats.
//!
//! The core components never see file paths; this module owns the input
//! loop, wraps core errors with the offending line number, and writes the
//! captured editor sub-recordings next to the output document.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use castweave_html::{DocumentConfig, HtmlDocument, HtmlRenderer};
use castweave_rec::{CastPipeline, Frame, Header};
use castweave_session::SessionParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Terminal,
    Asciinema,
}

impl InputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "terminal" => Some(Self::Terminal),
            "asciinema" => Some(Self::Asciinema),
            _ => None,
        }
    }
}

/// Convert `infile` to HTML, into `outfile` or standard output.
pub fn convert_file(
    infile: &Path,
    outfile: Option<&Path>,
    format: InputFormat,
    config: DocumentConfig,
) -> Result<()> {
    info!("parsing file {}", infile.display());
    let reader = BufReader::new(
        File::open(infile)
            .with_context(|| format!("opening {}", infile.display()))?,
    );

    match outfile {
        Some(path) => {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            let out = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let sessions = run(reader, out, format, config)?;
            let outdir = path.parent().unwrap_or(Path::new("."));
            write_sessions(outdir, sessions)?;
        },
        None => {
            run(reader, io::stdout().lock(), format, config)?;
        },
    }
    Ok(())
}

fn run<R: BufRead, W: Write>(
    reader: R,
    out: W,
    format: InputFormat,
    config: DocumentConfig,
) -> Result<Vec<(String, String)>> {
    let renderer = HtmlRenderer::new(out, config)?;
    let mut doc = match format {
        InputFormat::Terminal => convert_terminal(reader, renderer)?,
        InputFormat::Asciinema => convert_asciinema(reader, renderer)?,
    };
    Ok(doc.take_sessions())
}

/// Raw byte log: feed the detector one `0x0A`-delimited line at a time.
fn convert_terminal<R: BufRead, W: Write>(
    mut reader: R,
    mut renderer: HtmlRenderer<W>,
) -> Result<HtmlDocument<W>> {
    let mut session = SessionParser::default();
    let mut line = Vec::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        session
            .parse_line(&line, &mut renderer)
            .with_context(|| format!("error in line {line_no}"))?;
        renderer
            .check()
            .with_context(|| format!("error in line {line_no}"))?;
    }

    session.finish(&mut renderer);
    renderer.check()?;
    session.stats().log_statistics();
    Ok(renderer.finish()?)
}

/// Asciinema recording: header line, then one JSON frame per line.
fn convert_asciinema<R: BufRead, W: Write>(
    mut reader: R,
    renderer: HtmlRenderer<W>,
) -> Result<HtmlDocument<W>> {
    let mut first = String::new();
    reader.read_line(&mut first)?;
    let header = Header::parse(first.trim_end())
        .context("reading recording header")?;

    let mut pipeline = CastPipeline::new(header, renderer);
    let mut line_no = 1usize;
    for line in reader.lines() {
        let line = line?;
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let frame = Frame::parse(&line)
            .with_context(|| format!("error in line {line_no}"))?;
        pipeline
            .feed(&frame)
            .with_context(|| format!("error in line {line_no}"))?;
    }

    pipeline.stats().log_statistics();
    Ok(pipeline.finish()?)
}

/// Write the captured editor sub-recordings below the output directory.
fn write_sessions(
    outdir: &Path,
    sessions: Vec<(String, String)>,
) -> Result<()> {
    if sessions.is_empty() {
        return Ok(());
    }

    let dir = outdir.join("vs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating {}", dir.display()))?;
    for (id, data) in sessions {
        let path = dir.join(format!("vim_session_{id}.rec"));
        info!("writing editor sub-recording {}", path.display());
        fs::write(&path, data)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
