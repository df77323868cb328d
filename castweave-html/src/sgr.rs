//! Select Graphic Rendition translation into span directives.

use std::io::Write;

use log::warn;

use crate::document::HtmlDocument;
use crate::error::{Error, Result};
use crate::span::{Span, SpanKind};

/// Apply one SGR parameter string to the document's span stack.
///
/// Color classes are opened before attribute classes so the palette's
/// `.f<n> > .bold` brightening selectors keep working. A `38`/`48`
/// extended color is only handled as a standalone sequence; malformed
/// parameter counts are logged and skipped, never fatal.
pub(crate) fn perform<W: Write>(
    doc: &mut HtmlDocument<W>,
    params: &[u8],
) -> Result<()> {
    if params.is_empty() || params == b"0" || params == b"00" {
        return doc.close_all_spans();
    }

    let Ok(params) = std::str::from_utf8(params) else {
        warn!("SGR parameters are not valid text, skipping");
        return Ok(());
    };
    let parts: Vec<&str> = params.split(';').collect();

    if parts[0] == "38" || parts[0] == "48" {
        return extended_color(doc, &parts);
    }

    let mut classes: Vec<String> = Vec::new();
    for part in &parts {
        let code: u16 = match part.parse() {
            Ok(code) => code,
            Err(_) => {
                warn!("unreadable SGR parameter {part:?}, skipping");
                continue;
            },
        };

        match code {
            30..=37 => classes.insert(0, format!("f{}", code - 30)),
            40..=47 => classes.insert(0, format!("b{}", code - 40)),
            90..=97 => classes.insert(0, format!("ef{}", 8 + code - 90)),
            100..=107 => classes.insert(0, format!("eb{}", 8 + code - 100)),
            1 => classes.push("bold".into()),
            4 => classes.push("underline".into()),
            5 => classes.push("blink".into()),
            7 => classes.push("reverse".into()),
            22 => doc.close_one(SpanKind::Bold)?,
            24 => doc.close_one(SpanKind::Underline)?,
            27 => doc.close_one(SpanKind::Reverse)?,
            39 => doc.close_one(SpanKind::Foreground)?,
            49 => doc.close_one(SpanKind::Background)?,
            code => return Err(Error::UnsupportedSgr(code)),
        }
    }

    for class in classes {
        doc.open_span(Span::Class(class))?;
    }
    Ok(())
}

/// Indexed (`38;5;n`) and RGB (`38;2;r;g;b`) colors, foreground and
/// background.
fn extended_color<W: Write>(
    doc: &mut HtmlDocument<W>,
    parts: &[&str],
) -> Result<()> {
    if parts.len() != 3 && parts.len() != 5 && parts.len() != 6 {
        warn!(
            "SGR {} with unexpected parameter count {}, skipping",
            parts[0],
            parts.len()
        );
        return Ok(());
    }

    let foreground = parts[0] == "38";
    if parts[1] == "5" {
        let class = if foreground {
            format!("ef{}", parts[2])
        } else {
            format!("eb{}", parts[2])
        };
        doc.open_span(Span::Class(class))
    } else {
        let n = parts.len();
        let (r, g, b) = (parts[n - 3], parts[n - 2], parts[n - 1]);
        let property = if foreground {
            "color"
        } else {
            "background-color"
        };
        doc.open_span(Span::Style(format!("{property}:rgb({r},{g},{b})")))
    }
}
