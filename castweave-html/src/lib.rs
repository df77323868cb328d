mod document;
mod error;
mod line;
mod palette;
mod render;
mod sgr;
mod span;

pub use document::{
    DocumentConfig, HopLinks, HtmlDocument, PlayerSession, PlayerVersion,
};
pub use error::{Error, Result};
pub use line::{Elem, LineBuilder};
pub use palette::Palette;
pub use render::HtmlRenderer;
pub use span::{Span, SpanKind};
