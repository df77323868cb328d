//! Span directives kept on the renderer's span stack.

/// A rendering directive for one open `<span>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    /// `<span class="...">`
    Class(String),
    /// `<span style="...">`
    Style(String),
}

/// Classification used by the selective close protocol: SGR reset codes
/// close the innermost span of a matching kind while preserving everything
/// opened after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Bold,
    Underline,
    Blink,
    Reverse,
    Foreground,
    Background,
    Other,
}

impl Span {
    pub fn kind(&self) -> SpanKind {
        match self {
            Self::Class(class) => match class.as_str() {
                "bold" => SpanKind::Bold,
                "underline" => SpanKind::Underline,
                "blink" => SpanKind::Blink,
                "reverse" => SpanKind::Reverse,
                name if name.starts_with("ef") || name.starts_with('f') => {
                    SpanKind::Foreground
                },
                name if name.starts_with("eb") || name.starts_with('b') => {
                    SpanKind::Background
                },
                _ => SpanKind::Other,
            },
            Self::Style(style) => {
                if style.starts_with("background-color:") {
                    SpanKind::Background
                } else if style.starts_with("color:") {
                    SpanKind::Foreground
                } else {
                    SpanKind::Other
                }
            },
        }
    }

    /// The opening tag for this span.
    pub fn open_tag(&self) -> String {
        match self {
            Self::Class(class) => format!("<span class=\"{class}\">"),
            Self::Style(style) => format!("<span style=\"{style}\">"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_class_spans() {
        let cases = vec![
            (Span::Class("bold".into()), SpanKind::Bold),
            (Span::Class("underline".into()), SpanKind::Underline),
            (Span::Class("blink".into()), SpanKind::Blink),
            (Span::Class("reverse".into()), SpanKind::Reverse),
            (Span::Class("f1".into()), SpanKind::Foreground),
            (Span::Class("ef12".into()), SpanKind::Foreground),
            (Span::Class("b4".into()), SpanKind::Background),
            (Span::Class("eb9".into()), SpanKind::Background),
        ];
        for (span, kind) in cases {
            assert_eq!(span.kind(), kind);
        }
    }

    #[test]
    fn classifies_style_spans() {
        assert_eq!(
            Span::Style("color:rgb(1,2,3)".into()).kind(),
            SpanKind::Foreground
        );
        assert_eq!(
            Span::Style("background-color:rgb(1,2,3)".into()).kind(),
            SpanKind::Background
        );
    }
}
