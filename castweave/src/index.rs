//! Index page listing every converted transcript with chapter anchors.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug)]
struct IndexEntry {
    file: String,
    title: String,
    chapters: BTreeMap<u32, String>,
}

#[derive(Debug)]
pub struct Index {
    title: String,
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    pub fn add_file(&mut self, file: &str, title: &str) {
        self.entries.push(IndexEntry {
            file: file.to_string(),
            title: title.to_string(),
            chapters: BTreeMap::new(),
        });
    }

    pub fn add_chapters(&mut self, file: &str, chapters: BTreeMap<u32, String>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.file == file) {
            entry.chapters = chapters;
        }
    }

    pub fn html(&self) -> String {
        let mut page = String::new();
        page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        page.push_str(
            "<meta http-equiv=\"Content-Type\" content=\"text/html; \
             charset=utf-8\"/>\n",
        );
        let _ = writeln!(page, "<title>{}</title>", self.title);
        page.push_str("<style type=\"text/css\">\n");
        page.push_str("h1 { color: #D1C3CB; text-align: center; }\n");
        page.push_str(
            "h2 { color: #e0e0c0; padding-left: 1em; }\n\
             section { color: #e0e0c0; font-family: sans-serif; \
             padding-left: 4em; }\n",
        );
        page.push_str(
            "h2 > a, section > a { color: #e0e0c0; text-decoration: none; }\n\
             h2 > a:hover, section > a:hover { color: #FFFFEE; \
             text-decoration: underline; }\n",
        );
        page.push_str(".f9 { color: #f8f8f2; }\n");
        page.push_str(".b9 { background-color: #21222c; }\n");
        page.push_str("</style>\n</head>\n\n<body class=\"f9 b9\">\n");
        let _ = writeln!(page, "\n  <h1>{}</h1>\n", self.title);

        for entry in &self.entries {
            let _ = writeln!(
                page,
                "  <h2><a href=\"{}\">{}</a></h2>",
                entry.file, entry.title
            );
            for (cmd, chapter) in &entry.chapters {
                let _ = writeln!(
                    page,
                    "    <section><a href=\"{}#c{}\">{}</a></section>",
                    entry.file, cmd, chapter
                );
            }
        }

        page.push_str("</body>\n</html>\n");
        page
    }

    pub fn write(&self, out_dir: &Path) -> Result<()> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
        let path = out_dir.join("index.html");
        fs::write(&path, self.html())
            .with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_with_chapter_anchors() {
        let mut index = Index::new("Git Training");
        index.add_file("day1.html", "Day one");
        index.add_chapters(
            "day1.html",
            BTreeMap::from([(3, "Branching".to_string())]),
        );

        let html = index.html();
        assert!(html.contains("<a href=\"day1.html\">Day one</a>"));
        assert!(html.contains("<a href=\"day1.html#c3\">Branching</a>"));
    }
}
