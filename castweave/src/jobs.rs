//! Job-list processing: one JSON file describing a batch of conversions.
//!
//! Besides the per-file options, the list carries side tables keyed by
//! file id: `<id>-chapters` (headings by command index), `<id>-suppress`
//! (command indices to drop) and `<id>-hopto` (cross-transcript links).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::info;
use serde::Deserialize;
use serde_json::Value;

use castweave_html::{DocumentConfig, HopLinks, Palette};
use castweave_rec::align;

use crate::convert::{InputFormat, convert_file};
use crate::index::Index;

#[derive(Debug, Deserialize)]
struct JobList {
    title: Option<String>,
    base_dir_in: Option<String>,
    base_dir_out: Option<String>,
    #[serde(default)]
    files: Vec<JobEntry>,
    /// Side tables: `<id>-chapters`, `<id>-suppress`, `<id>-hopto`.
    #[serde(flatten)]
    side_tables: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct JobEntry {
    #[serde(rename = "in")]
    input: String,
    out: Option<String>,
    format: Option<String>,
    palette: Option<String>,
    title: Option<String>,
    review: Option<bool>,
    id: Option<String>,
    /// Id of the parallel recording used to derive review-mode hops.
    ahopto: Option<String>,
}

impl JobEntry {
    fn out_name(&self) -> String {
        match &self.out {
            Some(out) => out.clone(),
            None => {
                let path = Path::new(&self.input);
                path.with_extension("html").to_string_lossy().into_owned()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct HoptoSpec {
    id: String,
    #[serde(default)]
    hops: Vec<u32>,
    #[serde(default)]
    pre: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    post: String,
    #[serde(default)]
    rev_hops: Vec<(f64, f64)>,
}

/// Process a job list file: convert every entry and generate the index.
pub fn process_list(
    list_path: &Path,
    review_default: bool,
    palette_default: &str,
) -> Result<()> {
    let file = File::open(list_path)
        .with_context(|| format!("opening {}", list_path.display()))?;
    let list: JobList = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("reading {}", list_path.display()))?;

    let list_dir = list_path.parent().unwrap_or(Path::new("."));
    let base_in = resolve_dir(list_dir, list.base_dir_in.as_deref());
    let base_out = resolve_dir(list_dir, list.base_dir_out.as_deref());

    // Output names by id, for hop link targets.
    let out_by_id: HashMap<String, String> = list
        .files
        .iter()
        .filter_map(|f| f.id.clone().map(|id| (id, f.out_name())))
        .collect();
    let in_by_id: HashMap<String, String> = list
        .files
        .iter()
        .filter_map(|f| f.id.clone().map(|id| (id, f.input.clone())))
        .collect();

    let index_title = list.title.clone().unwrap_or_else(|| "Sessions".into());
    let mut index = Index::new(index_title);

    for entry in &list.files {
        let in_file = base_in.join(&entry.input);
        let out_name = entry.out_name();
        let out_file = base_out.join(&out_name);

        let format = match entry.format.as_deref() {
            None => InputFormat::Terminal,
            Some(name) => InputFormat::from_name(name).ok_or_else(|| {
                anyhow!(
                    "unsupported input format {name:?} for file {:?}",
                    entry.input
                )
            })?,
        };

        let palette_name =
            entry.palette.as_deref().unwrap_or(palette_default);
        let palette = Palette::from_name(palette_name)
            .with_context(|| format!("unknown palette {palette_name:?}"))?;

        let review = entry.review.unwrap_or(review_default);
        let title = entry.title.clone().unwrap_or_else(|| out_name.clone());

        index.add_file(&out_name, &title);

        let mut config = DocumentConfig {
            palette,
            review,
            title: Some(title.clone()),
            ..DocumentConfig::default()
        };

        if let Some(id) = &entry.id {
            if let Some(chapters) = side_table(&list, id, "chapters") {
                let chapters: BTreeMap<u32, String> =
                    parse_chapters(&chapters)?;
                index.add_chapters(&out_name, chapters.clone());
                config.chapters = chapters;
            }
            if let Some(suppress) = side_table(&list, id, "suppress") {
                config.suppress =
                    serde_json::from_value::<BTreeSet<u32>>(suppress)
                        .context("reading suppress table")?;
            }
            if let Some(hopto) = side_table(&list, id, "hopto") {
                let spec: HoptoSpec = serde_json::from_value(hopto)
                    .context("reading hopto table")?;
                config.hopto = Some(build_hop_links(spec, &out_by_id)?);
            }

            if review {
                if let Some(other) = &entry.ahopto {
                    let other_in = in_by_id.get(other).ok_or_else(|| {
                        anyhow!("ahopto references unknown id {other:?}")
                    })?;
                    let rev_hops =
                        derive_rev_hops(&in_file, &base_in.join(other_in))?;
                    config
                        .hopto
                        .get_or_insert_with(HopLinks::default)
                        .rev_hops = rev_hops;
                }
            }
        }

        info!(
            "processing {} -> {} as {:?}",
            in_file.display(),
            out_file.display(),
            title
        );
        println!("Process");
        println!("    {}", in_file.display());
        println!(" -> {}", out_file.display());

        convert_file(&in_file, Some(&out_file), format, config)?;
    }

    println!("Generating index file");
    index.write(&base_out)
}

fn resolve_dir(list_dir: &Path, configured: Option<&str>) -> PathBuf {
    match configured {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => list_dir.join(dir),
        None => list_dir.to_path_buf(),
    }
}

fn side_table(list: &JobList, id: &str, suffix: &str) -> Option<Value> {
    list.side_tables.get(&format!("{id}-{suffix}")).cloned()
}

fn parse_chapters(value: &Value) -> Result<BTreeMap<u32, String>> {
    let map = value
        .as_object()
        .ok_or_else(|| anyhow!("chapters table must be an object"))?;
    let mut chapters = BTreeMap::new();
    for (key, title) in map {
        let cmd: u32 = key
            .parse()
            .with_context(|| format!("chapter key {key:?}"))?;
        let title = title
            .as_str()
            .ok_or_else(|| anyhow!("chapter title for {key:?} must be a string"))?;
        chapters.insert(cmd, title.to_string());
    }
    Ok(chapters)
}

fn build_hop_links(
    spec: HoptoSpec,
    out_by_id: &HashMap<String, String>,
) -> Result<HopLinks> {
    let Some(target_file) = out_by_id.get(&spec.id) else {
        bail!("hopto references unknown id {:?}", spec.id);
    };
    Ok(HopLinks {
        id: spec.id,
        target_file: target_file.clone(),
        hops: spec.hops.into_iter().collect(),
        pre: spec.pre,
        to: spec.to,
        post: spec.post,
        rev_hops: spec.rev_hops,
    })
}

/// Align the entry's recording with its parallel capture and keep the
/// hops seen from this side.
fn derive_rev_hops(in_file: &Path, other: &Path) -> Result<Vec<(f64, f64)>> {
    let left = BufReader::new(
        File::open(in_file)
            .with_context(|| format!("opening {}", in_file.display()))?,
    );
    let right = BufReader::new(
        File::open(other)
            .with_context(|| format!("opening {}", other.display()))?,
    );
    let hops = align(left, right)
        .with_context(|| format!("aligning {}", in_file.display()))?;
    Ok(hops.hops_from_left)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_out_name_defaults_to_html_extension() {
        let entry: JobEntry = serde_json::from_value(serde_json::json!({
            "in": "sessions/day1.cast"
        }))
        .unwrap();
        assert_eq!(entry.out_name(), "sessions/day1.html");
    }

    #[test]
    fn job_list_with_side_tables_deserializes() {
        let list: JobList = serde_json::from_str(
            r#"{
                "title": "Training",
                "base_dir_out": "html",
                "files": [
                    {"in": "a.cast", "format": "asciinema", "id": "a"},
                    {"in": "b.log", "id": "b", "out": "b.html"}
                ],
                "a-chapters": {"2": "Setup"},
                "a-suppress": [4, 7],
                "a-hopto": {"id": "b", "hops": [3], "pre": "see ",
                            "to": "the other side", "post": ""}
            }"#,
        )
        .unwrap();

        assert_eq!(list.files.len(), 2);
        let chapters =
            parse_chapters(&side_table(&list, "a", "chapters").unwrap())
                .unwrap();
        assert_eq!(chapters.get(&2).map(String::as_str), Some("Setup"));

        let suppress: BTreeSet<u32> = serde_json::from_value(
            side_table(&list, "a", "suppress").unwrap(),
        )
        .unwrap();
        assert!(suppress.contains(&4));

        let spec: HoptoSpec =
            serde_json::from_value(side_table(&list, "a", "hopto").unwrap())
                .unwrap();
        let out_by_id = HashMap::from([
            ("a".to_string(), "a.html".to_string()),
            ("b".to_string(), "b.html".to_string()),
        ]);
        let links = build_hop_links(spec, &out_by_id).unwrap();
        assert_eq!(links.target_file, "b.html");
        assert!(links.hops.contains(&3));
    }
}
