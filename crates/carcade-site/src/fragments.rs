//! Content fragments: per-directory Markdown and YAML files.
//!
//! A directory may hold `name.md` / `name.LANG.md` (rendered to HTML and
//! stored under `name`) and `name.yaml` / `name.LANG.yaml` (mappings merged
//! into the context). Language-neutral files are read before language files
//! of the same kind, Markdown before YAML, so later sources win on key
//! collisions.

use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Options, Parser, html};
use serde_json::Value;

use crate::context::Context;
use crate::error::SiteError;

/// Reads the content fragments of one directory.
pub trait FragmentSource {
    /// Read fragments from `dir` for the given language.
    ///
    /// Files targeting other languages are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a fragment cannot be read or parsed.
    fn read(&self, dir: &Path, language: Option<&str>) -> Result<Context, SiteError>;
}

/// Filesystem-backed [`FragmentSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFragments;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Markdown,
    Yaml,
}

struct FragmentFile {
    path: PathBuf,
    key: String,
    kind: FragmentKind,
    language: Option<String>,
}

impl FragmentFile {
    /// Classify a file name like `body.md` or `body.en.yaml`.
    fn parse(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('.') {
            return None;
        }
        let segments: Vec<&str> = file_name.split('.').collect();
        let kind = match *segments.last()? {
            "md" => FragmentKind::Markdown,
            "yaml" => FragmentKind::Yaml,
            _ => return None,
        };
        let language = match segments.len() {
            0..=1 => return None,
            2 => None,
            n => Some(segments[n - 2].to_owned()),
        };
        let key = segments[0].to_owned();
        Some(Self {
            path,
            key,
            kind,
            language,
        })
    }

    /// Sort rank within a directory, or `None` when the file is skipped.
    fn rank(&self, language: Option<&str>) -> Option<u8> {
        let localized = match (&self.language, language) {
            (None, _) => false,
            (Some(own), Some(wanted)) if own == wanted => true,
            _ => return None,
        };
        Some(match (self.kind, localized) {
            (FragmentKind::Markdown, false) => 0,
            (FragmentKind::Markdown, true) => 1,
            (FragmentKind::Yaml, false) => 2,
            (FragmentKind::Yaml, true) => 3,
        })
    }
}

impl FragmentSource for FsFragments {
    fn read(&self, dir: &Path, language: Option<&str>) -> Result<Context, SiteError> {
        let entries = fs::read_dir(dir).map_err(|e| SiteError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SiteError::io(dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(file) = FragmentFile::parse(path)
                && let Some(rank) = file.rank(language)
            {
                files.push((rank, file));
            }
        }
        files.sort_by(|(a_rank, a), (b_rank, b)| a_rank.cmp(b_rank).then_with(|| a.path.cmp(&b.path)));

        let mut context = Context::new();
        for (_, file) in files {
            let content = fs::read_to_string(&file.path).map_err(|e| SiteError::io(&file.path, e))?;
            match file.kind {
                FragmentKind::Markdown => {
                    context.insert(file.key, Value::String(render_markdown(&content)));
                }
                FragmentKind::Yaml => {
                    if let Some(mapping) = parse_yaml(&file.path, &content)? {
                        context.extend(mapping);
                    }
                }
            }
        }
        Ok(context)
    }
}

/// Render Markdown to HTML with tables, footnotes and strikethrough.
#[must_use]
pub fn render_markdown(source: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Parse a YAML fragment into a mapping.
///
/// Returns `None` for empty or null documents.
fn parse_yaml(path: &Path, content: &str) -> Result<Option<Context>, SiteError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(trimmed).map_err(|e| SiteError::Fragment {
        path: path.to_path_buf(),
        message: format!("Invalid YAML: {e}"),
    })?;
    match value {
        Value::Null => Ok(None),
        Value::Object(mapping) => Ok(Some(mapping)),
        other => Err(SiteError::Fragment {
            path: path.to_path_buf(),
            message: format!("expected a mapping, found {other}"),
        }),
    }
}
