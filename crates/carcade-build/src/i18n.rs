//! Gettext PO catalogs.
//!
//! Only what the renderer needs is read: `msgid`, `msgid_plural`, `msgstr`
//! and `msgstr[N]`, including multi-line strings and the usual escapes.
//! Comments and `msgctxt` are skipped, entries flagged `fuzzy` are dropped,
//! and the header entry (empty msgid) is ignored. An empty translation
//! counts as untranslated.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Translations for one language.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    singular: HashMap<String, String>,
    plural: HashMap<String, Vec<String>>,
}

impl Catalog {
    /// Empty catalog; every lookup falls through to the source string.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Load `<dir>/<language>.po`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: &Path, language: &str) -> Result<Option<Self>, BuildError> {
        let path = catalog_path(dir, language);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        Self::parse(&content)
            .map(Some)
            .map_err(|(line, message)| BuildError::Catalog {
                path,
                line,
                message,
            })
    }

    /// Parse PO source. Errors carry the 1-based line number.
    pub(crate) fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut catalog = Self::default();
        let mut entry = Entry::default();
        let mut field: Option<Field> = None;

        for (number, raw) in content.lines().enumerate() {
            let line_no = number + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if comment.starts_with(',') && comment.contains("fuzzy") {
                    catalog.commit(std::mem::take(&mut entry));
                    entry.fuzzy = true;
                    field = None;
                }
                continue;
            }
            if line.starts_with('"') {
                let text = unquote(line).map_err(|e| (line_no, e))?;
                match field {
                    Some(Field::Id) => entry.id.push_str(&text),
                    Some(Field::IdPlural) => entry.id_plural.get_or_insert_default().push_str(&text),
                    Some(Field::Str(index)) => entry.str_at(index).push_str(&text),
                    Some(Field::Context) => {}
                    None => return Err((line_no, "continuation line without keyword".to_owned())),
                }
                continue;
            }

            let (keyword, rest) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| (line_no, format!("unexpected line: {line}")))?;
            let text = unquote(rest.trim()).map_err(|e| (line_no, e))?;
            match keyword {
                "msgctxt" => {
                    if entry.has_id {
                        catalog.commit(std::mem::take(&mut entry));
                    }
                    field = Some(Field::Context);
                }
                "msgid" => {
                    if entry.has_id {
                        catalog.commit(std::mem::take(&mut entry));
                    }
                    entry.has_id = true;
                    entry.id = text;
                    field = Some(Field::Id);
                }
                "msgid_plural" => {
                    entry.id_plural = Some(text);
                    field = Some(Field::IdPlural);
                }
                "msgstr" => {
                    *entry.str_at(0) = text;
                    field = Some(Field::Str(0));
                }
                other => {
                    let index = other
                        .strip_prefix("msgstr[")
                        .and_then(|s| s.strip_suffix(']'))
                        .and_then(|s| s.parse::<usize>().ok())
                        .ok_or_else(|| (line_no, format!("unknown keyword: {other}")))?;
                    *entry.str_at(index) = text;
                    field = Some(Field::Str(index));
                }
            }
        }
        catalog.commit(entry);
        Ok(catalog)
    }

    fn commit(&mut self, entry: Entry) {
        if !entry.has_id || entry.fuzzy || entry.id.is_empty() {
            return;
        }
        if entry.id_plural.is_some() {
            if entry.strs.iter().all(|s| !s.is_empty()) && !entry.strs.is_empty() {
                self.plural.insert(entry.id, entry.strs);
            }
        } else if let Some(translated) = entry.strs.into_iter().next()
            && !translated.is_empty()
        {
            self.singular.insert(entry.id, translated);
        }
    }

    /// Translate a message, or return it unchanged.
    #[must_use]
    pub fn gettext<'a>(&'a self, message: &'a str) -> &'a str {
        self.singular.get(message).map_or(message, String::as_str)
    }

    /// Translate a message with a plural form.
    ///
    /// Uses form 0 for `n == 1` and form 1 otherwise.
    #[must_use]
    pub fn ngettext<'a>(&'a self, singular: &'a str, plural: &'a str, n: i64) -> &'a str {
        let index = usize::from(n != 1);
        match self.plural.get(singular) {
            Some(forms) => forms
                .get(index)
                .or_else(|| forms.last())
                .map_or(singular, String::as_str),
            None if n == 1 => singular,
            None => plural,
        }
    }

    /// Number of translated messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.singular.len() + self.plural.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Conventional catalog location for a language.
#[must_use]
pub fn catalog_path(dir: &Path, language: &str) -> PathBuf {
    dir.join(format!("{language}.po"))
}

#[derive(Clone, Copy)]
enum Field {
    Context,
    Id,
    IdPlural,
    Str(usize),
}

#[derive(Default)]
struct Entry {
    has_id: bool,
    fuzzy: bool,
    id: String,
    id_plural: Option<String>,
    strs: Vec<String>,
}

impl Entry {
    fn str_at(&mut self, index: usize) -> &mut String {
        if self.strs.len() <= index {
            self.strs.resize_with(index + 1, String::new);
        }
        &mut self.strs[index]
    }
}

fn unquote(text: &str) -> Result<String, String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("expected a quoted string, found {text}"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(format!("unknown escape: \\{other}")),
            None => return Err("dangling backslash".to_owned()),
        }
    }
    Ok(out)
}

/// Quote a string for PO output.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// One message found in the templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub plural: Option<String>,
    /// `file:line` references.
    pub references: Vec<String>,
}

/// Serialize messages as a PO template where each translation equals its source.
#[must_use]
pub fn write_catalog(messages: &[Message]) -> String {
    let mut out = String::from(
        "msgid \"\"\nmsgstr \"\"\n\"Content-Type: text/plain; charset=UTF-8\\n\"\n",
    );
    for message in messages {
        out.push('\n');
        for reference in &message.references {
            let _ = writeln!(out, "#: {reference}");
        }
        let _ = writeln!(out, "msgid {}", quote(&message.id));
        match &message.plural {
            Some(plural) => {
                let _ = writeln!(out, "msgid_plural {}", quote(plural));
                let _ = writeln!(out, "msgstr[0] {}", quote(&message.id));
                let _ = writeln!(out, "msgstr[1] {}", quote(plural));
            }
            None => {
                let _ = writeln!(out, "msgstr {}", quote(&message.id));
            }
        }
    }
    out
}
