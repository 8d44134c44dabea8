//! Translatable message extraction from templates.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::BuildError;
use crate::i18n::{Message, write_catalog};

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(_|gettext|ngettext)\(\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')(?:\s*,\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'))?"#,
    )
    .expect("valid regex")
});

/// Collect messages from every template under `layouts_dir`.
///
/// Occurrences of the same message are merged; messages keep the order in
/// which they were first seen, templates being visited in sorted order.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked or a template read.
pub fn extract_messages(layouts_dir: &Path) -> Result<Vec<Message>, BuildError> {
    let mut templates = Vec::new();
    collect_templates(layouts_dir, &mut templates)?;
    templates.sort();

    let mut messages: Vec<Message> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for path in templates {
        let source = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let name = relative_name(layouts_dir, &path);
        for (line, id, plural) in scan_source(&source) {
            let reference = format!("{name}:{line}");
            match index.get(&id) {
                Some(&i) => {
                    let message = &mut messages[i];
                    if message.plural.is_none() {
                        message.plural = plural;
                    }
                    message.references.push(reference);
                }
                None => {
                    index.insert(id.clone(), messages.len());
                    messages.push(Message {
                        id,
                        plural,
                        references: vec![reference],
                    });
                }
            }
        }
    }
    tracing::debug!(count = messages.len(), "Extracted messages");
    Ok(messages)
}

/// Extract messages and write them as a PO file at `output`.
///
/// # Errors
///
/// Returns an error if extraction fails or the file cannot be written.
pub fn write_messages(layouts_dir: &Path, output: &Path) -> Result<usize, BuildError> {
    let messages = extract_messages(layouts_dir)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(output, write_catalog(&messages)).map_err(|e| BuildError::io(output, e))?;
    Ok(messages.len())
}

/// Find translation calls in one template: `(line, msgid, plural)`.
fn scan_source(source: &str) -> Vec<(usize, String, Option<String>)> {
    CALL_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let line = source[..whole.start()].matches('\n').count() + 1;
            let id = unquote_literal(caps.get(2)?.as_str());
            let plural = if &caps[1] == "ngettext" {
                caps.get(3).map(|m| unquote_literal(m.as_str()))
            } else {
                None
            };
            Some((line, id, plural))
        })
        .collect()
}

/// Strip the quotes of a template string literal and resolve its escapes.
fn unquote_literal(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn collect_templates(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    let entries = fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_templates(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_scan_source_finds_calls() {
        let source = "<h1>{{ _(\"Hello\") }}</h1>\n\
                      <p>{{ gettext('World') }}</p>\n\
                      <p>{{ ngettext(\"post\", \"posts\", n) }}</p>\n\
                      {{ my_(\"no\") }}";

        let found = scan_source(source);

        assert_eq!(
            found,
            vec![
                (1, "Hello".to_owned(), None),
                (2, "World".to_owned(), None),
                (3, "post".to_owned(), Some("posts".to_owned())),
            ]
        );
    }

    #[test]
    fn test_scan_source_unescapes() {
        let found = scan_source(r#"{{ _("Say \"hi\"") }}"#);
        assert_eq!(found, vec![(1, "Say \"hi\"".to_owned(), None)]);
    }

    #[test]
    fn test_extract_merges_references() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("partials")).unwrap();
        fs::write(temp.path().join("default.html"), "{{ _('Home') }}\n{{ _('About') }}").unwrap();
        fs::write(temp.path().join("partials/nav.html"), "\n\n{{ _('Home') }}").unwrap();
        fs::write(temp.path().join(".default.html.swp"), "{{ _('Ignored') }}").unwrap();

        let messages = extract_messages(temp.path()).unwrap();

        assert_eq!(
            messages,
            vec![
                Message {
                    id: "Home".to_owned(),
                    plural: None,
                    references: vec!["default.html:1".to_owned(), "partials/nav.html:3".to_owned()],
                },
                Message {
                    id: "About".to_owned(),
                    plural: None,
                    references: vec!["default.html:2".to_owned()],
                },
            ]
        );
    }

    #[test]
    fn test_write_messages_creates_parent() {
        let temp = tempfile::tempdir().unwrap();
        let layouts = temp.path().join("layouts");
        fs::create_dir(&layouts).unwrap();
        fs::write(layouts.join("default.html"), "{{ _('Hello') }}").unwrap();
        let output = temp.path().join("translations/messages.po");

        let count = write_messages(&layouts, &output).unwrap();

        assert_eq!(count, 1);
        let po = fs::read_to_string(output).unwrap();
        assert!(po.contains("#: default.html:1\nmsgid \"Hello\"\nmsgstr \"Hello\"\n"));
    }

    #[test]
    fn test_missing_layouts_dir_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract_messages(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}
