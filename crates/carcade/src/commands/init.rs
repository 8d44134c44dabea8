//! `carcade init` command implementation.
//!
//! Writes a small working project: two pages, one layout, a stylesheet
//! bundle, and an empty translations directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::CliError;
use crate::output::Output;

const CONFIG: &str = r#"[site]
home = "index"

[[ordering]]
pattern = "*"
order = ["index", "about"]

# Layout rules match node paths without pagination segments:
# "blog" selects every listing page of blog, "blog/*" every post.
# [[layouts]]
# pattern = "blog/*"
# template = "post.html"

[bundles.css]
output = "site.css"
inputs = ["style.css"]
"#;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="{{ LANGUAGE or 'en' }}">
<head>
  <meta charset="utf-8">
  <title>{{ title }}</title>
  <link rel="stylesheet" href="{{ asset_url('css') }}">
</head>
<body>
  <nav>
    {% for item in ROOT.CHILDREN %}<a href="{{ url_for(item.PATH) }}">{{ item.title }}</a>
    {% endfor %}
  </nav>
  <main>
    {{ body }}
  </main>
  <footer>{{ _("Built with Carcade") }}</footer>
</body>
</html>
"#;

const STYLE: &str = "body {
  font-family: sans-serif;
  margin: 2rem auto;
  max-width: 40rem;
}
";

/// Files created by `init`, relative to the project directory.
const SKELETON: &[(&str, &str)] = &[
    ("carcade.toml", CONFIG),
    ("layouts/default.html", LAYOUT),
    ("pages/index/meta.yaml", "title: Home\n"),
    ("pages/index/body.md", "# Welcome\n\nEdit `pages/index/body.md` to change this page.\n"),
    ("pages/about/meta.yaml", "title: About\n"),
    ("pages/about/body.md", "# About\n\nEvery directory under `pages/` is a page.\n"),
    ("static/style.css", STYLE),
];

/// Arguments for the init command.
#[derive(Args)]
pub(crate) struct InitArgs {
    /// Directory to create.
    name: PathBuf,
}

impl InitArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        scaffold(&self.name)?;
        output.success(&format!("Created project in {}", self.name.display()));
        output.info(&format!(
            "Run `carcade runserver` inside {} to preview it.",
            self.name.display()
        ));
        Ok(())
    }
}

fn scaffold(root: &Path) -> Result<(), CliError> {
    if root.exists() {
        return Err(CliError::Validation(format!(
            "{} already exists",
            root.display()
        )));
    }

    for (relative, content) in SKELETON {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
    }
    fs::create_dir_all(root.join("translations"))?;
    tracing::debug!(root = %root.display(), "Project scaffolded");
    Ok(())
}
