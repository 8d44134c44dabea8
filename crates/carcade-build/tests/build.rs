//! End-to-end builds over temporary projects.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use carcade_build::{BUILD_DIR_PREFIX, BuildConfig, BuildError, SiteBuilder};
use carcade_config::Config;
use pretty_assertions::assert_eq;

const BLOG_CONFIG: &str = r#"
[[ordering]]
pattern = "blog/*"
order = "alphabetically"

[[pagination]]
pattern = "blog/*"
per_page = 2
"#;

struct Project {
    temp: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            temp: tempfile::tempdir().unwrap(),
        };
        project.write("layouts/default.html", "{{ NAME }}:{{ PATH }}");
        project
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn dir(&self, relative: &str) {
        fs::create_dir_all(self.root().join(relative)).unwrap();
    }

    fn builder(&self, toml: &str) -> SiteBuilder {
        let config = Config::from_toml_str(toml, self.root()).unwrap();
        SiteBuilder::new(BuildConfig::from_config(&config).unwrap())
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }
}

fn blog_project() -> Project {
    let project = Project::new();
    for name in ["e", "a", "g", "c", "b", "f", "d"] {
        project.dir(&format!("pages/blog/{name}"));
    }
    project.dir("pages/about");
    project
}

/// Relative file paths and contents under `dir`.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).unwrap().to_path_buf();
                out.insert(relative, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}

#[test]
fn test_build_writes_page_per_url() {
    let project = blog_project();
    let output = project.root().join("www");

    let report = project.builder(BLOG_CONFIG).build(&output).unwrap();

    let files: Vec<String> = snapshot(&output)
        .into_keys()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(
        files,
        vec![
            "about/index.html",
            "blog/a/index.html",
            "blog/b/index.html",
            "blog/c/index.html",
            "blog/d/index.html",
            "blog/e/index.html",
            "blog/f/index.html",
            "blog/g/index.html",
            "blog/index.html",
            "blog/page2/index.html",
            "blog/page3/index.html",
            "blog/page4/index.html",
        ]
    );
    assert!(!output.join("index.html").exists());
    assert_eq!(project.read("www/blog/c/index.html"), "c:blog/page2/c");
    assert_eq!(report.passes, 1);
    assert_eq!(report.written, 12);
    // `blog` and `blog/page1` share a URL; page1 is rendered first.
    assert_eq!(report.skipped, 1);
    assert_eq!(project.read("www/blog/index.html"), "page1:blog/page1");
}

#[test]
fn test_build_is_idempotent() {
    let project = blog_project();
    project.write("pages/about/body.md", "# About\n\nText.");
    project.write("static/site.css", "body {}");
    let builder = project.builder(BLOG_CONFIG);

    builder.build(&project.root().join("one")).unwrap();
    builder.build(&project.root().join("two")).unwrap();
    let first = snapshot(&project.root().join("one"));
    builder.build(&project.root().join("one")).unwrap();

    assert_eq!(first, snapshot(&project.root().join("two")));
    assert_eq!(first, snapshot(&project.root().join("one")));
}

#[test]
fn test_build_replaces_stale_output() {
    let project = blog_project();
    project.write("www/stale.html", "old");

    project.builder(BLOG_CONFIG).build(&project.root().join("www")).unwrap();

    assert!(!project.root().join("www/stale.html").exists());
    assert!(project.root().join("www/about/index.html").exists());
}

#[test]
fn test_render_failure_removes_build_dir() {
    let project = blog_project();
    project.write("layouts/broken.html", "{{ url_for('no/such/page') }}");
    let toml = format!("{BLOG_CONFIG}\n[[layouts]]\npattern = \"blog/*\"\ntemplate = \"broken.html\"\n");
    let output = project.root().join("www");

    let err = project.builder(&toml).build(&output).unwrap_err();

    assert!(matches!(err, BuildError::Template(_)));
    assert!(!output.exists());
}

#[test]
fn test_layouts_match_listing_and_post_paths() {
    let project = blog_project();
    project.write("layouts/list.html", "list:{{ PATH }}");
    project.write("layouts/post.html", "post:{{ PATH }}");
    let toml = format!(
        "{BLOG_CONFIG}\n[[layouts]]\npattern = \"blog\"\ntemplate = \"list.html\"\n\n[[layouts]]\npattern = \"blog/*\"\ntemplate = \"post.html\"\n"
    );

    project.builder(&toml).build(&project.root().join("www")).unwrap();

    assert_eq!(project.read("www/blog/index.html"), "list:blog/page1");
    assert_eq!(project.read("www/blog/page3/index.html"), "list:blog/page3");
    assert_eq!(project.read("www/blog/e/index.html"), "post:blog/page3/e");
    assert_eq!(project.read("www/about/index.html"), "about:about");
}

#[test]
fn test_existing_target_is_kept() {
    let project = blog_project();
    project.write("static/about/index.html", "<p>hand-written</p>");

    let report = project.builder(BLOG_CONFIG).build(&project.root().join("www")).unwrap();

    assert_eq!(project.read("www/about/index.html"), "<p>hand-written</p>");
    assert_eq!(report.written, 11);
    assert_eq!(report.skipped, 2);
}

#[test]
fn test_refuses_output_holding_sources() {
    let project = blog_project();
    project.write("pages/about/body.md", "# About");
    let builder = project.builder(BLOG_CONFIG);

    for target in [project.root().to_path_buf(), project.root().join("pages")] {
        let err = builder.build(&target).unwrap_err();
        assert!(matches!(err, BuildError::UnsafeOutput { .. }), "{err}");
        let err = builder.build_atomically(&target).unwrap_err();
        assert!(matches!(err, BuildError::UnsafeOutput { .. }), "{err}");
    }

    assert_eq!(project.read("pages/about/body.md"), "# About");
    assert!(project.root().join("layouts/default.html").is_file());
    assert!(project.root().join("pages/blog/a").is_dir());
}

#[test]
fn test_missing_layout_removes_build_dir() {
    let project = blog_project();
    fs::remove_file(project.root().join("layouts/default.html")).unwrap();
    let output = project.root().join("www");

    let err = project.builder("").build(&output).unwrap_err();

    assert!(matches!(err, BuildError::Template(_)));
    assert!(!output.exists());
}

#[test]
fn test_missing_pages_dir_fails() {
    let project = Project::new();
    let output = project.root().join("www");

    let err = project.builder("").build(&output).unwrap_err();

    assert!(matches!(err, BuildError::Site(_)));
    assert!(!output.exists());
}

#[test]
fn test_multi_language_build() {
    let project = Project::new();
    project.write("layouts/default.html", "{{ LANGUAGE }}|{{ title }}|{{ _('Home') }}|{{ url_for('about') }}");
    project.write("pages/about/title.md", "About");
    project.write("pages/about/title.ru.md", "O nas");
    project.write(
        "translations/ru.po",
        "msgid \"Home\"\nmsgstr \"Glavnaya\"\n",
    );
    let toml = "[site]\nlanguages = [\"en\", \"ru\"]\n";

    let report = project.builder(toml).build(&project.root().join("www")).unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(
        project.read("www/about/index.html"),
        "en|<p>About</p>\n|Home|/about/"
    );
    assert_eq!(
        project.read("www/ru/about/index.html"),
        "ru|<p>O nas</p>\n|Glavnaya|/ru/about/"
    );
}

#[test]
fn test_home_renders_at_site_root() {
    let project = Project::new();
    project.dir("pages/index");
    project.dir("pages/about");
    let toml = "[site]\nhome = \"index\"\n";

    project.builder(toml).build(&project.root().join("www")).unwrap();

    assert_eq!(project.read("www/index.html"), "index:index");
    assert_eq!(project.read("www/about/index.html"), "about:about");
}

#[test]
fn test_static_files_and_bundles() {
    let project = Project::new();
    project.dir("pages/about");
    project.write("layouts/default.html", "{{ asset_url('styles') }}");
    project.write("static/robots.txt", "User-agent: *");
    project.write("static/css/a.css", "a {}\n");
    project.write("static/css/b.css", "b {}\n");
    let toml = "[bundles.styles]\noutput = \"gen/all.css\"\ninputs = [\"css/a.css\", \"css/b.css\"]\n";

    project.builder(toml).build(&project.root().join("www")).unwrap();

    assert_eq!(project.read("www/robots.txt"), "User-agent: *");
    assert_eq!(project.read("www/gen/all.css"), "a {}\nb {}\n");
    assert_eq!(project.read("www/about/index.html"), "/gen/all.css");
}

#[cfg(unix)]
#[test]
fn test_atomic_build_swaps_symlink() {
    let project = blog_project();
    let output = project.root().join("www");
    let builder = project.builder(BLOG_CONFIG);

    builder.build_atomically(&output).unwrap();
    let first_target = fs::read_link(&output).unwrap();
    builder.build_atomically(&output).unwrap();
    let second_target = fs::read_link(&output).unwrap();

    assert_ne!(first_target, second_target);
    assert!(!project.root().join(&first_target).exists());
    assert_eq!(project.read("www/about/index.html"), "about:about");

    let build_dirs: Vec<_> = fs::read_dir(project.root())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(BUILD_DIR_PREFIX))
        .collect();
    assert_eq!(build_dirs.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_failed_atomic_build_keeps_previous() {
    let project = blog_project();
    let output = project.root().join("www");
    project.builder(BLOG_CONFIG).build_atomically(&output).unwrap();
    let published = fs::read_link(&output).unwrap();

    project.write("layouts/default.html", "{{ url_for('missing') }}");
    let err = project.builder(BLOG_CONFIG).build_atomically(&output).unwrap_err();

    assert!(matches!(err, BuildError::Template(_)));
    assert_eq!(fs::read_link(&output).unwrap(), published);
    assert_eq!(project.read("www/about/index.html"), "about:about");
    let build_dirs = fs::read_dir(project.root())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(BUILD_DIR_PREFIX))
        .count();
    assert_eq!(build_dirs, 1);
}

#[cfg(unix)]
#[test]
fn test_atomic_build_replaces_real_directory() {
    let project = blog_project();
    project.write("www/old.html", "old");
    let output = project.root().join("www");

    project.builder(BLOG_CONFIG).build_atomically(&output).unwrap();

    assert!(fs::symlink_metadata(&output).unwrap().file_type().is_symlink());
    assert!(!output.join("old.html").exists());
}
