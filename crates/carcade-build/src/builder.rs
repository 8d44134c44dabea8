//! Multi-language static site builder.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use carcade_config::{BundleConfig, Config};
use carcade_site::{
    FragmentSource, FsFragments, OrderingDirective, PatternRules, SiteError, SiteRules,
    UrlResolver, build_site_tree, page_size,
};

use crate::assets;
use crate::error::BuildError;
use crate::i18n::Catalog;
use crate::publish;
use crate::template::{self, TemplateGlobals};

/// File written for every page.
pub const INDEX_FILE: &str = "index.html";

/// Everything the builder reads, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; never used as a build target.
    pub project_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub layouts_dir: PathBuf,
    pub static_dir: PathBuf,
    pub translations_dir: PathBuf,
    /// One render pass per entry; `None` renders without a language.
    pub languages: Vec<Option<String>>,
    pub rules: SiteRules,
    /// Node path pattern to template name, matched against
    /// [`SiteTree::content_path`](carcade_site::SiteTree::content_path).
    pub layouts: PatternRules<String>,
    pub default_layout: String,
    pub resolver: UrlResolver,
    pub bundles: BTreeMap<String, BundleConfig>,
}

impl BuildConfig {
    /// Convert loaded configuration, compiling rule patterns.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid patterns, unknown ordering directives or
    /// zero page sizes.
    pub fn from_config(config: &Config) -> Result<Self, SiteError> {
        let mut rules = SiteRules {
            page_name: config.site.page_name.clone(),
            ..SiteRules::default()
        };
        for rule in &config.ordering {
            let directive = OrderingDirective::from_value(&rule.pattern, &rule.order)?;
            rules.ordering.push(&rule.pattern, directive)?;
        }
        for rule in &config.pagination {
            rules
                .pagination
                .push(&rule.pattern, page_size(&rule.pattern, rule.per_page)?)?;
        }
        let mut layouts = PatternRules::new();
        for rule in &config.layouts {
            layouts.push(&rule.pattern, rule.template.clone())?;
        }

        let paths = &config.paths_resolved;
        Ok(Self {
            project_dir: paths.project_dir.clone(),
            pages_dir: paths.pages_dir.clone(),
            layouts_dir: paths.layouts_dir.clone(),
            static_dir: paths.static_dir.clone(),
            translations_dir: paths.translations_dir.clone(),
            languages: config.build_languages(),
            rules,
            layouts,
            default_layout: config.site.default_layout.clone(),
            resolver: UrlResolver::new(
                config.default_language().map(str::to_owned),
                config.site.home.clone(),
            ),
            bundles: config.bundles.clone(),
        })
    }
}

/// Outcome of a successful build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages rendered and written.
    pub written: usize,
    /// Pages skipped because their target file already existed.
    pub skipped: usize,
    /// Language passes run.
    pub passes: usize,
}

/// Renders a content tree into a directory of `index.html` files.
pub struct SiteBuilder {
    config: BuildConfig,
    fragments: Box<dyn FragmentSource + Send + Sync>,
}

impl SiteBuilder {
    /// Create a builder reading fragments from the filesystem.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            fragments: Box::new(FsFragments),
        }
    }

    /// Replace the fragment reader.
    #[must_use]
    pub fn with_fragments(mut self, fragments: impl FragmentSource + Send + Sync + 'static) -> Self {
        self.fragments = Box::new(fragments);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build into `build_dir`, replacing whatever is there.
    ///
    /// On failure `build_dir` is removed entirely before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsafeOutput`] if `build_dir` holds any of the
    /// project's sources, otherwise the first error raised by any stage of
    /// any language pass.
    pub fn build(&self, build_dir: &Path) -> Result<BuildReport, BuildError> {
        self.check_output(build_dir)?;
        prepare_dir(build_dir)?;
        match self.build_into(build_dir) {
            Ok(report) => {
                tracing::info!(
                    path = %build_dir.display(),
                    written = report.written,
                    skipped = report.skipped,
                    "Build finished"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(cleanup) = remove_path(build_dir) {
                    tracing::warn!(
                        path = %build_dir.display(),
                        error = %cleanup,
                        "Failed to remove incomplete build"
                    );
                }
                Err(e)
            }
        }
    }

    /// Build into a fresh directory beside `output`, then repoint `output`
    /// at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the build or the publish step fails. The
    /// previously published build stays in place in either case.
    pub fn build_atomically(&self, output: &Path) -> Result<BuildReport, BuildError> {
        self.check_output(output)?;
        let build_dir = publish::create_build_dir(output)?;
        let report = self.build(&build_dir)?;
        if let Err(e) = publish::publish(output, &build_dir) {
            if let Err(cleanup) = remove_path(&build_dir) {
                tracing::warn!(path = %build_dir.display(), error = %cleanup, "Failed to remove unpublished build");
            }
            return Err(e);
        }
        Ok(report)
    }

    /// Refuse targets that are, or contain, a source directory. Both build
    /// modes delete whatever sits at the target.
    fn check_output(&self, output: &Path) -> Result<(), BuildError> {
        let Ok(resolved) = fs::canonicalize(output) else {
            return Ok(());
        };
        let config = &self.config;
        let sources = [
            &config.project_dir,
            &config.pages_dir,
            &config.layouts_dir,
            &config.static_dir,
            &config.translations_dir,
        ];
        for source in sources {
            if let Ok(source_resolved) = fs::canonicalize(source)
                && source_resolved.starts_with(&resolved)
            {
                return Err(BuildError::UnsafeOutput {
                    path: output.to_path_buf(),
                    contains: source.clone(),
                });
            }
        }
        Ok(())
    }

    fn build_into(&self, build_dir: &Path) -> Result<BuildReport, BuildError> {
        let copied = assets::copy_static(&self.config.static_dir, build_dir)?;
        tracing::debug!(files = copied, "Copied static files");
        let bundles = Arc::new(assets::build_bundles(
            &self.config.bundles,
            &self.config.static_dir,
            build_dir,
        )?);

        let mut report = BuildReport::default();
        for language in &self.config.languages {
            self.build_language(build_dir, language.as_deref(), &bundles, &mut report)?;
            report.passes += 1;
        }
        Ok(report)
    }

    fn build_language(
        &self,
        build_dir: &Path,
        language: Option<&str>,
        bundles: &Arc<BTreeMap<String, String>>,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        tracing::info!(language = language.unwrap_or("-"), "Building pages");
        let config = &self.config;
        let tree = Arc::new(build_site_tree(
            &config.pages_dir,
            &config.rules,
            self.fragments.as_ref(),
            language,
        )?);

        let catalog = match language {
            Some(language) => Catalog::load(&config.translations_dir, language)?.unwrap_or_else(|| {
                tracing::warn!(language, "No translation catalog, rendering untranslated");
                Catalog::passthrough()
            }),
            None => Catalog::passthrough(),
        };
        let env = template::create_environment(
            &config.layouts_dir,
            TemplateGlobals {
                tree: Arc::clone(&tree),
                resolver: config.resolver.clone(),
                language: language.map(str::to_owned),
                catalog: Arc::new(catalog),
                bundles: Arc::clone(bundles),
            },
        );

        for id in tree.post_order() {
            if id == tree.root() {
                continue;
            }
            let path = tree.path(id);
            let url = config.resolver.url_for(&tree, &path, language)?;
            let target = output_file(build_dir, &url);
            if target.exists() {
                tracing::debug!(path = %path, target = %target.display(), "Target exists, skipping");
                report.skipped += 1;
                continue;
            }

            let layout = config
                .layouts
                .find(&tree.content_path(id))
                .map_or(config.default_layout.as_str(), String::as_str);
            let html = template::render_node(&env, layout, &tree, id)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::write(&target, html).map_err(|e| BuildError::io(&target, e))?;
            tracing::debug!(path = %path, url = %url, layout, "Rendered page");
            report.written += 1;
        }
        Ok(())
    }
}

/// Location of the page file for `url` inside `build_dir`.
#[must_use]
pub fn output_file(build_dir: &Path, url: &str) -> PathBuf {
    let mut target = build_dir.to_path_buf();
    for segment in url.split('/').filter(|s| !s.is_empty()) {
        target.push(segment);
    }
    target.join(INDEX_FILE)
}

/// Remove whatever sits at `dir` and create it empty.
fn prepare_dir(dir: &Path) -> Result<(), BuildError> {
    remove_path(dir).map_err(|e| BuildError::io(dir, e))?;
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))
}

/// Remove a directory, file or symlink; a missing path is not an error.
fn remove_path(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(meta) if meta.file_type().is_symlink() && cfg!(windows) => fs::remove_dir(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
