//! Static files and asset bundles.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use carcade_config::BundleConfig;

use crate::error::BuildError;

/// Copy the static tree verbatim into `build_dir`.
///
/// A missing static directory is skipped with a warning.
pub(crate) fn copy_static(static_dir: &Path, build_dir: &Path) -> Result<usize, BuildError> {
    if !static_dir.is_dir() {
        tracing::warn!(path = %static_dir.display(), "Static directory not found, skipping");
        return Ok(0);
    }
    copy_dir(static_dir, build_dir)
}

fn copy_dir(from: &Path, to: &Path) -> Result<usize, BuildError> {
    fs::create_dir_all(to).map_err(|e| BuildError::io(to, e))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).map_err(|e| BuildError::io(from, e))? {
        let source = entry.map_err(|e| BuildError::io(from, e))?.path();
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = to.join(name);
        if source.is_dir() {
            copied += copy_dir(&source, &target)?;
        } else {
            fs::copy(&source, &target).map_err(|e| BuildError::io(&source, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Assemble every bundle into `build_dir`.
///
/// Each bundle's inputs are read from `static_dir` and concatenated, in
/// order, into its output file. Returns bundle name to public URL.
pub(crate) fn build_bundles(
    bundles: &BTreeMap<String, BundleConfig>,
    static_dir: &Path,
    build_dir: &Path,
) -> Result<BTreeMap<String, String>, BuildError> {
    let mut urls = BTreeMap::new();
    for (name, bundle) in bundles {
        let mut content = Vec::new();
        for input in &bundle.inputs {
            let path = static_dir.join(input);
            let bytes = fs::read(&path).map_err(|e| BuildError::Bundle {
                name: name.clone(),
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            content.extend_from_slice(&bytes);
            if !bytes.ends_with(b"\n") {
                content.push(b'\n');
            }
        }

        let output = bundle.output.trim_start_matches('/');
        let target = build_dir.join(output);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(&target, content).map_err(|e| BuildError::io(&target, e))?;
        tracing::debug!(bundle = %name, output = %target.display(), "Built bundle");
        urls.insert(name.clone(), format!("/{output}"));
    }
    Ok(urls)
}
