//! Change detection for the serve loop.
//!
//! Raises a single "something changed" signal on a one-slot channel. Extra
//! signals while one is pending are dropped.

use std::path::{Component, Path, PathBuf};

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ServerError;

/// Whether a filesystem event for `path` should trigger a rebuild.
///
/// Paths under `output_dir` and paths with any hidden component below
/// `root` are ignored.
pub(crate) fn is_relevant(path: &Path, root: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    !relative.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

fn is_change(kind: notify::EventKind) -> bool {
    matches!(
        kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    )
}

/// Watch `root` recursively, sending on `changes` for relevant events.
///
/// The returned watcher stops when dropped.
pub(crate) fn watch(
    root: &Path,
    output_dir: &Path,
    changes: mpsc::Sender<()>,
) -> Result<notify::RecommendedWatcher, ServerError> {
    let root_owned = root.to_path_buf();
    let output_owned: PathBuf = output_dir.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Watch error");
                return;
            }
        };
        if !is_change(event.kind) {
            return;
        }
        if let Some(path) = event
            .paths
            .iter()
            .find(|p| is_relevant(p, &root_owned, &output_owned))
        {
            tracing::debug!(path = %path.display(), kind = ?event.kind, "Change detected");
            // A full channel already holds a pending rebuild.
            let _ = changes.try_send(());
        }
    })?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    tracing::debug!(root = %root.display(), "Watching for changes");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_change_is_relevant() {
        let root = Path::new("/site");
        let output = Path::new("/site/www");
        assert!(is_relevant(Path::new("/site/pages/blog/a/body.md"), root, output));
        assert!(is_relevant(Path::new("/site/layouts/default.html"), root, output));
        assert!(is_relevant(Path::new("/site/carcade.toml"), root, output));
    }

    #[test]
    fn test_output_ignored() {
        let root = Path::new("/site");
        let output = Path::new("/site/www");
        assert!(!is_relevant(Path::new("/site/www"), root, output));
        assert!(!is_relevant(Path::new("/site/www/blog/index.html"), root, output));
        assert!(is_relevant(Path::new("/site/www2/file"), root, output));
    }

    #[test]
    fn test_hidden_paths_ignored() {
        let root = Path::new("/site");
        let output = Path::new("/site/www");
        assert!(!is_relevant(Path::new("/site/.git/index"), root, output));
        assert!(!is_relevant(Path::new("/site/.build-abc123/blog/index.html"), root, output));
        assert!(!is_relevant(Path::new("/site/pages/.body.md.swp"), root, output));
    }

    #[test]
    fn test_hidden_ancestor_of_root_allowed() {
        let root = Path::new("/home/user/.sites/blog");
        let output = Path::new("/home/user/.sites/blog/www");
        assert!(is_relevant(
            Path::new("/home/user/.sites/blog/pages/index/body.md"),
            root,
            output
        ));
    }

    #[test]
    fn test_event_kinds() {
        use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

        assert!(is_change(notify::EventKind::Create(CreateKind::File)));
        assert!(is_change(notify::EventKind::Modify(ModifyKind::Any)));
        assert!(is_change(notify::EventKind::Remove(RemoveKind::Folder)));
        assert!(!is_change(notify::EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test]
    async fn test_watch_signals_on_write() {
        let temp = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        std::fs::create_dir(root.join("pages")).unwrap();
        let (tx, mut rx) = mpsc::channel(1);

        let _watcher = watch(&root, &root.join("www"), tx).unwrap();
        std::fs::write(root.join("pages/body.md"), "changed").unwrap();

        let signal = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv()).await;
        assert_eq!(signal.ok().flatten(), Some(()));
    }
}
