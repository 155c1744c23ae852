use ignore::WalkBuilder;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::error::StageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Staged {
        source: PathBuf,
        destination: PathBuf,
        files: usize,
        dirs: usize,
    },
    SkippedSourceMissing {
        source: PathBuf,
    },
}

impl StageOutcome {
    pub fn is_staged(&self) -> bool {
        matches!(self, StageOutcome::Staged { .. })
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Staged {
                source,
                destination,
                files,
                dirs,
            } => write!(
                f,
                "staged {} -> {} ({files} files, {dirs} directories)",
                source.display(),
                destination.display()
            ),
            StageOutcome::SkippedSourceMissing { source } => write!(
                f,
                "Source directory {} does not exist. Skipping.",
                source.display()
            ),
        }
    }
}

/// Make `destination` a fresh recursive copy of `source`.
///
/// A missing `source` is not an error: nothing on disk changes and a
/// diagnostic naming the path is logged. Otherwise any existing
/// `destination` is removed first, so repeated calls converge on the same
/// tree. Parent directories of `destination` are created as needed.
pub fn stage(source: &Path, destination: &Path) -> Result<StageOutcome, StageError> {
    if !source.exists() {
        let outcome = StageOutcome::SkippedSourceMissing {
            source: source.to_path_buf(),
        };
        tracing::warn!("{outcome}");
        return Ok(outcome);
    }

    if !source.is_dir() {
        return Err(StageError::NotADirectory(source.to_path_buf()));
    }

    check_overlap(source, destination)?;

    if fs::symlink_metadata(destination).is_ok() {
        tracing::debug!("removing previous {}", destination.display());
        remove_destination(destination)?;
    }

    let (files, dirs) = copy_tree(source, destination)?;

    let outcome = StageOutcome::Staged {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        files,
        dirs,
    };
    tracing::info!("{outcome}");
    Ok(outcome)
}

/// Removing a destination that contains the source (or copying a source into
/// itself) would destroy the tree being staged.
fn check_overlap(source: &Path, destination: &Path) -> Result<(), StageError> {
    let source_real = resolve(source)?;
    let destination_real = resolve(destination)?;

    if destination_real.starts_with(&source_real) || source_real.starts_with(&destination_real) {
        return Err(StageError::Overlap {
            source_dir: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }

    Ok(())
}

/// Canonicalize the deepest existing ancestor and re-append the rest.
///
/// `..` in the not-yet-existing remainder is folded lexically; when that
/// lands back on an existing directory the result is resolved again.
fn resolve(path: &Path) -> Result<PathBuf, StageError> {
    let absolute = std::path::absolute(path).map_err(|source| StageError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    for ancestor in absolute.ancestors() {
        if !ancestor.exists() {
            continue;
        }

        let real = ancestor.canonicalize().map_err(|source| StageError::Resolve {
            path: ancestor.to_path_buf(),
            source,
        })?;

        let Ok(rest) = absolute.strip_prefix(ancestor) else {
            return Ok(real);
        };

        let mut resolved = real;
        let mut folded = false;
        for component in rest.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                    folded = true;
                }
                other => resolved.push(other),
            }
        }

        return if folded {
            resolve(&resolved)
        } else {
            Ok(resolved)
        };
    }

    Ok(absolute)
}

fn remove_destination(destination: &Path) -> Result<(), StageError> {
    let metadata = fs::symlink_metadata(destination).map_err(|source| StageError::Remove {
        path: destination.to_path_buf(),
        source,
    })?;

    let result = if metadata.is_dir() {
        fs::remove_dir_all(destination)
    } else {
        fs::remove_file(destination)
    };

    result.map_err(|source| StageError::Remove {
        path: destination.to_path_buf(),
        source,
    })
}

/// Returns the number of files and subdirectories written.
fn copy_tree(source: &Path, destination: &Path) -> Result<(usize, usize), StageError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .build();

    let mut files = 0;
    let mut dirs = 0;

    for entry in walker {
        let entry = entry.map_err(|err| StageError::Walk {
            path: source.to_path_buf(),
            source: err,
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        let is_dir = entry.file_type().is_some_and(|ty| ty.is_dir());

        if is_dir {
            fs::create_dir_all(&target).map_err(|source| StageError::CreateDir {
                path: target.clone(),
                source,
            })?;
            if entry.depth() > 0 {
                dirs += 1;
            }
        } else {
            fs::copy(entry.path(), &target).map_err(|source| StageError::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                source,
            })?;
            files += 1;
        }
    }

    Ok((files, dirs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Relative path → file contents (`None` for directories).
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<String>> {
        let mut entries = BTreeMap::new();
        for entry in WalkBuilder::new(root).standard_filters(false).build().flatten() {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            if relative.as_os_str().is_empty() {
                continue;
            }
            let contents = if entry.path().is_dir() {
                None
            } else {
                Some(fs::read_to_string(entry.path()).unwrap())
            };
            entries.insert(relative, contents);
        }
        entries
    }

    fn media_player_source(root: &Path) -> PathBuf {
        let source = root.join("components/esp_adf/media_player");
        fs::create_dir_all(source.join("b")).unwrap();
        fs::write(source.join("a.txt"), "hello").unwrap();
        fs::write(source.join("b/c.txt"), "world").unwrap();
        source
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn replaces_stale_destination_with_source_tree() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        let destination = dir.path().join("src/esphome/components/esp_adf/media_player");
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("old.txt"), "stale").unwrap();

        let outcome = stage(&source, &destination).unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Staged {
                source: source.clone(),
                destination: destination.clone(),
                files: 2,
                dirs: 1,
            }
        );
        assert_eq!(fs::read_to_string(destination.join("a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(destination.join("b/c.txt")).unwrap(), "world");
        assert!(!destination.join("old.txt").exists());
        assert_eq!(snapshot(&source), snapshot(&destination));
    }

    #[test]
    fn creates_missing_destination_and_parents() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        let destination = dir.path().join("src/esphome/components/esp_adf/media_player");
        assert!(!dir.path().join("src").exists());

        let outcome = stage(&source, &destination).unwrap();

        assert!(outcome.is_staged());
        assert!(destination.is_dir());
        assert_eq!(snapshot(&source), snapshot(&destination));
    }

    #[test]
    fn staging_twice_yields_the_same_tree() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        let destination = dir.path().join("out");

        stage(&source, &destination).unwrap();
        let first = snapshot(&destination);
        stage(&source, &destination).unwrap();

        assert_eq!(first, snapshot(&destination));
        assert_eq!(snapshot(&source), snapshot(&destination));
    }

    #[test]
    fn missing_source_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("components/esp_adf/media_player");
        let destination = dir.path().join("out");
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("keep.txt"), "keep me").unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let outcome =
            tracing::subscriber::with_default(subscriber, || stage(&source, &destination)).unwrap();

        assert_eq!(
            outcome,
            StageOutcome::SkippedSourceMissing {
                source: source.clone()
            }
        );
        assert_eq!(fs::read_to_string(destination.join("keep.txt")).unwrap(), "keep me");
        assert!(captured.text().contains(&source.display().to_string()));
        assert!(captured.text().contains("does not exist"));
    }

    #[test]
    fn missing_source_does_not_create_destination() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("src/esphome/components/esp_adf/media_player");

        let outcome = stage(&dir.path().join("absent"), &destination).unwrap();

        assert!(!outcome.is_staged());
        assert!(!destination.exists());
        assert!(!dir.path().join("src").exists());
    }

    #[test]
    fn hidden_and_ignored_files_are_copied() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src_tree");
        fs::create_dir_all(source.join(".hidden")).unwrap();
        fs::write(source.join(".gitignore"), "*.o\n").unwrap();
        fs::write(source.join("codec.o"), "obj").unwrap();
        fs::write(source.join(".hidden/x.h"), "#pragma once").unwrap();
        let destination = dir.path().join("dst");

        stage(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(destination.join("codec.o")).unwrap(), "obj");
        assert!(destination.join(".gitignore").is_file());
        assert!(destination.join(".hidden/x.h").is_file());
    }

    #[test]
    fn empty_source_produces_empty_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty");
        fs::create_dir(&source).unwrap();
        let destination = dir.path().join("dst");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("old.txt"), "x").unwrap();

        let outcome = stage(&source, &destination).unwrap();

        assert!(matches!(outcome, StageOutcome::Staged { files: 0, dirs: 0, .. }));
        assert!(destination.is_dir());
        assert!(snapshot(&destination).is_empty());
    }

    #[test]
    fn destination_file_is_replaced_by_tree() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        let destination = dir.path().join("dst");
        fs::write(&destination, "not a directory").unwrap();

        stage(&source, &destination).unwrap();

        assert_eq!(snapshot(&source), snapshot(&destination));
    }

    #[test]
    fn source_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("file.txt");
        fs::write(&source, "x").unwrap();

        let err = stage(&source, &dir.path().join("dst")).unwrap_err();
        assert!(matches!(err, StageError::NotADirectory(_)));
    }

    #[test]
    fn nested_destination_is_rejected_before_any_mutation() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());

        let inside = stage(&source, &source.join("b/copy")).unwrap_err();
        assert!(matches!(inside, StageError::Overlap { .. }));

        let outside = stage(&source, &dir.path().join("components")).unwrap_err();
        assert!(matches!(outside, StageError::Overlap { .. }));

        let same = stage(&source, &source).unwrap_err();
        assert!(matches!(same, StageError::Overlap { .. }));

        let dotted = dir.path().join("nonexist/../components/esp_adf/media_player");
        let via_parent = stage(&source, &dotted).unwrap_err();
        assert!(matches!(via_parent, StageError::Overlap { .. }));
        assert!(!dir.path().join("nonexist").exists());

        let dotted_inside = dir.path().join("x/../components/esp_adf/media_player/./b/../out");
        let inside_via_parent = stage(&source, &dotted_inside).unwrap_err();
        assert!(matches!(inside_via_parent, StageError::Overlap { .. }));

        assert_eq!(fs::read_to_string(source.join("a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(source.join("b/c.txt")).unwrap(), "world");
    }

    #[test]
    fn dotted_destination_outside_source_is_staged() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        let destination = dir.path().join("gone/../src/esphome/media_player");

        stage(&source, &destination).unwrap();

        assert_eq!(snapshot(&source), snapshot(&dir.path().join("src/esphome/media_player")));
        assert_eq!(fs::read_to_string(source.join("a.txt")).unwrap(), "hello");
    }

    /// Permission bits do not bind root; skip where they are not enforced.
    #[cfg(unix)]
    fn permissions_enforced(probe_dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        let locked = probe_dir.join(".locked");
        fs::write(&locked, "x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = fs::read(&locked).is_err();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        fs::remove_file(&locked).unwrap();
        enforced
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_file_fails_with_copy_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        if !permissions_enforced(dir.path()) {
            return;
        }
        let source = media_player_source(dir.path());
        let secret = source.join("b/c.txt");
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
        let destination = dir.path().join("dst");

        let result = stage(&source, &destination);
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

        match result.unwrap_err() {
            StageError::Copy { from, source, .. } => {
                assert_eq!(from, secret);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected copy error, got {other:?}"),
        }
        // no rollback: what was copied before the failure stays
        assert!(destination.is_dir());
        assert_eq!(fs::read_to_string(source.join("b/c.txt")).unwrap(), "world");
    }

    #[cfg(unix)]
    #[test]
    fn read_only_destination_parent_fails_with_remove_error() {
        use std::error::Error as _;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        if !permissions_enforced(dir.path()) {
            return;
        }
        let source = media_player_source(dir.path());
        let parent = dir.path().join("generated");
        let destination = parent.join("media_player");
        fs::create_dir_all(&destination).unwrap();
        fs::write(destination.join("old.txt"), "stale").unwrap();
        fs::set_permissions(&destination, fs::Permissions::from_mode(0o555)).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

        let result = stage(&source, &destination);
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(&destination, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(
            matches!(err, StageError::Remove { .. } | StageError::CreateDir { .. }),
            "unexpected error {err:?}"
        );
        assert!(err.source().is_some());
        assert_eq!(fs::read_to_string(destination.join("old.txt")).unwrap(), "stale");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_copied_as_content() {
        let dir = TempDir::new().unwrap();
        let source = media_player_source(dir.path());
        std::os::unix::fs::symlink(source.join("a.txt"), source.join("link.txt")).unwrap();
        let destination = dir.path().join("dst");

        stage(&source, &destination).unwrap();

        let link = destination.join("link.txt");
        assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(link).unwrap(), "hello");
    }

    #[test]
    fn outcome_messages_name_the_paths() {
        let skipped = StageOutcome::SkippedSourceMissing {
            source: PathBuf::from("/w/components/esp_adf/media_player"),
        };
        assert_eq!(
            skipped.to_string(),
            "Source directory /w/components/esp_adf/media_player does not exist. Skipping."
        );
    }
}
