//! Directory listing implementation using walkdir.

use super::filter::ImageFilter;
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, ScanEvent};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to include dot-files
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

/// Lists the frames directly inside one directory
pub struct DirectoryScanner {
    filter: ImageFilter,
}

impl DirectoryScanner {
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);
        if let Some(extensions) = config.extensions {
            filter = filter.with_extensions(extensions);
        }
        Self { filter }
    }

    pub fn scan(&self, directory: &Path) -> Result<Vec<PathBuf>, ScanError> {
        self.scan_with_events(directory, &null_sender())
    }

    /// Absolute paths of the frames in `directory`, sorted by name.
    ///
    /// Sub-directories (including the archive directory) are not entered.
    /// Symlinks to files count as frames under the link's own name;
    /// dangling links are skipped.
    pub fn scan_with_events(
        &self,
        directory: &Path,
        events: &EventSender,
    ) -> Result<Vec<PathBuf>, ScanError> {
        if !directory.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: directory.to_path_buf(),
            });
        }
        let root = directory
            .canonicalize()
            .map_err(|source| ScanError::ReadDirectory {
                path: directory.to_path_buf(),
                source,
            })?;

        events.send(Event::Scan(ScanEvent::Started { path: root.clone() }));

        let mut images = Vec::new();
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_dangling_link(&e) => {
                    warn!(path = ?e.path(), "skipping dangling symlink");
                    continue;
                }
                Err(e) => return Err(walk_error(&root, e)),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !self.filter.should_include(&path) {
                debug!(path = %path.display(), "skipping non-image entry");
                continue;
            }
            events.send(Event::Scan(ScanEvent::ImageFound { path: path.clone() }));
            images.push(path);
        }

        images.sort();

        events.send(Event::Scan(ScanEvent::Completed {
            total_images: images.len(),
        }));
        debug!(directory = %root.display(), count = images.len(), "scan finished");
        Ok(images)
    }
}

fn is_dangling_link(error: &walkdir::Error) -> bool {
    error.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound)
        && error.path().is_some_and(|p| p.is_symlink())
}

fn walk_error(root: &Path, error: walkdir::Error) -> ScanError {
    let path = error.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    warn!(path = %path.display(), %error, "failed to read directory entry");

    if error.io_error().map(io::Error::kind) == Some(io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: io::Error::other(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn create_frame(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn empty_directory_returns_empty_vec() {
        let temp_dir = TempDir::new().unwrap();
        let images = DirectoryScanner::new(ScanConfig::default())
            .scan(temp_dir.path())
            .unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn results_are_sorted_and_absolute() {
        let temp_dir = TempDir::new().unwrap();
        create_frame(&temp_dir, "img2.png");
        create_frame(&temp_dir, "img0.png");
        create_frame(&temp_dir, "img1.png");

        let images = DirectoryScanner::new(ScanConfig::default())
            .scan(temp_dir.path())
            .unwrap();

        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["img0.png", "img1.png", "img2.png"]);
        assert!(images.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn subdirectories_are_not_entered() {
        let temp_dir = TempDir::new().unwrap();
        create_frame(&temp_dir, "img0.png");
        let archive = temp_dir.path().join("abnormal");
        fs::create_dir(&archive).unwrap();
        File::create(archive.join("img0.png")).unwrap();

        let images = DirectoryScanner::new(ScanConfig::default())
            .scan(temp_dir.path())
            .unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn non_images_and_hidden_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        create_frame(&temp_dir, "img0.png");
        create_frame(&temp_dir, ".img1.png");
        create_frame(&temp_dir, "notes.txt");

        let images = DirectoryScanner::new(ScanConfig::default())
            .scan(temp_dir.path())
            .unwrap();
        assert_eq!(images.len(), 1);

        let config = ScanConfig {
            include_hidden: true,
            ..Default::default()
        };
        let images = DirectoryScanner::new(config).scan(temp_dir.path()).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = DirectoryScanner::new(ScanConfig::default())
            .scan(Path::new("/nonexistent/frames/12345"));
        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_frames_are_listed_under_their_link_name() {
        use std::os::unix::fs::symlink;

        let store = TempDir::new().unwrap();
        let target = create_frame(&store, "capture.png");
        let temp_dir = TempDir::new().unwrap();
        create_frame(&temp_dir, "img0.png");
        symlink(&target, temp_dir.path().join("img1.png")).unwrap();
        symlink(store.path().join("gone.png"), temp_dir.path().join("img2.png")).unwrap();

        let images = DirectoryScanner::new(ScanConfig::default())
            .scan(temp_dir.path())
            .unwrap();

        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["img0.png", "img1.png"]);
    }
}
