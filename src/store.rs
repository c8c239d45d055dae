use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::fetcher::Page;

static PAGE_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^page_(\d+)\.html$").unwrap());

/// A page file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPage {
    /// Batch position parsed from `page_<index>.html`, if the name follows that scheme.
    pub index: Option<usize>,
    pub path: PathBuf,
}

impl SavedPage {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub fn page_file_name(index: usize) -> String {
    format!("page_{}.html", index)
}

/// Write every page to `dir/page_<index>.html`, replacing existing files.
pub fn save_pages(dir: &Path, pages: &[Page]) -> Result<Vec<PathBuf>, ScrapeError> {
    fs::create_dir_all(dir).map_err(|e| ScrapeError::io(dir, e))?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(page_file_name(page.index));
        write_replace(&path, &page.content)?;
        debug!("Saved page {} to {}", page.page_number, path.display());
        written.push(path);
    }

    info!("Saved {} pages to {}", written.len(), dir.display());
    Ok(written)
}

/// Write to a temporary sibling, then rename over the target.
fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), ScrapeError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| ScrapeError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ScrapeError::io(path, e))
}

/// Regular files in `dir`, numbered pages first by index, then the rest by name.
pub fn list_pages(dir: &Path) -> Result<Vec<SavedPage>, ScrapeError> {
    let entries = fs::read_dir(dir).map_err(|e| ScrapeError::io(dir, e))?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScrapeError::io(dir, e))?;
        let path = entry.path();
        // Follows symlinks, unlike `DirEntry::file_type`.
        let is_file = match fs::metadata(&path) {
            Ok(meta) => meta.is_file(),
            // Dangling link: keep it so the read error is reported for this file alone.
            Err(_) => entry
                .file_type()
                .map_err(|e| ScrapeError::io(&path, e))?
                .is_symlink(),
        };
        if !is_file {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".part") {
            continue;
        }
        let index = PAGE_FILE_RE
            .captures(&name)
            .and_then(|c| c[1].parse::<usize>().ok());
        pages.push(SavedPage { index, path });
    }

    // None sorts before Some, so flip it to put unnumbered files last.
    pages.sort_by(|a, b| {
        (a.index.is_none(), a.index, a.file_name()).cmp(&(b.index.is_none(), b.index, b.file_name()))
    });
    Ok(pages)
}

pub fn read_page(page: &SavedPage) -> Result<String, ScrapeError> {
    let bytes = fs::read(&page.path).map_err(|e| ScrapeError::io(&page.path, e))?;
    String::from_utf8(bytes).map_err(|source| ScrapeError::Encoding {
        path: page.path.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pages: &[SavedPage]) -> Vec<String> {
        pages.iter().map(SavedPage::file_name).collect()
    }

    #[test]
    fn save_creates_dir_and_names_by_index() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("data");
        let pages = vec![Page::new(0, 1, "<p>one</p>"), Page::new(1, 2, "<p>two</p>")];

        save_pages(&dir, &pages).unwrap();

        assert_eq!(fs::read_to_string(dir.join("page_0.html")).unwrap(), "<p>one</p>");
        assert_eq!(fs::read_to_string(dir.join("page_1.html")).unwrap(), "<p>two</p>");
        assert!(!dir.join("page_0.html.part").exists());
    }

    #[test]
    fn save_is_idempotent_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        save_pages(tmp.path(), &[Page::new(0, 1, "old content, longer")]).unwrap();
        save_pages(tmp.path(), &[Page::new(0, 1, "new")]).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("page_0.html")).unwrap(), "new");
        assert_eq!(list_pages(tmp.path()).unwrap().len(), 1);
    }

    #[test]
    fn list_sorts_numerically_then_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["page_10.html", "notes.txt", "page_2.html", "page_0.html", "extra.html"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let pages = list_pages(tmp.path()).unwrap();

        assert_eq!(
            names(&pages),
            ["page_0.html", "page_2.html", "page_10.html", "extra.html", "notes.txt"]
        );
        assert_eq!(pages[2].index, Some(10));
        assert_eq!(pages[3].index, None);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_page_is_listed() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("stash.html");
        fs::write(&target, "<p>linked</p>").unwrap();
        let dir = tmp.path().join("data");
        fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("page_0.html")).unwrap();

        let pages = list_pages(&dir).unwrap();

        assert_eq!(names(&pages), ["page_0.html"]);
        assert_eq!(pages[0].index, Some(0));
        assert_eq!(read_page(&pages[0]).unwrap(), "<p>linked</p>");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_listed_but_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone.html"), tmp.path().join("page_1.html"))
            .unwrap();

        let pages = list_pages(tmp.path()).unwrap();

        assert_eq!(names(&pages), ["page_1.html"]);
        assert!(matches!(read_page(&pages[0]), Err(ScrapeError::Io { .. })));
    }

    #[test]
    fn missing_dir_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = list_pages(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, ScrapeError::Io { .. }));
    }

    #[test]
    fn read_rejects_invalid_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page_0.html");
        fs::write(&path, [0x3c, 0xff, 0xfe, 0x3e]).unwrap();

        let err = read_page(&SavedPage { index: Some(0), path }).unwrap_err();
        assert!(matches!(err, ScrapeError::Encoding { .. }));
    }
}
