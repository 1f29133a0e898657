use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// 支援的影像副檔名（不分大小寫）。 / Image extensions recognised by listings (case-insensitive).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// 目錄列舉錯誤。 / Errors raised while listing a directory.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("failed to read directory {directory}: {source}")]
    ReadDir {
        directory: String,
        #[source]
        source: io::Error,
    },
}

/// 外部檔案系統回傳的目錄項目。 / Directory entry as reported by the filesystem collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_file: bool,
}

impl DirEntryInfo {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_file: true,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_file: false,
        }
    }
}

/// 檔案系統協作者介面。 / Filesystem collaborator used to enumerate a directory.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// 列出目錄內容。 / Lists the raw entries of `directory`.
    async fn list_directory(&self, directory: &str) -> io::Result<Vec<DirEntryInfo>>;
}

/// 以 `tokio::fs` 實作的列舉器。 / Lister backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

#[async_trait]
impl DirectoryLister for FsLister {
    async fn list_directory(&self, directory: &str) -> io::Result<Vec<DirEntryInfo>> {
        let mut reader = tokio::fs::read_dir(directory).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(?raw, directory, "skipping entry with non UTF-8 name");
                    continue;
                }
            };
            let is_file = entry.file_type().await?.is_file();
            entries.push(DirEntryInfo { name, is_file });
        }
        Ok(entries)
    }
}

/// 記憶體內的列舉器，供嵌入與測試使用。 / In-memory lister for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLister {
    directories: HashMap<String, Vec<DirEntryInfo>>,
    unreadable: HashSet<String>,
}

impl InMemoryLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊目錄與其檔案名稱。 / Registers a directory holding the given file names.
    pub fn with_files<I, S>(mut self, directory: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_files(directory, files);
        self
    }

    /// 將目錄標記為無法讀取。 / Marks a directory as unreadable.
    pub fn with_unreadable(mut self, directory: impl Into<String>) -> Self {
        self.unreadable.insert(directory.into());
        self
    }

    pub fn insert_files<I, S>(&mut self, directory: impl Into<String>, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = files.into_iter().map(DirEntryInfo::file).collect();
        self.directories.insert(directory.into(), entries);
    }

    pub fn insert_entry(&mut self, directory: &str, entry: DirEntryInfo) {
        self.directories
            .entry(directory.to_string())
            .or_default()
            .push(entry);
    }

    pub fn remove_file(&mut self, directory: &str, name: &str) -> bool {
        match self.directories.get_mut(directory) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|entry| entry.name != name);
                before != entries.len()
            }
            None => false,
        }
    }

    pub fn mark_unreadable(&mut self, directory: impl Into<String>) {
        self.unreadable.insert(directory.into());
    }
}

#[async_trait]
impl DirectoryLister for InMemoryLister {
    async fn list_directory(&self, directory: &str) -> io::Result<Vec<DirEntryInfo>> {
        if self.unreadable.contains(directory) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{directory} is not readable"),
            ));
        }
        self.directories.get(directory).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{directory} does not exist"))
        })
    }
}

/// 取得路徑最後一個分隔符號之前的目錄；若無分隔符號則回傳 `None`。 /
/// Returns the substring before the last path separator, or `None` when there is none.
pub fn determine_directory(path: &str) -> Option<&str> {
    path.rfind(['/', '\\']).map(|index| &path[..index])
}

/// 取得路徑的檔名部分。 / Returns the component after the last separator.
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// 依目錄慣用的分隔符號組合路徑。 / Joins a file name onto a directory using the directory's separator.
pub fn join_path(directory: &str, name: &str) -> String {
    let separator = if directory.contains('\\') && !directory.contains('/') {
        '\\'
    } else {
        '/'
    };
    format!("{directory}{separator}{name}")
}

/// 檔名是否為支援的影像格式。 / Whether the file name carries a supported image extension.
pub fn is_image_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// 自然排序（數字感知、不分大小寫）。 / Natural, numeric-aware, case-insensitive ordering.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    natord::compare_ignore_case(left, right)
}

/// 以自然排序整理路徑。 / Sorts paths in place using [`natural_cmp`].
pub fn sort_naturally(paths: &mut [String]) {
    paths.sort_by(|a, b| natural_cmp(a, b));
}

/// 列出目錄中的影像並排序，回傳完整路徑。 / Lists the directory's images as full, naturally sorted paths.
pub async fn get_sorted_image_files(
    lister: &dyn DirectoryLister,
    directory: &str,
) -> Result<Vec<String>, PathError> {
    let entries = lister
        .list_directory(directory)
        .await
        .map_err(|source| PathError::ReadDir {
            directory: directory.to_string(),
            source,
        })?;

    let mut files: Vec<String> = entries
        .into_iter()
        .filter(|entry| entry.is_file && !entry.name.is_empty() && is_image_file(&entry.name))
        .map(|entry| join_path(directory, &entry.name))
        .collect();
    sort_naturally(&mut files);
    debug!(directory, count = files.len(), "listed image files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn determine_directory_uses_last_separator() {
        assert_eq!(determine_directory("/photos/2024/a.png"), Some("/photos/2024"));
        assert_eq!(determine_directory("/a.png"), Some(""));
        assert_eq!(determine_directory("C:\\shots\\b.jpg"), Some("C:\\shots"));
        assert_eq!(determine_directory("loose.png"), None);
    }

    #[test]
    fn image_extension_match_is_case_insensitive() {
        assert!(is_image_file("IMG_0001.JPG"));
        assert!(is_image_file("frame.WebP"));
        assert!(is_image_file("scan.jpeg"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("png"));
        assert!(!is_image_file("archive.png.zip"));
    }

    #[test]
    fn natural_sort_orders_numbers_by_value() {
        let mut paths = vec![
            "/d/img10.png".to_string(),
            "/d/IMG2.png".to_string(),
            "/d/img1.png".to_string(),
        ];
        sort_naturally(&mut paths);
        assert_eq!(paths, vec!["/d/img1.png", "/d/IMG2.png", "/d/img10.png"]);
    }

    #[tokio::test]
    async fn sorted_listing_filters_non_images_and_directories() {
        let mut lister =
            InMemoryLister::new().with_files("/d", ["b.png", "a.txt", "A10.gif", "a2.bmp"]);
        lister.insert_entry("/d", DirEntryInfo::dir("nested.png"));

        let files = get_sorted_image_files(&lister, "/d").await.unwrap();
        assert_eq!(files, vec!["/d/a2.bmp", "/d/A10.gif", "/d/b.png"]);
    }

    #[tokio::test]
    async fn unreadable_directory_reports_error() {
        let lister = InMemoryLister::new().with_unreadable("/locked");
        let err = get_sorted_image_files(&lister, "/locked").await.unwrap_err();
        assert!(matches!(err, PathError::ReadDir { ref directory, .. } if directory == "/locked"));
    }

    #[tokio::test]
    async fn fs_lister_reads_real_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shot2.png"), b"").unwrap();
        fs::write(dir.path().join("shot10.png"), b"").unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let root = dir.path().to_str().unwrap();
        let files = get_sorted_image_files(&FsLister, root).await.unwrap();
        let names: Vec<_> = files.iter().map(|path| file_name(path)).collect();
        assert_eq!(names, vec!["shot2.png", "shot10.png"]);
    }
}
