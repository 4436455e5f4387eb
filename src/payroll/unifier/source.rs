//! Seams for the external collaborators: the file source the extracts come
//! from and the notification sink the summary goes to. Cloud transport and
//! SMTP delivery live behind these traits; the crate ships filesystem-backed
//! implementations that cover local runs and tests.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::payroll::unifier::error::{Result, UnifierError};

/// MIME type of cloud-native sheets that are exported as xlsx on download.
pub const CLOUD_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

const SPREADSHEET_EXTENSIONS: [&str; 3] = [".xlsx", ".xlsm", ".xls"];

/// One listed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

/// Listing and download of source workbooks.
pub trait FileSource {
    fn list_files(&self) -> Result<Vec<SourceFile>>;
    fn download(&self, file: &SourceFile) -> Result<Vec<u8>>;
}

/// True for files the pipeline should attempt to open as workbooks.
pub fn is_spreadsheet(file: &SourceFile) -> bool {
    let name = file.name.to_lowercase();
    SPREADSHEET_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) || file.mime_type == CLOUD_SHEET_MIME
}

/// [`FileSource`] over a local folder of workbooks.
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileSource for FolderSource {
    fn list_files(&self) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(SourceFile {
                id: entry.path().to_string_lossy().into_owned(),
                mime_type: mime_for(&name),
                name,
            });
        }
        files.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        debug!(folder = %self.root.display(), files = files.len(), "folder listed");
        Ok(files)
    }

    fn download(&self, file: &SourceFile) -> Result<Vec<u8>> {
        fs::read(Path::new(&file.id)).map_err(|error| UnifierError::Download {
            name: file.name.clone(),
            reason: error.to_string(),
        })
    }
}

fn mime_for(name: &str) -> String {
    let lowered = name.to_lowercase();
    if lowered.ends_with(".xlsx") || lowered.ends_with(".xlsm") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string()
    } else if lowered.ends_with(".xls") {
        "application/vnd.ms-excel".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// Delivery of the run summary. Fire-and-forget: callers log failures and
/// carry on.
pub trait NotificationSink {
    fn send(&self, subject: &str, html_body: &str, attachments: &[PathBuf]) -> Result<()>;
}

/// [`NotificationSink`] that drops the summary into an outbox directory
/// instead of mailing it. The actual mail transport picks it up from there.
pub struct OutboxSink {
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the summary body is written to.
    pub fn summary_path(&self) -> PathBuf {
        self.dir.join("summary.html")
    }
}

impl NotificationSink for OutboxSink {
    fn send(&self, subject: &str, html_body: &str, attachments: &[PathBuf]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.summary_path(), html_body)?;
        info!(
            subject,
            attachments = attachments.len(),
            outbox = %self.dir.display(),
            "summary written to outbox"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str) -> SourceFile {
        SourceFile {
            id: name.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn spreadsheet_filter_accepts_extensions_and_cloud_mime() {
        assert!(is_spreadsheet(&file("a.xlsx", "application/octet-stream")));
        assert!(is_spreadsheet(&file("b.XLSM", "application/octet-stream")));
        assert!(is_spreadsheet(&file("legacy.xls", "application/octet-stream")));
        assert!(is_spreadsheet(&file("sheet", CLOUD_SHEET_MIME)));
        assert!(!is_spreadsheet(&file("notes.txt", "text/plain")));
        assert!(!is_spreadsheet(&file("report.pdf", "application/pdf")));
    }

    #[test]
    fn folder_source_lists_only_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.xlsx"), b"fake").unwrap();
        std::fs::write(dir.path().join("a.xlsx"), b"fake").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = FolderSource::new(dir.path()).list_files().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.xlsx", "b.xlsx"]);
    }

    #[test]
    fn download_returns_the_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wb.xlsx"), b"content").unwrap();

        let source = FolderSource::new(dir.path());
        let files = source.list_files().unwrap();
        assert_eq!(source.download(&files[0]).unwrap(), b"content");
    }
}
