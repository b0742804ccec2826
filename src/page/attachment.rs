use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{settle, Page};
use crate::errors::WikiError;
use crate::types::WriteOutcome;
use crate::utils::naming::{is_blank, normalize, titleize, ATTACH_DIR_SUFFIX};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

// Stem used when neither the display name nor the upload name has any usable characters.
const FALLBACK_STEM: &str = "file";

/// A file uploaded into a page's attachment directory
#[derive(Debug, Clone)]
pub struct Attachment {
    path: PathBuf,
    page_name: String,
}

impl Attachment {
    pub fn new(path: PathBuf, page_name: impl Into<String>) -> Self {
        Self { path, page_name: page_name.into() }
    }

    /// Files in the page's attachment directory, sorted by name; empty when it is missing.
    pub fn list(page: &Page<'_>) -> Vec<Attachment> {
        let dir = page.attachment_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut attachments: Vec<Attachment> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("Failed to read attachment entry in {:?}: {}", dir, e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .map(|path| Attachment::new(path, page.intname()))
            .collect();
        attachments.sort_by(|a, b| a.name().cmp(&b.name()));
        debug!("Found {} attachments for {}", attachments.len(), page.intname());
        attachments
    }

    /// Store `bytes` as an attachment of `page` and commit it.
    ///
    /// The stored name is `display_name` (or the upload's own stem when that
    /// is blank) normalized, plus the upload's original extension.
    pub fn save(
        page: &Page<'_>,
        bytes: &[u8],
        original_filename: &str,
        display_name: Option<&str>,
    ) -> Result<WriteOutcome, WikiError> {
        let original = Path::new(original_filename);
        let stem = match display_name.filter(|name| !is_blank(name)) {
            Some(name) => flat_stem(name),
            None => flat_stem(&original.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default()),
        };
        let filename = stored_name(&stem, original.extension().and_then(|e| e.to_str()));

        let git = page.git();
        let _guard = git.write_lock();

        let dir = page.attachment_dir();
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&filename), bytes)?;
        info!("Saved attachment {} for {} ({} bytes)", filename, page.intname(), bytes.len());

        let rel_path = format!("{}/{}", page.attachment_dir_name(), filename);
        let commit_message = format!("uploaded {} for {}", filename, page.title());
        let result = git.add(&rel_path).and_then(|_| git.commit(&commit_message));
        Ok(settle(result, &commit_message))
    }

    /// Remove attachment `filename` of `page` and commit; a missing file is a no-op.
    pub fn delete(page: &Page<'_>, filename: &str) -> Result<WriteOutcome, WikiError> {
        let filename = normalize_filename(filename);
        let git = page.git();
        let _guard = git.write_lock();

        let path = page.attachment_dir().join(&filename);
        if !path.is_file() {
            debug!("Attachment {} of {} not found, nothing to delete", filename, page.intname());
            return Ok(WriteOutcome::Unchanged);
        }
        fs::remove_file(&path)?;
        info!("Removed attachment {} of {}", filename, page.intname());

        let rel_path = format!("{}/{}", page.attachment_dir_name(), filename);
        let commit_message = format!("removed {} for {}", filename, page.title());
        let result = git.remove(&rel_path, false).and_then(|_| git.commit(&commit_message));
        Ok(settle(result, &commit_message))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    /// File name of the attachment
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Titleized name without any extension
    pub fn nice_name(&self) -> String {
        let name = self.name();
        let stem = name.split('.').next().unwrap_or_default();
        titleize(stem)
    }

    /// Public url, `/f/<page>/<file>`
    pub fn link_path(&self) -> String {
        format!("/f/{}/{}", self.page_name, self.name())
    }

    /// Url that deletes this attachment, `/a/file/delete/<page>_files/<file>`
    pub fn delete_path(&self) -> String {
        format!("/a/file/delete/{}{}/{}", self.page_name, ATTACH_DIR_SUFFIX, self.name())
    }

    pub fn is_image(&self) -> bool {
        is_image(&self.name())
    }

    /// Human readable size; `0 bytes` if the file cannot be read
    pub fn size(&self) -> String {
        let bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        size_label(bytes)
    }
}

/// Normalize the stem of `filename`, keeping its extension.
fn normalize_filename(filename: &str) -> String {
    let path = Path::new(filename);
    let stem = flat_stem(&path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default());
    stored_name(&stem, path.extension().and_then(|e| e.to_str()))
}

// Attachments live directly in the attachment directory, never below it.
fn flat_stem(name: &str) -> String {
    normalize(name).replace('/', "_")
}

fn stored_name(stem: &str, extension: Option<&str>) -> String {
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem.to_string(),
    }
}

/// True when the extension of `filename` is a known image type
pub fn is_image(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Byte count as `N bytes`, `X kilobytes` or `X megabytes`, with trailing zero decimals dropped
pub fn size_label(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    match bytes {
        1 => "1 byte".to_string(),
        b if b < KB => format!("{} bytes", b),
        b if b < MB => format!("{} kilobytes", trim_decimals(b as f64 / KB as f64)),
        b => format!("{} megabytes", trim_decimals(b as f64 / MB as f64)),
    }
}

fn trim_decimals(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_labels_pick_units_and_trim_zeros() {
        assert_eq!(size_label(0), "0 bytes");
        assert_eq!(size_label(1), "1 byte");
        assert_eq!(size_label(500), "500 bytes");
        assert_eq!(size_label(1023), "1023 bytes");
        assert_eq!(size_label(2048), "2 kilobytes");
        assert_eq!(size_label(1536), "1.5 kilobytes");
        assert_eq!(size_label(1100), "1.07 kilobytes");
        assert_eq!(size_label(5 * 1024 * 1024), "5 megabytes");
    }

    #[test]
    fn images_are_recognized_by_extension() {
        assert!(is_image("photo.JPG"));
        assert!(is_image("dir/diagram.png"));
        assert!(is_image("anim.gif"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("png"));
    }

    #[test]
    fn urls_follow_the_route_layout() {
        let attachment = Attachment::new(PathBuf::from("/srv/wiki/docs/intro_files/chart.png"), "docs/intro");
        assert_eq!(attachment.name(), "chart.png");
        assert_eq!(attachment.nice_name(), "Chart");
        assert_eq!(attachment.link_path(), "/f/docs/intro/chart.png");
        assert_eq!(attachment.delete_path(), "/a/file/delete/docs/intro_files/chart.png");
        assert!(attachment.is_image());
    }

    #[test]
    fn stored_names_keep_the_extension() {
        assert_eq!(normalize_filename("My Photo.JPG"), "my_photo.JPG");
        assert_eq!(normalize_filename("!!!.png"), "file.png");
        assert_eq!(normalize_filename("readme"), "readme");
        assert_eq!(normalize_filename("README"), "r_e_a_d_m_e");
    }

    #[test]
    fn stored_names_never_nest() {
        assert_eq!(normalize_filename("reports/q1.png"), "q1.png");
        assert_eq!(flat_stem("reports/q1"), "reports_q1");
        assert_eq!(flat_stem("../up"), "up");
    }
}
