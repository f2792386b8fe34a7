//! Image uploads
//!
//! Files are checked against an extension allow-list, stored under a
//! sanitized name in a single directory and served back by that name.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Longest stored name, in bytes; the usual filesystem limit for one component
pub const MAX_FILENAME_LEN: usize = 255;

/// True if the last extension of `filename` is on the allow-list (any case)
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Reduce a client-supplied filename to something safe to join onto the
/// upload directory: accented letters are decomposed (NFKD) and only the
/// ASCII part kept, path separators become spaces, whitespace runs become
/// `_`, only `[A-Za-z0-9_.-]` survive, and leading or trailing `.`/`_` are
/// stripped. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Filesystem store for uploaded images
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!("Upload store at {:?}", dir);
        Ok(Self { dir })
    }

    /// Validate and store an upload, returning the name it is served under.
    ///
    /// Every rejection happens before anything touches the filesystem.
    pub async fn save(&self, filename: Option<&str>, data: Bytes) -> Result<String> {
        let filename = match filename {
            Some(name) if !name.is_empty() => name,
            _ => return Err(Error::validation("No selected file")),
        };

        if !allowed_file(filename) {
            return Err(Error::validation("Invalid file extension"));
        }

        let safe_name = secure_filename(filename);
        if safe_name.is_empty()
            || safe_name.len() > MAX_FILENAME_LEN
            || !allowed_file(&safe_name)
        {
            return Err(Error::validation("Invalid file name"));
        }

        fs::write(self.dir.join(&safe_name), &data).await?;
        info!("Stored upload {} ({} bytes)", safe_name, data.len());
        Ok(safe_name)
    }

    /// Read back a stored upload with its content type
    pub async fn open(&self, filename: &str) -> Result<(Bytes, &'static str)> {
        // Anything that would not survive sanitizing was never stored by us
        if filename.is_empty() || secure_filename(filename) != filename {
            debug!("Rejected upload lookup for {:?}", filename);
            return Err(Error::NotFound);
        }

        match fs::read(self.dir.join(filename)).await {
            Ok(data) => Ok((Bytes::from(data), content_type_for(filename))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
