//! Persisted hash markers recording the last fingerprint applied to a destination folder
//!
//! A marker is a small properties-style text file:
//!
//! ```text
//! #File Transfer Utility Property File
//! #Sat, 17 Oct 2026 10:15:00 +0200
//! hashcode=-1234567
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use treesync_types::{Error, FolderHash, Result};

/// File name of the marker inside each destination folder
pub const MARKER_FILE_NAME: &str = "hashcode.transfer";

/// Key holding the fingerprint inside the marker
pub const MARKER_KEY: &str = "hashcode";

const MARKER_HEADER: &str = "File Transfer Utility Property File";
const TEMP_FILE_NAME: &str = ".hashcode.transfer.tmp";

/// Whether `name` belongs to the marker machinery and must not be scanned or copied
pub fn is_marker_name(name: &str) -> bool {
    name == MARKER_FILE_NAME || name == TEMP_FILE_NAME
}

/// Path of the marker file inside `dir`
pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE_NAME)
}

/// Read the fingerprint recorded in `dir`.
///
/// Missing, unreadable or malformed markers all yield `None`.
pub fn read_marker(dir: &Path) -> Option<FolderHash> {
    let path = marker_path(dir);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No readable marker at {}: {}", path.display(), e);
            return None;
        }
    };

    let hash = parse_marker(&content);
    if hash.is_none() {
        debug!("Ignoring malformed marker at {}", path.display());
    }
    hash
}

/// Record `hash` as the fingerprint applied to `dir`, replacing any previous marker
pub fn write_marker(dir: &Path, hash: FolderHash) -> Result<()> {
    let temp = dir.join(TEMP_FILE_NAME);
    let target = marker_path(dir);

    fs::write(&temp, render_marker(hash)).map_err(|e| Error::io_at("write", &temp, &e))?;
    if let Err(e) = fs::rename(&temp, &target) {
        let _ = fs::remove_file(&temp);
        return Err(Error::marker(
            &target,
            format!("failed to replace marker: {}", e),
        ));
    }

    debug!("Wrote marker {} to {}", hash, target.display());
    Ok(())
}

/// Extract the fingerprint from marker text
pub fn parse_marker(content: &str) -> Option<FolderHash> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            Some((line[..split].trim(), line[split + 1..].trim()))
        })
        .find(|(key, _)| *key == MARKER_KEY)
        .and_then(|(_, value)| value.parse().ok())
}

/// Marker text for `hash`
pub fn render_marker(hash: FolderHash) -> String {
    format!(
        "#{}\n#{}\n{}={}\n",
        MARKER_HEADER,
        chrono::Local::now().to_rfc2822(),
        MARKER_KEY,
        hash
    )
}
