//! `create_file`: write a text file into the workspace directory.
//!
//! Input is `filename|content`, split on the first `|`. Only the final path
//! component of the filename is used, so writes cannot leave the workspace.

use std::path::Path;

use tracing::{debug, warn};

use crate::files::{CreatedFile, CreatedFiles};

pub const FORMAT_ERROR: &str = "Error: Input must be in format 'filename|content'";

/// Write the file and record it in `ledger` on success.
pub async fn create_file(workspace_dir: &Path, input: &str, ledger: &mut CreatedFiles) -> String {
    let Some((raw_name, content)) = input.split_once('|') else {
        return FORMAT_ERROR.into();
    };

    let name = match sanitize_file_name(raw_name) {
        Some(name) => name,
        None => {
            return format!("Error creating file: '{}' is not a valid file name", raw_name.trim());
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(workspace_dir).await {
        return format!("Error creating file: {e}");
    }

    let path = workspace_dir.join(&name);
    match tokio::fs::write(&path, content).await {
        Ok(()) => {
            debug!(tool = "create_file", file = %name, bytes = content.len(), "File written");
            ledger.push(CreatedFile::new(name.clone(), content));
            format!("Successfully created file: {name}")
        }
        Err(e) => {
            warn!(tool = "create_file", file = %name, error = %e, "File write failed");
            format!("Error creating file: {e}")
        }
    }
}

/// Trim and reduce to the last path component. `None` for empty, `.`, `..`.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let base = Path::new(trimmed).file_name()?.to_str()?;
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}
