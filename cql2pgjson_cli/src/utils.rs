// SPDX-License-Identifier: AGPL-3.0-or-later

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use path_clean::PathClean;

/// Returns the absolute path of a file or directory.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("Could not determine current directory")?
            .join(path)
    }
    .clean();

    Ok(absolute_path)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::absolute_path;

    #[test]
    fn cleans_absolute_paths() {
        assert_eq!(
            absolute_path("/etc/cql2pgjson/../schema.json").unwrap(),
            Path::new("/etc/schema.json")
        );
    }

    #[test]
    fn joins_relative_paths() {
        let path = absolute_path("./schema.json").unwrap();

        assert!(path.is_absolute());
        assert!(path.ends_with("schema.json"));
    }
}
