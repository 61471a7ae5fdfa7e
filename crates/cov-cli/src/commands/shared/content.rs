use anyhow::Context;

use crate::cli::root_commands::ContentSource;

/// Content bytes from `--content` or `--file`, if either was given.
pub fn read_content(source: &ContentSource) -> anyhow::Result<Option<Vec<u8>>> {
    if let Some(text) = &source.content {
        return Ok(Some(text.clone().into_bytes()));
    }
    match &source.file {
        Some(path) => std::fs::read(path)
            .map(Some)
            .with_context(|| format!("failed to read content from {}", path.display())),
        None => Ok(None),
    }
}
