pub mod fit;
pub mod gif;
pub mod split;

use std::path::Path;

use crate::error::ClipstackResult;

pub fn ensure_parent_dir(path: &Path) -> ClipstackResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
