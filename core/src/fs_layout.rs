use std::path::{Path, PathBuf};

/// Directory and file layout under a node's data directory:
///
/// ```text
/// <datadir>/database/genesis.json
/// <datadir>/database/block.db
/// ```
pub fn database_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("database")
}

pub fn genesis_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join("genesis.json")
}

pub fn block_db_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join("block.db")
}

pub fn init_data_dir_if_not_exists(data_dir: &Path) -> std::io::Result<()> {
    let db_dir = database_dir(data_dir);
    if !db_dir.exists() {
        std::fs::create_dir_all(&db_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted_under_database_subdir() {
        let root = Path::new("/tmp/somewhere");
        assert_eq!(
            genesis_path(root),
            Path::new("/tmp/somewhere/database/genesis.json")
        );
        assert_eq!(
            block_db_path(root),
            Path::new("/tmp/somewhere/database/block.db")
        );
    }
}
