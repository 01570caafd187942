use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub root: PathBuf,
    pub users_file: PathBuf,
    pub channels_file: PathBuf,
    pub groups_file: PathBuf,
    pub dms_file: PathBuf,
    pub mpims_file: PathBuf,
}

impl ArchivePaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            users_file: root.join("users.json"),
            channels_file: root.join("channels.json"),
            groups_file: root.join("groups.json"),
            dms_file: root.join("dms.json"),
            mpims_file: root.join("mpims.json"),
        }
    }

    /// Directory holding the day files of one conversation.
    pub fn conversation_dir(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }

    pub fn tables(&self) -> [(&'static str, &Path); 5] {
        [
            ("users", self.users_file.as_path()),
            ("channels", self.channels_file.as_path()),
            ("groups", self.groups_file.as_path()),
            ("dms", self.dms_file.as_path()),
            ("mpims", self.mpims_file.as_path()),
        ]
    }

    /// Workspace name guessed from the export directory name; used for permalinks.
    pub fn slack_name(&self) -> String {
        self.root
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("slack")
            .to_string()
    }
}
