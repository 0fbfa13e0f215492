use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ConfigError, Result};

const CONFIG_FILE_NAME: &str = "config.json";

/// 配置文件路径：`~/.<tool_name>/config.json`
pub fn default_config_path(tool_name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine home directory",
        ))
    })?;
    Ok(home.join(format!(".{}", tool_name)).join(CONFIG_FILE_NAME))
}

/// JSON 文件持久化
#[derive(Debug, Clone, Default)]
pub struct Storage {
    file_path: PathBuf,
}

impl Storage {
    pub fn new(file_path: &Path) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// 读取文件内容，文件不存在返回 None
    pub fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.file_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 以两空格缩进序列化后写入，文件权限仅限所有者读写
    pub fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;

        // 确保父目录存在
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        write_private(&self.file_path, json.as_bytes())?;
        tracing::debug!("配置已写入 {}", self.file_path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // 已存在的文件不受 mode 影响，显式收紧
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::new(&tmp.path().join("config.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn test_write_creates_parent_dirs_and_indents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/config.json");
        let storage = Storage::new(&path);

        storage
            .write(&serde_json::json!({"current_context": "a"}))
            .unwrap();

        let content = storage.read().unwrap().unwrap();
        assert_eq!(content, "{\n  \"current_context\": \"a\"\n}");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        Storage::new(&path).write(&serde_json::json!({})).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_default_config_path_uses_tool_name() {
        if let Ok(path) = default_config_path("mytool") {
            assert!(path.ends_with(".mytool/config.json"));
        }
    }
}
