//! 输出产物持久化
//!
//! 每个产物都是对应内存结构的直接 JSON 序列化，写到输出目录下。

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::error::{AppResult, FileError};

/// 把结构序列化为带缩进的 JSON 并写入文件
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FileError::CreateDirFailed {
                    path: parent.display().to_string(),
                    source,
                })?;
        }
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(crate::error::SchemaError::from)?;
    fs::write(path, json)
        .await
        .map_err(|source| FileError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;

    info!("💾 已保存: {}", path.display());
    Ok(())
}

/// 输出目录下的产物路径
pub fn artifact_path(output_dir: &str, file_name: &str) -> PathBuf {
    PathBuf::from(output_dir).join(file_name)
}
