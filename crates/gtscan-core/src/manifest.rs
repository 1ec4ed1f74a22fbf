//! 清单加载：从 TOML 清单与主题目录构建待扫描来源
//!
//! 这里属于“外部协作方”一侧：读不到的来源只记录警告并跳过，
//! 只有清单本身格式错误（未知分类、字段缺失）才返回错误。
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::scan::{Content, Inventory};
use crate::types::SourceKind;

/// 主题目录中需要检查的文件
pub const THEME_FILES: [&str; 4] = ["header.php", "footer.php", "functions.php", "index.php"];

/// 来源内容格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceEntry {
    pub category: String,
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<SourceFormat>,
}

/// 顶层清单结构
#[derive(Debug, Clone, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    pub active_extensions: Vec<String>,
    #[serde(default)]
    pub source: Vec<SourceEntry>,
}

/// 加载清单；`path` 字段相对于清单所在目录
pub fn load_manifest(path: &Path) -> Result<Inventory> {
    let txt = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ManifestFile = toml::from_str(&txt).map_err(|source| Error::ManifestParse {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut inv = Inventory::new();
    inv.active_extensions = parsed.active_extensions;
    for e in parsed.source {
        let kind: SourceKind = e.category.parse()?;
        // 页面构建器数据默认按 JSON 解析，其余按纯文本
        let format = e.format.unwrap_or(match kind {
            SourceKind::PageBuilderData => SourceFormat::Json,
            _ => SourceFormat::Text,
        });
        let content = match (e.text, e.path) {
            (Some(text), None) => match format {
                SourceFormat::Text => Content::Text(text),
                SourceFormat::Json => Content::EncodedDocument(text.into_bytes()),
            },
            (None, Some(rel)) => {
                let full = base.join(rel);
                let bytes = match std::fs::read(&full) {
                    Ok(b) => b,
                    Err(err) => {
                        warn!(path = %full.display(), %err, "unreadable source, skipping");
                        continue;
                    }
                };
                match format {
                    SourceFormat::Text => Content::Text(String::from_utf8_lossy(&bytes).into_owned()),
                    SourceFormat::Json => Content::EncodedDocument(bytes),
                }
            }
            (Some(_), Some(_)) => {
                return Err(Error::ManifestEntry { id: e.id, reason: "both `text` and `path` are set" })
            }
            (None, None) => {
                return Err(Error::ManifestEntry { id: e.id, reason: "one of `text` or `path` is required" })
            }
        };
        match e.label {
            Some(label) => inv.push_labeled(kind, e.id, label, content),
            None => inv.push(kind, e.id, content),
        }
    }
    Ok(inv)
}

/// 收集主题目录顶层的模板文件（按 `THEME_FILES` 的声明顺序）
pub fn collect_theme_files(theme_dir: &Path, inv: &mut Inventory) {
    let mut files: Vec<(usize, PathBuf)> = vec![];
    for entry in WalkDir::new(theme_dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(dir = %theme_dir.display(), %err, "theme directory entry unreadable");
                continue;
            }
        };
        let rank = entry.file_name().to_str().and_then(|n| THEME_FILES.iter().position(|f| *f == n));
        if let Some(rank) = rank {
            if entry.file_type().is_file() {
                files.push((rank, entry.into_path()));
            }
        }
    }
    files.sort_by_key(|(rank, _)| *rank);

    for (_, path) in files {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                inv.push(SourceKind::ThemeFile, path.display().to_string(), Content::Text(text));
            }
            Err(err) => warn!(path = %path.display(), %err, "unreadable theme file, skipping"),
        }
    }
}
