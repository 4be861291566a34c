//! 全局配置结构（Config）与默认值，以及文件名清理。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 保存配置
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_true")]
    pub show_progress: bool,

    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub run_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    // 链接解析
    #[serde(default = "default_false")]
    pub replace_base: bool,

    // 页面结构标记
    #[serde(default = "default_section_header_tag")]
    pub section_header_tag: String,
    #[serde(default = "default_section_header_class")]
    pub section_header_class: String,
    #[serde(default = "default_item_list_tag")]
    pub item_list_tag: String,
    #[serde(default = "default_item_tag")]
    pub item_tag: String,
    #[serde(default = "default_resource_container_tag")]
    pub resource_container_tag: String,
    #[serde(default = "default_resource_container_class")]
    pub resource_container_class: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            show_progress: default_true(),
            request_timeout: default_request_timeout(),
            run_timeout: 0,
            user_agent: default_user_agent(),
            default_chunk_size: default_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
            replace_base: default_false(),
            section_header_tag: default_section_header_tag(),
            section_header_class: default_section_header_class(),
            item_list_tag: default_item_list_tag(),
            item_tag: default_item_tag(),
            resource_container_tag: default_resource_container_tag(),
            resource_container_class: default_resource_container_class(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 14] = [
            FieldMeta {
                name: "save_path",
                description: "下载保存根目录（留空为当前目录）",
            },
            FieldMeta {
                name: "show_progress",
                description: "是否显示下载进度条",
            },
            FieldMeta {
                name: "request_timeout",
                description: "单次请求超时时间（秒）",
            },
            FieldMeta {
                name: "run_timeout",
                description: "整次下载的总时限（秒），0 表示不限制",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "default_chunk_size",
                description: "响应未给出 Content-Length 时的写入块大小（字节）",
            },
            FieldMeta {
                name: "max_chunk_size",
                description: "写入块大小上限（字节）",
            },
            FieldMeta {
                name: "replace_base",
                description: "遇到新的绝对链接时是否以其目录作为后续相对链接的基准",
            },
            FieldMeta {
                name: "section_header_tag",
                description: "章节（周）标题的标签名",
            },
            FieldMeta {
                name: "section_header_class",
                description: "章节（周）标题的 class",
            },
            FieldMeta {
                name: "item_list_tag",
                description: "标题之后课程列表的标签名",
            },
            FieldMeta {
                name: "item_tag",
                description: "课程列表中单个课程的标签名",
            },
            FieldMeta {
                name: "resource_container_tag",
                description: "课程资源容器的标签名",
            },
            FieldMeta {
                name: "resource_container_class",
                description: "课程资源容器的 class",
            },
        ];
        &FIELDS
    }
}

impl Config {
    /// 下载根目录；未配置时为当前目录。
    pub fn save_root(&self) -> PathBuf {
        let trimmed = self.save_path.trim();
        if trimmed.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(trimmed)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        (self.run_timeout > 0).then(|| Duration::from_secs(self.run_timeout))
    }
}

/// 去掉路径中不允许出现的字符（`:` `?` `\` `/`），并去掉首尾空白。
///
/// 结果可能为空，调用方自行决定回退名称。
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ':' | '?' | '\\' | '/'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// 能否直接作为一级路径名：非空，且不是 `.` / `..`。
pub fn is_usable_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

fn default_false() -> bool {
    false
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}

fn default_chunk_size() -> usize {
    16 * 1024
}

fn default_max_chunk_size() -> usize {
    8 * 1024 * 1024
}

fn default_section_header_tag() -> String {
    "h3".to_string()
}

fn default_section_header_class() -> String {
    "list_header".to_string()
}

fn default_item_list_tag() -> String {
    "ul".to_string()
}

fn default_item_tag() -> String {
    "li".to_string()
}

fn default_resource_container_tag() -> String {
    "div".to_string()
}

fn default_resource_container_class() -> String {
    "item_resource".to_string()
}
