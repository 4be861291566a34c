//! 下载相关的数据模型定义。
//!
//! 包含错误分类、单个下载目标与整次运行的汇总报告。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::fetcher::FetchError;

/// 只影响单个资源的错误：记录日志后跳过，继续处理后面的资源。
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("无法补全为可用的 http(s) 地址: {0}")]
    Unresolvable(String),
    #[error("响应是网页而不是可下载文件 ({0})")]
    NonDownloadable(String),
    #[error("获取失败: {0}")]
    Fetch(#[from] FetchError),
    #[error("无法确定文件名")]
    Unnamed,
    #[error("写入 {path} 失败: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("超过总时限，未处理")]
    DeadlineExceeded,
}

/// 让整次运行终止的错误。
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("无法创建下载根目录 {path}: {source}")]
    RootDirectory { path: PathBuf, source: io::Error },
}

/// 单个资源的本地目录与已补全的地址，只在一次获取中使用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub url: String,
}

#[derive(Debug)]
pub struct SkippedResource {
    pub section: String,
    pub item: String,
    pub url: String,
    pub reason: ResourceError,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub root: PathBuf,
    pub downloaded: Vec<PathBuf>,
    pub already_present: Vec<PathBuf>,
    pub skipped: Vec<SkippedResource>,
    /// 因创建失败而整体跳过的目录
    pub failed_dirs: Vec<PathBuf>,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.downloaded.len() + self.already_present.len() + self.skipped.len()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed_dirs.is_empty()
    }
}

/// 单个资源的结局。
#[derive(Debug)]
pub(crate) enum ResourceOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
}
