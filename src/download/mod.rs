//! 下载流程模块入口。
//!
//! 子模块：
//! - `fetcher`      — 资源获取接口与响应头解读
//! - `models`       — 错误分类、下载目标与汇总报告
//! - `progress`     — CLI 进度条
//! - `orchestrator` — 按大纲建目录、补全链接、逐个下载

pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub(crate) mod progress;

pub use orchestrator::{CourseDownloader, DownloadOptions};
