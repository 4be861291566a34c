//! 资源获取接口与响应头解读。
//!
//! 编排层只依赖 [`Fetcher`]：给一个地址，拿回三个响应头和可顺序读取的正文。
//! 真实实现见 `network_parser::network::CourseraSession`，测试里用内存实现。

use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::base_system::context::{is_usable_name, sanitize_name};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("http status {status}")]
    Status { status: u16 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHeaders {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub content_length: Option<u64>,
}

pub struct FetchResponse {
    pub headers: ResourceHeaders,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        (**self).fetch(url)
    }
}

fn re_attachment_filename() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r#"attachment; filename="(.*?)""#).unwrap())
}

impl ResourceHeaders {
    /// 响应是否是网页（多半是登录页或错误页，而不是资源本身）。
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
            .unwrap_or(false)
    }

    /// `Content-Disposition: attachment; filename="..."` 中的文件名，已清理。
    pub fn attachment_filename(&self) -> Option<String> {
        let cd = self.content_disposition.as_deref()?;
        let caps = re_attachment_filename().captures(cd)?;
        let name = sanitize_name(caps.get(1)?.as_str().trim_start());
        is_usable_name(&name).then_some(name)
    }

    /// 写入块大小：优先按声明的长度，缺失时用默认值，并限制上限。
    pub fn chunk_size(&self, default_chunk: usize, max_chunk: usize) -> usize {
        let declared = self
            .content_length
            .filter(|len| *len > 0)
            .map(|len| usize::try_from(len).unwrap_or(usize::MAX));
        declared
            .unwrap_or(default_chunk)
            .clamp(1, max_chunk.max(1))
    }
}

/// 从地址最后一段推出文件名（去掉查询串与锚点，百分号解码）。
pub fn filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(last)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| last.to_string());
    // 解码后可能又出现 `/`
    let tail = decoded.rsplit('/').next().unwrap_or_default();
    let name = sanitize_name(tail);
    is_usable_name(&name).then_some(name)
}

/// 依次尝试响应头与地址，返回第一个可用的文件名。
pub fn resolve_filename(headers: &ResourceHeaders, url: &str) -> Option<String> {
    headers
        .attachment_filename()
        .or_else(|| filename_from_url(url))
}

/// `.txt` 以文本方式写入，其余一律按二进制原样写入。
pub fn is_text_file(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}
