//! 按大纲顺序建立目录并逐个下载资源。
//!
//! 目录结构：`<课程目录>/<章节>/<NN - 课程>/<文件>`，`NN` 为课程在章节内从 1 开始的两位序号。
//! 全程串行；单个资源、单个目录的失败只记录并跳过，唯一中止整次运行的是课程目录无法创建。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use url::Url;

use super::fetcher::{FetchError, Fetcher, is_text_file, resolve_filename};
use super::models::{
    DownloadError, DownloadReport, DownloadTarget, ResourceError, ResourceOutcome,
    SkippedResource,
};
use super::progress::ProgressReporter;
use crate::base_system::context::Config;
use crate::network_parser::resolver::UrlResolver;
use crate::syllabus_parser::Syllabus;

#[cfg(windows)]
const LINE_ENDING: &[u8] = b"\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &[u8] = b"\n";

const TEMP_PREFIX: &str = ".download-";
const TEMP_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub replace_base: bool,
    pub default_chunk_size: usize,
    pub max_chunk_size: usize,
    pub deadline: Option<Duration>,
    pub show_progress: bool,
}

impl From<&Config> for DownloadOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            replace_base: cfg.replace_base,
            default_chunk_size: cfg.default_chunk_size,
            max_chunk_size: cfg.max_chunk_size,
            deadline: cfg.run_deadline(),
            show_progress: cfg.show_progress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Text,
    Binary,
}

/// 只认可带主机名的 http/https 地址。
pub fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// `mailto:`、`javascript:` 之类带非 http 协议的链接不参与补全。
fn has_foreign_scheme(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| !matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub fn item_dir_name(index: usize, item_name: &str) -> String {
    format!("{index:02} - {item_name}")
}

pub struct CourseDownloader<F: Fetcher> {
    fetcher: F,
    options: DownloadOptions,
}

impl<F: Fetcher> CourseDownloader<F> {
    pub fn new(fetcher: F, options: DownloadOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn download_course(
        &self,
        syllabus: &Syllabus,
        course_root: &Path,
        course_url: &str,
    ) -> Result<DownloadReport, DownloadError> {
        fs::create_dir_all(course_root).map_err(|source| DownloadError::RootDirectory {
            path: course_root.to_path_buf(),
            source,
        })?;
        info!(target: "download", "保存到: {}", course_root.display());

        let started = Instant::now();
        let mut resolver = UrlResolver::new(course_url, self.options.replace_base);
        debug!(target: "download", "相对链接基准: {:?}", resolver.base());
        let mut report = DownloadReport {
            root: course_root.to_path_buf(),
            ..DownloadReport::default()
        };
        let mut progress =
            ProgressReporter::new(syllabus.resource_count(), self.options.show_progress);

        for section in &syllabus.sections {
            let section_dir = course_root.join(&section.name);
            if let Err(err) = fs::create_dir_all(&section_dir) {
                warn!(target: "download", "创建目录失败 {}: {}", section_dir.display(), err);
                report.failed_dirs.push(section_dir);
                progress.inc(section.items.iter().map(|i| i.resources.len()).sum());
                continue;
            }

            for (idx, item) in section.items.iter().enumerate() {
                let item_dir = section_dir.join(item_dir_name(idx + 1, &item.name));
                if let Err(err) = fs::create_dir_all(&item_dir) {
                    warn!(target: "download", "创建目录失败 {}: {}", item_dir.display(), err);
                    report.failed_dirs.push(item_dir);
                    progress.inc(item.resources.len());
                    continue;
                }
                remove_stale_parts(&item_dir);
                progress.set_item(&item.name);
                info!(target: "download", "{} / {}", section.name, item.name);

                for raw in &item.resources {
                    let outcome = if self.deadline_passed(started) {
                        Err(ResourceError::DeadlineExceeded)
                    } else {
                        resolve_resource(&mut resolver, raw).and_then(|url| {
                            self.fetch_into(&DownloadTarget {
                                dir: item_dir.clone(),
                                url,
                            })
                        })
                    };

                    match outcome {
                        Ok(ResourceOutcome::Downloaded(path)) => report.downloaded.push(path),
                        Ok(ResourceOutcome::AlreadyPresent(path)) => {
                            info!(target: "download", "  - {} 已存在，跳过", path.display());
                            report.already_present.push(path);
                        }
                        Err(reason) => {
                            warn!(target: "download", "  - 跳过 {}: {}", raw, reason);
                            report.skipped.push(SkippedResource {
                                section: section.name.clone(),
                                item: item.name.clone(),
                                url: raw.clone(),
                                reason,
                            });
                        }
                    }
                    progress.inc(1);
                }
            }
        }

        progress.finish();
        info!(
            target: "download",
            "完成：新下载 {} 个，已存在 {} 个，跳过 {} 个，目录失败 {} 个，用时 {:.1}s",
            report.downloaded.len(),
            report.already_present.len(),
            report.skipped.len(),
            report.failed_dirs.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.options
            .deadline
            .map(|limit| started.elapsed() >= limit)
            .unwrap_or(false)
    }

    fn fetch_into(&self, target: &DownloadTarget) -> Result<ResourceOutcome, ResourceError> {
        info!(target: "download", "  - 下载资源: {}", target.url);
        let resp = self.fetcher.fetch(&target.url)?;

        let file_name =
            resolve_filename(&resp.headers, &target.url).ok_or(ResourceError::Unnamed)?;
        let path = target.dir.join(&file_name);
        if path.exists() {
            return Ok(ResourceOutcome::AlreadyPresent(path));
        }

        if resp.headers.is_html() {
            let ct = resp.headers.content_type.clone().unwrap_or_default();
            return Err(ResourceError::NonDownloadable(ct));
        }

        let chunk = resp
            .headers
            .chunk_size(self.options.default_chunk_size, self.options.max_chunk_size);
        let mode = if is_text_file(&file_name) {
            WriteMode::Text
        } else {
            WriteMode::Binary
        };
        debug!(target: "download", "写入 {} (块 {} 字节, {:?})", path.display(), chunk, mode);

        stream_to_file(resp.body, &target.dir, path, chunk, mode)
    }
}

/// 上次运行被强制中断时，临时文件来不及清理，会以 `.download-*.part` 留在课程目录里。
fn remove_stale_parts(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
            continue;
        }
        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => debug!(target: "download", "清理残留临时文件: {}", path.display()),
            Err(e) => debug!(target: "download", "清理残留临时文件失败 {}: {}", path.display(), e),
        }
    }
}

fn resolve_resource(resolver: &mut UrlResolver, raw: &str) -> Result<String, ResourceError> {
    let raw = raw.trim();
    if has_foreign_scheme(raw) {
        return Err(ResourceError::Unresolvable(raw.to_string()));
    }

    // 绝对地址同样经过解析器，替换模式下需要用它更新基准
    let resolved = resolver.resolve(raw);
    if is_valid_url(&resolved) {
        if resolved != raw {
            debug!(target: "download", "{} → {}", raw, resolved);
        }
        Ok(resolved)
    } else {
        Err(ResourceError::Unresolvable(resolved))
    }
}

/// 先写入同目录下的临时文件，写完后以“不覆盖”方式改名为目标文件。
/// 中途失败不会在目标位置留下残缺文件；目标已被占用时视为已存在。
fn stream_to_file(
    mut body: Box<dyn Read + Send>,
    dir: &Path,
    path: PathBuf,
    chunk: usize,
    mode: WriteMode,
) -> Result<ResourceOutcome, ResourceError> {
    let io_err = |source: io::Error| ResourceError::Io {
        path: path.clone(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(io_err)?;

    let mut buf = vec![0u8; chunk];
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ResourceError::Fetch(FetchError::Transport(e.to_string()))),
        };
        let out = tmp.as_file_mut();
        let written = match mode {
            WriteMode::Binary => out.write_all(&buf[..n]),
            WriteMode::Text => write_text_chunk(out, &buf[..n], LINE_ENDING),
        };
        written.map_err(io_err)?;
    }
    tmp.as_file_mut().flush().map_err(io_err)?;

    match tmp.persist_noclobber(&path) {
        Ok(_) => Ok(ResourceOutcome::Downloaded(path)),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            Ok(ResourceOutcome::AlreadyPresent(path))
        }
        Err(e) => Err(io_err(e.error)),
    }
}

/// 文本方式写入：每个 `\n` 写成平台换行符。
fn write_text_chunk(out: &mut impl Write, chunk: &[u8], line_ending: &[u8]) -> io::Result<()> {
    if line_ending == b"\n" {
        return out.write_all(chunk);
    }
    for piece in chunk.split_inclusive(|b| *b == b'\n') {
        match piece.strip_suffix(b"\n") {
            Some(line) => {
                out.write_all(line)?;
                out.write_all(line_ending)?;
            }
            None => out.write_all(piece)?,
        }
    }
    Ok(())
}
