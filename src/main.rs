//! Coursera 课程下载器。
//!
//! 读取课程讲座页，按“章节 → 课程 → 资源”提取大纲，并把所有资源镜像到本地目录树，
//! 已存在的文件不会重复下载。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/课程路径等基础设施
//! - `network_parser`：登录会话、资源获取、相对链接补全
//! - `syllabus_parser`：讲座页大纲提取
//! - `download`：下载流程编排

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{error, info};

mod base_system;
mod download;
mod network_parser;
mod syllabus_parser;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::course_paths::{course_folder_path, course_name_from_url, normalize_course_arg};
use base_system::logging::{LogOptions, LogSystem};
use download::models::DownloadReport;
use download::{CourseDownloader, DownloadOptions};
use network_parser::network::CourseraSession;
use syllabus_parser::{Syllabus, SyllabusExtractor, SyllabusMarkers};

#[derive(Debug, Parser)]
#[command(name = "coursera-dl", version)]
#[command(about = "Download course videos/docs for offline use")]
struct Cli {
    /// 课程讲座页地址，或课程名（地址中的第 4 段，例如 algo-005）
    course: String,

    /// 登录用户名（邮箱）；不提供时不登录
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// 登录密码；也可通过 COURSERA_PASSWORD 环境变量提供
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// 保存根目录（覆盖 config.yml 中的 save_path）
    #[arg(short = 'd', long = "dest")]
    target_dir: Option<PathBuf>,

    /// 从本地 HTML 文件读取讲座页，而不是联网获取
    #[arg(long)]
    html: Option<PathBuf>,

    /// 只打印提取到的大纲，不下载
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// 每遇到新的绝对链接就以其目录作为相对链接的基准
    #[arg(long, default_value_t = false)]
    replace_base: bool,

    /// 整次下载的总时限（秒）
    #[arg(long)]
    run_timeout: Option<u64>,

    /// 数据目录（存放 config.yml 与 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log = init_logging(cli.debug, cli.data_dir.as_deref())?;

    // 日志系统在 main 返回前仍存活，致命错误要在这里写进 latest.log
    run(&cli).inspect_err(|err| error!(target: "startup", "{err:#}"))
}

fn run(cli: &Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_deref();
    let mut config: Config = load_or_create(data_dir).context("读取 config.yml 失败")?;
    if let Some(dir) = cli.target_dir.as_ref() {
        config.save_path = dir.to_string_lossy().to_string();
    }
    if cli.replace_base {
        config.replace_base = true;
    }
    if let Some(secs) = cli.run_timeout {
        config.run_timeout = secs;
    }

    let course_url = normalize_course_arg(&cli.course);
    let course_name = course_name_from_url(&course_url)
        .ok_or_else(|| anyhow!("无法从地址中识别课程名: {course_url}"))?;

    let session = CourseraSession::new(&config)?;
    if let Some(user) = cli.username.as_deref() {
        let password = cli
            .password
            .clone()
            .or_else(|| std::env::var("COURSERA_PASSWORD").ok())
            .ok_or_else(|| anyhow!("提供了用户名但没有密码（-p 或 COURSERA_PASSWORD）"))?;
        session.login(user, &password)?;
    }

    let html = match cli.html.as_ref() {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("读取讲座页文件失败: {}", path.display()))?,
        None => session.fetch_lecture_page(&course_url)?,
    };

    let syllabus = SyllabusExtractor::new(SyllabusMarkers::from(&config)).extract(&html);
    info!(
        target: "startup",
        "{}：共 {} 个章节，{} 个资源",
        course_name,
        syllabus.sections.len(),
        syllabus.resource_count()
    );

    if cli.dry_run {
        print_syllabus(&syllabus);
        return Ok(());
    }

    let root = course_folder_path(&config.save_root(), &course_name);
    let downloader = CourseDownloader::new(&session, DownloadOptions::from(&config));
    let report = downloader.download_course(&syllabus, &root, &course_url)?;
    print_summary(&report);
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&std::path::Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        ..LogOptions::default()
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}

fn print_syllabus(syllabus: &Syllabus) {
    for section in &syllabus.sections {
        println!("{}", section.name);
        for (idx, item) in section.items.iter().enumerate() {
            println!("  {:02} - {}", idx + 1, item.name);
            for url in &item.resources {
                println!("      {}", url);
            }
        }
    }
    for issue in &syllabus.issues {
        println!("! {}", issue);
    }
}

fn print_summary(report: &DownloadReport) {
    println!("\n===== 下载汇总 =====");
    println!("目录: {}", report.root.display());
    println!("新下载: {}", report.downloaded.len());
    println!("已存在: {}", report.already_present.len());
    println!("跳过: {}", report.skipped.len());
    for skipped in &report.skipped {
        println!(
            "  - [{} / {}] {}: {}",
            skipped.section, skipped.item, skipped.url, skipped.reason
        );
    }
    for dir in &report.failed_dirs {
        println!("  - 目录创建失败: {}", dir.display());
    }
    if report.is_complete() {
        println!("全部 {} 个资源已就绪", report.total());
    }
}
