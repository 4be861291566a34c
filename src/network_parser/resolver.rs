//! 相对链接补全。
//!
//! 解析器持有一个“当前基准”（scheme + host + 目录），按出现顺序逐个处理页面里的链接：
//! - 尚无基准时，遇到的第一个绝对链接成为基准；
//! - `replace_base` 开启时，每个新的绝对链接都会替换基准；
//! - 其余绝对链接原样返回，不改变基准；
//! - `../x` 去掉基准最后一级目录，`/x` 回到站点根，`./x` 与 `x` 直接拼接。
//!
//! 无法补全的输入原样返回，由调用方判断结果是否可用。

use std::sync::OnceLock;

use regex::Regex;

fn re_absolute() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*://)(.*)$").unwrap())
}

pub fn is_absolute(url: &str) -> bool {
    re_absolute().is_match(url)
}

/// 规范化后的基准：`scheme://host/dir1/dir2/`，不含文件名、查询串与锚点。
#[derive(Debug, Clone, PartialEq, Eq)]
struct Base {
    scheme: String,
    host: String,
    dirs: Vec<String>,
}

impl Base {
    fn parse(url: &str) -> Option<Self> {
        let caps = re_absolute().captures(url)?;
        let scheme = caps.get(1)?.as_str().to_string();
        let rest = caps.get(2)?.as_str();
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let (host, path) = match rest.split_once('/') {
            Some((host, path)) => (host, path),
            None => (rest, ""),
        };
        if host.is_empty() {
            return None;
        }

        // 最后一段视为文件名（以 `/` 结尾时为空串），丢弃
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        let dirs = segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            scheme,
            host: host.to_string(),
            dirs,
        })
    }

    fn root(&self) -> String {
        format!("{}{}", self.scheme, self.host)
    }

    fn render_dirs(&self, dirs: &[String]) -> String {
        let mut out = self.root();
        out.push('/');
        for dir in dirs {
            out.push_str(dir);
            out.push('/');
        }
        out
    }

    fn render(&self) -> String {
        self.render_dirs(&self.dirs)
    }

    fn parent(&self) -> Option<String> {
        let (_, parent) = self.dirs.split_last()?;
        Some(self.render_dirs(parent))
    }
}

/// 一次课程下载内独占使用的链接解析状态。
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base: Option<Base>,
    replace_base: bool,
}

impl UrlResolver {
    /// `seed` 通常是课程讲座页地址；为空或不是绝对地址时，第一个遇到的绝对链接会成为基准。
    pub fn new(seed: &str, replace_base: bool) -> Self {
        Self {
            base: Base::parse(seed),
            replace_base,
        }
    }

    pub fn base(&self) -> Option<String> {
        self.base.as_ref().map(Base::render)
    }

    pub fn resolve(&mut self, url: &str) -> String {
        let absolute = is_absolute(url);

        if self.base.is_none() || (self.replace_base && absolute) {
            if let Some(base) = Base::parse(url) {
                self.base = Some(base);
            }
            return url.to_string();
        }

        if absolute {
            return url.to_string();
        }

        let Some(base) = self.base.as_ref() else {
            return url.to_string();
        };

        if let Some(rest) = url.strip_prefix("../") {
            // 已经到站点根，没有上级目录可去，按坏链处理
            return match base.parent() {
                Some(parent) => parent + rest,
                None => url.to_string(),
            };
        }

        if url.starts_with("//") {
            // 协议相对地址沿用基准的协议
            return format!("{}{}", base.scheme.trim_end_matches('/'), url);
        }

        if url.starts_with('/') {
            return base.root() + url;
        }

        let rest = url.strip_prefix("./").unwrap_or(url);
        base.render() + rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> UrlResolver {
        UrlResolver::new("https://host/a/b/", false)
    }

    #[test]
    fn seed_is_reduced_to_its_directory() {
        let r = UrlResolver::new("https://class.example.com/course/lecture/index?x=a/b#top", false);
        assert_eq!(
            r.base().as_deref(),
            Some("https://class.example.com/course/lecture/")
        );
        let r = UrlResolver::new("https://host", false);
        assert_eq!(r.base().as_deref(), Some("https://host/"));
    }

    #[test]
    fn relative_forms_compose_against_base() {
        let mut r = resolver();
        assert_eq!(r.resolve("c/d.pdf"), "https://host/a/b/c/d.pdf");
        assert_eq!(r.resolve("./c/d.pdf"), "https://host/a/b/c/d.pdf");
        assert_eq!(r.resolve("../e.pdf"), "https://host/a/e.pdf");
        assert_eq!(r.resolve("/root.pdf"), "https://host/root.pdf");
        assert_eq!(r.resolve("//cdn.host/x.mp4"), "https://cdn.host/x.mp4");
    }

    #[test]
    fn parent_of_root_is_left_unresolved() {
        let mut r = UrlResolver::new("https://host/index.html", false);
        assert_eq!(r.resolve("../up.pdf"), "../up.pdf");
        assert_eq!(r.base().as_deref(), Some("https://host/"));
    }

    #[test]
    fn absolute_passthrough_keeps_base() {
        let mut r = resolver();
        let url = "http://other.org/x/y/z.mp4";
        assert_eq!(r.resolve(url), url);
        assert_eq!(r.resolve(url), url);
        assert_eq!(r.base().as_deref(), Some("https://host/a/b/"));
        assert_eq!(r.resolve("n.txt"), "https://host/a/b/n.txt");
    }

    #[test]
    fn replace_mode_adopts_each_absolute_url() {
        let mut r = UrlResolver::new("https://host/a/b/", true);
        assert_eq!(r.resolve("https://cdn.org/v/1.mp4"), "https://cdn.org/v/1.mp4");
        assert_eq!(r.base().as_deref(), Some("https://cdn.org/v/"));
        assert_eq!(r.resolve("2.mp4"), "https://cdn.org/v/2.mp4");
    }

    #[test]
    fn first_absolute_url_anchors_an_unseeded_resolver() {
        let mut r = UrlResolver::new("", false);
        assert_eq!(r.resolve("rel.pdf"), "rel.pdf");
        assert!(r.base().is_none());

        assert_eq!(r.resolve("https://host/p/q.html"), "https://host/p/q.html");
        assert_eq!(r.resolve("rel.pdf"), "https://host/p/rel.pdf");
        assert_eq!(r.resolve("https://elsewhere/z/"), "https://elsewhere/z/");
        assert_eq!(r.base().as_deref(), Some("https://host/p/"));
    }

    #[test]
    fn empty_input_yields_current_base() {
        let mut r = resolver();
        assert_eq!(r.resolve(""), "https://host/a/b/");
    }

    #[test]
    fn lecture_page_scenario() {
        let mut r = UrlResolver::new("https://class.example.com/course/lecture/index", false);
        assert_eq!(
            r.resolve("slides.pdf"),
            "https://class.example.com/course/lecture/slides.pdf"
        );
        assert_eq!(
            r.resolve("../shared/notes.pdf"),
            "https://class.example.com/course/shared/notes.pdf"
        );
    }
}
