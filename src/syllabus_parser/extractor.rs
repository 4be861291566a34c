//! 从讲座页 HTML 中提取课程大纲。
//!
//! 页面结构约定（标签与 class 均可在配置中修改）：
//!
//! ```text
//! <h3 class="list_header">Week 1</h3>
//! <ul>
//!   <li><a>Lecture 1</a>
//!       <div class="item_resource"><a href="slides.pdf">..</a> ...</div></li>
//! </ul>
//! ```
//!
//! 标题之后、下一个标题之前出现的第一个列表即该章节的课程列表。
//! 结构缺失只会记为 [`ExtractionIssue`]，不会让整个提取失败。

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::model::{ExtractionIssue, Item, Section, Syllabus};
use crate::base_system::context::{Config, is_usable_name, sanitize_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyllabusMarkers {
    pub header_tag: String,
    pub header_class: String,
    pub list_tag: String,
    pub item_tag: String,
    pub container_tag: String,
    pub container_class: String,
}

impl Default for SyllabusMarkers {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SyllabusMarkers {
    fn from(cfg: &Config) -> Self {
        Self {
            header_tag: cfg.section_header_tag.trim().to_ascii_lowercase(),
            header_class: cfg.section_header_class.trim().to_string(),
            list_tag: cfg.item_list_tag.trim().to_ascii_lowercase(),
            item_tag: cfg.item_tag.trim().to_ascii_lowercase(),
            container_tag: cfg.resource_container_tag.trim().to_ascii_lowercase(),
            container_class: cfg.resource_container_class.trim().to_string(),
        }
    }
}

fn matches(el: &ElementRef<'_>, tag: &str, class: &str) -> bool {
    el.value().name() == tag && (class.is_empty() || el.value().classes().any(|c| c == class))
}

fn collapsed_text(el: &ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn descendants_named<'a, 'b>(
    el: ElementRef<'a>,
    tag: &'b str,
) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == tag)
}

pub struct SyllabusExtractor {
    markers: SyllabusMarkers,
}

impl SyllabusExtractor {
    pub fn new(markers: SyllabusMarkers) -> Self {
        Self { markers }
    }

    pub fn extract(&self, html: &str) -> Syllabus {
        let doc = Html::parse_document(html);
        let mut syllabus = Syllabus::default();

        // 文档顺序展开所有元素，便于“标题之后的第一个列表”这类查找
        let elements: Vec<ElementRef<'_>> = doc
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        let m = &self.markers;
        let is_header = |e: &ElementRef<'_>| matches(e, &m.header_tag, &m.header_class);

        let header_positions: Vec<usize> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| is_header(*e))
            .map(|(idx, _)| idx)
            .collect();
        debug!(target: "syllabus", "找到 {} 个章节标题", header_positions.len());

        for (n, &pos) in header_positions.iter().enumerate() {
            let header = elements[pos];
            let mut name = sanitize_name(&collapsed_text(&header));
            if !is_usable_name(&name) {
                let fallback = format!("Section {}", n + 1);
                syllabus.issues.push(ExtractionIssue::MissingSectionName {
                    index: n + 1,
                    fallback: fallback.clone(),
                });
                name = fallback;
            }

            let list = elements[pos + 1..]
                .iter()
                .take_while(|e| !is_header(*e))
                .find(|e| e.value().name() == m.list_tag);
            let Some(list) = list else {
                syllabus
                    .issues
                    .push(ExtractionIssue::MissingItemList { section: name });
                continue;
            };

            let section = self.extract_section(name, *list, &mut syllabus.issues);
            syllabus.push_section(section);
        }

        for issue in &syllabus.issues {
            warn!(target: "syllabus", "{issue}");
        }
        syllabus
    }

    fn extract_section(
        &self,
        name: String,
        list: ElementRef<'_>,
        issues: &mut Vec<ExtractionIssue>,
    ) -> Section {
        let m = &self.markers;
        let mut section = Section::new(name);

        let mut entries: Vec<ElementRef<'_>> = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == m.item_tag)
            .collect();
        if entries.is_empty() {
            entries = descendants_named(list, &m.item_tag).collect();
        }

        for (idx, entry) in entries.into_iter().enumerate() {
            let item_name = match item_name(entry) {
                Some(n) => n,
                None => {
                    let fallback = format!("Item {}", idx + 1);
                    issues.push(ExtractionIssue::MissingItemName {
                        section: section.name.clone(),
                        index: idx + 1,
                        fallback: fallback.clone(),
                    });
                    fallback
                }
            };

            let container = entry
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .find(|e| matches(e, &m.container_tag, &m.container_class));

            let resources = match container {
                Some(c) => descendants_named(c, "a")
                    .filter_map(|a| a.value().attr("href"))
                    .map(str::to_string)
                    .collect(),
                None => {
                    issues.push(ExtractionIssue::MissingResourceContainer {
                        section: section.name.clone(),
                        item: item_name.clone(),
                    });
                    Vec::new()
                }
            };

            section.push_item(
                Item {
                    name: item_name,
                    resources,
                },
                issues,
            );
        }
        section
    }
}

/// 课程名：链接文字 → 链接 title → 条目全部文字，取第一个可用作目录名的结果。
fn item_name(entry: ElementRef<'_>) -> Option<String> {
    let link = descendants_named(entry, "a").next();
    let candidates = [
        link.map(|a| collapsed_text(&a)),
        link.and_then(|a| a.value().attr("title").map(str::to_string)),
        Some(collapsed_text(&entry)),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|c| sanitize_name(&c))
        .find(|c| is_usable_name(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Syllabus {
        SyllabusExtractor::new(SyllabusMarkers::default()).extract(html)
    }

    const PAGE: &str = r#"
<html><body>
  <h3 class="list_header">Week 3</h3>
  <ul>
    <li><a href="/v/1">Lecture B</a>
      <div class="item_resource">
        <a href="b1.pdf">pdf</a><a href="https://cdn.example.com/b2.mp4">mp4</a>
      </div></li>
    <li><a href="/v/2">Lecture A</a>
      <div class="item_resource"><a href="a1.pdf">pdf</a></div></li>
  </ul>
  <h3 class="list_header">Week 1</h3>
  <ul>
    <li><a>Intro</a><div class="item_resource"><a href="i.txt">txt</a></div></li>
  </ul>
  <h3 class="list_header">Week 2</h3>
  <ul>
    <li><a>Z</a><div class="item_resource"></div></li>
    <li><a>Y</a><div class="item_resource"><a href="y.pdf">y</a></div></li>
  </ul>
</body></html>"#;

    #[test]
    fn keeps_document_order_for_sections_items_and_links() {
        let s = extract(PAGE);
        assert_eq!(s.section_names().collect::<Vec<_>>(), ["Week 3", "Week 1", "Week 2"]);

        let w3 = s.section("Week 3").unwrap();
        assert_eq!(w3.item_names().collect::<Vec<_>>(), ["Lecture B", "Lecture A"]);
        assert_eq!(
            w3.item("Lecture B").unwrap().resources,
            ["b1.pdf", "https://cdn.example.com/b2.mp4"]
        );

        let w2 = s.section("Week 2").unwrap();
        assert_eq!(w2.item_names().collect::<Vec<_>>(), ["Z", "Y"]);
        assert!(w2.item("Z").unwrap().resources.is_empty());
        assert!(s.issues.is_empty());
        assert_eq!(s.resource_count(), 5);
    }

    #[test]
    fn names_are_sanitized() {
        let s = extract(
            r#"<h3 class="list_header"> Week 1: Basics? </h3>
               <ul><li><a>Part 1/2: Setup</a><div class="item_resource"></div></li></ul>"#,
        );
        let section = s.section("Week 1 Basics").unwrap();
        assert_eq!(section.item_names().collect::<Vec<_>>(), ["Part 12 Setup"]);
    }

    #[test]
    fn missing_container_degrades_to_empty_resources() {
        let s = extract(
            r#"<h3 class="list_header">W</h3>
               <ul><li><a>No res</a></li><li><a>Has</a><div class="item_resource"><a href="x">x</a></div></li></ul>"#,
        );
        let w = s.section("W").unwrap();
        assert!(w.item("No res").unwrap().resources.is_empty());
        assert_eq!(w.item("Has").unwrap().resources, ["x"]);
        assert_eq!(
            s.issues,
            [ExtractionIssue::MissingResourceContainer {
                section: "W".into(),
                item: "No res".into()
            }]
        );
    }

    #[test]
    fn header_without_list_does_not_steal_next_sections_list() {
        let s = extract(
            r#"<h3 class="list_header">Empty</h3>
               <h3 class="list_header">Real</h3>
               <ul><li><a>L</a><div class="item_resource"></div></li></ul>"#,
        );
        assert_eq!(s.section_names().collect::<Vec<_>>(), ["Real"]);
        assert!(matches!(
            s.issues.as_slice(),
            [ExtractionIssue::MissingItemList { section }] if section == "Empty"
        ));
    }

    #[test]
    fn list_may_follow_a_wrapped_header() {
        let s = extract(
            r#"<div class="wrap"><h3 class="list_header">Wrapped</h3></div>
               <ul><li><a>L</a><div class="item_resource"><a href="l.pdf">l</a></div></li></ul>"#,
        );
        assert_eq!(s.section("Wrapped").unwrap().item("L").unwrap().resources, ["l.pdf"]);
    }

    #[test]
    fn duplicate_sanitized_headers_are_disambiguated() {
        let s = extract(
            r#"<h3 class="list_header">Week 1:</h3><ul><li><a>a</a><div class="item_resource"></div></li></ul>
               <h3 class="list_header">Week 1?</h3><ul><li><a>b</a><div class="item_resource"></div></li></ul>"#,
        );
        assert_eq!(s.section_names().collect::<Vec<_>>(), ["Week 1", "Week 1 (2)"]);
        assert_eq!(s.section("Week 1 (2)").unwrap().item_names().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn unnamed_item_gets_positional_name() {
        let s = extract(
            r#"<h3 class="list_header">W</h3><ul><li><div class="item_resource"></div></li></ul>"#,
        );
        assert_eq!(s.section("W").unwrap().item_names().collect::<Vec<_>>(), ["Item 1"]);
    }

    #[test]
    fn dot_names_fall_back_to_positional_names() {
        let s = extract(
            r#"<h3 class="list_header">..</h3><ul><li><a>.</a><div class="item_resource"><a href="s.pdf"></a></div></li></ul>"#,
        );
        assert_eq!(s.section_names().collect::<Vec<_>>(), ["Section 1"]);
        let section = s.section("Section 1").unwrap();
        assert_eq!(section.item_names().collect::<Vec<_>>(), ["Item 1"]);
        assert_eq!(section.items[0].resources, ["s.pdf"]);
        assert!(s.issues.contains(&ExtractionIssue::MissingSectionName {
            index: 1,
            fallback: "Section 1".to_string(),
        }));
        assert!(
            s.issues
                .iter()
                .any(|i| matches!(i, ExtractionIssue::MissingItemName { .. }))
        );
    }

    #[test]
    fn other_headings_are_ignored() {
        let s = extract(r#"<h3>Not a section</h3><ul><li><a>x</a></li></ul>"#);
        assert!(s.sections.is_empty());
    }
}
