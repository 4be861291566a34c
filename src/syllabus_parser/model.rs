//! 课程大纲的数据模型：章节 → 课程 → 资源链接，全部保持页面中的顺序。

use thiserror::Error;

/// 页面结构与预期不符的地方。只记录、不中断提取。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionIssue {
    #[error("第 {index} 个章节标题为空，使用 `{fallback}`")]
    MissingSectionName { index: usize, fallback: String },
    #[error("章节 `{section}` 之后没有课程列表，已忽略")]
    MissingItemList { section: String },
    #[error("章节 `{section}` 第 {index} 个课程没有可用名称，使用 `{fallback}`")]
    MissingItemName {
        section: String,
        index: usize,
        fallback: String,
    },
    #[error("课程 `{section}/{item}` 没有资源容器，按无资源处理")]
    MissingResourceContainer { section: String, item: String },
    #[error("名称 `{original}` 重复，改为 `{renamed}`")]
    DuplicateName { original: String, renamed: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    /// 页面中原样的 href，可能是相对地址或残缺地址
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub items: Vec<Item>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.name.as_str())
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name == name)
    }

    /// 追加课程；与已有课程重名时追加序号后缀，返回实际使用的名称。
    pub fn push_item(&mut self, mut item: Item, issues: &mut Vec<ExtractionIssue>) -> String {
        let unique = unique_name(&item.name, |n| self.item(n).is_some());
        if unique != item.name {
            issues.push(ExtractionIssue::DuplicateName {
                original: item.name.clone(),
                renamed: unique.clone(),
            });
            item.name = unique.clone();
        }
        self.items.push(item);
        unique
    }
}

/// 整个课程大纲。`sections` 的顺序即页面顺序，也是下载顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Syllabus {
    pub sections: Vec<Section>,
    pub issues: Vec<ExtractionIssue>,
}

impl Syllabus {
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn push_section(&mut self, mut section: Section) -> String {
        let unique = unique_name(&section.name, |n| self.section(n).is_some());
        if unique != section.name {
            self.issues.push(ExtractionIssue::DuplicateName {
                original: section.name.clone(),
                renamed: unique.clone(),
            });
            section.name = unique.clone();
        }
        self.sections.push(section);
        unique
    }

    pub fn resource_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.items)
            .map(|i| i.resources.len())
            .sum()
    }
}

fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_section_names_get_numbered_suffix() {
        let mut s = Syllabus::default();
        assert_eq!(s.push_section(Section::new("Week 1")), "Week 1");
        assert_eq!(s.push_section(Section::new("Week 1")), "Week 1 (2)");
        assert_eq!(s.push_section(Section::new("Week 1")), "Week 1 (3)");

        let names: Vec<_> = s.section_names().collect();
        assert_eq!(names, ["Week 1", "Week 1 (2)", "Week 1 (3)"]);
        assert_eq!(s.issues.len(), 2);
    }

    #[test]
    fn duplicate_items_are_kept_in_order() {
        let mut section = Section::new("Week 1");
        let mut issues = Vec::new();
        for url in ["a.pdf", "b.pdf"] {
            section.push_item(
                Item {
                    name: "Intro".into(),
                    resources: vec![url.into()],
                },
                &mut issues,
            );
        }
        assert_eq!(section.item_names().collect::<Vec<_>>(), ["Intro", "Intro (2)"]);
        assert_eq!(section.item("Intro (2)").unwrap().resources, ["b.pdf"]);
        assert_eq!(issues.len(), 1);
    }
}
