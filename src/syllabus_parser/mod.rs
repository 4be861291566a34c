//! 课程大纲解析。
//!
//! - `model`     — 章节 / 课程 / 资源的有序数据结构
//! - `extractor` — 从讲座页 HTML 提取大纲

pub mod extractor;
pub mod model;

pub use extractor::{SyllabusExtractor, SyllabusMarkers};
pub use model::{ExtractionIssue, Item, Section, Syllabus};
