//! 课程名与讲座页地址的互相转换，以及课程保存目录。

use std::path::{Path, PathBuf};

use crate::base_system::context::{is_usable_name, sanitize_name};

pub const LECTURE_URL_TEMPLATE: &str = "https://class.coursera.org/{name}/lecture/index";

/// `https://class.coursera.org/<name>/lecture/index` → `<name>`。
pub fn course_name_from_url(course_url: &str) -> Option<String> {
    let name = course_url.split('/').nth(3)?;
    let name = sanitize_name(name);
    is_usable_name(&name).then_some(name)
}

pub fn course_url_from_name(course_name: &str) -> String {
    LECTURE_URL_TEMPLATE.replace("{name}", course_name)
}

/// 命令行既可以给完整地址也可以只给课程名。
pub fn normalize_course_arg(arg: &str) -> String {
    let arg = arg.trim();
    if arg.starts_with("http") {
        arg.to_string()
    } else {
        course_url_from_name(arg)
    }
}

pub fn course_folder_path(save_root: &Path, course_name: &str) -> PathBuf {
    save_root.join(course_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_fourth_url_component() {
        assert_eq!(
            course_name_from_url("https://class.coursera.org/algo2012-p2/lecture/index").as_deref(),
            Some("algo2012-p2")
        );
        assert_eq!(course_name_from_url("https://class.coursera.org"), None);
    }

    #[test]
    fn dot_components_are_not_course_names() {
        assert_eq!(course_name_from_url("https://h/../x"), None);
        assert_eq!(course_name_from_url("https://h/./x"), None);
        assert_eq!(course_name_from_url("https://h//x"), None);
    }

    #[test]
    fn bare_name_expands_to_lecture_page() {
        assert_eq!(
            normalize_course_arg("ml-005"),
            "https://class.coursera.org/ml-005/lecture/index"
        );
        assert_eq!(
            normalize_course_arg("https://class.example.com/course/lecture/index"),
            "https://class.example.com/course/lecture/index"
        );
    }
}
