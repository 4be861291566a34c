//! CLI 进度条。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub(crate) struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn new(total: usize, enabled: bool) -> Self {
        if !enabled || total == 0 {
            return Self { bar: None };
        }

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::with_template("{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_prefix("资源下载");
        Self { bar: Some(bar) }
    }

    pub(crate) fn set_item(&self, item: &str) {
        if let Some(bar) = self.bar.as_ref() {
            bar.set_message(item.to_string());
        }
    }

    pub(crate) fn inc(&self, n: usize) {
        if let Some(bar) = self.bar.as_ref() {
            bar.inc(n as u64);
        }
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}
