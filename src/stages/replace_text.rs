use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

use crate::foundation::error::TimelapseResult;
use crate::project::config::{Config, TextReplacement};
use crate::snapshot::{Snapshot, StageId};
use crate::stages::{Stage, StageContext};

static RE_INCLUDE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*%?[ \t]*\\includeonly\s*\{[^}]*\}").expect("valid includeonly regex")
});

/// Apply configured text replacements and make sure the whole document is compiled.
#[derive(Default)]
pub struct ReplaceText {
    replacements: Vec<TextReplacement>,
}

impl ReplaceText {
    fn rewrite(&self, text: &str, is_main: bool) -> String {
        let mut out = text.to_string();
        for r in &self.replacements {
            out = out.replace(&r.old, &r.new);
        }
        if is_main {
            out = RE_INCLUDE_ONLY.replace_all(&out, "").into_owned();
        }
        out
    }

    fn apply(&self, snapshot: &Snapshot) -> TimelapseResult<()> {
        let work_dir = snapshot.work_dir()?;
        let main_file = snapshot.main_file()?;

        for file in &snapshot.includes {
            let is_main = file == main_file;
            if !is_main && !(file.ends_with(".tex") || file.ends_with(".bib")) {
                continue;
            }
            let path = work_dir.join(file);
            let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            let text = String::from_utf8_lossy(&bytes);
            let rewritten = self.rewrite(&text, is_main);
            if rewritten != text {
                std::fs::write(&path, rewritten)
                    .with_context(|| format!("write {}", path.display()))?;
            }
        }
        Ok(())
    }
}

impl Stage for ReplaceText {
    fn id(&self) -> StageId {
        StageId::ReplaceText
    }

    fn init(&mut self, config: &Config) -> TimelapseResult<()> {
        self.replacements = config.text_replacements.clone();
        Ok(())
    }

    fn run(&self, snapshot: &mut Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        self.apply(snapshot)
    }

    fn restore(&self, snapshot: &Snapshot, _ctx: &StageContext<'_>) -> TimelapseResult<()> {
        self.apply(snapshot)
    }

    /// Nothing to undo: checkout restores the pristine sources.
    fn reset(&self, _snapshot: &mut Snapshot, _ctx: &StageContext<'_>) {}
}

#[cfg(test)]
#[path = "../../tests/unit/stages/replace_text.rs"]
mod tests;
