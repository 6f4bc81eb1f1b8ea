//! # Script 模块
//!
//! 逐行解析 Ren'Py 脚本文本（正则分类，无跨行状态）。
//!
//! ## 架构
//!
//! ```text
//! 原始行 → [清理] → [分类] → [标记位推导] → [说话人规范化] → ScriptLine
//! ```
//!
//! ## 模块结构
//!
//! - `cleaner`: 行清理
//! - `classifier`: 有序规则分类
//! - `flags`: 标记位推导
//! - `speaker`: 说话人规范化

mod classifier;
mod cleaner;
mod flags;
mod speaker;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::line::{Category, ScriptLine};

pub use classifier::{
    CHOICE_CONDITION_KEYWORDS, Classification, ENGINE_KEYWORDS, SPEAKER_INTERNAL,
    SPEAKER_UNSPECIFIED, classify,
};
pub use cleaner::{MAIN_CHARACTER_PLACEHOLDER, clean};
pub use flags::{BRANCH_INDENT, LineFlags, derive_flags};
pub use speaker::{CHARACTER_ALIASES, MAIN_CHARACTER_CODE, normalize};

/// 默认主角名
pub const DEFAULT_MAIN_CHARACTER: &str = "Marco";

/// 脚本解析器
pub struct ScriptParser {
    /// 主角显示名
    main_character: String,
    /// 未能分类的行数
    unknown_count: usize,
}

impl ScriptParser {
    /// 创建新的解析器
    pub fn new(main_character: impl Into<String>) -> Self {
        Self {
            main_character: main_character.into(),
            unknown_count: 0,
        }
    }

    /// 主角显示名
    pub fn main_character(&self) -> &str {
        &self.main_character
    }

    /// 解析单行
    ///
    /// 依次执行清理、分类、标记位推导、说话人规范化。
    pub fn parse_line(&mut self, file: &str, line_idx: usize, raw: &str) -> ScriptLine {
        let cleaned = clean(raw, &self.main_character);
        let Classification {
            category,
            speaker,
            text,
        } = classify(&cleaned);
        let flags = derive_flags(category, raw);
        let speaker = normalize(speaker.as_deref(), &self.main_character);

        if category == Category::Unknown {
            self.unknown_count += 1;
            debug!(file, line_idx, raw = raw.trim_end(), "行未匹配任何分类规则");
        }

        ScriptLine {
            file: file.to_string(),
            line_idx,
            raw: raw.to_string(),
            category,
            speaker,
            line: text,
            is_renpy: flags.is_renpy,
            is_choice: flags.is_choice,
            is_read: flags.is_read,
            has_speaker: flags.has_speaker,
            is_branch: flags.is_branch,
        }
    }

    /// 解析整份脚本文本
    ///
    /// 行保留结尾换行符，行号从 0 开始。`\r\n` 与单独的 `\r` 统一为 `\n`。
    pub fn parse_text(&mut self, file: &str, text: &str) -> Vec<ScriptLine> {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        text.split_inclusive('\n')
            .enumerate()
            .map(|(idx, raw)| self.parse_line(file, idx, raw))
            .collect()
    }

    /// 目前为止未能分类的行数
    pub fn unknown_count(&self) -> usize {
        self.unknown_count
    }
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAIN_CHARACTER)
    }
}
