//! # 标记位推导
//!
//! 由分类和原始缩进计算过滤用的布尔标记。

use serde::{Deserialize, Serialize};

use crate::line::Category;

/// 分支内容的最小缩进（空格数）
///
/// Adastra 的缩进约定：
/// - 0 空格：无条件内容
/// - 4 空格：选项本身，或条件分支的直接内容
/// - 8 空格：选项之下的嵌套分支内容
pub const BRANCH_INDENT: usize = 4;

/// 一行的过滤标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineFlags {
    pub is_renpy: bool,
    pub is_choice: bool,
    pub is_read: bool,
    pub has_speaker: bool,
    pub is_branch: bool,
}

/// 推导标记位
pub fn derive_flags(category: Category, raw: &str) -> LineFlags {
    let is_choice = category.is_choice();
    let indent = raw.chars().take_while(|c| *c == ' ').count();

    LineFlags {
        is_renpy: category.is_engine(),
        is_choice,
        is_read: category.is_dialogue(),
        has_speaker: category.has_speaker(),
        is_branch: indent >= BRANCH_INDENT && !is_choice,
    }
}
