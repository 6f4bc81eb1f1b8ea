//! # 行清理
//!
//! 去除转义、替换主角名占位符、把引擎标记转换为纯文本。

use std::sync::LazyLock;

use regex::Regex;

/// 主角名占位符
pub const MAIN_CHARACTER_PLACEHOLDER: &str = "[mc]";

/// 斜体标记 `{i}` / `{/i}`
static ITALICS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{/?i\}").expect("valid regex"));

/// 打字速度标记 `{cps=N}`
static TYPING_SPEED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{cps=\d+\}").expect("valid regex"));

/// 清理一行原始脚本文本
///
/// 输入: `    m "{i}Hello{/i}, [mc].{cps=20}"\n`, `"Marco"`
/// 输出: `m "*Hello*, Marco."`
pub fn clean(raw: &str, main_character: &str) -> String {
    let line = raw.trim().replace('\\', "");
    let line = line.replace(MAIN_CHARACTER_PLACEHOLDER, main_character);
    let line = ITALICS_MARKER.replace_all(&line, "*");
    TYPING_SPEED_MARKER.replace_all(&line, "").into_owned()
}
