//! # 说话人规范化
//!
//! 将脚本中的角色简写映射为角色全名。

/// 主角简写
pub const MAIN_CHARACTER_CODE: &str = "m";

/// 角色简写表（主角条目在查表时替换为调用方提供的名字）
pub const CHARACTER_ALIASES: [(&str, &str); 12] = [
    ("a", "amicus"),
    (MAIN_CHARACTER_CODE, "marco"),
    ("unk", "?????"),
    ("com", "computer"),
    ("c", "cassius"),
    ("ca", "cato"),
    ("al", "alexios"),
    ("v", "virginia"),
    ("n", "neferu"),
    ("mon", "monitor"),
    ("sc", "scipio"),
    ("me", "meera"),
];

/// 查找简写对应的全名
fn lookup<'a>(code: &'a str, main_character: &'a str) -> &'a str {
    if code == MAIN_CHARACTER_CODE {
        return main_character;
    }
    CHARACTER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// 规范化说话人
///
/// 缺省保持缺省；未收录的简写原样保留；结果统一小写。
pub fn normalize(speaker: Option<&str>, main_character: &str) -> Option<String> {
    speaker.map(|code| lookup(code, main_character).to_lowercase())
}
