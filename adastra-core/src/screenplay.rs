//! # Screenplay 模块
//!
//! 按上下文规则把语料行重排为剧本文本，每个脚本输出一个文件。
//!
//! ## 流程
//!
//! ```text
//! 选中行 → 输出单元格 = screenplay_col
//!        → 依次应用每个上下文（只作用于其 where 命中的行）
//!        → 按 file_col 分组，行间以 line_sep 连接
//! ```
//!
//! 上下文是链式的：后一个上下文读取 `screenplay_col` 时拿到的是
//! 前面上下文改写后的单元格，其余列始终读取原始值。上下文的 `where`
//! 同样按改写后的单元格求值。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdastraError, AdastraResult, AnalysisError, ScreenplayError};
use crate::query::{EvalError, Filter, Row, Value};

/// 没有设置宽度时分隔线的长度
pub const DEFAULT_BAR_WIDTH: usize = 10;

fn default_line_sep() -> String {
    "\n".to_string()
}

fn default_file_col() -> String {
    "file".to_string()
}

fn default_screenplay_col() -> String {
    "line".to_string()
}

fn default_style() -> String {
    "{line}".to_string()
}

/// 单个列片段的格式
///
/// 应用顺序：去引号 → 大写 → 小写 → 标题化 → 前后缀 → 左侧缩进。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartFormat {
    /// 列名，也是样式中的占位符名
    pub name: String,
    #[serde(default)]
    pub strip_quotes: bool,
    #[serde(default)]
    pub upper: bool,
    #[serde(default)]
    pub lower: bool,
    #[serde(default)]
    pub title: bool,
    /// 左侧缩进空格数
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub postfix: String,
}

impl PartFormat {
    /// 格式化一个片段
    pub fn apply(&self, text: &str) -> String {
        let mut formatted = if self.strip_quotes {
            text.trim_matches('"').to_string()
        } else {
            text.to_string()
        };

        if self.upper {
            formatted = formatted.to_uppercase();
        }
        if self.lower {
            formatted = formatted.to_lowercase();
        }
        if self.title {
            formatted = title_case(&formatted);
        }

        formatted = format!("{}{}{}", self.prefix, formatted, self.postfix);

        if self.offset > 0 {
            formatted = format!("{}{}", " ".repeat(self.offset), formatted);
        }
        formatted
    }
}

/// 一组行的格式规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub name: String,
    /// 作用的行
    #[serde(default, rename = "where")]
    pub filter: Filter,
    /// 样式模板，`{name}` 为占位符，`{{` `}}` 为字面量花括号
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub parts: Vec<PartFormat>,
    /// 覆盖全局宽度
    #[serde(default)]
    pub justify: Option<usize>,
    /// 折行后续行的额外缩进
    #[serde(default)]
    pub textwrap_offset: usize,
    /// 在行前加一条分隔线
    #[serde(default)]
    pub add_bar: bool,
}

/// 剧本定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenplaySpec {
    /// 选中行
    #[serde(default, rename = "where")]
    pub filter: Filter,
    /// 折行宽度
    #[serde(default)]
    pub justify: Option<usize>,
    #[serde(default = "default_line_sep")]
    pub line_sep: String,
    /// 分文件依据的列
    #[serde(default = "default_file_col")]
    pub file_col: String,
    /// 输出内容所在的列
    #[serde(default = "default_screenplay_col")]
    pub screenplay_col: String,
    /// 离开分支内容时插入分隔线
    #[serde(default)]
    pub branch_separator: bool,
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,
}

impl Default for ScreenplaySpec {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            justify: None,
            line_sep: default_line_sep(),
            file_col: default_file_col(),
            screenplay_col: default_screenplay_col(),
            branch_separator: false,
            contexts: Vec::new(),
        }
    }
}

/// 一个输出文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenplayFile {
    /// `file_col` 的值
    pub name: String,
    pub contents: String,
}

impl ScreenplayFile {
    /// 输出文件名
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.name)
    }
}

/// 渲染剧本
pub fn render<R: Row>(rows: &[R], spec: &ScreenplaySpec) -> AdastraResult<Vec<ScreenplayFile>> {
    let mut included = Vec::new();
    for row in rows {
        if spec.filter.matches(row)? {
            included.push(row);
        }
    }

    let mut cells = included
        .iter()
        .map(|row| column_text(*row, &spec.screenplay_col))
        .collect::<Result<Vec<_>, _>>()?;

    for context in &spec.contexts {
        let justify = context.justify.or(spec.justify).filter(|w| *w > 0);
        let mut applied = 0;
        for (row, cell) in included.iter().zip(cells.iter_mut()) {
            let current = CellRow {
                row: *row,
                cell: cell.as_str(),
                screenplay_col: &spec.screenplay_col,
            };
            if !context.filter.matches(&current)? {
                continue;
            }
            *cell = format_row(*row, cell, context, &spec.screenplay_col, justify)?;
            applied += 1;
        }
        debug!(context = %context.name, rows = applied, "格式规则已应用");
    }

    let bar = separator_bar(spec.justify.filter(|w| *w > 0));
    let mut buffers: Vec<FileBuffer> = Vec::new();
    for (row, cell) in included.iter().zip(cells) {
        let name = column_text(*row, &spec.file_col)?;
        let is_branch = matches!(row.column("is_branch"), Some(Value::Bool(true)));

        let idx = match buffers.iter().position(|b| b.name == name) {
            Some(idx) => idx,
            None => {
                buffers.push(FileBuffer::new(name));
                buffers.len() - 1
            }
        };
        let buffer = &mut buffers[idx];
        if spec.branch_separator && buffer.prev_branch && !is_branch {
            buffer.lines.push(bar.clone());
        }
        buffer.prev_branch = is_branch;
        buffer.lines.push(cell);
    }

    Ok(buffers
        .into_iter()
        .map(|buffer| ScreenplayFile {
            contents: buffer.lines.join(&spec.line_sep),
            name: buffer.name,
        })
        .collect())
}

/// 写出全部文件到目录，返回写出的路径
pub fn write_screenplays(files: &[ScreenplayFile], dir: &Path) -> Result<Vec<PathBuf>, ScreenplayError> {
    fs::create_dir_all(dir).map_err(|source| ScreenplayError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(file.file_name());
        fs::write(&path, &file.contents).map_err(|source| ScreenplayError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

/// 以当前输出单元格替换 `screenplay_col` 的行视图
struct CellRow<'a, R> {
    row: &'a R,
    cell: &'a str,
    screenplay_col: &'a str,
}

impl<R: Row> Row for CellRow<'_, R> {
    fn column(&self, name: &str) -> Option<Value> {
        if name == self.screenplay_col {
            Some(Value::String(self.cell.to_string()))
        } else {
            self.row.column(name)
        }
    }

    fn column_names(&self) -> Vec<&'static str> {
        self.row.column_names()
    }
}

struct FileBuffer {
    name: String,
    lines: Vec<String>,
    prev_branch: bool,
}

impl FileBuffer {
    fn new(name: String) -> Self {
        Self {
            name,
            lines: Vec::new(),
            prev_branch: false,
        }
    }
}

fn column_text(row: &impl Row, name: &str) -> Result<String, EvalError> {
    row.column(name)
        .map(|value| value.to_text())
        .ok_or_else(|| EvalError::UnknownColumn {
            name: name.to_string(),
        })
}

fn separator_bar(justify: Option<usize>) -> String {
    "-".repeat(justify.unwrap_or(DEFAULT_BAR_WIDTH))
}

/// 用一个上下文格式化一行
fn format_row(
    row: &impl Row,
    cell: &str,
    context: &ContextConfig,
    screenplay_col: &str,
    justify: Option<usize>,
) -> AdastraResult<String> {
    let mut parts: HashMap<&str, String> = HashMap::new();
    for part in &context.parts {
        let raw = if part.name == screenplay_col {
            cell.to_string()
        } else {
            column_text(row, &part.name)?
        };
        parts.insert(part.name.as_str(), part.apply(&raw));
    }

    let mut line = render_style(&context.style, |name| {
        if let Some(formatted) = parts.get(name) {
            Ok(formatted.clone())
        } else if name == screenplay_col {
            Ok(cell.to_string())
        } else {
            column_text(row, name).map_err(AdastraError::from)
        }
    })?;

    if let Some(width) = justify {
        line = justify_text(&line, width, context.textwrap_offset);
    }
    if context.add_bar {
        line = format!("{}\n{}", separator_bar(justify), line);
    }
    Ok(line)
}

/// 填充样式模板
fn render_style(
    style: &str,
    mut lookup: impl FnMut(&str) -> AdastraResult<String>,
) -> AdastraResult<String> {
    let invalid = |message: &str| -> AdastraError {
        AnalysisError::InvalidTemplate {
            template: style.to_string(),
            message: message.to_string(),
        }
        .into()
    };

    let mut output = String::with_capacity(style.len());
    let mut chars = style.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(invalid("占位符缺少 '}'")),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid("空占位符"));
                }
                output.push_str(&lookup(name)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(invalid("单独的 '}'")),
            c => output.push(c),
        }
    }
    Ok(output)
}

/// 按宽度折行
///
/// 每个输入行单独折行，不拆分长词，保留行首缩进；
/// `textwrap_offset > 0` 时，第一行之后的内容按 `width - offset` 重新折行并缩进。
/// 结果去除行尾空白。
pub fn justify_text(text: &str, width: usize, textwrap_offset: usize) -> String {
    let mut lines: Vec<String> = text.lines().flat_map(|line| wrap_line(line, width)).collect();

    if textwrap_offset > 0 && lines.len() > 1 {
        let remaining = lines[1..].join(" ");
        let pad = " ".repeat(textwrap_offset);
        let rest = wrap_line(&remaining, width.saturating_sub(textwrap_offset).max(1));
        lines.truncate(1);
        lines.extend(rest.into_iter().map(|line| format!("{}{}", pad, line)));
    }

    lines
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 贪心折行（单个输入行），空白行折行后为空
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let content = line.trim_start();
    if content.trim_end().is_empty() {
        return Vec::new();
    }
    let indent = &line[..line.len() - content.len()];

    let mut lines = Vec::new();
    let mut current = indent.to_string();
    let mut current_len = indent.chars().count();
    let mut first = true;

    for (sep, word) in words_with_separators(content) {
        let word_len = word.chars().count();
        let sep_len = sep.chars().count();
        if first {
            first = false;
            current.push_str(word);
            current_len += word_len;
        } else if current_len + sep_len + word_len <= width {
            current.push_str(sep);
            current.push_str(word);
            current_len += sep_len + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    lines.push(current);
    lines
}

/// 切分为 (前导空白, 词)
fn words_with_separators(text: &str) -> Vec<(&str, &str)> {
    let mut chunks = Vec::new();
    let mut rest = text;
    let mut sep = "";
    while !rest.is_empty() {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if word_end > 0 {
            chunks.push((sep, &rest[..word_end]));
        }
        rest = &rest[word_end..];
        let trimmed = rest.trim_start();
        sep = &rest[..rest.len() - trimmed.len()];
        rest = trimmed;
    }
    chunks
}

/// 标题化：每个字母序列首字母大写，其余小写
fn title_case(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut prev_alphabetic = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alphabetic {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            prev_alphabetic = true;
        } else {
            output.push(c);
            prev_alphabetic = false;
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::ScriptLine;
    use crate::script::ScriptParser;

    const SCENE: &str = "label a1s1:\n    scene bg ship\n\"The deck creaks beneath my feet.\"\nc \"You're awake. Good.\"\n\"Should I answer?\":\n    m \"I am.\"\n    \"He nods.\"\njump a1s2\n\"The wind picks up.\"\n";

    fn rows(file: &str, text: &str) -> Vec<ScriptLine> {
        ScriptParser::new("Marco").parse_text(file, text)
    }

    fn part(name: &str) -> PartFormat {
        PartFormat {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn context(name: &str, filter: &str, style: &str) -> ContextConfig {
        ContextConfig {
            name: name.to_string(),
            filter: Filter::parse(filter).unwrap(),
            style: style.to_string(),
            parts: Vec::new(),
            justify: None,
            textwrap_offset: 0,
            add_bar: false,
        }
    }

    fn screenplay_spec() -> ScreenplaySpec {
        let mut choices = context("choices", "is_choice", "[BRANCH] {line}");
        choices.add_bar = true;

        let mut dialogue = context("dialogue", "has_speaker", "{speaker}\n{line}");
        dialogue.parts = vec![
            PartFormat {
                upper: true,
                offset: 10,
                ..part("speaker")
            },
            PartFormat {
                offset: 5,
                ..part("line")
            },
        ];

        let narration = context("narration", "not has_speaker and not is_choice", "{line}");

        ScreenplaySpec {
            filter: Filter::parse("is_read or is_choice").unwrap(),
            justify: Some(30),
            branch_separator: true,
            contexts: vec![choices, dialogue, narration],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_screenplay() {
        let files = render(&rows("a1s1", SCENE), &screenplay_spec()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a1s1");
        insta::assert_snapshot!(files[0].contents, @r"
The deck creaks beneath my
feet.
          CASSIUS
     You're awake. Good.
------------------------------
[BRANCH] Should I answer?
          MARCO
     I am.
He nods.
------------------------------
The wind picks up.
");
    }

    #[test]
    fn test_contexts_chain_on_output_cell() {
        let mut spec = ScreenplaySpec {
            filter: Filter::parse("is_read").unwrap(),
            ..Default::default()
        };
        let mut quote = context("quote", "", "{line}");
        quote.parts = vec![PartFormat {
            prefix: "<".to_string(),
            postfix: ">".to_string(),
            ..part("line")
        }];
        let mut shout = context("shout", "has_speaker", "{speaker}: {line}");
        shout.parts = vec![PartFormat {
            upper: true,
            ..part("line")
        }];
        spec.contexts = vec![quote, shout];

        let files = render(&rows("a1s2", "m \"Hi.\"\n\"Quiet.\"\n"), &spec).unwrap();
        assert_eq!(files[0].contents, "marco: <HI.>\n<Quiet.>");
    }

    #[test]
    fn test_context_filter_sees_rewritten_cell() {
        let mut spec = ScreenplaySpec {
            filter: Filter::parse("is_read").unwrap(),
            ..Default::default()
        };
        let mut tag = context("tag", "has_speaker", "{line}");
        tag.parts = vec![PartFormat {
            prefix: "> ".to_string(),
            ..part("line")
        }];
        let mut tagged = context("tagged", "line like '> %'", "{line}");
        tagged.parts = vec![PartFormat {
            upper: true,
            ..part("line")
        }];
        // 改写后单元格已不等于原始文本
        let stale = context("stale", "line = 'Hi.'", "never");
        spec.contexts = vec![tag, tagged, stale];

        let files = render(&rows("a1s2", "m \"Hi.\"\n\"Quiet.\"\n"), &spec).unwrap();
        assert_eq!(files[0].contents, "> HI.\nQuiet.");
    }

    #[test]
    fn test_one_file_per_value_in_first_appearance_order() {
        let mut all = rows("a2s1", "m \"One.\"\n");
        all.extend(rows("a1s1", "m \"Two.\"\n"));
        all.extend(rows("a2s1", "m \"Three.\"\n"));

        let spec = ScreenplaySpec {
            line_sep: "\n\n".to_string(),
            ..Default::default()
        };
        let files = render(&all, &spec).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a2s1", "a1s1"]);
        assert_eq!(files[0].contents, "One.\n\nThree.");
    }

    #[test]
    fn test_branch_separator_disabled() {
        let spec = ScreenplaySpec {
            filter: Filter::parse("is_read").unwrap(),
            ..Default::default()
        };
        let files = render(&rows("a1s1", "    \"In.\"\n\"Out.\"\n"), &spec).unwrap();
        assert_eq!(files[0].contents, "In.\nOut.");

        let spec = ScreenplaySpec {
            branch_separator: true,
            ..spec
        };
        let files = render(&rows("a1s1", "    \"In.\"\n\"Out.\"\n"), &spec).unwrap();
        assert_eq!(files[0].contents, format!("In.\n{}\nOut.", "-".repeat(DEFAULT_BAR_WIDTH)));
    }

    #[test]
    fn test_part_format_order() {
        let format = PartFormat {
            strip_quotes: true,
            title: true,
            prefix: "(".to_string(),
            postfix: ")".to_string(),
            offset: 2,
            ..part("line")
        };
        assert_eq!(format.apply("\"the SEA of stars\""), "  (The Sea Of Stars)");

        let format = PartFormat {
            upper: true,
            lower: true,
            ..part("line")
        };
        assert_eq!(format.apply("Mixed"), "mixed");
    }

    #[test]
    fn test_title_case_follows_letter_runs() {
        assert_eq!(title_case("who's there"), "Who'S There");
        assert_eq!(title_case("a1s1 end_game"), "A1S1 End_Game");
    }

    #[test]
    fn test_justify_text() {
        assert_eq!(
            justify_text("CATO: We leave at dawn, all of us.", 20, 0),
            "CATO: We leave at\ndawn, all of us."
        );
        assert_eq!(
            justify_text("CATO: We leave at dawn, all of us.", 20, 6),
            "CATO: We leave at\n      dawn, all of\n      us."
        );
        // 长词不拆分，行首缩进保留
        assert_eq!(justify_text("    incomprehensibilities", 10, 0), "    incomprehensibilities");
        // 每个输入行单独折行
        assert_eq!(justify_text("a b\nc d", 80, 0), "a b\nc d");
    }

    #[test]
    fn test_render_style_errors() {
        let row = rows("a1s1", "m \"Hi.\"\n").remove(0);
        let spec = ScreenplaySpec {
            contexts: vec![context("bad", "", "{line")],
            ..Default::default()
        };
        assert!(matches!(
            render(&[row.clone()], &spec),
            Err(AdastraError::Analysis(AnalysisError::InvalidTemplate { .. }))
        ));

        let spec = ScreenplaySpec {
            contexts: vec![context("unknown", "", "{mood}")],
            ..Default::default()
        };
        assert!(matches!(
            render(&[row.clone()], &spec),
            Err(AdastraError::Eval(EvalError::UnknownColumn { .. }))
        ));

        let spec = ScreenplaySpec {
            contexts: vec![context("braces", "", "{{{category}}}")],
            ..Default::default()
        };
        assert_eq!(render(&[row], &spec).unwrap()[0].contents, "{dialogue_alias}");
    }

    #[test]
    fn test_spec_from_json_defaults() {
        let spec: ScreenplaySpec = serde_json::from_str(
            r#"{"justify": 60, "contexts": [{"name": "all", "parts": [{"name": "line", "upper": true}]}]}"#,
        )
        .unwrap();
        assert_eq!(spec.line_sep, "\n");
        assert_eq!(spec.file_col, "file");
        assert_eq!(spec.screenplay_col, "line");
        assert!(spec.filter.is_match_all());
        assert_eq!(spec.contexts[0].style, "{line}");
        assert!(spec.contexts[0].parts[0].upper);
    }

    #[test]
    fn test_write_screenplays() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            ScreenplayFile {
                name: "a1s1".to_string(),
                contents: "One.".to_string(),
            },
            ScreenplayFile {
                name: "a1s2".to_string(),
                contents: "Two.".to_string(),
            },
        ];
        let out = dir.path().join("screenplays/v3");
        let written = write_screenplays(&files, &out).unwrap();

        assert_eq!(written, vec![out.join("a1s1.txt"), out.join("a1s2.txt")]);
        assert_eq!(fs::read_to_string(out.join("a1s2.txt")).unwrap(), "Two.");
    }
}
