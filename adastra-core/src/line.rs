//! # Line 模块
//!
//! 语料表的行模型：一行脚本文本解析后的结构化结果。
//!
//! ## 设计原则
//!
//! - 行在构建语料时创建一次，之后**不可变**
//! - 下游阶段（NLP、过滤、渲染）产出新表，不修改源表
//! - 字段顺序即 JSONL 输出的列顺序

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::nlp::{NLP_COLUMNS, NlpFields};
use crate::query::{Row, Value};

/// 行分类
///
/// 前缀决定标记位：`engine_*` 为引擎内容，`choice_*` 为分支，
/// `dialogue_*` 为需要阅读的文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `#` 注释
    EngineComment,
    /// `$` 内联代码
    EngineInlineCode,
    /// 场景/引擎指令或空行
    EngineDirective,
    /// `if ` / `else:` 分支条件
    ChoiceCondition,
    /// `m "..."` 别名对白
    DialogueAlias,
    /// `"Name" "..."` 具名对白
    DialogueName,
    /// `"\"...\""` 未指明说话人的对白
    DialogueUnspecified,
    /// `"..."` 内心独白/旁白
    DialogueInternal,
    /// `"...":` 玩家选项
    ChoicePlayer,
    /// 未匹配任何规则
    Unknown,
}

impl Category {
    /// 全部分类（按分类规则顺序）
    pub const ALL: [Category; 10] = [
        Category::EngineComment,
        Category::EngineInlineCode,
        Category::EngineDirective,
        Category::ChoiceCondition,
        Category::DialogueAlias,
        Category::DialogueName,
        Category::DialogueUnspecified,
        Category::DialogueInternal,
        Category::ChoicePlayer,
        Category::Unknown,
    ];

    /// 分类名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EngineComment => "engine_comment",
            Self::EngineInlineCode => "engine_inline_code",
            Self::EngineDirective => "engine_directive",
            Self::ChoiceCondition => "choice_condition",
            Self::DialogueAlias => "dialogue_alias",
            Self::DialogueName => "dialogue_name",
            Self::DialogueUnspecified => "dialogue_unspecified",
            Self::DialogueInternal => "dialogue_internal",
            Self::ChoicePlayer => "choice_player",
            Self::Unknown => "unknown",
        }
    }

    /// 是否为引擎内容（分类名以 `engine` 开头）
    pub fn is_engine(&self) -> bool {
        self.as_str().starts_with("engine")
    }

    /// 是否为分支相关（分类名以 `choice` 开头）
    pub fn is_choice(&self) -> bool {
        self.as_str().starts_with("choice")
    }

    /// 是否为对白/旁白（分类名以 `dialogue` 开头）
    pub fn is_dialogue(&self) -> bool {
        self.as_str().starts_with("dialogue")
    }

    /// 是否能归属到具名说话人
    pub fn has_speaker(&self) -> bool {
        self.is_dialogue()
            && !matches!(self, Self::DialogueUnspecified | Self::DialogueInternal)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("未知分类 '{}'", s))
    }
}

/// 语料表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    /// 脚本标识符（文件名，不含扩展名）
    pub file: String,
    /// 文件内行号（从 0 开始）
    pub line_idx: usize,
    /// 原始行文本（含换行符）
    pub raw: String,
    /// 分类结果
    pub category: Category,
    /// 规范化后的说话人（仅对白分类存在）
    pub speaker: Option<String>,
    /// 清理/提取后的显示文本
    pub line: String,
    /// 引擎指令、注释或空行
    pub is_renpy: bool,
    /// 玩家选项或其条件
    pub is_choice: bool,
    /// 需要阅读的叙述/对白
    pub is_read: bool,
    /// 可归属到具名说话人
    pub has_speaker: bool,
    /// 仅能经由先前的选项到达的缩进内容
    pub is_branch: bool,
}

impl ScriptLine {
    /// 从脚本路径得到脚本标识符（文件名去掉扩展名）
    pub fn file_id(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// `ScriptLine` 的列名（按输出顺序）
pub const SCRIPT_LINE_COLUMNS: [&str; 11] = [
    "file",
    "line_idx",
    "raw",
    "category",
    "speaker",
    "line",
    "is_renpy",
    "is_choice",
    "is_read",
    "has_speaker",
    "is_branch",
];

impl Row for ScriptLine {
    fn column(&self, name: &str) -> Option<Value> {
        let value = match name {
            "file" => Value::String(self.file.clone()),
            "line_idx" => Value::Int(self.line_idx as i64),
            "raw" => Value::String(self.raw.clone()),
            "category" => Value::String(self.category.as_str().to_string()),
            "speaker" => self
                .speaker
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            "line" => Value::String(self.line.clone()),
            "is_renpy" => Value::Bool(self.is_renpy),
            "is_choice" => Value::Bool(self.is_choice),
            "is_read" => Value::Bool(self.is_read),
            "has_speaker" => Value::Bool(self.has_speaker),
            "is_branch" => Value::Bool(self.is_branch),
            _ => return None,
        };
        Some(value)
    }

    fn column_names(&self) -> Vec<&'static str> {
        SCRIPT_LINE_COLUMNS.to_vec()
    }
}

/// 分析表的一行：语料行加可选的 NLP 列
///
/// 序列化时展平为一个 JSON 对象，未做 NLP 时不含 NLP 列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(flatten)]
    pub line: ScriptLine,
    #[serde(flatten)]
    pub nlp: Option<NlpFields>,
}

impl From<ScriptLine> for AnalyticsRow {
    fn from(line: ScriptLine) -> Self {
        Self { line, nlp: None }
    }
}

impl Row for AnalyticsRow {
    fn column(&self, name: &str) -> Option<Value> {
        self.line
            .column(name)
            .or_else(|| self.nlp.as_ref().and_then(|nlp| nlp.column(name)))
    }

    fn column_names(&self) -> Vec<&'static str> {
        let mut names = self.line.column_names();
        if self.nlp.is_some() {
            names.extend(NLP_COLUMNS);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_prefix_groups() {
        assert!(Category::EngineComment.is_engine());
        assert!(Category::EngineInlineCode.is_engine());
        assert!(Category::EngineDirective.is_engine());
        assert!(Category::ChoiceCondition.is_choice());
        assert!(Category::ChoicePlayer.is_choice());
        assert!(Category::DialogueInternal.is_dialogue());
        assert!(!Category::Unknown.is_engine());
        assert!(!Category::Unknown.is_choice());
        assert!(!Category::Unknown.is_dialogue());
    }

    #[test]
    fn test_category_has_speaker() {
        assert!(Category::DialogueAlias.has_speaker());
        assert!(Category::DialogueName.has_speaker());
        assert!(!Category::DialogueUnspecified.has_speaker());
        assert!(!Category::DialogueInternal.has_speaker());
        assert!(!Category::ChoicePlayer.has_speaker());
    }

    #[test]
    fn test_category_serde_uses_snake_case() {
        let json = serde_json::to_string(&Category::DialogueUnspecified).unwrap();
        assert_eq!(json, "\"dialogue_unspecified\"");

        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("renpy_comment".parse::<Category>().is_err());
    }

    #[test]
    fn test_file_id_strips_directory_and_extension() {
        assert_eq!(ScriptLine::file_id(Path::new("Adastra/game/a1s1.rpy")), "a1s1");
        assert_eq!(ScriptLine::file_id(Path::new("end_game2.rpy")), "end_game2");
    }

    #[test]
    fn test_row_columns() {
        let line = ScriptLine {
            file: "a1s1".to_string(),
            line_idx: 3,
            raw: "    m \"Hi.\"\n".to_string(),
            category: Category::DialogueAlias,
            speaker: Some("marco".to_string()),
            line: "Hi.".to_string(),
            is_renpy: false,
            is_choice: false,
            is_read: true,
            has_speaker: true,
            is_branch: true,
        };

        assert_eq!(line.column("line_idx"), Some(Value::Int(3)));
        assert_eq!(
            line.column("category"),
            Some(Value::String("dialogue_alias".to_string()))
        );
        assert_eq!(line.column("is_branch"), Some(Value::Bool(true)));
        assert_eq!(line.column("nope"), None);
        assert_eq!(line.column_names().len(), SCRIPT_LINE_COLUMNS.len());
    }

    #[test]
    fn test_json_field_order() {
        let line = ScriptLine {
            file: "a1s1".to_string(),
            line_idx: 0,
            raw: "\n".to_string(),
            category: Category::EngineDirective,
            speaker: None,
            line: String::new(),
            is_renpy: true,
            is_choice: false,
            is_read: false,
            has_speaker: false,
            is_branch: false,
        };
        let json = serde_json::to_string(&line).unwrap();
        let mut last = 0;
        for column in SCRIPT_LINE_COLUMNS {
            let pos = json.find(&format!("\"{}\":", column)).unwrap();
            assert!(pos >= last, "column {} out of order", column);
            last = pos;
        }
        assert!(json.contains("\"speaker\":null"));
    }

    #[test]
    fn test_analytics_row_columns() {
        let line = crate::script::ScriptParser::new("Marco").parse_line("a1s1", 0, "m \"Fine.\"\n");
        let plain = AnalyticsRow::from(line.clone());
        assert_eq!(plain.column("num_words"), None);
        assert_eq!(plain.column_names().len(), SCRIPT_LINE_COLUMNS.len());

        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("sentiment"));
        let back: AnalyticsRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plain);

        let augmented = AnalyticsRow {
            line,
            nlp: Some(crate::nlp::NlpAnalyzer::new().analyze("Fine.")),
        };
        assert_eq!(augmented.column("num_words"), Some(Value::Int(1)));
        assert_eq!(
            augmented.column_names().len(),
            SCRIPT_LINE_COLUMNS.len() + NLP_COLUMNS.len()
        );
        let json = serde_json::to_string(&augmented).unwrap();
        let back: AnalyticsRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, augmented);
    }
}
