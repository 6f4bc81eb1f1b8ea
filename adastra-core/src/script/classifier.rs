//! # 行分类
//!
//! 对清理后的行按有序规则分类，第一条命中的规则生效。
//!
//! ## 规则顺序
//!
//! ```text
//! #…            → engine_comment
//! $…            → engine_inline_code
//! 引擎关键字 / 空行 → engine_directive
//! if  / else:   → choice_condition
//! m "…"         → dialogue_alias
//! "Name" "…"    → dialogue_name
//! ""…""         → dialogue_unspecified
//! "…"           → dialogue_internal
//! "…":          → choice_player
//! 其余           → unknown
//! ```
//!
//! 别名对白带有非引号前缀，必须先于其他引号形式检查；
//! `dialogue_unspecified` 比 `dialogue_internal` 更具体，因此排在前面。

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::line::Category;

/// 场景/引擎指令关键字（前缀匹配）
pub const ENGINE_KEYWORDS: [&str; 14] = [
    "ease", "hide", "jump", "label", "menu", "pause", "play", "queue", "return", "scene", "show",
    "stop", "window", "with",
];

/// 分支条件关键字（前缀匹配）
pub const CHOICE_CONDITION_KEYWORDS: [&str; 2] = ["if ", "else:"];

/// 未指明说话人的哨兵值
pub const SPEAKER_UNSPECIFIED: &str = "unspecified";

/// 内心独白的哨兵值
pub const SPEAKER_INTERNAL: &str = "internal";

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// 分类
    pub category: Category,
    /// 说话人（别名或名字，尚未规范化）
    pub speaker: Option<String>,
    /// 提取出的文本
    pub text: String,
}

impl Classification {
    fn new(category: Category, speaker: Option<String>, text: impl Into<String>) -> Self {
        Self {
            category,
            speaker,
            text: text.into(),
        }
    }
}

/// 说话人来源
#[derive(Debug, Clone, Copy)]
enum SpeakerSource {
    /// 来自 `speaker` 捕获组
    Captured,
    /// 固定哨兵值
    Sentinel(&'static str),
    /// 没有说话人
    Absent,
}

/// 单条分类规则的匹配方式
enum Matcher {
    /// 以任一前缀开头
    Prefix(&'static [&'static str]),
    /// 以任一前缀开头，或为空行
    PrefixOrEmpty(&'static [&'static str]),
    /// 整行匹配正则，`text` 捕获组为提取文本
    Pattern {
        regex: Regex,
        speaker: SpeakerSource,
    },
}

/// 分类规则
struct Rule {
    category: Category,
    matcher: Matcher,
}

impl Rule {
    fn prefix(category: Category, prefixes: &'static [&'static str]) -> Self {
        Self {
            category,
            matcher: Matcher::Prefix(prefixes),
        }
    }

    fn pattern(category: Category, pattern: &str, speaker: SpeakerSource) -> Self {
        Self {
            category,
            matcher: Matcher::Pattern {
                regex: Regex::new(pattern).expect("valid regex"),
                speaker,
            },
        }
    }

    /// 尝试应用规则，命中则返回分类结果
    fn apply(&self, line: &str) -> Option<Classification> {
        match &self.matcher {
            Matcher::Prefix(prefixes) => prefixes
                .iter()
                .any(|p| line.starts_with(p))
                .then(|| Classification::new(self.category, None, line)),
            Matcher::PrefixOrEmpty(prefixes) => (line.is_empty()
                || prefixes.iter().any(|p| line.starts_with(p)))
            .then(|| Classification::new(self.category, None, line)),
            Matcher::Pattern { regex, speaker } => {
                let caps = regex.captures(line)?;
                let speaker = match speaker {
                    SpeakerSource::Captured => capture(&caps, "speaker"),
                    SpeakerSource::Sentinel(s) => Some((*s).to_string()),
                    SpeakerSource::Absent => None,
                };
                let text = capture(&caps, "text").unwrap_or_default();
                Some(Classification::new(self.category, speaker, text))
            }
        }
    }
}

fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::prefix(Category::EngineComment, &["#"]),
        Rule::prefix(Category::EngineInlineCode, &["$"]),
        Rule {
            category: Category::EngineDirective,
            matcher: Matcher::PrefixOrEmpty(&ENGINE_KEYWORDS),
        },
        Rule::prefix(Category::ChoiceCondition, &CHOICE_CONDITION_KEYWORDS),
        Rule::pattern(
            Category::DialogueAlias,
            r#"^(?P<speaker>[a-z]+) "(?P<text>.*)"$"#,
            SpeakerSource::Captured,
        ),
        Rule::pattern(
            Category::DialogueName,
            r#"^"(?P<speaker>.*?)" "(?P<text>.*)"$"#,
            SpeakerSource::Captured,
        ),
        Rule::pattern(
            Category::DialogueUnspecified,
            r#"^"(?P<text>".+")"$"#,
            SpeakerSource::Sentinel(SPEAKER_UNSPECIFIED),
        ),
        Rule::pattern(
            Category::DialogueInternal,
            r#"^"(?P<text>.+)"$"#,
            SpeakerSource::Sentinel(SPEAKER_INTERNAL),
        ),
        Rule::pattern(
            Category::ChoicePlayer,
            r#"^"(?P<text>.+)":$"#,
            SpeakerSource::Absent,
        ),
    ]
});

/// 对清理后的行分类
///
/// 总是返回一个分类；没有规则命中时为 `unknown`，文本保持原样。
pub fn classify(cleaned: &str) -> Classification {
    RULES
        .iter()
        .find_map(|rule| rule.apply(cleaned))
        .unwrap_or_else(|| Classification::new(Category::Unknown, None, cleaned))
}
