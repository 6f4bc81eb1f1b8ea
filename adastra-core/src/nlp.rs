//! # NLP 模块
//!
//! 为语料行附加情感、分句、分词等派生列。
//!
//! ## 规则
//!
//! - 分句：`.` `!` `?`（可连续）之后是空白或文本结尾
//! - 分词：字母/数字序列，可包含内部撇号（`don't`），不含标点
//! - 实词：小写化后不在英文停用词表中的词
//! - 情感：词典命中词的平均极性；前一个词是程度副词时乘以其系数，
//!   前两个词中有否定词时极性乘以 -0.5

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::line::AnalyticsRow;
use crate::query::Value;

/// 句末标点（可连续）加空白或结尾
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex"));

/// 单词：字母/数字，允许内部撇号
static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}\p{N}]+)*").expect("valid regex")
});

/// 否定词使极性反转并减半
const NEGATION_FACTOR: f64 = -0.5;

/// 否定词的作用窗口（向前看的词数）
const NEGATION_WINDOW: usize = 2;

/// 英文停用词
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "even",
    "ever", "every", "few", "for", "from", "further", "get", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "me", "might", "more", "most", "must", "my", "myself",
    "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
    "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "still", "such",
    "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "us", "very", "was",
    "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves", "i'm", "it's", "don't",
    "can't", "won't", "that's", "you're", "i'll", "i've", "we're", "let's",
];

/// 情感词典：词 → (极性, 主观性)
const SENTIMENT_LEXICON: &[(&str, f64, f64)] = &[
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.8, 1.0),
    ("glad", 0.5, 1.0),
    ("love", 0.5, 0.6),
    ("beautiful", 0.85, 1.0),
    ("wonderful", 1.0, 1.0),
    ("nice", 0.6, 1.0),
    ("kind", 0.6, 0.9),
    ("safe", 0.5, 0.5),
    ("calm", 0.3, 0.75),
    ("warm", 0.6, 0.6),
    ("fine", 0.4, 0.5),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("amazing", 0.6, 0.9),
    ("perfect", 1.0, 1.0),
    ("brave", 0.8, 1.0),
    ("strong", 0.43, 0.73),
    ("gentle", 0.5, 0.75),
    ("sweet", 0.35, 0.65),
    ("lovely", 0.5, 0.75),
    ("fun", 0.3, 0.2),
    ("funny", 0.25, 1.0),
    ("interesting", 0.5, 0.5),
    ("thank", 0.2, 0.2),
    ("thanks", 0.2, 0.2),
    ("friend", 0.3, 0.4),
    ("hope", 0.3, 0.5),
    ("smile", 0.3, 0.6),
    ("right", 0.29, 0.54),
    ("true", 0.35, 0.65),
    ("bad", -0.7, 0.67),
    ("terrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("sad", -0.5, 1.0),
    ("angry", -0.5, 1.0),
    ("afraid", -0.6, 0.9),
    ("scared", -0.5, 1.0),
    ("hate", -0.8, 0.9),
    ("wrong", -0.5, 0.9),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
    ("dead", -0.2, 0.4),
    ("dark", -0.15, 0.4),
    ("cold", -0.6, 1.0),
    ("stupid", -0.8, 1.0),
    ("weird", -0.5, 1.0),
    ("strange", -0.1, 0.15),
    ("hard", -0.29, 0.54),
    ("tired", -0.4, 0.7),
    ("hurt", -0.5, 0.6),
    ("pain", -0.5, 0.7),
    ("sorry", -0.5, 1.0),
    ("poor", -0.4, 0.6),
    ("lonely", -0.5, 1.0),
    ("dangerous", -0.6, 0.9),
    ("cruel", -1.0, 1.0),
    ("sick", -0.71, 0.86),
    ("crazy", -0.6, 0.9),
    ("mad", -0.62, 1.0),
    ("ugly", -0.7, 1.0),
];

/// 程度副词 → 极性系数
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("so", 1.3),
    ("too", 1.2),
    ("quite", 1.1),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("absolutely", 1.4),
    ("truly", 1.3),
    ("pretty", 1.1),
    ("rather", 1.1),
];

/// 否定词（另外，所有以 `n't` 结尾的词也视为否定）
const NEGATORS: &[&str] = &["not", "no", "never", "nothing", "nobody", "none", "neither", "nor"];

/// NLP 派生列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NlpFields {
    /// 情感极性，[-1, 1]
    pub sentiment: f64,
    /// 主观性，[0, 1]
    pub subjectivity: f64,
    pub sentences: Vec<String>,
    pub num_sentences: usize,
    /// 单词（保留原始大小写，不含标点）
    pub words: Vec<String>,
    pub num_words: usize,
    /// 去除停用词后的小写单词
    pub content_words: Vec<String>,
    pub num_content_words: usize,
}

/// `NlpFields` 的列名（按输出顺序）
pub const NLP_COLUMNS: [&str; 8] = [
    "sentiment",
    "subjectivity",
    "sentences",
    "num_sentences",
    "words",
    "num_words",
    "content_words",
    "num_content_words",
];

impl NlpFields {
    /// 按列名读取
    pub fn column(&self, name: &str) -> Option<Value> {
        let value = match name {
            "sentiment" => Value::Float(self.sentiment),
            "subjectivity" => Value::Float(self.subjectivity),
            "sentences" => Value::List(self.sentences.clone()),
            "num_sentences" => Value::Int(self.num_sentences as i64),
            "words" => Value::List(self.words.clone()),
            "num_words" => Value::Int(self.num_words as i64),
            "content_words" => Value::List(self.content_words.clone()),
            "num_content_words" => Value::Int(self.num_content_words as i64),
            _ => return None,
        };
        Some(value)
    }
}

/// 文本分析器
pub struct NlpAnalyzer {
    lexicon: HashMap<&'static str, (f64, f64)>,
    intensifiers: HashMap<&'static str, f64>,
    stop_words: HashSet<&'static str>,
}

impl NlpAnalyzer {
    /// 使用内置词典创建分析器
    pub fn new() -> Self {
        Self {
            lexicon: SENTIMENT_LEXICON
                .iter()
                .map(|(word, polarity, subjectivity)| (*word, (*polarity, *subjectivity)))
                .collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// 是否为停用词（输入应为小写）
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// 分析一段文本
    pub fn analyze(&self, text: &str) -> NlpFields {
        let sentences = split_sentences(text);
        let words = tokenize_words(text);
        let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let content_words: Vec<String> = lowered
            .iter()
            .filter(|w| !self.is_stop_word(w))
            .cloned()
            .collect();
        let (sentiment, subjectivity) = self.sentiment(&lowered);

        NlpFields {
            sentiment,
            subjectivity,
            num_sentences: sentences.len(),
            sentences,
            num_words: words.len(),
            words,
            num_content_words: content_words.len(),
            content_words,
        }
    }

    /// 计算 (极性, 主观性)，没有命中词典时为 (0, 0)
    fn sentiment(&self, lowered: &[String]) -> (f64, f64) {
        let mut polarities = Vec::new();
        let mut subjectivities = Vec::new();

        for (idx, word) in lowered.iter().enumerate() {
            let Some(&(mut polarity, subjectivity)) = self.lexicon.get(word.as_str()) else {
                continue;
            };

            if let Some(prev) = idx.checked_sub(1).map(|i| lowered[i].as_str())
                && let Some(factor) = self.intensifiers.get(prev)
            {
                polarity = (polarity * factor).clamp(-1.0, 1.0);
            }

            let window_start = idx.saturating_sub(NEGATION_WINDOW);
            if lowered[window_start..idx].iter().any(|w| is_negator(w)) {
                polarity *= NEGATION_FACTOR;
            }

            polarities.push(polarity);
            subjectivities.push(subjectivity);
        }

        if polarities.is_empty() {
            return (0.0, 0.0);
        }
        let n = polarities.len() as f64;
        (
            (polarities.iter().sum::<f64>() / n).clamp(-1.0, 1.0),
            (subjectivities.iter().sum::<f64>() / n).clamp(0.0, 1.0),
        )
    }
}

impl Default for NlpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't") || word.ends_with("n’t")
}

/// 分句
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        sentences.push(text[start..m.end()].trim().to_string());
        start = m.end();
    }
    sentences.push(text[start..].trim().to_string());
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// 分词（不含标点，保留大小写）
pub fn tokenize_words(text: &str) -> Vec<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// 为语料的每一行附加 NLP 列，返回新表
pub fn augment(corpus: &Corpus, analyzer: &NlpAnalyzer) -> Vec<AnalyticsRow> {
    corpus
        .lines()
        .iter()
        .map(|line| AnalyticsRow {
            nlp: Some(analyzer.analyze(&line.line)),
            line: line.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("We leave at dawn. Be ready!  Understood?"),
            vec!["We leave at dawn.", "Be ready!", "Understood?"]
        );
        assert_eq!(split_sentences("Wait... what?!"), vec!["Wait...", "what?!"]);
        // 小数点后没有空白，不分句
        assert_eq!(split_sentences("It costs 3.50 denarii"), vec!["It costs 3.50 denarii"]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_tokenize_words_drops_punctuation() {
        assert_eq!(
            tokenize_words("*Marco*, don't go -- it's late."),
            vec!["Marco", "don't", "go", "it's", "late"]
        );
    }

    #[test]
    fn test_analyze_counts() {
        let analyzer = NlpAnalyzer::new();
        let fields = analyzer.analyze("The sea is calm tonight. I like it.");
        assert_eq!(fields.num_sentences, 2);
        assert_eq!(fields.num_words, 8);
        assert_eq!(fields.content_words, vec!["sea", "calm", "tonight", "like"]);
        assert_eq!(fields.num_content_words, 4);
    }

    #[test]
    fn test_sentiment_lexicon_average() {
        let analyzer = NlpAnalyzer::new();
        let fields = analyzer.analyze("A good and bad day.");
        assert!((fields.sentiment - 0.0).abs() < 1e-9);
        assert!(fields.subjectivity > 0.0);

        let fields = analyzer.analyze("Nothing here to see.");
        assert_eq!(fields.sentiment, 0.0);
        assert_eq!(fields.subjectivity, 0.0);
    }

    #[test]
    fn test_intensifier_and_negation() {
        let analyzer = NlpAnalyzer::new();

        let plain = analyzer.analyze("That is good.").sentiment;
        let intense = analyzer.analyze("That is very good.").sentiment;
        assert!(intense > plain);
        assert!(intense <= 1.0);

        let negated = analyzer.analyze("That is not good.").sentiment;
        assert!((negated - plain * NEGATION_FACTOR).abs() < 1e-9);

        let contracted = analyzer.analyze("That isn't good.").sentiment;
        assert!(contracted < 0.0);
    }

    #[test]
    fn test_sentiment_is_bounded() {
        let analyzer = NlpAnalyzer::new();
        for text in [
            "extremely wonderful perfect best",
            "absolutely terrible awful worst",
            "",
        ] {
            let fields = analyzer.analyze(text);
            assert!((-1.0..=1.0).contains(&fields.sentiment), "{}", text);
            assert!((0.0..=1.0).contains(&fields.subjectivity), "{}", text);
        }
    }

    #[test]
    fn test_nlp_columns() {
        let fields = NlpAnalyzer::new().analyze("Hello there.");
        for name in NLP_COLUMNS {
            assert!(fields.column(name).is_some(), "{}", name);
        }
        assert_eq!(fields.column("num_words"), Some(Value::Int(2)));
        assert_eq!(fields.column("speaker"), None);
    }
}
