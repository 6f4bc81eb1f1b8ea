//! # 词频模块
//!
//! 计算选中行相对于全表的 TF-IDF 词权重（词云的数据来源）。
//!
//! ```text
//! n      = N + s
//! df_j  += s
//! idf_j  = ln((n - k) / (df_j - qdf_j)) + 1
//! w_j    = Σ_i normalize_l2(tf_ij · idf_j)
//! ```
//!
//! `N` 为全表行数，`k` 为选中行数，`qdf_j` 为选中行中的文档频率，
//! 平滑时 `s = 1`。分子分母最小取 1。

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AdastraResult, AnalysisError};
use crate::nlp::STOP_WORDS;
use crate::query::{EvalError, Filter, Row, Value};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

fn default_true() -> bool {
    true
}

fn default_min_token_len() -> usize {
    2
}

fn default_doc_col() -> String {
    "line".to_string()
}

/// 分词计数参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCounter {
    /// 计数前转为小写
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// 去除英文停用词
    #[serde(default)]
    pub stop_words: bool,
    /// 最短词长（字符数）
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
}

impl Default for TermCounter {
    fn default() -> Self {
        Self {
            lowercase: true,
            stop_words: false,
            min_token_len: default_min_token_len(),
        }
    }
}

impl TermCounter {
    /// 切分一个文档
    pub fn tokenize(&self, document: &str) -> Vec<String> {
        TOKEN
            .find_iter(document)
            .map(|m| {
                if self.lowercase {
                    m.as_str().to_lowercase()
                } else {
                    m.as_str().to_string()
                }
            })
            .filter(|token| token.chars().count() >= self.min_token_len)
            .filter(|token| !self.stop_words || !STOP_WORDS.contains(&token.to_lowercase().as_str()))
            .collect()
    }

    /// 对每一行的文档列计数
    ///
    /// 文档列可以是文本或词列表，空值视为空文档。
    pub fn count<R: Row>(&self, rows: &[R], doc_col: &str) -> Result<TermCounts, EvalError> {
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let value = row.column(doc_col).ok_or_else(|| EvalError::UnknownColumn {
                name: doc_col.to_string(),
            })?;
            let document = match value {
                Value::List(items) => items.join(" "),
                other => other.to_text(),
            };
            let mut counts = BTreeMap::new();
            for token in self.tokenize(&document) {
                *counts.entry(token).or_insert(0) += 1;
            }
            docs.push(counts);
        }
        Ok(TermCounts { docs })
    }
}

/// 每行的词计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermCounts {
    docs: Vec<BTreeMap<String, usize>>,
}

impl TermCounts {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// 第 `idx` 行的词计数
    pub fn doc(&self, idx: usize) -> Option<&BTreeMap<String, usize>> {
        self.docs.get(idx)
    }
}

/// 文档频率：包含该词的文档数
fn doc_freq<'a>(docs: impl Iterator<Item = &'a BTreeMap<String, usize>>) -> BTreeMap<&'a str, usize> {
    let mut freq = BTreeMap::new();
    for doc in docs {
        for word in doc.keys() {
            *freq.entry(word.as_str()).or_insert(0) += 1;
        }
    }
    freq
}

/// 计算选中行的加权词频
///
/// `selected` 为行下标（越界下标被忽略）。权重不大于 0 的词被丢弃。
pub fn weighted_word_frequencies(
    counts: &TermCounts,
    selected: &[usize],
    smooth_idf: bool,
) -> BTreeMap<String, f64> {
    let smoothing = usize::from(smooth_idf);
    let selected: Vec<usize> = {
        let mut seen = HashSet::new();
        selected
            .iter()
            .copied()
            .filter(|idx| *idx < counts.len() && seen.insert(*idx))
            .collect()
    };

    let n = counts.len() + smoothing;
    let k = selected.len();
    let all_doc_freq = doc_freq(counts.docs.iter());
    let selected_doc_freq = doc_freq(selected.iter().map(|idx| &counts.docs[*idx]));

    let numerator = n.saturating_sub(k).max(1) as f64;
    let idf = |word: &str| -> f64 {
        let df = all_doc_freq.get(word).copied().unwrap_or(0) + smoothing;
        let qdf = selected_doc_freq.get(word).copied().unwrap_or(0);
        let denominator = df.saturating_sub(qdf).max(1) as f64;
        (numerator / denominator).ln() + 1.0
    };

    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for idx in &selected {
        let doc = &counts.docs[*idx];
        let row: Vec<(&str, f64)> = doc
            .iter()
            .map(|(word, tf)| (word.as_str(), *tf as f64 * idf(word.as_str())))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        for (word, weight) in row {
            *weights.entry(word.to_string()).or_insert(0.0) += weight / norm;
        }
    }

    weights.retain(|_, weight| *weight > 0.0);
    weights
}

/// 词频任务定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordFrequencySpec {
    /// 选中行
    #[serde(default, rename = "where")]
    pub filter: Filter,
    /// 文档列
    #[serde(default = "default_doc_col")]
    pub doc_col: String,
    #[serde(default = "default_true")]
    pub smooth_idf: bool,
    /// 分词参数
    #[serde(default)]
    pub terms: TermCounter,
}

impl Default for WordFrequencySpec {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            doc_col: default_doc_col(),
            smooth_idf: true,
            terms: TermCounter::default(),
        }
    }
}

/// 对全表计数，按过滤条件选行，计算加权词频
///
/// 过滤后没有任何行时返回 [`AnalysisError::EmptySelection`]。
pub fn word_frequencies<R: Row>(rows: &[R], spec: &WordFrequencySpec) -> AdastraResult<BTreeMap<String, f64>> {
    let counts = spec.terms.count(rows, &spec.doc_col)?;

    let mut selected = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if spec.filter.matches(row)? {
            selected.push(idx);
        }
    }

    if selected.is_empty() {
        warn!(filter = spec.filter.source(), "过滤条件没有选中任何行");
        return Err(AnalysisError::EmptySelection {
            filter: spec.filter.source().to_string(),
        }
        .into());
    }

    let weights = weighted_word_frequencies(&counts, &selected, spec.smooth_idf);
    debug!(rows = selected.len(), words = weights.len(), "词频计算完成");
    Ok(weights)
}
