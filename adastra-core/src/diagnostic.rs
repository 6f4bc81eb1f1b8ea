//! # 诊断模块
//!
//! 对已构建的语料做静态检查，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，只读取语料
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 未能分类的行只降级为警告，不影响构建

use std::collections::BTreeMap;

use crate::corpus::Corpus;
use crate::line::Category;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// 脚本标识符
    pub script_id: String,
    /// 行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    pub message: String,
    /// 诊断详情（可选，如原始行内容）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, script_id, message)
    }

    /// 创建警告诊断
    pub fn warn(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, script_id, message)
    }

    /// 创建信息诊断
    pub fn info(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, script_id, message)
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.script_id)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    pub fn info_count(&self) -> usize {
        self.count(DiagnosticLevel::Info)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤（包含更高级别）
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

/// 分析语料，返回诊断结果
///
/// - 每个 `unknown` 行一条警告（行号从 1 开始，详情为原始行）
/// - 每个脚本一条统计信息
pub fn analyze_corpus(corpus: &Corpus) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    for file in corpus.files() {
        let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
        let mut total = 0;

        for line in corpus.lines_of(file) {
            total += 1;
            *counts.entry(line.category).or_insert(0) += 1;

            if line.category == Category::Unknown {
                result.push(
                    Diagnostic::warn(file, "行未匹配任何分类规则")
                        .with_line(line.line_idx + 1)
                        .with_detail(line.raw.trim_end()),
                );
            }
        }

        let read = counts
            .iter()
            .filter(|(category, _)| category.is_dialogue())
            .map(|(_, n)| n)
            .sum::<usize>();
        let choices = counts
            .iter()
            .filter(|(category, _)| category.is_choice())
            .map(|(_, n)| n)
            .sum::<usize>();
        let unknown = counts.get(&Category::Unknown).copied().unwrap_or(0);

        result.push(Diagnostic::info(
            file,
            format!(
                "共 {} 行：对白 {} 行，分支 {} 行，未分类 {} 行",
                total, read, choices, unknown
            ),
        ));
    }

    result
}
