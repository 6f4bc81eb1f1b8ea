//! # Error 模块
//!
//! 定义 adastra-core 中使用的错误类型。

use std::path::PathBuf;

use thiserror::Error;

use crate::query::EvalError;

/// 语料构建与读写错误
#[derive(Error, Debug)]
pub enum CorpusError {
    /// 脚本文件不存在
    #[error("脚本文件不存在: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// 文件读写失败
    #[error("文件读写失败: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSONL 记录无效
    #[error("第 {line} 行：无效的记录 - {message}")]
    InvalidRecord { line: usize, message: String },
}

impl CorpusError {
    /// 将 IO 错误映射为语料错误，`NotFound` 视为缺失输入文件
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingInputFile { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// 过滤表达式语法错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// 表达式意外结束
    #[error("过滤表达式意外结束: {message}")]
    UnexpectedEnd { message: String },

    /// 无效的语法
    #[error("过滤表达式第 {position} 字节处语法错误 - {message}")]
    InvalidSyntax { position: usize, message: String },
}

/// 分析阶段错误（词频、关系图数据等）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// 过滤后没有任何行，无法计算词频
    #[error("过滤条件 `{filter}` 没有选中任何行")]
    EmptySelection { filter: String },

    /// 列值不是数值
    #[error("列 '{column}' 在第 {row} 行不是数值")]
    NonNumericColumn { column: String, row: usize },

    /// 格式模板无效
    #[error("无效的格式模板 '{template}' - {message}")]
    InvalidTemplate { template: String, message: String },
}

/// 剧本输出错误
#[derive(Error, Debug)]
pub enum ScreenplayError {
    /// 输出文件写入失败
    #[error("剧本写入失败: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// adastra-core 统一错误类型
#[derive(Error, Debug)]
pub enum AdastraError {
    /// 语料错误
    #[error("语料错误: {0}")]
    Corpus(#[from] CorpusError),

    /// 过滤表达式语法错误
    #[error("过滤表达式错误: {0}")]
    Filter(#[from] FilterError),

    /// 求值错误
    #[error("求值错误: {0}")]
    Eval(#[from] EvalError),

    /// 分析错误
    #[error("分析错误: {0}")]
    Analysis(#[from] AnalysisError),

    /// 剧本输出错误
    #[error("剧本输出错误: {0}")]
    Screenplay(#[from] ScreenplayError),
}

/// Result 类型别名
pub type AdastraResult<T> = Result<T, AdastraError>;
