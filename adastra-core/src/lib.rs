//! # Adastra Core
//!
//! Adastra 剧本的解析与文本分析核心库。
//!
//! ## 架构概述
//!
//! `adastra-core` 是纯逻辑核心，不做日志初始化，也不退出进程。
//! 唯一的 IO 是通过显式路径读取脚本、读写 JSONL 和剧本文件。
//!
//! ```text
//! .rpy 脚本 ──► CorpusBuilder ──► Corpus (ScriptLine 表)
//!                                    │
//!                  ┌─────────────────┼──────────────────┐
//!                  ▼                 ▼                  ▼
//!             nlp::augment      query::Filter     diagnostic
//!                  │                 │
//!                  ▼                 ▼
//!            AnalyticsRow ──► 查询 / 剧本 / 词频 / 关系图
//! ```
//!
//! ## 核心类型
//!
//! - [`ScriptLine`]：语料表的一行
//! - [`Corpus`]：按文件顺序拼接的语料表
//! - [`Filter`]：类似 SQL `WHERE` 的行过滤条件
//! - [`AnalyticsRow`]：语料行加可选 NLP 列
//!
//! ## 使用示例
//!
//! ```ignore
//! use adastra_core::{CorpusBuilder, Filter, filter_rows, script_paths, DEFAULT_SCRIPT_FILES};
//!
//! let paths = script_paths(Path::new("Adastra"), "game", &DEFAULT_SCRIPT_FILES);
//! let corpus = CorpusBuilder::new("Marco").build(&paths)?;
//! corpus.save(Path::new("data/adastra.jsonl"))?;
//!
//! let filter = Filter::parse("speaker = 'cassius' and not is_branch")?;
//! let lines = filter_rows(corpus.lines(), &filter)?;
//! ```
//!
//! ## 模块结构
//!
//! - [`line`]：行模型与分类
//! - [`script`]：逐行解析（清理、分类、标记位、说话人）
//! - [`corpus`]：语料构建与 JSONL 读写
//! - [`diagnostic`]：语料诊断
//! - [`query`]：过滤表达式与查询
//! - [`nlp`]：情感、分句、分词
//! - [`tfidf`]：加权词频
//! - [`screenplay`]：剧本渲染
//! - [`relplot`]：关系图数据序列
//! - [`error`]：错误类型定义

pub mod corpus;
pub mod diagnostic;
pub mod error;
pub mod line;
pub mod nlp;
pub mod query;
pub mod relplot;
pub mod screenplay;
pub mod script;
pub mod tfidf;

// 重导出核心类型
pub use corpus::{
    Corpus, CorpusBuilder, DEFAULT_SCRIPT_FILES, load_records, parse_records, save_jsonl,
    script_paths, write_jsonl,
};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_corpus};
pub use error::{
    AdastraError, AdastraResult, AnalysisError, CorpusError, FilterError, ScreenplayError,
};
pub use line::{AnalyticsRow, Category, SCRIPT_LINE_COLUMNS, ScriptLine};
pub use nlp::{NLP_COLUMNS, NlpAnalyzer, NlpFields, augment};
pub use query::{EvalError, Expr, Filter, QuerySpec, Row, Value, filter_rows, run_query};
pub use relplot::{RelPoint, RelplotSpec, relplot_series};
pub use screenplay::{
    ContextConfig, PartFormat, ScreenplayFile, ScreenplaySpec, render, write_screenplays,
};
pub use script::{DEFAULT_MAIN_CHARACTER, ScriptParser};
pub use tfidf::{TermCounter, WordFrequencySpec, weighted_word_frequencies, word_frequencies};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let mut parser = ScriptParser::new("Marco");
        let line = parser.parse_line("a1s1", 0, "m \"Hello there.\"\n");
        assert_eq!(line.category, Category::DialogueAlias);

        let corpus = Corpus::new(vec![line]);
        let rows = augment(&corpus, &NlpAnalyzer::new());
        let filter = Filter::parse("num_words = 2").unwrap();
        assert_eq!(filter_rows(&rows, &filter).unwrap().len(), 1);

        let result = analyze_corpus(&corpus);
        assert_eq!(result.info_count(), 1);

        let _spec = QuerySpec::default();
        let _screenplay = ScreenplaySpec::default();
        let _wordcloud = WordFrequencySpec::default();
    }
}
