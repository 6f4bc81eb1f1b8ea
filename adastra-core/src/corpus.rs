//! # Corpus 模块
//!
//! 从脚本文件构建语料表，并以 JSONL（每行一个 JSON 对象）读写。
//!
//! 语料是所有文件按调用方给定顺序拼接的结果，不排序也不合并；
//! 任一文件缺失则整个构建失败。

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::CorpusError;
use crate::line::{AnalyticsRow, Category, ScriptLine};
use crate::script::{DEFAULT_MAIN_CHARACTER, ScriptParser};

/// Adastra 的脚本文件（按剧情顺序）
pub const DEFAULT_SCRIPT_FILES: [&str; 14] = [
    "a1s1.rpy",
    "a1s2.rpy",
    "a1s3.rpy",
    "a1s4.rpy",
    "a1s5.rpy",
    "a1s6.rpy",
    "a1s7.rpy",
    "a2s1.rpy",
    "a2s2.rpy",
    "a2s3.rpy",
    "a3s1.rpy",
    "a3s2.rpy",
    "end_game1.rpy",
    "end_game2.rpy",
];

/// 按列表顺序拼出 `<adastra_dir>/<subdir>/<file>`
pub fn script_paths<S: AsRef<str>>(adastra_dir: &Path, subdir: &str, files: &[S]) -> Vec<PathBuf> {
    let base = adastra_dir.join(subdir);
    files.iter().map(|file| base.join(file.as_ref())).collect()
}

/// 语料表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    lines: Vec<ScriptLine>,
}

impl Corpus {
    /// 由已解析的行创建
    pub fn new(lines: Vec<ScriptLine>) -> Self {
        Self { lines }
    }

    /// 全部行
    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<ScriptLine> {
        self.lines
    }

    /// 脚本标识符（按首次出现顺序）
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for line in &self.lines {
            if !files.contains(&line.file.as_str()) {
                files.push(&line.file);
            }
        }
        files
    }

    /// 某个脚本的全部行
    pub fn lines_of<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ScriptLine> + 'a {
        self.lines.iter().filter(move |line| line.file == file)
    }

    /// 每个分类的行数
    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for line in &self.lines {
            *counts.entry(line.category).or_insert(0) += 1;
        }
        counts
    }

    /// 未能分类的行
    pub fn unknown_lines(&self) -> Vec<&ScriptLine> {
        self.lines
            .iter()
            .filter(|line| line.category == Category::Unknown)
            .collect()
    }

    /// 写出 JSONL
    pub fn write_jsonl(&self, writer: impl Write) -> io::Result<()> {
        write_jsonl(&self.lines, writer)
    }

    /// 保存为 JSONL 文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        save_jsonl(&self.lines, path)
    }
}

/// 语料构建器
pub struct CorpusBuilder {
    main_character: String,
}

impl CorpusBuilder {
    pub fn new(main_character: impl Into<String>) -> Self {
        Self {
            main_character: main_character.into(),
        }
    }

    /// 读取并解析全部脚本
    ///
    /// 任一路径不存在时返回 [`CorpusError::MissingInputFile`]，不返回部分结果。
    pub fn build<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Corpus, CorpusError> {
        let mut parser = ScriptParser::new(self.main_character.as_str());
        let mut lines = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|e| CorpusError::from_io(path, e))?;
            let file = ScriptLine::file_id(path);
            let parsed = parser.parse_text(&file, &text);
            debug!(file = %file, lines = parsed.len(), "脚本解析完成");
            lines.extend(parsed);
        }

        let unknown = parser.unknown_count();
        if unknown > 0 {
            warn!(count = unknown, "存在未能分类的行");
        }
        info!(files = paths.len(), lines = lines.len(), "语料构建完成");

        Ok(Corpus::new(lines))
    }
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAIN_CHARACTER)
    }
}

/// 以 JSONL 写出任意行
pub fn write_jsonl<T: Serialize>(rows: &[T], writer: impl Write) -> io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// 以 JSONL 保存任意行（自动创建父目录）
pub fn save_jsonl<T: Serialize>(rows: &[T], path: &Path) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CorpusError::from_io(parent, e))?;
    }
    let file = fs::File::create(path).map_err(|e| CorpusError::from_io(path, e))?;
    write_jsonl(rows, file).map_err(|e| CorpusError::from_io(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), "JSONL 已写出");
    Ok(())
}

/// 解析 JSONL 文本（跳过空行）
pub fn parse_records(text: &str) -> Result<Vec<AnalyticsRow>, CorpusError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| CorpusError::InvalidRecord {
                line: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// 读取 JSONL 数据集
pub fn load_records(path: &Path) -> Result<Vec<AnalyticsRow>, CorpusError> {
    let text = fs::read_to_string(path).map_err(|e| CorpusError::from_io(path, e))?;
    let records = parse_records(&text)?;
    info!(path = %path.display(), rows = records.len(), "数据集加载完成");
    Ok(records)
}
