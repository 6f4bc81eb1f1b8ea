//! # Runs 模块
//!
//! 子命令的具体实现：构建数据集、执行任务、检索与浏览。

use std::fs;
use std::path::{Path, PathBuf};

use adastra_core::{
    AdastraError, AnalysisError, AnalyticsRow, CorpusBuilder, DiagnosticLevel, NlpAnalyzer,
    analyze_corpus, augment, filter_rows, load_records, relplot_series, render, run_query,
    save_jsonl, word_frequencies, write_screenplays,
};
use anyhow::{Context, bail};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, NamedJob};

/// 构建数据集，返回写出的路径
pub fn build(config: &AppConfig, nlp: bool) -> anyhow::Result<PathBuf> {
    let paths = config.script_paths();
    let corpus = CorpusBuilder::new(config.main_character.as_str())
        .build(&paths)
        .context("构建语料失败")?;

    let diagnostics = analyze_corpus(&corpus);
    for diag in diagnostics.filter_by_level(DiagnosticLevel::Warn) {
        debug!("{}", diag);
    }

    let path = config.dataset_path(nlp);
    let saved = if nlp {
        let rows = augment(&corpus, &NlpAnalyzer::new());
        save_jsonl(&rows, &path)
    } else {
        corpus.save(&path)
    };
    saved.with_context(|| format!("写出数据集失败: {}", path.display()))?;

    println!(
        "✅ 数据集已生成: {}（{} 行，{} 个文件，{} 行未分类）",
        path.display(),
        corpus.len(),
        corpus.files().len(),
        diagnostics.warn_count()
    );
    Ok(path)
}

/// 载入数据集并应用全局过滤条件
pub fn load_dataset(config: &AppConfig) -> anyhow::Result<Vec<AnalyticsRow>> {
    let path = config.dataset_path(config.use_nlp);
    let rows = load_records(&path)
        .with_context(|| format!("读取数据集失败: {}（请先运行 build）", path.display()))?;
    let rows = filter_rows(&rows, &config.filter).context("全局过滤条件求值失败")?;
    info!(path = %path.display(), rows = rows.len(), "数据集已载入");
    Ok(rows)
}

/// 要执行的任务
///
/// `None` 表示未指定该类任务，空列表表示该类全部任务。
#[derive(Debug, Clone, Default)]
pub struct RunSelection {
    pub queries: Option<Vec<String>>,
    pub screenplays: Option<Vec<String>>,
    pub relplots: Option<Vec<String>>,
    pub wordclouds: Option<Vec<String>>,
}

impl RunSelection {
    /// 没有指定任何类别时执行全部任务
    fn resolved(&self) -> Self {
        let unset = self.queries.is_none()
            && self.screenplays.is_none()
            && self.relplots.is_none()
            && self.wordclouds.is_none();
        if unset {
            Self {
                queries: Some(Vec::new()),
                screenplays: Some(Vec::new()),
                relplots: Some(Vec::new()),
                wordclouds: Some(Vec::new()),
            }
        } else {
            self.clone()
        }
    }
}

fn select_jobs<'a, J: NamedJob>(
    kind: &str,
    jobs: &'a [J],
    names: Option<&[String]>,
) -> anyhow::Result<Vec<&'a J>> {
    let Some(names) = names else {
        return Ok(Vec::new());
    };
    if names.is_empty() {
        return Ok(jobs.iter().collect());
    }

    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        match jobs.iter().find(|job| job.name() == name) {
            Some(job) => selected.push(job),
            None => bail!("未定义的 {} 任务: {}", kind, name),
        }
    }
    Ok(selected)
}

/// 执行选中的任务，返回写出的全部路径
pub fn run_jobs(
    config: &AppConfig,
    rows: &[AnalyticsRow],
    selection: &RunSelection,
) -> anyhow::Result<Vec<PathBuf>> {
    let selection = selection.resolved();

    // 先解析全部名称，未知名称不会留下半途的输出
    let queries = select_jobs("queries", &config.queries, selection.queries.as_deref())?;
    let screenplays = select_jobs(
        "screenplays",
        &config.screenplays,
        selection.screenplays.as_deref(),
    )?;
    let relplots = select_jobs("relplots", &config.relplots, selection.relplots.as_deref())?;
    let wordclouds = select_jobs(
        "wordclouds",
        &config.wordclouds,
        selection.wordclouds.as_deref(),
    )?;

    let mut written = Vec::new();

    for job in queries {
        let result =
            run_query(rows, &job.spec).with_context(|| format!("查询 {} 失败", job.name))?;
        save_jsonl(&result, &job.file)?;
        info!(job = %job.name, rows = result.len(), "查询完成");
        written.push(job.file.clone());
    }

    for job in screenplays {
        let files =
            render(rows, &job.spec).with_context(|| format!("剧本 {} 失败", job.name))?;
        let paths = write_screenplays(&files, &job.folder)?;
        info!(job = %job.name, files = paths.len(), "剧本完成");
        written.extend(paths);
    }

    for job in relplots {
        let points = relplot_series(rows, &job.spec)
            .with_context(|| format!("关系图 {} 失败", job.name))?;
        save_jsonl(&points, &job.file)?;
        info!(job = %job.name, points = points.len(), "关系图数据完成");
        written.push(job.file.clone());
    }

    for job in wordclouds {
        let weights = match word_frequencies(rows, &job.spec) {
            Ok(weights) => weights,
            Err(AdastraError::Analysis(AnalysisError::EmptySelection { .. })) => {
                warn!(job = %job.name, "词云没有选中任何行，已跳过");
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("词云 {} 失败", job.name)),
        };
        write_json(&weights, &job.file)?;
        info!(job = %job.name, words = weights.len(), "词云数据完成");
        written.push(job.file.clone());
    }

    Ok(written)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("创建目录失败: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("写出文件失败: {}", path.display()))?;
    Ok(())
}

/// 在非引擎行中做大小写无关的子串检索
pub fn find<'a>(rows: &'a [AnalyticsRow], text: &str) -> Vec<&'a AnalyticsRow> {
    let needle = text.to_lowercase();
    rows.iter()
        .filter(|row| !row.line.is_renpy)
        .filter(|row| row.line.line.to_lowercase().contains(&needle))
        .collect()
}

/// 某个脚本中玩家会读到的行（忽略 `.rpy` 后缀与大小写）
pub fn show<'a>(rows: &'a [AnalyticsRow], file: &str) -> Vec<&'a AnalyticsRow> {
    let lowered = file.to_lowercase();
    let file = lowered.strip_suffix(".rpy").unwrap_or(lowered.as_str());
    rows.iter()
        .filter(|row| row.line.is_read && row.line.file.to_lowercase() == file)
        .collect()
}

/// `find` 的输出行
pub fn format_found(row: &AnalyticsRow) -> String {
    let line = &row.line;
    format!(
        "{} {} {} {} {} {}",
        line.file,
        line.line_idx,
        line.speaker.as_deref().unwrap_or("-"),
        line.is_choice,
        line.is_branch,
        line.line
    )
}

/// `show` 的输出行
pub fn format_shown(row: &AnalyticsRow) -> String {
    let line = &row.line;
    format!(
        "{} {} {} {}",
        line.line_idx,
        line.speaker.as_deref().unwrap_or("-"),
        line.is_branch,
        line.line
    )
}
