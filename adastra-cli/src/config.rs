//! # Config 模块
//!
//! 命令行工具的配置管理，集中管理脚本位置、数据目录和各类任务。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (adastra.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use adastra_core::{
    DEFAULT_MAIN_CHARACTER, DEFAULT_SCRIPT_FILES, Filter, QuerySpec, RelplotSpec, ScreenplaySpec,
    WordFrequencySpec, script_paths,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 游戏根目录
    #[serde(default = "default_adastra_dir")]
    pub adastra_dir: PathBuf,

    /// 脚本所在子目录（相对于 adastra_dir）
    #[serde(default = "default_script_subdir")]
    pub script_subdir: String,

    /// 按阅读顺序排列的脚本文件
    #[serde(default = "default_script_files")]
    pub script_files: Vec<String>,

    /// 主角名（无说话人的独白归属于他）
    #[serde(default = "default_main_character")]
    pub main_character: String,

    /// 数据集输出目录
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// 是否使用带 NLP 列的数据集
    #[serde(default)]
    pub use_nlp: bool,

    /// 载入数据集时先应用的全局过滤条件
    #[serde(default, rename = "where")]
    pub filter: Filter,

    #[serde(default)]
    pub queries: Vec<QueryJob>,

    #[serde(default)]
    pub screenplays: Vec<ScreenplayJob>,

    #[serde(default)]
    pub relplots: Vec<RelplotJob>,

    #[serde(default)]
    pub wordclouds: Vec<WordcloudJob>,
}

/// 查询任务：结果写为 JSONL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJob {
    pub name: String,
    pub file: PathBuf,
    #[serde(flatten)]
    pub spec: QuerySpec,
}

/// 剧本任务：每个脚本一个文本文件，写入 `folder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenplayJob {
    pub name: String,
    pub folder: PathBuf,
    #[serde(flatten)]
    pub spec: ScreenplaySpec,
}

/// 关系图任务：数据序列写为 JSONL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelplotJob {
    pub name: String,
    pub file: PathBuf,
    #[serde(flatten)]
    pub spec: RelplotSpec,
}

/// 词云任务：词权重写为 JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordcloudJob {
    pub name: String,
    pub file: PathBuf,
    #[serde(flatten)]
    pub spec: WordFrequencySpec,
}

/// 有名字的任务
pub trait NamedJob {
    fn name(&self) -> &str;
}

macro_rules! impl_named_job {
    ($($job:ty),*) => {
        $(impl NamedJob for $job {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named_job!(QueryJob, ScreenplayJob, RelplotJob, WordcloudJob);

// 默认值函数
fn default_adastra_dir() -> PathBuf {
    PathBuf::from("Adastra")
}

fn default_script_subdir() -> String {
    "game".to_string()
}

fn default_script_files() -> Vec<String> {
    DEFAULT_SCRIPT_FILES.iter().map(|f| f.to_string()).collect()
}

fn default_main_character() -> String {
    DEFAULT_MAIN_CHARACTER.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adastra_dir: default_adastra_dir(),
            script_subdir: default_script_subdir(),
            script_files: default_script_files(),
            main_character: default_main_character(),
            data_dir: default_data_dir(),
            use_nlp: false,
            filter: Filter::default(),
            queries: Vec::new(),
            screenplays: Vec::new(),
            relplots: Vec::new(),
            wordclouds: Vec::new(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.main_character.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "必须配置 main_character（主角名）".to_string(),
            ));
        }

        if self.script_files.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "script_files 不能为空".to_string(),
            ));
        }

        let names = self
            .queries
            .iter()
            .map(|j| ("queries", j.name.as_str()))
            .chain(self.screenplays.iter().map(|j| ("screenplays", j.name.as_str())))
            .chain(self.relplots.iter().map(|j| ("relplots", j.name.as_str())))
            .chain(self.wordclouds.iter().map(|j| ("wordclouds", j.name.as_str())));
        for (kind, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} 中存在未命名的任务",
                    kind
                )));
            }
        }

        for job in &self.screenplays {
            let zero_width = job.spec.justify == Some(0)
                || job.spec.contexts.iter().any(|c| c.justify == Some(0));
            if zero_width {
                return Err(ConfigError::ValidationFailed(format!(
                    "剧本 {} 的 justify 必须大于 0",
                    job.name
                )));
            }
        }

        Ok(())
    }

    /// 数据集路径
    pub fn dataset_path(&self, nlp: bool) -> PathBuf {
        let file = if nlp { "adastra_nlp.jsonl" } else { "adastra.jsonl" };
        self.data_dir.join(file)
    }

    /// 按阅读顺序的脚本完整路径
    pub fn script_paths(&self) -> Vec<PathBuf> {
        script_paths(&self.adastra_dir, &self.script_subdir, &self.script_files)
    }
}

/// 配置错误
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// 序列化失败
    SerializationFailed(String),
    /// IO 错误
    IoError(String),
    /// 验证失败
    ValidationFailed(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::SerializationFailed(e) => write!(f, "配置序列化失败: {}", e),
            ConfigError::IoError(e) => write!(f, "配置 IO 错误: {}", e),
            ConfigError::ValidationFailed(e) => write!(f, "配置验证失败: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
