//! # Adastra
//!
//! Adastra 剧本分析工具：构建语料数据集，并按配置执行查询、剧本、关系图与词云任务。
//!
//! ## 用法
//!
//! ```bash
//! adastra init
//! adastra build
//! adastra build --nlp
//! adastra run
//! adastra run --queries cassius_lines --wordclouds
//! adastra find "the sea"
//! adastra show a1s1.rpy
//! adastra --config configs/adastra.json -v run --screenplays
//! ```

mod config;
mod runs;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;
use runs::RunSelection;

#[derive(Parser)]
#[command(name = "adastra")]
#[command(about = "Adastra 剧本分析工具 - 解析 .rpy 脚本并生成分析数据")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：adastra.json）
    #[arg(short, long, default_value = "adastra.json", global = true)]
    config: PathBuf,

    /// 输出调试日志
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// 只输出警告与错误
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 写出一份默认配置文件
    Init {
        /// 覆盖已存在的配置文件
        #[arg(long)]
        force: bool,
    },
    /// 解析脚本并写出数据集
    Build {
        /// 同时计算 NLP 列
        #[arg(long)]
        nlp: bool,
    },
    /// 执行配置中的任务（不指定任何类别时执行全部）
    Run {
        /// 查询任务（不带名称时执行全部查询）
        #[arg(long, num_args = 0..)]
        queries: Option<Vec<String>>,
        /// 剧本任务
        #[arg(long, num_args = 0..)]
        screenplays: Option<Vec<String>>,
        /// 关系图任务
        #[arg(long, num_args = 0..)]
        relplots: Option<Vec<String>>,
        /// 词云任务
        #[arg(long, num_args = 0..)]
        wordclouds: Option<Vec<String>>,
    },
    /// 在非引擎行中检索文本（大小写无关）
    Find {
        /// 要检索的文本
        text: String,
    },
    /// 显示一个脚本中需要阅读的行
    Show {
        /// 脚本文件名（可带 .rpy 后缀）
        file: String,
    },
}

fn init_logging(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("❌ 日志初始化失败: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = real_main(cli) {
        eprintln!("❌ 执行失败: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(path);
    config.validate()?;
    Ok(config)
}

fn real_main(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { force } => {
            if cli.config.exists() && !force {
                anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", cli.config.display());
            }
            AppConfig::default().save(&cli.config)?;
            println!("✅ 默认配置已写出: {}", cli.config.display());
        }
        Commands::Build { nlp } => {
            let config = load_config(&cli.config)?;
            runs::build(&config, nlp || config.use_nlp)?;
        }
        Commands::Run {
            queries,
            screenplays,
            relplots,
            wordclouds,
        } => {
            let config = load_config(&cli.config)?;
            let rows = runs::load_dataset(&config)?;
            let selection = RunSelection {
                queries,
                screenplays,
                relplots,
                wordclouds,
            };
            let written = runs::run_jobs(&config, &rows, &selection)?;
            for path in &written {
                println!("{}", path.display());
            }
            println!("✅ 任务完成，共写出 {} 个文件", written.len());
        }
        Commands::Find { text } => {
            let config = load_config(&cli.config)?;
            let rows = runs::load_dataset(&config)?;
            for row in runs::find(&rows, &text) {
                println!("{}", runs::format_found(row));
            }
        }
        Commands::Show { file } => {
            let config = load_config(&cli.config)?;
            let rows = runs::load_dataset(&config)?;
            let shown = runs::show(&rows, &file);
            if shown.is_empty() {
                anyhow::bail!("脚本 {} 中没有需要阅读的行", file);
            }
            for row in shown {
                println!("{}", runs::format_shown(row));
            }
        }
    }

    Ok(())
}
