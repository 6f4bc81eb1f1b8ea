//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-core`: 运行 adastra-core 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `script-check`: 检查 .rpy 脚本（无法读取的文件、未分类的行、各文件统计）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use adastra_core::{
    CorpusBuilder, DEFAULT_MAIN_CHARACTER, Diagnostic, DiagnosticResult, ScriptLine,
    analyze_corpus,
};
use walkdir::WalkDir;

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn ensure_cargo_llvm_cov_available() -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["llvm-cov", "--version"]);
    let status = cmd.status();
    match status {
        Ok(s) if s.success() => Ok(()),
        _ => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;
        }
        "cov-core" => {
            ensure_cargo_llvm_cov_available()?;

            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "-p", "adastra-core", "--html"]);
            run("cargo llvm-cov -p adastra-core --html", &mut cov)?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available()?;

            // 排除 xtask，避免稀释覆盖率信号
            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "--workspace", "--exclude", "xtask", "--html"]);
            run(
                "cargo llvm-cov --workspace --exclude xtask --html",
                &mut cov,
            )?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "script-check" => {
            let path = args.next();
            let main_character = args.next();
            script_check(path.as_deref(), main_character.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-core        运行 adastra-core 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  script-check    检查 .rpy 脚本

SCRIPT-CHECK:
  cargo xtask script-check [path] [main_character]

  不带参数：检查 Adastra/game/ 下所有 .rpy 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 无法读取的脚本（不存在、非 UTF-8）
    - 未匹配任何分类规则的行
    - 每个脚本的对白/分支/未分类统计

ALIASES (in .cargo/config.toml):
  cargo check-all     -> cargo xtask check-all
  cargo cov-core      -> cargo xtask cov-core
  cargo cov-workspace -> cargo xtask cov-workspace
  cargo script-check  -> cargo xtask script-check
"#
    );
}

//=============================================================================
// script-check 命令实现
//=============================================================================

/// 默认脚本目录（相对于 workspace root）
const DEFAULT_SCRIPTS_DIR: &str = "Adastra/game";

/// 执行脚本检查
fn script_check(path: Option<&str>, main_character: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_script_files(&path)?
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_SCRIPTS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认脚本目录不存在: {}\n请在 workspace 根目录运行，或指定脚本路径",
                    dir.display()
                );
            }
            collect_script_files(dir)?
        }
    };

    if files.is_empty() {
        eprintln!("未找到脚本文件（.rpy）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个脚本文件...\n", files.len());

    let result = check_scripts(&files, main_character.unwrap_or(DEFAULT_MAIN_CHARACTER));
    print_check_result(files.len(), &result);

    if result.has_errors() {
        anyhow::bail!("脚本检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有脚本文件（按路径排序）
fn collect_script_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "rpy") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// 逐个脚本构建语料并运行诊断
///
/// 无法读取的脚本（不存在、非 UTF-8 等）记为错误诊断，其余脚本照常检查。
fn check_scripts(files: &[PathBuf], main_character: &str) -> DiagnosticResult {
    let builder = CorpusBuilder::new(main_character);
    let mut result = DiagnosticResult::new();

    for file in files {
        match builder.build(std::slice::from_ref(file)) {
            Ok(corpus) => result.merge(analyze_corpus(&corpus)),
            Err(e) => result.push(Diagnostic::error(ScriptLine::file_id(file), e.to_string())),
        }
    }
    result
}

/// 输出检查结果
fn print_check_result(scripts_checked: usize, result: &DiagnosticResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个脚本", scripts_checked);
    eprintln!();

    for diag in &result.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.error_count();
    let warn_count = result.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
