use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gtscan_core::{
    collect_theme_files, load_manifest, scan_and_write, Inventory, MatchLimits, PatternRegistry, ScanOptions,
    DEFAULT_MATCH_BUDGET, DEFAULT_MAX_DEPTH, DEFAULT_MAX_INPUT_BYTES,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "gtscan", version, about = "Google 跟踪代码精确扫描")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描清单与主题目录并生成 JSON 报告
    Scan {
        /// 来源清单（TOML）
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// 主题目录（检查 header.php / footer.php / functions.php / index.php）
        #[arg(long)]
        theme_dir: Option<PathBuf>,

        /// 输出文件（JSON）
        #[arg(long, default_value = "./gtscan-report.json")]
        output: PathBuf,

        /// 线程数（"auto"=CPU 核心数）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 单个文本块的最大扫描字节数，超出视为无命中
        #[arg(long, default_value_t = DEFAULT_MAX_INPUT_BYTES)]
        max_input_bytes: usize,

        /// 单条规则的匹配时间预算（毫秒），0 表示不限时
        #[arg(long, default_value_t = DEFAULT_MATCH_BUDGET.as_millis() as u64)]
        match_budget_ms: u64,

        /// 结构化文档最大遍历深度
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// 追加规则文件路径（TOML）
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// 列出当前生效的规则
    Patterns {
        /// 追加规则文件路径（TOML）
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { manifest, theme_dir, output, threads, max_input_bytes, match_budget_ms, max_depth, rules } => {
            info!(?manifest, ?theme_dir, ?output, "starting scan");

            let mut inventory = match &manifest {
                Some(path) => load_manifest(path).with_context(|| format!("load manifest {}", path.display()))?,
                None => Inventory::new(),
            };
            if let Some(dir) = &theme_dir {
                collect_theme_files(dir, &mut inventory);
            }

            let match_budget = (match_budget_ms > 0).then(|| Duration::from_millis(match_budget_ms));
            let opts = ScanOptions {
                threads: parse_threads(&threads),
                limits: MatchLimits { max_input_bytes, match_budget },
                max_depth,
                rules_path: rules,
            };

            // 以缓冲方式打开输出文件
            let mut out = BufWriter::new(File::create(&output).context("create output file")?);
            let stats = scan_and_write(&inventory, &mut out, &opts).context("scan and write failed")?;
            out.flush().context("flush output file")?;

            info!(
                sources_scanned = stats.sources_scanned,
                locations_found = stats.locations_found,
                snippets_found = stats.snippets_found,
                "scan finished"
            );
        }
        Commands::Patterns { rules } => {
            let registry = match &rules {
                Some(path) => PatternRegistry::with_rules_file(path),
                None => PatternRegistry::builtin(),
            }
            .context("load pattern registry")?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for p in registry.iter() {
                writeln!(out, "{:<28} {}", p.key(), p.display_name())?;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") {
        return None;
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
