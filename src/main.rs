//! tugua - 喷嚏图卦转换工具

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use tugua::config::LogConfig;
use tugua::env::{core::Interactive, EnvVar};
use tugua::{
    catalogue, default_prompter, download_tugua, BatchSummary, Config, ConversionContext,
    TuguaError,
};

#[derive(Parser)]
#[command(name = "tugua")]
#[command(version, about = "Convert the daily tugua digest into clean, segmented HTML", long_about = None)]
#[command(after_help = "EXAMPLES:
    tugua                                   Convert every new digest in the catalogue
    tugua 20140102                          Convert a single date from the catalogue
    tugua 20140102 http://host/more.asp?id=1  Convert one digest page")]
struct Cli {
    /// Date of the digest (YYYYMMDD)
    #[arg(value_name = "DATE", value_parser = parse_date)]
    date: Option<String>,

    /// Digest page URL; requires DATE
    #[arg(value_name = "URL", requires = "date")]
    url: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory, overrides tugua_dir
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Ask on the terminal after anomalies
    #[arg(short, long, conflicts_with = "unattended")]
    interactive: bool,

    /// Continue automatically after anomalies
    #[arg(short, long)]
    unattended: bool,
}

impl Cli {
    fn interactive(&self) -> Option<bool> {
        if self.interactive {
            Some(true)
        } else if self.unattended {
            Some(false)
        } else {
            Interactive::get().ok()
        }
    }
}

fn parse_date(value: &str) -> Result<String, String> {
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(value.to_string())
    } else {
        Err(format!("expected a date like 20140102, got '{value}'"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.log) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let dir = cli
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.tugua.tugua_dir));
    let summary_file = config.log.summary_file.clone();

    let code = match run(&cli, config, &dir) {
        Ok(summary) => {
            tracing::info!("共转换 {} 篇图卦，失败 {} 篇", summary.converted, summary.failed);
            if let Some(path) = summary_file.as_deref().filter(|p| !p.is_empty()) {
                if let Err(e) = summary.append_to(Path::new(path)) {
                    tracing::error!("写入汇总文件 {} 失败: {}", path, e);
                }
            }
            if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("!!! 发生异常 !!! {}", e);
            ExitCode::FAILURE
        }
    };

    tracing::info!("--------------------------------");
    code
}

fn run(cli: &Cli, config: Config, dir: &Path) -> Result<BatchSummary, TuguaError> {
    let catalog_url = config.tugua.catalog_url.clone();
    let mut ctx = ConversionContext::with_session(config, default_prompter(cli.interactive()))?;

    match (&cli.date, &cli.url) {
        (Some(date), Some(url)) => {
            let mut summary = BatchSummary::default();
            match download_tugua(&mut ctx, url, dir, date) {
                Ok(path) => {
                    tracing::info!("图卦 {} 已保存到 {}", date, path.display());
                    summary.converted += 1;
                }
                Err(e) => {
                    tracing::error!("!!! 图卦 {} 转换失败 !!! {}", date, e);
                    summary.failed += 1;
                }
            }
            Ok(summary)
        }
        (date, _) => catalogue(&mut ctx, &catalog_url, dir, date.as_deref()),
    }
}

fn init_logging(log: &LogConfig) -> Result<(), String> {
    let level = Level::from_str(log.level.trim())
        .map_err(|_| format!("unknown log level '{}'", log.level))?;

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    match log.file.as_deref().filter(|f| !f.is_empty()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("cannot open log file '{path}': {e}"))?;
            let writer = BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)));
            builder.with_ansi(false).with_writer(writer).init();
        }
        None => builder.with_writer(BoxMakeWriter::new(std::io::stdout)).init(),
    }

    Ok(())
}
