mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tierplan")]
#[command(about = "ティア構成とディザスタリカバリーを KDL から計画する", long_about = None)]
struct Cli {
    /// デバッグログを表示（RUST_LOG が優先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// クラスターのプランを表示
    Plan {
        /// 環境名 (dev, stg, prod)
        #[arg(short, long, env = "TIERPLAN_ENV")]
        env: Option<String>,
        /// 対象クラスター（省略時は全クラスター）
        #[arg(short, long)]
        cluster: Option<String>,
        /// 出力形式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// 設定を検証
    Validate {
        /// 環境名 (dev, stg, prod)
        #[arg(short, long, env = "TIERPLAN_ENV")]
        env: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };
        EnvFilter::default().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Version => {
            println!("tierplan {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Validate { env } => commands::validate::handle(env.as_deref()),
        Commands::Plan {
            env,
            cluster,
            format,
        } => commands::plan::handle(env.as_deref(), cluster.as_deref(), format),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
