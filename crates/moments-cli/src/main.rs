use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use moments_core::limits::{CLIENT_MIN_IMAGES, MAX_IMAGES};
use moments_core::AnalysisEnvelope;

use moments_cli::client::DEFAULT_SERVER_URL;
use moments_cli::render::{render_outcome, render_preview};
use moments_cli::upload::AddOutcome;
use moments_cli::{
    default_output_dir, AnalysisOutcome, AnalysisSession, AnalyzeOptions, GatewayClient, JpegReencoder,
};

#[derive(Parser)]
#[command(name = "moments")]
#[command(about = "Analyze social-feed screenshots through the Moments gateway")]
#[command(version)]
struct Cli {
    #[arg(long, env = "MOMENTS_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate images and show the preview grid
    Preview {
        files: Vec<PathBuf>,

        /// Show every image instead of the first 18
        #[arg(long)]
        show_all: bool,
    },
    /// Compress, upload and analyze images
    Analyze(AnalyzeArgs),
    /// Render a saved analysis response without contacting the gateway
    Render {
        envelope: PathBuf,

        #[arg(long)]
        export: bool,

        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Check that the gateway is reachable
    Health,
}

#[derive(Args)]
struct AnalyzeArgs {
    files: Vec<PathBuf>,

    /// File name to drop from the selection (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Show every image instead of the first 18
    #[arg(long)]
    show_all: bool,

    #[arg(long, default_value_t = CLIENT_MIN_IMAGES)]
    min_images: usize,

    #[arg(long, default_value_t = MAX_IMAGES)]
    max_images: usize,

    /// Per-image compression budget in KB
    #[arg(long)]
    target_kb: Option<usize>,

    /// Write the Markdown report after a successful analysis
    #[arg(long)]
    export: bool,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save the gateway response for later `render`
    #[arg(long)]
    save_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Server URL: {}", cli.server_url).dimmed());
    }

    let client = GatewayClient::new(&cli.server_url);

    match cli.command {
        Commands::Preview { files, show_all } => {
            let mut session = AnalysisSession::new();
            report_added(&session.add_paths(&files));
            session.images_mut().set_show_all(show_all);
            print!("{}", render_preview(session.images()));
            Ok(())
        }
        Commands::Analyze(args) => run_analyze(&client, args).await,
        Commands::Render {
            envelope,
            export,
            output_dir,
        } => {
            let text = fs::read_to_string(&envelope)
                .with_context(|| format!("failed to read {}", envelope.display()))?;
            let envelope: AnalysisEnvelope =
                serde_json::from_str(&text).context("分析结果格式异常，请稍后重试")?;
            let outcome = AnalysisOutcome::from_envelope(envelope)?;

            let mut session = AnalysisSession::new();
            session.set_outcome(outcome.clone());
            finish(&session, &outcome, export, output_dir)
        }
        Commands::Health => {
            let status = client.health().await?;
            println!(
                "{}",
                format!("✅ {} is up: {}", client.base_url(), status).green()
            );
            Ok(())
        }
    }
}

async fn run_analyze(client: &GatewayClient, args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut session = AnalysisSession::new();
    report_added(&session.add_paths(&args.files));
    for name in &args.exclude {
        if session.remove_by_name(name).is_none() {
            eprintln!("{}", format!("⚠️  未找到要移除的图片: {}", name).yellow());
        }
    }
    session.images_mut().set_show_all(args.show_all);
    print!("{}", render_preview(session.images()));

    let mut options = AnalyzeOptions {
        min_images: args.min_images,
        max_images: args.max_images,
        ..AnalyzeOptions::default()
    };
    if let Some(kb) = args.target_kb {
        options = options.with_target_kb(kb);
    }

    println!("{}", "🚀 正在压缩并分析图片...".cyan());
    let outcome = session
        .analyze(client, &options, &JpegReencoder, |asset, compressed| {
            println!(
                "   {} {:.2}MB -> {}KB",
                asset.name,
                asset.size_mb(),
                compressed.byte_len / 1024
            );
        })
        .await?
        .clone();
    println!("{}", "✅ 分析完成".green());

    if let Some(path) = args.save_json {
        save_envelope(&path, &outcome)?;
    }
    finish(&session, &outcome, args.export, args.output_dir)
}

fn report_added(outcome: &AddOutcome) {
    for (path, error) in &outcome.rejected {
        eprintln!("{}", format!("⚠️  {}: {}", path.display(), error).yellow());
    }
    if outcome.compression_notice {
        println!("{}", "检测到大图，分析前会自动压缩到5MB以内".dimmed());
    }
}

fn save_envelope(path: &Path, outcome: &AnalysisOutcome) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&outcome.to_envelope())?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("{}", format!("💾 Saved response to {}", path.display()).green());
    Ok(())
}

fn finish(
    session: &AnalysisSession,
    outcome: &AnalysisOutcome,
    export: bool,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let generated_at = Utc::now();
    println!();
    print!("{}", render_outcome(outcome, generated_at));

    if export {
        let dir = output_dir.unwrap_or_else(default_output_dir);
        let path = session.export(&dir, generated_at)?;
        println!();
        println!("{}", format!("📄 报告已保存: {}", path.display()).green());
    }
    Ok(())
}
