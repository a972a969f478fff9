use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use vidgrab::downloader::tools;
use vidgrab::{
    Container, DownloadOutcome, DownloadRequest, DownloadWorker, FfmpegTranscoder, Orchestrator,
    ResolutionSelector, ResolverConfig, YtDlpResolver,
};

#[derive(Parser)]
#[command(name = "vidgrab", about = "Download a video or its audio track via yt-dlp")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download one video URL
    Get {
        url: String,

        /// highest, 1080p, 720p, 480p, 360p or audio
        #[arg(long, default_value = "highest", value_parser = parse_resolution)]
        resolution: ResolutionSelector,

        /// mp4 or mp3
        #[arg(long, default_value = "mp4", value_parser = parse_container)]
        format: Container,

        /// Destination directory (defaults to the downloads folder)
        #[arg(long)]
        output: Option<PathBuf>,

        /// SOCKS5/HTTP proxy URL passed to yt-dlp
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Show the status of the external tools (yt-dlp, ffmpeg)
    Tools,
}

fn parse_resolution(s: &str) -> Result<ResolutionSelector, String> {
    s.parse()
}

fn parse_container(s: &str) -> Result<Container, String> {
    s.parse()
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Tools => show_tools(),
        Command::Get {
            url,
            resolution,
            format,
            output,
            proxy,
        } => {
            let dest_dir = output.unwrap_or_else(default_output_dir);
            let request = DownloadRequest::new(url, format, resolution, dest_dir);
            run_download(request, proxy).await;
        }
    }
}

fn show_tools() {
    for info in tools::all_tools() {
        if info.is_available {
            println!(
                "{:8} ok    {} ({})",
                info.name,
                info.path.as_deref().unwrap_or("?"),
                info.version.as_deref().unwrap_or("unknown version"),
            );
        } else {
            println!("{:8} missing", info.name);
        }
    }
}

async fn run_download(request: DownloadRequest, proxy: Option<String>) {
    let resolver = YtDlpResolver::with_config(ResolverConfig::default().with_proxy(proxy));
    let worker = DownloadWorker::new(Orchestrator::new(
        Box::new(resolver),
        Box::new(FfmpegTranscoder::new()),
    ));

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{wide_bar} {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let progress_bar = bar.clone();
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let submitted = worker.submit(
        request,
        Box::new(move |p| progress_bar.set_position(p.percent as u64)),
        Box::new(move |outcome| {
            let _ = outcome_tx.send(outcome);
        }),
    );
    if submitted.is_err() {
        eprintln!("error: a download is already in progress");
        std::process::exit(1);
    }

    match outcome_rx.await {
        Ok(DownloadOutcome::Success { file_name }) => {
            bar.finish_and_clear();
            println!("Downloaded: {}", file_name);
        }
        Ok(DownloadOutcome::Failure { message, .. }) => {
            bar.finish_and_clear();
            eprintln!("error: {}", message);
            std::process::exit(1);
        }
        Err(_) => {
            bar.finish_and_clear();
            eprintln!("error: worker terminated without an outcome");
            std::process::exit(1);
        }
    }
}
