use anyhow::Result;
use clap::{Arg, Command};
use hoops_analyzer::{Config, PromptVariant, VideoAnalyzer};
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Hoops Analyzer")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Basketball shot analysis of cloud-stored videos with Gemini")
        .arg(
            Arg::new("video-uri")
                .short('u')
                .long("video-uri")
                .value_name("URI")
                .help("Cloud storage URI of the video to analyze")
                .default_value("gs://bucket/video.mp4")
        )
        .arg(
            Arg::new("variant")
                .long("variant")
                .value_name("VARIANT")
                .help("Analysis prompt variant: regular or pro")
                .default_value("regular")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    // Load configuration
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // Configure logging based on verbose flag
    let filter = if matches.get_flag("verbose") {
        "hoops_analyzer=debug,info".to_string()
    } else {
        format!("hoops_analyzer={},warn", config.output.log_level)
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    if let Err(e) = config.validate() {
        warn!("Configuration problem: {}", e);
    }
    info!("{}", config.summary());

    let video_uri = matches
        .get_one::<String>("video-uri")
        .map(String::as_str)
        .unwrap_or("gs://bucket/video.mp4");
    let variant = matches
        .get_one::<String>("variant")
        .map(|v| PromptVariant::from_name(v))
        .unwrap_or_default();

    info!("🏀 Analyzing {} ({} prompt)", video_uri, variant);

    let analyzer = VideoAnalyzer::from_config(config).await;
    let result = analyzer.analyze(video_uri, variant).await;

    println!("Gemini API analysis complete: {}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
