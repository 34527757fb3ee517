use clap::Parser;
use gamecraft::config::Settings;
use gamecraft::llm_client::AVAILABLE_MODELS;
use gamecraft::models::ProcessingResult;
use gamecraft::utils::format_duration;
use gamecraft::workflow::WorkflowManager;
use std::process::ExitCode;

/// Turn a gaming query into a YouTube video script with thumbnail ideas.
#[derive(Parser, Debug)]
#[command(name = "gamecraft", version, about)]
struct Cli {
    /// Query text, e.g. "Create a review script for Hades II"
    #[arg(required_unless_present = "list_models")]
    query: Option<String>,

    /// Target video length in minutes
    #[arg(short, long, default_value_t = 10)]
    duration: u32,

    /// LLM to bind the collaborators to (defaults to GAMECRAFT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// List the selectable models and exit
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();

    if cli.list_models {
        for model in AVAILABLE_MODELS {
            println!("{:<28} {:<10?} {}", model.id, model.provider, model.description);
        }
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let manager = WorkflowManager::from_settings(settings).await;
    let query = cli.query.unwrap_or_default();
    let result = manager
        .process(&query, cli.duration, cli.model.as_deref())
        .await;

    if cli.json {
        match result.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!("❌ Failed to serialize result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_summary(&result);
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(result: &ProcessingResult) {
    if let Some(script) = &result.script {
        println!("🎬 {}\n", script.title);
        println!("{}\n", script.script_content);
        for (section, range) in &script.timestamps {
            println!("  {:<16} {}", section, range);
        }
    }

    if !result.thumbnail_suggestions.is_empty() {
        println!("\n🖼️ Thumbnail ideas:");
        for thumb in &result.thumbnail_suggestions {
            println!("  - {} (target CTR {}): {}", thumb.style, thumb.target_ctr, thumb.description);
        }
    }

    if !result.media_assets.is_empty() {
        println!("\n📺 Reference videos:");
        for asset in &result.media_assets {
            let length = asset.duration_seconds.map(format_duration).unwrap_or_else(|| "--:--".to_string());
            println!("  - [{}] {} ({}) {}", asset.asset_type, asset.title, length, asset.url);
        }
    }

    for warning in &result.warnings {
        println!("⚠️ {}", warning);
    }
    for error in &result.errors {
        println!("❌ {}", error);
    }

    println!(
        "\n{} in {:.2}s{} | steps: {}",
        if result.success { "✅ Completed" } else { "❌ Failed" },
        result.processing_time,
        if result.cached { " (cached research)" } else { "" },
        result.completed_steps.join(" → ")
    );
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default by build profile
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "info,gamecraft=debug,reqwest=info,hyper=info".to_string()
        } else {
            "warn,gamecraft=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // Logs go to stderr so --json output stays machine-readable
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("GameCraft {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
