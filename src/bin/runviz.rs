//! CLI for RunViz - three images per prompt via Runware.

use clap::{Args, Parser, Subcommand, ValueEnum};
use runviz::image::providers::{RunwareFactory, RunwareModel, API_KEY_ENV};
use runviz::studio::{ImageGenerator, KeySource, Notification, NotificationLevel, Notifier};
use runviz::AspectRatio;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runviz")]
#[command(about = "Generate three AI images from one prompt via Runware")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a batch of images from a text prompt
    Generate(GenerateArgs),

    /// List aspect ratio presets
    Presets,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the images
    prompt: String,

    /// Runware API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Aspect ratio preset
    #[arg(long, value_enum)]
    aspect_ratio: Option<AspectRatioArg>,

    /// Model to use
    #[arg(short, long, value_enum, default_value = "flux-schnell")]
    model: ModelArg,

    /// Directory the images are saved into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Only print the image URLs
    #[arg(long)]
    no_download: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    FluxSchnell,
    FluxDev,
}

impl From<ModelArg> for RunwareModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::FluxSchnell => RunwareModel::FluxSchnell,
            ModelArg::FluxDev => RunwareModel::FluxDev,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
        }
    }
}

/// Prints notifications to stderr, like a toast area.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        let status = match notification.level {
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
        };
        eprintln!("{} {}", status, notification.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("runviz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            generate(args, cli.json).await?;
        }
        Commands::Presets => {
            list_presets(cli.json)?;
        }
    }

    Ok(())
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    // clap already folded RUNWARE_API_KEY into `api_key`; without one the
    // provider falls back to the key baked in at build time.
    let key_source = if args.api_key.is_some() {
        KeySource::Input
    } else {
        KeySource::Configured
    };

    let generator = ImageGenerator::builder()
        .key_source(key_source)
        .factory(RunwareFactory::new().model(args.model.into()))
        .notifier(Arc::new(StderrNotifier))
        .build();

    generator.set_prompt(args.prompt.as_str()).await;
    if let Some(key) = &args.api_key {
        generator.set_api_key(key.as_str()).await;
    }
    generator
        .select_aspect_ratio(args.aspect_ratio.map(Into::into))
        .await;

    let images = generator.generate().await?;

    let mut saved = Vec::new();
    if !args.no_download {
        std::fs::create_dir_all(&args.output_dir)?;
        // Each download reports its own failure; keep whatever succeeded.
        let downloads = (0..images.len()).map(|index| generator.download(index, &args.output_dir));
        for result in futures::future::join_all(downloads).await {
            saved.push(result.ok().map(|path| path.display().to_string()));
        }
    }

    if json_output {
        let result = serde_json::json!({
            "type": "image_batch",
            "success": true,
            "images": images,
            "saved": saved,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", generator.view().await);
        for path in saved.iter().flatten() {
            println!("Saved: {}", path);
        }
    }

    if saved.iter().any(Option::is_none) {
        anyhow::bail!("some images could not be downloaded");
    }

    Ok(())
}

fn list_presets(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct PresetInfo {
        ratio: &'static str,
        width: u32,
        height: u32,
    }

    let presets: Vec<PresetInfo> = AspectRatio::ALL
        .iter()
        .map(|ratio| {
            let (width, height) = ratio.dimensions();
            PresetInfo {
                ratio: ratio.as_str(),
                width,
                height,
            }
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&presets)?);
    } else {
        println!("Aspect ratio presets:\n");
        for p in &presets {
            println!("  {:<5} {}x{}", p.ratio, p.width, p.height);
        }
    }

    Ok(())
}
