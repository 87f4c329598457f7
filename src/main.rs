use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use google_genai_nodes::credentials::{self, CredentialSources};
use google_genai_nodes::image::{encode_from_image, ImageBatch, ImageTensor};
use google_genai_nodes::nodes::imagen::IMAGEN_NODE_ID;
use google_genai_nodes::nodes::llm::{DEFAULT_TEXT_MODEL, LLM_NODE_ID};
use google_genai_nodes::nodes::vlm::VLM_NODE_ID;
use google_genai_nodes::nodes::{NodeInputs, NodeOutput, NodeRegistry};
use google_genai_nodes::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "google-genai-nodes")]
#[command(about = "Run Google generative-AI nodes outside the graph host")]
struct CliArgs {
    /// Settings file. Defaults to $GOOGLE_GENAI_NODES_CONFIG, then config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print node metadata as JSON.
    Nodes,
    /// Run the LLM node.
    Llm(TextArgs),
    /// Run the VLM node on an image file.
    Vlm {
        #[command(flatten)]
        text: TextArgs,
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },
    /// Run the Imagen node and write PNG files.
    Imagen(ImagenArgs),
}

#[derive(Debug, Args)]
struct TextArgs {
    prompt: String,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    model: String,
    #[arg(long, default_value = "")]
    system_prompt: String,
}

impl TextArgs {
    fn into_inputs(self) -> NodeInputs {
        NodeInputs::new()
            .with_string("prompt", self.prompt)
            .with_string("model", self.model)
            .with_string("system_prompt", self.system_prompt)
    }
}

#[derive(Debug, Args)]
struct ImagenArgs {
    prompt: String,
    #[arg(long, default_value = "")]
    negative_prompt: String,
    #[arg(long, default_value_t = 1024)]
    width: i64,
    #[arg(long, default_value_t = 1024)]
    height: i64,
    #[arg(long, default_value_t = 1)]
    num_images: i64,
    #[arg(long, default_value_t = 0)]
    seed: i64,
    #[arg(long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,
}

impl ImagenArgs {
    fn to_inputs(&self) -> NodeInputs {
        NodeInputs::new()
            .with_string("prompt", self.prompt.as_str())
            .with_string("negative_prompt", self.negative_prompt.as_str())
            .with_int("width", self.width)
            .with_int("height", self.height)
            .with_int("num_images", self.num_images)
            .with_int("seed", self.seed)
    }
}

fn load_image_tensor(path: &Path) -> Result<ImageTensor> {
    let image = image::open(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?
        .to_rgb8();
    Ok(ImageTensor::from(encode_from_image(&image)))
}

fn write_batch(batch: &ImageBatch, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    batch
        .to_images()?
        .into_iter()
        .map(|image| -> Result<PathBuf> {
            let path = output_dir.join(format!("{}.png", Uuid::new_v4()));
            image.save(&path)?;
            Ok(path)
        })
        .collect()
}

/// Write the batch, logging instead of failing so a completed node run
/// still exits cleanly.
fn save_batch(batch: &ImageBatch, output_dir: &Path) -> Vec<PathBuf> {
    match write_batch(batch, output_dir) {
        Ok(paths) => paths,
        Err(e) => {
            error!("Failed to write images to {}: {:#}", output_dir.display(), e);
            Vec::new()
        }
    }
}

async fn run_node(registry: &NodeRegistry, id: &str, inputs: NodeInputs) -> Result<NodeOutput> {
    let node = registry
        .create(id)
        .with_context(|| format!("Node {} is not registered", id))?;
    info!("Running {}", node.spec().display_name);
    Ok(node.run(&inputs).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "google_genai_nodes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    if let Command::Nodes = args.command {
        println!("{}", serde_json::to_string_pretty(&NodeRegistry::specs())?);
        return Ok(());
    }

    let config_path = args.config.unwrap_or_else(Settings::default_path);
    info!("Using settings file {}", config_path.display());
    let registry = NodeRegistry::new(credentials::init_global(
        CredentialSources::from_environment(&config_path),
    ));

    match args.command {
        Command::Nodes => {}
        Command::Llm(text) => {
            let output = run_node(&registry, LLM_NODE_ID, text.into_inputs()).await?;
            println!("{}", output.as_text().unwrap_or_default());
        }
        Command::Vlm { text, image } => {
            let tensor = load_image_tensor(&image)?;
            let inputs = text.into_inputs().with_image("image", tensor);
            let output = run_node(&registry, VLM_NODE_ID, inputs).await?;
            println!("{}", output.as_text().unwrap_or_default());
        }
        Command::Imagen(imagen) => {
            let output = run_node(&registry, IMAGEN_NODE_ID, imagen.to_inputs()).await?;
            if let Some(batch) = output.as_image() {
                for path in save_batch(batch, &imagen.output_dir) {
                    println!("{}", path.display());
                }
            }
        }
    }

    Ok(())
}
