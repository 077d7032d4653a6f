use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "imgops-cli")]
#[command(about = "Client for the image operations service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Where to write returned images. Defaults to the server's filename.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode as JPEG
    Compress {
        file: PathBuf,
        #[arg(short, long, default_value_t = 85)]
        quality: u8,
    },
    /// Report compressed size without downloading the image
    Estimate {
        file: PathBuf,
        #[arg(short, long, default_value_t = 85)]
        quality: u8,
    },
    /// Cut the subject out of its background
    RemoveBackground { file: PathBuf },
    /// Upscale with a super-resolution model
    Upscale {
        file: PathBuf,
        #[arg(short, long, default_value_t = 2)]
        scale: u32,
    },
    /// Apply adjustments; values as accepted by the service
    Edit {
        file: PathBuf,
        #[arg(long)]
        brightness: Option<String>,
        #[arg(long)]
        contrast: Option<String>,
        #[arg(long)]
        saturation: Option<String>,
        #[arg(long)]
        blur: Option<String>,
        #[arg(long)]
        rotation: Option<String>,
        #[arg(long)]
        sepia: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let (operation, file, fields): (&str, PathBuf, Vec<(&str, String)>) = match cli.command {
        Commands::Compress { file, quality } => {
            ("compress", file, vec![("quality", quality.to_string())])
        }
        Commands::Estimate { file, quality } => (
            "compress",
            file,
            vec![("quality", quality.to_string()), ("estimate", "1".to_string())],
        ),
        Commands::RemoveBackground { file } => ("remove-background", file, vec![]),
        Commands::Upscale { file, scale } => ("upscale", file, vec![("scale", scale.to_string())]),
        Commands::Edit {
            file,
            brightness,
            contrast,
            saturation,
            blur,
            rotation,
            sepia,
        } => {
            let fields = [
                ("brightness", brightness),
                ("contrast", contrast),
                ("saturation", saturation),
                ("blur", blur),
                ("rotation", rotation),
                ("sepia", sepia),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();
            ("edit", file, fields)
        }
    };

    let form = build_form(&file, operation, fields).await?;
    let res = client
        .post(format!("{}/{}", cli.url.trim_end_matches('/'), operation))
        .multipart(form)
        .send()
        .await?;

    handle_response(res, cli.output.as_deref()).await
}

async fn build_form(
    file: &Path,
    operation: &str,
    fields: Vec<(&str, String)>,
) -> Result<Form, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(file).await?;
    let mime = match file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        _ => "image/jpeg",
    };
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let mut form = Form::new()
        .text("operation", operation.to_string())
        .part("image", Part::bytes(bytes).file_name(filename).mime_str(mime)?);
    for (name, value) in fields {
        form = form.text(name.to_string(), value);
    }
    Ok(form)
}

async fn handle_response(
    res: reqwest::Response,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let json: Value = res.json().await?;
        if status.is_success() {
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            eprintln!("Error: service returned status {}", status);
            eprintln!("{}", serde_json::to_string_pretty(&json)?);
        }
        return Ok(());
    }

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let suggested = res
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split("filename=").nth(1))
        .map(|name| name.trim_matches('"').to_string())
        .unwrap_or_else(|| "result.bin".to_string());

    let path = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(suggested));
    let bytes = res.bytes().await?;
    tokio::fs::write(&path, &bytes).await?;
    println!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
