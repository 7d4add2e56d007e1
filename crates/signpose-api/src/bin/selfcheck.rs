use std::path::Path;

use signpose_api::ApiConfig;
use signpose_media::{check_ffmpeg, GlossDataset, PipelineConfig, PoseSource, SkinnedBodyModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let api_config = ApiConfig::from_env();
    let config = PipelineConfig::from_env();

    println!(
        "signpose-selfcheck: starting with output_dir={}",
        api_config.output_dir.display()
    );
    ensure_output_dir(&api_config.output_dir).await?;
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("{}", e))?;
    println!("signpose-selfcheck: ffmpeg at {}", ffmpeg.display());

    let dataset = GlossDataset::open(&config.mapping_path, &config.dataset_dir)
        .map_err(|e| anyhow::anyhow!("gloss mapping: {}", e))?;
    let words = dataset.words();
    println!("signpose-selfcheck: {} words", words.len());
    if let Some(first) = words.first() {
        let seq = dataset
            .resolve(first)
            .map_err(|e| anyhow::anyhow!("record for '{}': {}", first, e))?;
        println!("signpose-selfcheck: '{}' has {} frames", first, seq.len());
    }

    let model = SkinnedBodyModel::from_npz(&config.model_path)
        .map_err(|e| anyhow::anyhow!("body model: {}", e))?;
    println!("signpose-selfcheck: body model with {} vertices", model.num_vertices());

    config
        .joint_limits()
        .map_err(|e| anyhow::anyhow!("joint limits: {}", e))?;

    if !(1..=120).contains(&config.default_fps) {
        anyhow::bail!("SIGNPOSE_DEFAULT_FPS must be within 1..=120, got {}", config.default_fps);
    }

    println!("signpose-selfcheck: ok");
    Ok(())
}

async fn ensure_output_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let marker = path.join(".selfcheck");
    tokio::fs::write(&marker, b"ok").await?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}
