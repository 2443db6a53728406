//! Runs one batch and saves the three images to the current directory.
//!
//! Run with: `cargo run --example generate_batch`
//!
//! Requires `RUNWARE_API_KEY`.

use runviz::{AspectRatio, ImageGenerator, KeySource};

#[tokio::main]
async fn main() -> runviz::Result<()> {
    let generator = ImageGenerator::builder()
        .key_source(KeySource::Configured)
        .build();

    generator
        .set_prompt("A paper boat on a rainy street, cinematic lighting")
        .await;
    generator
        .select_aspect_ratio(Some(AspectRatio::Landscape))
        .await;

    let images = generator.generate().await?;
    for (index, image) in images.iter().enumerate() {
        let path = generator.download(index, ".").await?;
        println!("{} -> {}", image.image_url, path.display());
    }

    Ok(())
}
