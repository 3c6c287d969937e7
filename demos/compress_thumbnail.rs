use std::path::PathBuf;

use wechat_open_sdk::thumbnail::{ThumbnailCompressor, DEFAULT_THUMB_KB};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().ok_or("usage: compress_thumbnail <image> [budget_kb]")?);
    let budget_kb: u32 = match args.next() {
        Some(value) => value.parse()?,
        None => DEFAULT_THUMB_KB,
    };

    let image = std::fs::read(&input)?;
    let compressed = ThumbnailCompressor::default().compress(&image, budget_kb)?;

    println!(
        "{}: {} -> {} bytes via {:?}{}",
        input.display(),
        image.len(),
        compressed.len(),
        compressed.tier,
        if compressed.within_budget { "" } else { " (over budget)" }
    );
    if let Some((width, height)) = compressed.dimensions {
        println!("dimensions: {width}x{height}");
    }

    let output = input.with_extension("thumb.jpg");
    std::fs::write(&output, compressed.into_within_budget()?)?;
    println!("written to {}", output.display());

    Ok(())
}
