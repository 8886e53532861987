use anyhow::Context;
use data_loader::Catalog;
use std::path::PathBuf;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/kion"));

    println!("Loading catalog from {}...\n", data_dir.display());

    let start = Instant::now();
    let catalog = Catalog::load_from_dir(&data_dir).context("Failed to load catalog")?;
    let elapsed = start.elapsed();

    let (items, users, interactions) = catalog.counts();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Items: {}", items);
    println!("Users: {}", users);
    println!("Interactions: {}", interactions);
    println!("\nPerformance: {:.0} interactions/second",
             interactions as f64 / elapsed.as_secs_f64());
    Ok(())
}
