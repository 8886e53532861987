use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Catalog, ItemId};
use recommender::{add_titles, FeatureConfig, TitledRecommendation, U2IRecommender, UserFeatures};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

const HISTORY_LEN: usize = 5;
const CSV_DELIMITER: u8 = b';';

/// ReelRecs - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Top-K movie recommendations from a pre-trained model", long_about = None)]
struct Cli {
    /// Directory with items.csv, users.csv and interactions.csv
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend movies for a list of viewed movies
    Recommend {
        /// Model artifact to load
        #[arg(long)]
        model: PathBuf,

        /// Viewed item ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        viewed: Vec<ItemId>,

        /// Number of recommendations to return
        #[arg(short, long, default_value = "10")]
        k: usize,

        /// User attribute as feature=value (repeatable)
        #[arg(long = "user-feature", value_parser = parse_named)]
        user_features: Vec<(String, String)>,
    },

    /// Run every model against every viewing history
    Compare {
        /// Model as name=PATH (repeatable)
        #[arg(long = "model", value_parser = parse_named, required = true)]
        models: Vec<(String, String)>,

        /// Viewing history as name=1,2,3 (repeatable)
        #[arg(long = "history", value_parser = parse_named, required = true)]
        histories: Vec<(String, String)>,

        /// User attribute of one history as name:feature=value (repeatable)
        #[arg(long = "history-feature", value_parser = parse_history_feature)]
        history_features: Vec<(String, String, String)>,

        /// Number of recommendations per history and model
        #[arg(short, long, default_value = "10")]
        k: usize,

        /// Also write the rows as a ;-separated CSV file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Model artifact to load
        #[arg(long)]
        model: PathBuf,

        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

/// One row of a model comparison, as written to the CSV export
#[derive(Debug, Serialize)]
struct ComparisonRow {
    history: String,
    model: String,
    item_id: ItemId,
    title: Option<String>,
    rank: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading catalog from {}...", cli.data_dir.display());
    let start = Instant::now();
    let catalog = Catalog::load_from_dir(&cli.data_dir).context("Failed to load catalog")?;
    println!("{} Loaded catalog in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Recommend {
            model,
            viewed,
            k,
            user_features,
        } => handle_recommend(&catalog, &model, &viewed, k, user_features)?,
        Commands::Compare {
            models,
            histories,
            history_features,
            k,
            output,
        } => handle_compare(
            &catalog,
            &models,
            &histories,
            history_features,
            k,
            output.as_deref(),
        )?,
        Commands::Search { title } => handle_search(&catalog, &title),
        Commands::Benchmark {
            model,
            requests,
            concurrent,
        } => handle_benchmark(&catalog, &model, requests, concurrent).await?,
    }

    Ok(())
}

fn parse_items(raw: &str) -> std::result::Result<Vec<ItemId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<ItemId>().map_err(|_| format!("invalid item id `{}`", s)))
        .collect()
}

fn parse_named(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", raw))?;
    if name.trim().is_empty() {
        return Err(format!("missing name in `{}`", raw));
    }
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_history_feature(raw: &str) -> std::result::Result<(String, String, String), String> {
    let (history, feature) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:FEATURE=VALUE, got `{}`", raw))?;
    if history.trim().is_empty() {
        return Err(format!("missing history name in `{}`", raw));
    }
    let (feature, value) = parse_named(feature)?;
    Ok((history.trim().to_string(), feature, value))
}

/// Group `name:feature=value` options by history, rejecting unknown names
fn group_history_features(
    histories: &[(String, String)],
    features: Vec<(String, String, String)>,
) -> Result<HashMap<String, UserFeatures>> {
    let mut grouped: HashMap<String, UserFeatures> = HashMap::new();
    for (history, feature, value) in features {
        ensure!(
            histories.iter().any(|(name, _)| *name == history),
            "feature given for unknown history `{}`",
            history
        );
        grouped.entry(history).or_default().insert(feature, value);
    }
    Ok(grouped)
}

fn load_recommender(catalog: &Catalog, model: &Path) -> Result<U2IRecommender> {
    U2IRecommender::new(model, catalog, &FeatureConfig::default())
        .with_context(|| format!("Failed to load model {}", model.display()))
}

/// Handle the 'recommend' command
fn handle_recommend(
    catalog: &Catalog,
    model: &Path,
    viewed: &[ItemId],
    k: usize,
    user_features: Vec<(String, String)>,
) -> Result<()> {
    let recommender = load_recommender(catalog, model)?;
    let features: UserFeatures = user_features.into_iter().collect();
    let features = (!features.is_empty()).then_some(&features);

    let recommendations = recommender.recommend(viewed, k, features)?;
    print_recommendations(&add_titles(&catalog.items, recommendations));
    Ok(())
}

/// Handle the 'compare' command
fn handle_compare(
    catalog: &Catalog,
    models: &[(String, String)],
    histories: &[(String, String)],
    history_features: Vec<(String, String, String)>,
    k: usize,
    output: Option<&Path>,
) -> Result<()> {
    let features = group_history_features(histories, history_features)?;
    let histories: Vec<(&str, Vec<ItemId>)> = histories
        .iter()
        .map(|(name, items)| {
            parse_items(items)
                .map(|ids| (name.as_str(), ids))
                .map_err(|e| anyhow::anyhow!("history `{}`: {}", name, e))
        })
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    for (model_name, path) in models {
        // One load per model, shared by every history
        let recommender = load_recommender(catalog, Path::new(path))?;
        for (history, viewed) in &histories {
            let recommendations = recommender
                .recommend(viewed, k, features.get(*history))
                .with_context(|| format!("model `{}` on history `{}`", model_name, history))?;
            for reco in add_titles(&catalog.items, recommendations) {
                rows.push(ComparisonRow {
                    history: history.to_string(),
                    model: model_name.clone(),
                    item_id: reco.item_id,
                    title: reco.title,
                    rank: reco.rank,
                });
            }
        }
    }

    for (history, _) in &histories {
        println!("{}", format!("History '{}':", history).bold().blue());
        for (model_name, _) in models {
            let titles: Vec<String> = rows
                .iter()
                .filter(|r| r.history == *history && r.model == *model_name)
                .map(|r| display_title(r.title.as_deref(), r.item_id))
                .collect();
            println!("  {}: {}", model_name.green(), titles.join(" | "));
        }
    }

    if let Some(path) = output {
        std::fs::File::create(path)
            .map_err(anyhow::Error::from)
            .and_then(|file| write_comparison(file, &rows))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Wrote {} rows to {}", "✓".green(), rows.len(), path.display());
    }
    Ok(())
}

fn write_comparison<W: io::Write>(writer: W, rows: &[ComparisonRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Handle the 'search' command
fn handle_search(catalog: &Catalog, title: &str) {
    let title_lower = title.to_lowercase();
    let mut matches = catalog.search_titles(title);

    // Exact matches first, then by id
    matches.sort_by_key(|item| (item.title.to_lowercase() != title_lower, item.id));

    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  no matches");
    }
    for item in matches.iter().take(20) {
        let attributes = item
            .attributes
            .iter()
            .map(|(column, value)| format!("{}: {}", column, value))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}: {} [{}]", item.id, item.title, attributes);
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    catalog: &Catalog,
    model: &Path,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    ensure!(requests > 0, "--requests must be positive");
    ensure!(concurrent > 0, "--concurrent must be positive");

    let recommender = Arc::new(load_recommender(catalog, model)?);
    let known: &[ItemId] = recommender.item_id_map().external_ids();
    ensure!(!known.is_empty(), "model has no items");

    // Random histories over items the model knows
    let histories: Vec<Vec<ItemId>> = (0..requests)
        .map(|_| {
            (0..HISTORY_LEN)
                .map(|_| known[rand::random::<u32>() as usize % known.len()])
                .collect()
        })
        .collect();

    info!("Running {} requests with concurrency {}", requests, concurrent);
    let semaphore = Arc::new(Semaphore::new(concurrent));
    let start = Instant::now();

    let mut handles = vec![];
    for history in histories {
        let recommender = Arc::clone(&recommender);
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let request_start = Instant::now();
            recommender.recommend(&history, 20, None)?;
            Ok::<_, anyhow::Error>(request_start.elapsed())
        });
        handles.push(handle);
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = start.elapsed();

    let total: Duration = timings.iter().sum();
    let avg_latency = total / (timings.len() as u32);
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f32 / wall_time.as_secs_f32();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

fn display_title(title: Option<&str>, item_id: ItemId) -> String {
    title
        .map(str::to_string)
        .unwrap_or_else(|| format!("<item {}>", item_id))
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[TitledRecommendation]) {
    println!("{}", "Movie Recommendations:".bold().blue());
    if recommendations.is_empty() {
        println!("  no eligible items");
    }
    for reco in recommendations {
        println!(
            "{}. {} (id {}) - Score: {:.3}",
            reco.rank.to_string().green(),
            display_title(reco.title.as_deref(), reco.item_id),
            reco.item_id,
            reco.score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        assert_eq!(parse_items("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_items("1,x").is_err());
        assert!(parse_items("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(
            parse_named("als=models/als.json").unwrap(),
            ("als".to_string(), "models/als.json".to_string())
        );
        assert_eq!(
            parse_named("katya=1,2,3").unwrap(),
            ("katya".to_string(), "1,2,3".to_string())
        );
        assert!(parse_named("no-separator").is_err());
        assert!(parse_named("=1,2").is_err());
    }

    #[test]
    fn test_parse_history_feature() {
        assert_eq!(
            parse_history_feature("katya:age=age_25_34").unwrap(),
            (
                "katya".to_string(),
                "age".to_string(),
                "age_25_34".to_string()
            )
        );
        assert!(parse_history_feature("age=age_25_34").is_err());
        assert!(parse_history_feature(":age=age_25_34").is_err());
        assert!(parse_history_feature("katya:age").is_err());
    }

    #[test]
    fn test_group_history_features() {
        let histories = vec![
            ("katya".to_string(), "1,2".to_string()),
            ("egor".to_string(), "3".to_string()),
        ];
        let features = vec![
            ("katya".to_string(), "age".to_string(), "age_25_34".to_string()),
            ("katya".to_string(), "sex".to_string(), "F".to_string()),
        ];

        let grouped = group_history_features(&histories, features).unwrap();
        assert_eq!(grouped["katya"].len(), 2);
        assert_eq!(grouped["katya"]["sex"], "F");
        assert!(!grouped.contains_key("egor"));

        let unknown = vec![("dima".to_string(), "age".to_string(), "x".to_string())];
        assert!(group_history_features(&histories, unknown).is_err());
    }

    #[test]
    fn test_write_comparison_quotes_special_values() {
        let rows = vec![
            ComparisonRow {
                history: "katya".to_string(),
                model: "als".to_string(),
                item_id: 10,
                title: Some("Love;\r Death".to_string()),
                rank: 1,
            },
            ComparisonRow {
                history: "katya".to_string(),
                model: "als".to_string(),
                item_id: 11,
                title: None,
                rank: 2,
            },
        ];

        let mut buf = Vec::new();
        write_comparison(&mut buf, &rows).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(CSV_DELIMITER)
            .from_reader(buf.as_slice());
        assert_eq!(
            reader.headers().unwrap(),
            vec!["history", "model", "item_id", "title", "rank"]
        );
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][3], "Love;\r Death");
        assert_eq!(&records[1][2], "11");
        assert_eq!(&records[1][3], "");
    }
}
