// src/bin/migrate.rs
// DOCUMENTATION: Seed loader
// PURPOSE: Bulk-load autoservice/carwash records through the admin API
//
// Usage: migrate <seed.json> [--category autoservice|carwash]
// Env:   ADMIN_ID (required), PLACES_API_URL (default http://localhost:8002)

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

// --- ANSI colors ---
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

const CATEGORIES: [&str; 2] = ["autoservice", "carwash"];

#[derive(Debug, PartialEq)]
struct Args {
    seed_path: PathBuf,
    category: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut seed_path = None;
    let mut category = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--category" => {
                let value = args.next().context("--category needs a value")?;
                if !CATEGORIES.contains(&value.as_str()) {
                    bail!("unknown category '{}', expected autoservice or carwash", value);
                }
                category = Some(value);
            }
            other if other.starts_with("--") => bail!("unknown flag '{}'", other),
            other => {
                if seed_path.is_some() {
                    bail!("only one seed file can be given");
                }
                seed_path = Some(PathBuf::from(other));
            }
        }
    }

    Ok(Args {
        seed_path: seed_path.context("usage: migrate <seed.json> [--category autoservice|carwash]")?,
        category,
    })
}

/// Older seed files carry working_hours as {"start", "end"}; the admin API
/// takes "HH:MM-HH:MM". Empty objects mean no hours.
fn normalize_record(mut record: Value) -> Value {
    if let Some(obj) = record.as_object_mut() {
        let text = match obj.get("working_hours") {
            Some(Value::Object(hours)) => match (hours.get("start"), hours.get("end")) {
                (Some(Value::String(start)), Some(Value::String(end))) => {
                    Some(Value::String(format!("{}-{}", start, end)))
                }
                _ => Some(Value::Null),
            },
            _ => None,
        };
        if let Some(text) = text {
            obj.insert("working_hours".to_string(), text);
        }
    }
    record
}

#[derive(Debug, Default)]
struct CategoryResult {
    created: u32,
    updated: u32,
    failed: u32,
}

struct SeedLoader {
    base_url: String,
    admin_id: String,
    client: Client,
    results: BTreeMap<String, CategoryResult>,
}

impl SeedLoader {
    fn new(base_url: String, admin_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_id,
            client,
            results: BTreeMap::new(),
        })
    }

    async fn check_service_health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// POST one record; Ok(true) when it was newly created
    async fn upsert(&self, category: &str, record: &Value) -> Result<bool, String> {
        let url = format!("{}/admin/places/{}", self.base_url, category);

        let response = self
            .client
            .post(&url)
            .header("X-Admin-Id", &self.admin_id)
            .json(record)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(status == reqwest::StatusCode::CREATED)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(format!("HTTP {} - {}", status, body))
        }
    }

    async fn load_category(&mut self, category: &str, records: Vec<Value>) {
        println!(
            "\n{}Loading {} {} records...{}",
            CYAN,
            records.len(),
            category,
            RESET
        );

        let mut result = CategoryResult::default();
        for record in records {
            let record = normalize_record(record);
            let label = record
                .get("id")
                .or_else(|| record.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            match self.upsert(category, &record).await {
                Ok(true) => result.created += 1,
                Ok(false) => result.updated += 1,
                Err(err) => {
                    println!("{}  x {}: {}{}", RED, label, err, RESET);
                    result.failed += 1;
                }
            }
        }

        println!(
            "{}  {} created, {} updated{}, {}{} failed{}",
            GREEN, result.created, result.updated, RESET,
            if result.failed > 0 { RED } else { GREEN },
            result.failed, RESET
        );
        self.results.insert(category.to_string(), result);
    }

    fn print_summary(&self, elapsed: Duration) {
        println!("\n{}Migration summary{}", BOLD, RESET);
        println!("{:<14} {:>8} {:>8} {:>8}", "Category", "New", "Updated", "Failed");
        for (category, res) in &self.results {
            println!(
                "{:<14} {:>8} {:>8} {:>8}",
                category, res.created, res.updated, res.failed
            );
        }
        println!("Duration: {:.1}s", elapsed.as_secs_f64());
    }

    fn total_failed(&self) -> u32 {
        self.results.values().map(|r| r.failed).sum()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = parse_args(env::args().skip(1))?;
    let admin_id = env::var("ADMIN_ID").context("ADMIN_ID must be set in .env")?;
    let base_url =
        env::var("PLACES_API_URL").unwrap_or_else(|_| "http://localhost:8002".to_string());

    let raw = std::fs::read_to_string(&args.seed_path)
        .with_context(|| format!("failed to read {}", args.seed_path.display()))?;
    let mut seed: Map<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON object", args.seed_path.display()))?;

    let mut loader = SeedLoader::new(base_url, admin_id)?;

    println!("{}Checking service status...{}", CYAN, RESET);
    if !loader.check_service_health().await {
        bail!("service at {} is unavailable", loader.base_url);
    }

    let started = Instant::now();
    for category in CATEGORIES {
        if args.category.as_deref().is_some_and(|only| only != category) {
            continue;
        }
        let records = match seed.remove(category) {
            Some(Value::Array(records)) => records,
            Some(_) => bail!("'{}' must be an array of records", category),
            None => {
                println!("{}No {} records in seed file{}", YELLOW, category, RESET);
                continue;
            }
        };
        loader.load_category(category, records).await;
    }

    loader.print_summary(started.elapsed());

    let failed = loader.total_failed();
    if failed > 0 {
        bail!("{} records failed to load", failed);
    }
    println!("{}Migration completed{}", GREEN, RESET);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(
            args(&["seed.json"]).unwrap(),
            Args {
                seed_path: PathBuf::from("seed.json"),
                category: None
            }
        );
        assert_eq!(
            args(&["seed.json", "--category", "carwash"]).unwrap().category,
            Some("carwash".to_string())
        );
        assert!(args(&[]).is_err());
        assert!(args(&["seed.json", "--category", "bakery"]).is_err());
        assert!(args(&["seed.json", "--category"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_normalize_record_hours() {
        let record = normalize_record(json!({
            "name": "Usta",
            "working_hours": {"start": "09:00", "end": "18:00"}
        }));
        assert_eq!(record["working_hours"], "09:00-18:00");

        let record = normalize_record(json!({"name": "Usta", "working_hours": {}}));
        assert_eq!(record["working_hours"], Value::Null);

        let record = normalize_record(json!({"name": "Usta", "working_hours": "24/7"}));
        assert_eq!(record["working_hours"], "24/7");
    }
}
