use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use visage_core::IdentityStore;
use visage_enroll::{Config, JsonEncoder, RecognitionReport, Recognizer};
use visage_search::MatchEngine;

/// Recognize one file on its own connection.
fn recognize_file(path: &Path, db_path: &Path, engine: MatchEngine) -> Result<RecognitionReport> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let store = IdentityStore::open(db_path).context("Failed to open database")?;
    let report = Recognizer::new(&store, engine).recognize(&bytes, &JsonEncoder)?;
    Ok(report)
}

fn print_report(path: &Path, report: &RecognitionReport) {
    println!("\n{}", path.display());
    println!("  {}", report.message);
    for face in &report.faces {
        let region = face
            .region
            .map(|r| format!(" at [{}, {}, {}, {}]", r.top, r.right, r.bottom, r.left))
            .unwrap_or_default();
        match face.distance {
            Some(distance) => println!("  ✓ {} (distance {:.4}){}", face.name, distance, region),
            None => println!("  ? {}{}", face.name, region),
        }
    }
}

/// Recognize every file in parallel, printing results in input order.
pub async fn run_recognize(files: Vec<PathBuf>, config: &Config, json: bool) -> Result<()> {
    let engine = MatchEngine::new(config.tolerance)?;

    // Apply migrations once before the readers start.
    drop(IdentityStore::open(&config.database_path).context("Failed to open database")?);

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let db_path = config.database_path.clone();
            tokio::task::spawn_blocking(move || {
                let report = recognize_file(&path, &db_path, engine);
                (path, report)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    let mut failures = 0usize;
    for handle in handles {
        let (path, report) = handle.await.context("Recognition task panicked")?;
        match report {
            Ok(report) => {
                if !json {
                    print_report(&path, &report);
                }
                results.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "faces": report.faces,
                    "message": report.message,
                }));
            }
            Err(e) => {
                failures += 1;
                eprintln!("  ✗ {}: {:#}", path.display(), e);
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    if failures > 0 {
        anyhow::bail!("{} file(s) could not be recognized", failures);
    }
    Ok(())
}
