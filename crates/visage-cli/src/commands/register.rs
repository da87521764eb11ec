use anyhow::{Context, Result};
use std::path::PathBuf;
use visage_core::IdentityStore;
use visage_enroll::{
    discover_inputs, Config, ImageInput, JsonEncoder, Registrar, RegistrationAction,
    RegistrationPolicy,
};

/// Expand directories to the sidecar files they contain.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<ImageInput>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(discover_inputs(path));
        } else {
            files.push(path.clone());
        }
    }

    files
        .iter()
        .map(|file| {
            ImageInput::read(file).with_context(|| format!("Failed to read {}", file.display()))
        })
        .collect()
}

pub fn run_register(name: &str, paths: &[PathBuf], config: &Config) -> Result<()> {
    let images = collect_inputs(paths)?;
    if images.is_empty() {
        anyhow::bail!("At least one encoding file is required to register '{}'", name);
    }
    log::info!("Registering '{}' from {} files", name, images.len());

    let mut store = IdentityStore::open(&config.database_path)
        .context("Failed to open database")?
        .with_expected_dimension(config.expected_dimension);
    let mut registrar = Registrar::with_policy(&mut store, RegistrationPolicy::from_config(config));
    let registration = registrar.register_images(name, &images, &JsonEncoder)?;

    let record = &registration.outcome.record;
    match registration.action {
        RegistrationAction::Created => {
            println!("✓ Created '{}' (id {})", record.name, record.id);
        }
        RegistrationAction::Augmented => {
            println!("✓ Updated '{}' (id {})", record.name, record.id);
        }
    }

    if let Some(images) = &registration.images {
        println!(
            "  Files: {} submitted, {} used, {} without a usable face",
            images.submitted,
            images.used,
            images.failed.len()
        );
        for label in &images.failed {
            println!("    ✗ {}", label);
        }
    }

    let outcome = &registration.outcome;
    println!("  Encodings added: {}", outcome.accepted);
    for skipped in &outcome.skipped {
        println!("    ✗ #{}: {}", skipped.position, skipped.reason);
    }
    if outcome.truncated > 0 {
        println!("  Dropped for lack of capacity: {}", outcome.truncated);
    }
    println!(
        "  Total encodings: {}/{}",
        record.encoding_count(),
        record.encodings.capacity()
    );

    Ok(())
}
