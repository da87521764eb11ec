use anyhow::{Context, Result};
use std::path::Path;
use visage_core::{EncodingId, IdentityId, IdentityStore};

fn open(db_path: &Path) -> Result<IdentityStore> {
    IdentityStore::open(db_path).context("Failed to open database")
}

pub fn list_identities(db_path: &Path, offset: usize, limit: usize) -> Result<()> {
    let store = open(db_path)?;
    let records = store.list(offset, limit)?;

    if records.is_empty() {
        println!("No identities registered.");
        return Ok(());
    }

    println!("{:>6}  {:<30}  {:>9}  {}", "ID", "NAME", "ENCODINGS", "UPDATED");
    for record in &records {
        println!(
            "{:>6}  {:<30}  {:>9}  {}",
            record.id,
            record.name,
            record.encoding_count(),
            record.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let total = store.count_identities()?;
    println!(
        "\nShowing {}-{} of {}",
        offset + 1,
        offset + records.len(),
        total
    );

    Ok(())
}

pub fn show_identity(db_path: &Path, id: IdentityId) -> Result<()> {
    let store = open(db_path)?;
    let record = store.find_by_id(id)?;

    println!("{} (id {})", record.name, record.id);
    println!("  Created: {}", record.created_at.to_rfc3339());
    println!("  Updated: {}", record.updated_at.to_rfc3339());
    println!(
        "  Encodings: {}/{}",
        record.encoding_count(),
        record.encodings.capacity()
    );
    for stored in &record.encodings {
        println!(
            "    #{}  {} dimensions",
            stored.id,
            stored.vector.dimension()
        );
    }

    Ok(())
}

pub fn delete_identity(db_path: &Path, id: IdentityId) -> Result<()> {
    let mut store = open(db_path)?;
    if !store.delete(id)? {
        anyhow::bail!("Identity {} not found", id);
    }
    println!("✓ Deleted identity {} and its encodings", id);
    Ok(())
}

pub fn delete_encoding(db_path: &Path, id: EncodingId) -> Result<()> {
    let mut store = open(db_path)?;
    let encoding = store.get_encoding(id)?;
    if let Some(reason) = &encoding.decode_error {
        log::warn!("Encoding {} holds undecodable data: {}", id, reason);
    }
    if !store.delete_encoding(id)? {
        anyhow::bail!("Encoding {} not found", id);
    }
    println!(
        "✓ Deleted encoding {} from identity {}",
        id, encoding.identity_id
    );
    Ok(())
}
