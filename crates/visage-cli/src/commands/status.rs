use anyhow::Result;
use visage_core::{IdentityStore, MAX_ENCODINGS_PER_IDENTITY};
use visage_enroll::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let store = IdentityStore::open(&config.database_path)?;

    let identities = store.count_identities()?;
    let encodings = store.count_encodings()?;

    println!("\n📊 Visage Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Identities: {}", identities);
    println!(
        "  Encodings: {} (up to {} per identity)",
        encodings, MAX_ENCODINGS_PER_IDENTITY
    );
    println!("  Match tolerance: {}", config.tolerance);

    if identities == 0 {
        println!("\n  Run `visage register <name> <files...>` to add someone");
    }

    Ok(())
}
