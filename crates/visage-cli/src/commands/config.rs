use anyhow::{Context, Result};
use visage_enroll::{config, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let config_path = config::config_file_path();
    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    print!("{}", config.to_toml()?);

    println!("\nPriority: CLI args > ENV vars (VISAGE_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value, or print the whole config file.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    let Some(key) = key else {
        let config_path = config::config_file_path();
        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'visage config init' to create it.");
        }
        return Ok(());
    };

    match key.as_str() {
        "database_path" => println!("{}", config.database_path.display()),
        "tolerance" => println!("{}", config.tolerance),
        "max_images_per_request" => println!("{}", config.max_images_per_request),
        "expected_dimension" => match config.expected_dimension {
            Some(dimension) => println!("{}", dimension),
            None => println!("<not set>"),
        },
        "logging.level" => println!("{}", config.logging.level),
        "logging.coloured" => println!("{}", config.logging.coloured),
        _ => {
            anyhow::bail!(
                "Unknown config key: {}\n\nValid keys: database_path, tolerance, \
                 max_images_per_request, expected_dimension, logging.level, logging.coloured",
                key
            );
        }
    }

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure visage.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
