//! Seed the catalog collections from a YAML file.
//!
//! The file is parsed and checked before connecting to the database, then
//! references are checked against the store and everything is upserted.

use std::path::Path;

use tracing::{error, info};

use neyisek_server::db::{self, Repositories};
use neyisek_server::seed::{self, SeedFile};

use super::migrate::database_url;

/// Parse a seed file.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or has unknown fields.
pub fn parse(content: &str) -> Result<SeedFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

fn report(errors: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if errors.is_empty() {
        return Ok(());
    }
    error!("Seed file validation failed:");
    for err in errors {
        error!("  - {err}");
    }
    Err(format!("{} validation errors found", errors.len()).into())
}

/// Load a seed file and upsert its records.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if
/// a database operation fails.
pub async fn from_file(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let file = parse(&content)?;

    info!(
        categories = file.categories.len(),
        users = file.users.len(),
        restaurants = file.restaurants.len(),
        "Parsed seed file"
    );
    if file.is_empty() {
        return Err("Seed file defines no records".into());
    }
    report(&file.validate())?;

    let pool = db::create_pool(&database_url()?).await?;
    let repos = Repositories::postgres(pool);
    info!("Connected to database");

    report(&file.validate_references(&repos).await?)?;
    info!("Seed file validated successfully");

    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let summary = seed::apply(&repos, file, chrono::Utc::now()).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Users: {}", summary.users);
    info!("  Restaurants: {}", summary.restaurants);
    Ok(())
}

/// Show row counts per collection.
///
/// # Errors
///
/// Returns an error if the database connection fails.
pub async fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::create_pool(&database_url()?).await?;
    let counts = Repositories::postgres(pool).counts().await?;

    info!("Collection Statistics");
    info!("=====================");
    info!("users: {}", counts.users);
    info!("restaurants: {}", counts.restaurants);
    info!("categories: {}", counts.categories);
    info!("orders: {}", counts.orders);
    info!("fcm_tokens: {}", counts.fcm_tokens);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = include_str!("../../seed/example.yaml");

    #[test]
    fn test_example_seed_is_valid() {
        let file = parse(EXAMPLE).unwrap();
        assert_eq!(file.categories.len(), 3);
        assert_eq!(file.users.len(), 3);
        assert_eq!(file.restaurants.len(), 2);
        assert!(file.validate().is_empty());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        assert!(parse("menus: []\n").is_err());
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let yaml = "users:\n  - uid: u1\n    email: not-an-email\n";
        assert!(parse(yaml).is_err());
    }

    #[test]
    fn test_report_counts_errors() {
        let err = report(&["a".to_string(), "b".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "2 validation errors found");
        assert!(report(&[]).is_ok());
    }
}
