//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Walnut Desk Organizer
//!     description: Five compartments, oiled finish
//!     price: "34.50"
//!     stock: 12
//!   - name: Brass Bookmark
//!     price: "6.00"
//!     stock: 0
//! ```
//!
//! The whole file is validated before the database is touched.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use tradepost_core::Price;
use tradepost_storefront::config;
use tradepost_storefront::db::{self, Repositories};
use tradepost_storefront::models::NewProduct;

/// Top-level layout of a catalog seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry in a seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    pub stock: i64,
}

impl SeedProduct {
    fn validate(&self) -> Result<NewProduct, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is empty".to_string());
        }
        let stock = i32::try_from(self.stock)
            .ok()
            .filter(|s| *s >= 0)
            .ok_or_else(|| format!("{name}: stock must be a non-negative integer"))?;

        Ok(NewProduct {
            name: name.to_string(),
            description: self.description.clone(),
            price: self.price,
            stock,
        })
    }
}

/// Parse and validate a catalog file's contents.
///
/// Every invalid entry is reported, not just the first.
///
/// # Errors
///
/// Returns a message per problem found.
pub fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, Vec<String>> {
    let file: CatalogFile = serde_yaml::from_str(content).map_err(|e| vec![e.to_string()])?;

    let mut products = Vec::with_capacity(file.products.len());
    let mut errors = Vec::new();
    for (index, entry) in file.products.iter().enumerate() {
        match entry.validate() {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("entry {index}: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(products)
    } else {
        Err(errors)
    }
}

/// Insert the products described in `file_path`.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, the database URL is
/// not set, or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;

    let products = match parse_catalog(&content) {
        Ok(products) => products,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = products.len(), "Catalog validated");

    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repos = Repositories::postgres(pool);
    for product in &products {
        let created = repos.products.create(product).await?;
        info!(id = %created.id, name = %created.name, stock = created.stock, "Product inserted");
    }

    info!("Seeding complete! {} products inserted", products.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let yaml = r#"
products:
  - name: Walnut Desk Organizer
    description: Five compartments
    price: "34.50"
    stock: 12
  - name: "  Brass Bookmark  "
    price: "6.00"
    stock: 0
"#;
        let products = parse_catalog(yaml).expect("valid catalog");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].stock, 12);
        assert_eq!(products[0].price.to_string(), "34.50");
        assert_eq!(products[1].name, "Brass Bookmark");
        assert!(products[1].description.is_none());
    }

    #[test]
    fn test_parse_catalog_collects_every_error() {
        let yaml = r#"
products:
  - name: ""
    price: "1.00"
    stock: 1
  - name: Lamp
    price: "20.00"
    stock: -3
"#;
        let errors = parse_catalog(yaml).expect_err("invalid catalog");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("entry 0"));
        assert!(errors[1].contains("stock"));
    }

    #[test]
    fn test_parse_catalog_rejects_negative_price() {
        let yaml = r#"
products:
  - name: Lamp
    price: "-5.00"
    stock: 1
"#;
        assert!(parse_catalog(yaml).is_err());
    }

    #[test]
    fn test_parse_catalog_rejects_unknown_fields() {
        let yaml = r#"
products:
  - name: Lamp
    price: "5.00"
    stock: 1
    color: red
"#;
        assert!(parse_catalog(yaml).is_err());
    }
}
