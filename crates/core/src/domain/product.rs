use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog entry for a purchasable workplace computer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub cost: Decimal,
    pub image_url: String,
    pub available: bool,
    pub base_specs: BaseSpecs,
    pub upgrade_options: Vec<UpgradeOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSpecs {
    pub ram: String,
    pub storage: String,
    pub cpu: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Ram,
    Storage,
    Cpu,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOption {
    pub kind: UpgradeKind,
    pub to: String,
    pub cost_delta: Decimal,
}

/// The projection tools embed in their JSON output: enough for a user to
/// pick a product, without the upgrade matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub cost: Decimal,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            sku: self.sku.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            cost: self.cost,
        }
    }

    /// Catalog SKUs are matched case-insensitively everywhere.
    pub fn matches_sku(&self, sku: &str) -> bool {
        self.sku.eq_ignore_ascii_case(sku)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{BaseSpecs, Product, UpgradeKind, UpgradeOption};

    fn product_fixture() -> Product {
        Product {
            sku: "DELL-LAT5440".to_string(),
            name: "Dell Latitude 5440".to_string(),
            description: "14-inch Dell Latitude laptop".to_string(),
            cost: Decimal::new(1_800_00, 2),
            image_url: "https://example.com/images/dell-lat5440.jpg".to_string(),
            available: true,
            base_specs: BaseSpecs {
                ram: "16GB".to_string(),
                storage: "512GB SSD".to_string(),
                cpu: "i7-1355U".to_string(),
            },
            upgrade_options: vec![UpgradeOption {
                kind: UpgradeKind::Ram,
                to: "32GB".to_string(),
                cost_delta: Decimal::new(180_00, 2),
            }],
        }
    }

    #[test]
    fn summary_projects_the_listing_fields() {
        let summary = product_fixture().summary();
        assert_eq!(summary.sku, "DELL-LAT5440");
        assert_eq!(summary.cost, Decimal::new(1_800_00, 2));
    }

    #[test]
    fn sku_matching_ignores_case() {
        let product = product_fixture();
        assert!(product.matches_sku("dell-lat5440"));
        assert!(product.matches_sku("DELL-LAT5440"));
        assert!(!product.matches_sku("DELL-XPS13"));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let serialized =
            serde_json::to_value(product_fixture().summary()).expect("summary serializes");
        assert!(serialized.get("sku").is_some());
        assert!(serialized.get("cost").is_some());
        assert!(serialized.get("baseSpecs").is_none());
    }
}
