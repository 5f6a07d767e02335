use rust_decimal::Decimal;
use sqlx::Row;
use tokio::sync::RwLock;

use procura_core::domain::product::{BaseSpecs, Product, ProductSummary, UpgradeKind, UpgradeOption};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

/// The workplace-computer catalog shipped with the service. The sqlite
/// backend is seeded from this same list, so both backends agree.
pub fn default_catalog() -> Vec<Product> {
    vec![
        laptop(
            "MBP-16-M3",
            "MacBook Pro 16\" (M3 Pro)",
            "16-inch MacBook Pro with Apple M3 Pro chip",
            Decimal::new(3_349_00, 2),
            "https://example.com/images/mbp16-m3.jpg",
            true,
            "M3 Pro",
            "M3 Max (High Performance)",
        ),
        laptop(
            "MBP-14-M3",
            "MacBook Pro 14\" (M3 Pro)",
            "14-inch MacBook Pro with Apple M3 Pro chip",
            Decimal::new(2_549_00, 2),
            "https://example.com/images/mbp14-m3.jpg",
            true,
            "M3 Pro",
            "M3 Max (High Performance)",
        ),
        laptop(
            "DELL-LAT5440",
            "Dell Latitude 5440",
            "14-inch Dell Latitude laptop with Intel Core i7 processor",
            Decimal::new(1_800_00, 2),
            "https://example.com/images/dell-lat5440.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "DELL-XPS13",
            "Dell XPS 13",
            "Premium 13.4-inch Dell XPS laptop with InfinityEdge display",
            Decimal::new(1_599_00, 2),
            "https://example.com/images/dell-xps13.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "LEN-T14S",
            "Lenovo ThinkPad T14s",
            "Lightweight 14-inch Lenovo ThinkPad with Intel Core i7",
            Decimal::new(1_740_00, 2),
            "https://example.com/images/len-t14s.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "LEN-X1C10",
            "Lenovo ThinkPad X1 Carbon G10",
            "Ultra-light 14-inch X1 Carbon Gen 10 with Intel Core i7",
            Decimal::new(2_109_50, 2),
            "https://example.com/images/len-x1c10.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "HP-ELITE840",
            "HP EliteBook 840 G10",
            "14-inch HP EliteBook with enterprise security and Intel Core i7",
            Decimal::new(1_989_50, 2),
            "https://example.com/images/hp-elite840.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "SURF-LAP-STUDIO2",
            "Surface Laptop Studio 2",
            "Versatile 14.4-inch Surface Laptop Studio 2 with Intel Core i7",
            Decimal::new(2_599_00, 2),
            "https://example.com/images/surf-lap-studio2.jpg",
            true,
            "i7-13700H",
            "i9-13900H (High Performance)",
        ),
        laptop(
            "SURF-PRO9",
            "Surface Pro 9 Tablet",
            "13-inch Surface Pro 9 2-in-1 tablet with Intel Core i7",
            Decimal::new(1_699_00, 2),
            "https://example.com/images/surf-pro9.jpg",
            true,
            "i7-1255U",
            "i7-1265U (High Performance)",
        ),
        laptop(
            "ASUS-EXPERT",
            "ASUS ExpertBook B9",
            "14-inch ASUS ExpertBook B9 with Intel Core i7 and ultra-light chassis",
            Decimal::new(1_834_50, 2),
            "https://example.com/images/asus-expert.jpg",
            false,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
        laptop(
            "ACER-TMP6",
            "Acer TravelMate P6",
            "14-inch Acer TravelMate P6 with Intel Core i7 for business professionals",
            Decimal::new(1_670_00, 2),
            "https://example.com/images/acer-tmp6.jpg",
            true,
            "i7-1355U",
            "i7-1370P (High Performance)",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn laptop(
    sku: &str,
    name: &str,
    description: &str,
    cost: Decimal,
    image_url: &str,
    available: bool,
    cpu: &str,
    cpu_upgrade: &str,
) -> Product {
    Product {
        sku: sku.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        cost,
        image_url: image_url.to_string(),
        available,
        base_specs: BaseSpecs {
            ram: "16GB".to_string(),
            storage: "512GB SSD".to_string(),
            cpu: cpu.to_string(),
        },
        upgrade_options: vec![
            upgrade(UpgradeKind::Ram, "32GB", Decimal::new(180_00, 2)),
            upgrade(UpgradeKind::Ram, "64GB", Decimal::new(380_00, 2)),
            upgrade(UpgradeKind::Storage, "1TB SSD", Decimal::new(140_00, 2)),
            upgrade(UpgradeKind::Storage, "2TB SSD", Decimal::new(300_00, 2)),
            upgrade(UpgradeKind::Cpu, cpu_upgrade, Decimal::new(220_00, 2)),
        ],
    }
}

fn upgrade(kind: UpgradeKind, to: &str, cost_delta: Decimal) -> UpgradeOption {
    UpgradeOption { kind, to: to.to_string(), cost_delta }
}

/// Catalog held in process memory; constructed once at bootstrap and shared
/// behind an `Arc`, never a process-wide static.
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products: RwLock::new(products) }
    }

    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| product.matches_sku(sku)).cloned())
    }

    async fn find_by_skus(&self, skus: &[String]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .iter()
            .filter(|product| skus.iter().any(|sku| product.matches_sku(sku)))
            .cloned()
            .collect())
    }

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().map(Product::summary).collect())
    }

    async fn list_available(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|product| product.available).cloned().collect())
    }
}

/// sqlite-backed catalog. Costs are stored as decimal TEXT and parsed on
/// the way out; a row that does not parse is a decode error, not a panic.
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Copies the default catalog into an empty `product` table. Safe to
    /// call on every bootstrap; a populated table is left untouched.
    pub async fn seed_defaults(&self) -> Result<(), RepositoryError> {
        let existing: i64 = sqlx::query("SELECT COUNT(*) AS count FROM product")
            .fetch_one(&self.pool)
            .await?
            .get("count");
        if existing > 0 {
            return Ok(());
        }

        for product in default_catalog() {
            sqlx::query(
                "INSERT INTO product (sku, name, description, cost, image_url, available, ram, storage, cpu) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&product.sku)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.cost.to_string())
            .bind(&product.image_url)
            .bind(product.available)
            .bind(&product.base_specs.ram)
            .bind(&product.base_specs.storage)
            .bind(&product.base_specs.cpu)
            .execute(&self.pool)
            .await?;

            for option in &product.upgrade_options {
                sqlx::query(
                    "INSERT INTO upgrade_option (product_sku, kind, upgrade_to, cost_delta) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(&product.sku)
                .bind(kind_label(option.kind))
                .bind(&option.to)
                .bind(option.cost_delta.to_string())
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn load_upgrade_options(&self, sku: &str) -> Result<Vec<UpgradeOption>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT kind, upgrade_to, cost_delta FROM upgrade_option \
             WHERE product_sku = ? ORDER BY id",
        )
        .bind(sku)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UpgradeOption {
                    kind: parse_kind(&row.get::<String, _>("kind"))?,
                    to: row.get("upgrade_to"),
                    cost_delta: parse_cost(&row.get::<String, _>("cost_delta"))?,
                })
            })
            .collect()
    }

    async fn row_to_product(&self, row: sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
        let sku: String = row.get("sku");
        let upgrade_options = self.load_upgrade_options(&sku).await?;
        Ok(Product {
            name: row.get("name"),
            description: row.get("description"),
            cost: parse_cost(&row.get::<String, _>("cost"))?,
            image_url: row.get("image_url"),
            available: row.get("available"),
            base_specs: BaseSpecs {
                ram: row.get("ram"),
                storage: row.get("storage"),
                cpu: row.get("cpu"),
            },
            upgrade_options,
            sku,
        })
    }
}

fn kind_label(kind: UpgradeKind) -> &'static str {
    match kind {
        UpgradeKind::Ram => "ram",
        UpgradeKind::Storage => "storage",
        UpgradeKind::Cpu => "cpu",
    }
}

fn parse_kind(label: &str) -> Result<UpgradeKind, RepositoryError> {
    match label {
        "ram" => Ok(UpgradeKind::Ram),
        "storage" => Ok(UpgradeKind::Storage),
        "cpu" => Ok(UpgradeKind::Cpu),
        other => Err(RepositoryError::Decode(format!("unknown upgrade kind `{other}`"))),
    }
}

fn parse_cost(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse()
        .map_err(|error| RepositoryError::Decode(format!("invalid cost `{raw}`: {error}")))
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT sku, name, description, cost, image_url, available, ram, storage, cpu \
             FROM product WHERE sku = ? COLLATE NOCASE",
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_product(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_skus(&self, skus: &[String]) -> Result<Vec<Product>, RepositoryError> {
        let mut products = Vec::new();
        for sku in skus {
            if let Some(product) = self.find_by_sku(sku).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn list_summaries(&self) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query("SELECT sku, name, description, cost FROM product ORDER BY sku")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProductSummary {
                    sku: row.get("sku"),
                    name: row.get("name"),
                    description: row.get("description"),
                    cost: parse_cost(&row.get::<String, _>("cost"))?,
                })
            })
            .collect()
    }

    async fn list_available(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sku, name, description, cost, image_url, available, ram, storage, cpu \
             FROM product WHERE available = 1 ORDER BY sku",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(self.row_to_product(row).await?);
        }
        Ok(products)
    }
}
