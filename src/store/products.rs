//! Product catalog queries.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::SqlitePool;

use super::StoreError;
use crate::types::{Category, NewProduct, Product};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, material, image_url, in_stock, featured";

/// Raw row; price and category are stored as text.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub material: String,
    pub image_url: String,
    pub in_stock: bool,
    pub featured: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(&row.price).map_err(|e| {
            StoreError::DataCorruption(format!("invalid price '{}' for product {}: {}", row.price, row.id, e))
        })?;
        let category = Category::from_str(&row.category)
            .map_err(|e| StoreError::DataCorruption(format!("product {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price,
            category,
            material: row.material,
            image_url: row.image_url,
            in_stock: row.in_stock,
            featured: row.featured,
        })
    }
}

fn price_text(price: Decimal) -> String {
    let mut p = price;
    p.rescale(2);
    p.to_string()
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, StoreError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Repository for catalog operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Products whose stored category equals `category`. Unknown categories yield nothing.
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ?1 ORDER BY id"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    pub async fn list_featured(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE featured = 1 ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Case-insensitive substring match on name, description or material.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, StoreError> {
        let needle = query.trim().to_lowercase();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE instr(lower(name), ?1) > 0
                OR instr(lower(description), ?1) > 0
                OR instr(lower(material), ?1) > 0
             ORDER BY id"
        ))
        .bind(needle)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (name, description, price, category, material, image_url, in_stock, featured)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(price_text(product.price))
        .bind(product.category.as_str())
        .bind(&product.material)
        .bind(&product.image_url)
        .bind(product.in_stock)
        .bind(product.featured)
        .fetch_one(self.pool)
        .await?;
        row.try_into()
    }

    /// Overwrites every column of an existing product. `None` when the id is unknown.
    pub async fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET name = ?2, description = ?3, price = ?4, category = ?5,
                 material = ?6, image_url = ?7, in_stock = ?8, featured = ?9
             WHERE id = ?1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(price_text(product.price))
        .bind(product.category.as_str())
        .bind(&product.material)
        .bind(&product.image_url)
        .bind(product.in_stock)
        .bind(product.featured)
        .fetch_optional(self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Deletes a product and, through the foreign key, its cart rows.
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM products WHERE id = ?1").bind(id).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(self.pool).await?;
        Ok(n)
    }

    /// In-stock products of `category`, ranked by material preference, then featured, then id.
    pub async fn recommend(
        &self,
        category: Category,
        preferred_materials: &[&str],
        exclude_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ?1 AND in_stock = 1 ORDER BY id"
        ))
        .bind(category.as_str())
        .fetch_all(self.pool)
        .await?;

        let mut products: Vec<Product> = into_products(rows)?
            .into_iter()
            .filter(|p| Some(p.id) != exclude_id)
            .collect();
        let matches_material = |p: &Product| {
            let material = p.material.to_lowercase();
            preferred_materials.iter().any(|m| material.contains(m))
        };
        products.sort_by_key(|p| (!matches_material(p), !p.featured, p.id));
        products.truncate(limit);
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        pool
    }

    fn product(name: &str, category: Category, material: &str, featured: bool) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: format!("{name} description"),
            price: Decimal::new(1999, 2),
            category,
            material: material.into(),
            image_url: "/img.jpg".into(),
            in_stock: true,
            featured,
        }
    }

    #[tokio::test]
    async fn create_find_update_delete() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);

        let created = repo.create(&product("Flannel Winter Sheets", Category::Bedsheets, "Flannel", false)).await.unwrap();
        assert_eq!(created.price.to_string(), "19.99");
        assert_eq!(repo.count().await.unwrap(), 1);

        let mut changed = repo.find_by_id(created.id).await.unwrap().unwrap();
        changed.featured = true;
        changed.price = Decimal::new(25, 0);
        let updated = repo.update(&changed).await.unwrap().unwrap();
        assert!(updated.featured);
        assert_eq!(updated.price.to_string(), "25.00");

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());

        let missing = Product { id: 999, ..updated };
        assert!(repo.update(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_fields() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);
        repo.create(&product("Silk Pillowcase", Category::PillowCovers, "Silk", true)).await.unwrap();
        repo.create(&product("Linen Table Runner", Category::TableCovers, "Linen", false)).await.unwrap();

        assert_eq!(repo.search("SILK").await.unwrap().len(), 1);
        assert_eq!(repo.search("linen").await.unwrap().len(), 1);
        assert_eq!(repo.search("description").await.unwrap().len(), 2);
        assert!(repo.search("velvet").await.unwrap().is_empty());

        assert_eq!(repo.list_featured().await.unwrap().len(), 1);
        assert_eq!(repo.list_by_category("table-covers").await.unwrap().len(), 1);
        assert!(repo.list_by_category("curtains").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recommend_prefers_material_then_featured() {
        let pool = pool().await;
        let repo = ProductRepository::new(&pool);
        let plain = repo.create(&product("Microfiber Sheets", Category::Bedsheets, "Microfiber", false)).await.unwrap();
        let featured = repo.create(&product("Bamboo Silk Sheets", Category::Bedsheets, "Bamboo Silk", true)).await.unwrap();
        let cotton = repo.create(&product("Premium Cotton Sheets", Category::Bedsheets, "Cotton", false)).await.unwrap();
        let mut sold_out = product("Organic Cotton Set", Category::Bedsheets, "Organic Cotton", true);
        sold_out.in_stock = false;
        repo.create(&sold_out).await.unwrap();

        let picks = repo.recommend(Category::Bedsheets, &["cotton"], None, 4).await.unwrap();
        let ids: Vec<i64> = picks.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![cotton.id, featured.id, plain.id]);

        let picks = repo.recommend(Category::Bedsheets, &[], Some(featured.id), 1).await.unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].id, plain.id);
    }

    #[tokio::test]
    async fn corrupt_rows_are_reported() {
        let pool = pool().await;
        sqlx::query(
            "INSERT INTO products (name, description, price, category, material, image_url) VALUES ('x','y','abc','bedsheets','m','/i')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let err = ProductRepository::new(&pool).list_all().await.unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }
}
