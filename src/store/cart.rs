//! Session-keyed cart rows.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::products::ProductRow;
use super::StoreError;
use crate::types::{CartItem, CartItemWithProduct, Product, MAX_QUANTITY};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i64,
    product_id: i64,
    quantity: i64,
    session_id: String,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self { id: row.id, product_id: row.product_id, quantity: row.quantity, session_id: row.session_id }
    }
}

fn joined_row(row: &SqliteRow) -> Result<CartItemWithProduct, StoreError> {
    let item = CartItem {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        session_id: row.try_get("session_id")?,
    };
    let product: Product = ProductRow {
        id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        material: row.try_get("material")?,
        image_url: row.try_get("image_url")?,
        in_stock: row.try_get("in_stock")?,
        featured: row.try_get("featured")?,
    }
    .try_into()?;
    Ok(CartItemWithProduct { item, product })
}

/// Repository for cart operations. Every call is scoped to a session id.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn items_for_session(&self, session_id: &str) -> Result<Vec<CartItemWithProduct>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.product_id, c.quantity, c.session_id,
                      p.name, p.description, p.price, p.category, p.material,
                      p.image_url, p.in_stock, p.featured
               FROM cart_items c
               INNER JOIN products p ON p.id = c.product_id
               WHERE c.session_id = ?1
               ORDER BY c.id"#,
        )
        .bind(session_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(joined_row).collect()
    }

    /// Adds `quantity` of a product. An existing row for the same product and
    /// session has its quantity increased instead of gaining a duplicate,
    /// capped at [`MAX_QUANTITY`].
    pub async fn add(&self, session_id: &str, product_id: i64, quantity: i64) -> Result<CartItem, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"INSERT INTO cart_items (product_id, quantity, session_id)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(product_id, session_id)
               DO UPDATE SET quantity = MIN(cart_items.quantity + excluded.quantity, ?4)
               RETURNING id, product_id, quantity, session_id"#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(session_id)
        .bind(MAX_QUANTITY)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update_quantity(
        &self,
        session_id: &str,
        id: i64,
        quantity: i64,
    ) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"UPDATE cart_items SET quantity = ?3
               WHERE id = ?1 AND session_id = ?2
               RETURNING id, product_id, quantity, session_id"#,
        )
        .bind(id)
        .bind(session_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn remove(&self, session_id: &str, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE id = ?1 AND session_id = ?2")
            .bind(id)
            .bind(session_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn clear(&self, session_id: &str) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM cart_items WHERE session_id = ?1")
            .bind(session_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::ProductRepository;
    use crate::types::{Category, NewProduct};
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (SqlitePool, i64, i64) {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        db::init_db(&pool).await.unwrap();
        let repo = ProductRepository::new(&pool);
        let mk = |name: &str| NewProduct {
            name: name.into(),
            description: "d".into(),
            price: Decimal::new(2499, 2),
            category: Category::PillowCovers,
            material: "Cotton".into(),
            image_url: "/p.jpg".into(),
            in_stock: true,
            featured: false,
        };
        let a = repo.create(&mk("Geometric Pillow Covers")).await.unwrap().id;
        let b = repo.create(&mk("Velvet Accent Pillows")).await.unwrap().id;
        (pool, a, b)
    }

    #[tokio::test]
    async fn adding_twice_merges_quantities() {
        let (pool, a, _) = setup().await;
        let cart = CartRepository::new(&pool);

        let first = cart.add("sess-1", a, 2).await.unwrap();
        let second = cart.add("sess-1", a, 3).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);

        let items = cart.items_for_session("sess-1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item.quantity, 5);
        assert_eq!(items[0].product.id, a);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let (pool, a, b) = setup().await;
        let cart = CartRepository::new(&pool);
        let mine = cart.add("mine", a, 1).await.unwrap();
        cart.add("mine", b, 1).await.unwrap();
        cart.add("theirs", a, 4).await.unwrap();

        assert_eq!(cart.items_for_session("mine").await.unwrap().len(), 2);
        assert!(cart.update_quantity("theirs", mine.id, 9).await.unwrap().is_none());
        assert!(!cart.remove("theirs", mine.id).await.unwrap());

        let updated = cart.update_quantity("mine", mine.id, 9).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 9);

        assert_eq!(cart.clear("mine").await.unwrap(), 2);
        assert!(cart.items_for_session("mine").await.unwrap().is_empty());
        assert_eq!(cart.items_for_session("theirs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_product_cascades_to_cart_rows() {
        let (pool, a, _) = setup().await;
        let cart = CartRepository::new(&pool);
        cart.add("sess", a, 1).await.unwrap();
        assert!(ProductRepository::new(&pool).delete(a).await.unwrap());
        assert!(cart.items_for_session("sess").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_violates_foreign_key() {
        let (pool, _, _) = setup().await;
        let err = CartRepository::new(&pool).add("sess", 4242, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
