use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tempfile::NamedTempFile;

use crate::db;
use crate::seed;
use crate::store::{CartRepository, ProductRepository};

async fn setup_file_db() -> (sqlx::SqlitePool, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let db_url = format!("sqlite:{}", temp_db.path().display());

    Sqlite::create_database(&db_url).await.unwrap();
    let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
    db::init_db(&pool).await.unwrap();

    (pool, temp_db)
}

#[tokio::test]
async fn test_init_db_creates_tables() {
    let (pool, _file) = setup_file_db().await;

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

    for t in ["admin_sessions", "admins", "cart_items", "products"] {
        assert!(tables.contains(&t.to_string()), "missing table {}", t);
    }

    let indexes: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='index'")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert!(indexes.contains(&"idx_cart_items_product_session".to_string()));
}

#[tokio::test]
async fn test_init_db_is_idempotent() {
    let (pool, _file) = setup_file_db().await;
    seed::seed_catalog(&pool).await.unwrap();

    db::init_db(&pool).await.unwrap();
    assert_eq!(ProductRepository::new(&pool).count().await.unwrap(), 20);
}

#[tokio::test]
async fn test_data_survives_reconnect() {
    let (pool, file) = setup_file_db().await;
    seed::seed_catalog(&pool).await.unwrap();
    CartRepository::new(&pool).add("persisted", 3, 2).await.unwrap();
    pool.close().await;

    let db_url = format!("sqlite:{}", file.path().display());
    let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();
    db::init_db(&pool).await.unwrap();

    let items = CartRepository::new(&pool).items_for_session("persisted").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item.quantity, 2);
    assert_eq!(items[0].product.name, "Blush Stripe Sheets");
    assert_eq!(items[0].product.price.to_string(), "69.99");
}

#[tokio::test]
async fn test_deleting_product_cascades_to_cart() {
    let (pool, _file) = setup_file_db().await;
    seed::seed_catalog(&pool).await.unwrap();

    let cart = CartRepository::new(&pool);
    cart.add("cascade", 4, 1).await.unwrap();
    cart.add("cascade", 5, 1).await.unwrap();

    assert!(ProductRepository::new(&pool).delete(4).await.unwrap());
    let items = cart.items_for_session("cascade").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].item.product_id, 5);
}
