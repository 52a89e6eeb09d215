//! Demo catalog and bootstrap admin created at startup.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::SqlitePool;

use crate::config::AdminConfig;
use crate::store::{AdminRepository, ProductRepository, StoreError};
use crate::types::{Category, NewProduct};

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: &'static str,
    category: Category,
    material: &'static str,
    photo: &'static str,
    featured: bool,
}

impl SeedProduct {
    fn image_url(&self) -> String {
        format!(
            "https://images.unsplash.com/photo-{}?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&h=600",
            self.photo
        )
    }

    fn to_new_product(&self) -> Result<NewProduct, StoreError> {
        let price = Decimal::from_str(self.price)
            .map_err(|e| StoreError::DataCorruption(format!("seed price for {}: {}", self.name, e)))?;
        Ok(NewProduct {
            name: self.name.to_string(),
            description: self.description.to_string(),
            price,
            category: self.category,
            material: self.material.to_string(),
            image_url: self.image_url(),
            in_stock: true,
            featured: self.featured,
        })
    }
}

const CATALOG: [SeedProduct; 20] = [
    SeedProduct {
        name: "Premium Cotton Sheets",
        description: "100% Egyptian cotton, 800 thread count for ultimate comfort",
        price: "89.99",
        category: Category::Bedsheets,
        material: "Cotton",
        photo: "1555041469-a586c61ea9bc",
        featured: true,
    },
    SeedProduct {
        name: "Navy Luxury Set",
        description: "Percale weave with cooling comfort technology",
        price: "109.99",
        category: Category::Bedsheets,
        material: "Cotton",
        photo: "1578662996442-48f60103fc96",
        featured: false,
    },
    SeedProduct {
        name: "Blush Stripe Sheets",
        description: "Soft cotton blend, machine washable and durable",
        price: "69.99",
        category: Category::Bedsheets,
        material: "Cotton Blend",
        photo: "1540932239986-30128078f3c5",
        featured: false,
    },
    SeedProduct {
        name: "Pure Linen Sheets",
        description: "100% European linen, naturally breathable and temperature regulating",
        price: "129.99",
        category: Category::Bedsheets,
        material: "Linen",
        photo: "1521783988139-89397d761dce",
        featured: false,
    },
    SeedProduct {
        name: "Organic Cotton Set",
        description: "GOTS certified organic cotton, eco-friendly and hypoallergenic",
        price: "94.99",
        category: Category::Bedsheets,
        material: "Organic Cotton",
        photo: "1586023492125-27b2c045efd7",
        featured: false,
    },
    SeedProduct {
        name: "Bamboo Silk Sheets",
        description: "Luxurious bamboo silk blend, naturally antimicrobial",
        price: "149.99",
        category: Category::Bedsheets,
        material: "Bamboo Silk",
        photo: "1505693416388-ac5ce068fe85",
        featured: true,
    },
    SeedProduct {
        name: "Microfiber Sheets",
        description: "Ultra-soft microfiber, wrinkle-resistant and easy care",
        price: "39.99",
        category: Category::Bedsheets,
        material: "Microfiber",
        photo: "1522771739844-6a9f6d5f14af",
        featured: false,
    },
    SeedProduct {
        name: "Flannel Winter Sheets",
        description: "Cozy brushed flannel for warmth and comfort",
        price: "79.99",
        category: Category::Bedsheets,
        material: "Flannel",
        photo: "1578662996442-48f60103fc96",
        featured: false,
    },
    SeedProduct {
        name: "Geometric Pillow Covers",
        description: "Modern geometric patterns on premium fabric blend",
        price: "24.99",
        category: Category::PillowCovers,
        material: "Cotton Blend",
        photo: "1586023492125-27b2c045efd7",
        featured: true,
    },
    SeedProduct {
        name: "Silk Pillowcase",
        description: "100% mulberry silk, gentle on hair and skin",
        price: "49.99",
        category: Category::PillowCovers,
        material: "Silk",
        photo: "1522771739844-6a9f6d5f14af",
        featured: true,
    },
    SeedProduct {
        name: "Linen Pillow Shams",
        description: "Natural linen with envelope closure, set of 2",
        price: "34.99",
        category: Category::PillowCovers,
        material: "Linen",
        photo: "1540932239986-30128078f3c5",
        featured: false,
    },
    SeedProduct {
        name: "Velvet Accent Pillows",
        description: "Luxurious velvet texture with hidden zipper",
        price: "39.99",
        category: Category::PillowCovers,
        material: "Velvet",
        photo: "1505693416388-ac5ce068fe85",
        featured: false,
    },
    SeedProduct {
        name: "Embroidered Cushion Covers",
        description: "Hand-embroidered designs on soft cotton",
        price: "29.99",
        category: Category::PillowCovers,
        material: "Cotton",
        photo: "1521783988139-89397d761dce",
        featured: false,
    },
    SeedProduct {
        name: "Memory Foam Pillow Set",
        description: "Cooling gel memory foam with bamboo cover",
        price: "59.99",
        category: Category::PillowCovers,
        material: "Bamboo",
        photo: "1555041469-a586c61ea9bc",
        featured: false,
    },
    SeedProduct {
        name: "Linen Table Runner",
        description: "Natural linen table runner with sophisticated style",
        price: "39.99",
        category: Category::TableCovers,
        material: "Linen",
        photo: "1600494603989-9650cf6ddd3d",
        featured: true,
    },
    SeedProduct {
        name: "Elegant Tablecloth",
        description: "Premium cotton tablecloth with stain resistance",
        price: "54.99",
        category: Category::TableCovers,
        material: "Cotton",
        photo: "1578662996442-48f60103fc96",
        featured: false,
    },
    SeedProduct {
        name: "Placemat Set",
        description: "Woven placemats with matching napkins, set of 6",
        price: "29.99",
        category: Category::TableCovers,
        material: "Cotton Blend",
        photo: "1540932239986-30128078f3c5",
        featured: false,
    },
    SeedProduct {
        name: "Waterproof Table Cover",
        description: "Durable waterproof material with elegant design",
        price: "44.99",
        category: Category::TableCovers,
        material: "Vinyl",
        photo: "1521783988139-89397d761dce",
        featured: false,
    },
    SeedProduct {
        name: "Holiday Table Runner",
        description: "Festive patterns perfect for special occasions",
        price: "34.99",
        category: Category::TableCovers,
        material: "Cotton",
        photo: "1505693416388-ac5ce068fe85",
        featured: false,
    },
    SeedProduct {
        name: "Dining Table Protector",
        description: "Clear protective cover with non-slip backing",
        price: "24.99",
        category: Category::TableCovers,
        material: "Clear Vinyl",
        photo: "1522771739844-6a9f6d5f14af",
        featured: false,
    },
];

/// Inserts the demo catalog when the products table is empty. Returns how many rows were added.
pub async fn seed_catalog(pool: &SqlitePool) -> Result<usize, StoreError> {
    let repo = ProductRepository::new(pool);
    if repo.count().await? > 0 {
        tracing::info!("Catalog already seeded, skipping");
        return Ok(0);
    }

    for item in CATALOG.iter() {
        repo.create(&item.to_new_product()?).await?;
    }

    tracing::info!("Seeded {} products", CATALOG.len());
    Ok(CATALOG.len())
}

/// Creates the configured bootstrap admin if no account with that name exists.
pub async fn ensure_bootstrap_admin(pool: &SqlitePool, cfg: &AdminConfig) -> Result<bool, StoreError> {
    let Some(username) = cfg.bootstrap_username.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(false);
    };
    let Some(password) = cfg.bootstrap_password.as_deref() else {
        return Ok(false);
    };

    match AdminRepository::new(pool).create(username, password, cfg.bootstrap_email.as_deref()).await {
        Ok(admin) => {
            tracing::info!(admin_id = admin.id, %username, "Bootstrap admin created; change its password after first login");
            Ok(true)
        }
        Err(StoreError::Conflict(_)) => {
            tracing::info!(%username, "Bootstrap admin already exists");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
