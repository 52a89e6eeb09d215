use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Product categories sold by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Bedsheets,
    PillowCovers,
    TableCovers,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Bedsheets, Category::PillowCovers, Category::TableCovers];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Bedsheets => "bedsheets",
            Category::PillowCovers => "pillow-covers",
            Category::TableCovers => "table-covers",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
    pub material: String,
    pub image_url: String,
    pub in_stock: bool,
    pub featured: bool,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
    pub material: String,
    pub image_url: String,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update for a product. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
    pub material: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
}

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_MATERIAL_LEN: usize = 100;
const MAX_URL_LEN: usize = 2048;

fn require_text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::validation(field, format!("must be at most {} characters", max)));
    }
    Ok(trimmed.to_string())
}

/// Normalizes a price to the stored `(10, 2)` shape.
pub fn normalize_price(price: Decimal) -> AppResult<Decimal> {
    if price <= Decimal::ZERO {
        return Err(AppError::validation("price", "must be greater than zero"));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::validation("price", "must have at most two decimal places"));
    }
    if price >= Decimal::from(100_000_000) {
        return Err(AppError::validation("price", "must be below 100000000"));
    }
    let mut p = price;
    p.rescale(2);
    Ok(p)
}

fn validate_image_url(url: &str) -> AppResult<String> {
    let url = require_text("imageUrl", url, MAX_URL_LEN)?;
    if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
        return Err(AppError::validation("imageUrl", "must be an http(s) URL or an absolute path"));
    }
    Ok(url)
}

impl NewProduct {
    /// Trims and checks every field, returning the normalized product.
    pub fn validated(self) -> AppResult<NewProduct> {
        Ok(NewProduct {
            name: require_text("name", &self.name, MAX_NAME_LEN)?,
            description: require_text("description", &self.description, MAX_DESCRIPTION_LEN)?,
            price: normalize_price(self.price)?,
            category: self.category,
            material: require_text("material", &self.material, MAX_MATERIAL_LEN)?,
            image_url: validate_image_url(&self.image_url)?,
            in_stock: self.in_stock,
            featured: self.featured,
        })
    }
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.material.is_none()
            && self.image_url.is_none()
            && self.in_stock.is_none()
            && self.featured.is_none()
    }

    /// Applies the patch on top of `product`, validating every changed field.
    pub fn apply_to(self, product: Product) -> AppResult<Product> {
        Ok(Product {
            id: product.id,
            name: match self.name {
                Some(v) => require_text("name", &v, MAX_NAME_LEN)?,
                None => product.name,
            },
            description: match self.description {
                Some(v) => require_text("description", &v, MAX_DESCRIPTION_LEN)?,
                None => product.description,
            },
            price: match self.price {
                Some(v) => normalize_price(v)?,
                None => product.price,
            },
            category: self.category.unwrap_or(product.category),
            material: match self.material {
                Some(v) => require_text("material", &v, MAX_MATERIAL_LEN)?,
                None => product.material,
            },
            image_url: match self.image_url {
                Some(v) => validate_image_url(&v)?,
                None => product.image_url,
            },
            in_stock: self.in_stock.unwrap_or(product.in_stock),
            featured: self.featured.unwrap_or(product.featured),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub session_id: String,
}

/// Cart row joined with its product, as rendered by the cart drawer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
}

pub const MAX_QUANTITY: i64 = 999;

pub fn validate_quantity(quantity: i64) -> AppResult<i64> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(AppError::BadRequest(format!(
            "Quantity must be a positive number no greater than {}",
            MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: i64,
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// An administrator account, without its password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Admin> for AdminSummary {
    fn from(admin: Admin) -> Self {
        Self { id: admin.id, username: admin.username, email: admin.email, last_login: admin.last_login }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub session_id: String,
    pub admin: AdminSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NewProduct {
        serde_json::from_value(json!({
            "name": "  Silk Pillowcase ",
            "description": "100% mulberry silk",
            "price": "49.9",
            "category": "pillow-covers",
            "material": "Silk",
            "imageUrl": "https://images.unsplash.com/photo-1"
        }))
        .unwrap()
    }

    #[test]
    fn new_product_defaults_and_normalization() {
        let p = sample().validated().unwrap();
        assert_eq!(p.name, "Silk Pillowcase");
        assert_eq!(p.price.to_string(), "49.90");
        assert!(p.in_stock);
        assert!(!p.featured);
        assert_eq!(p.category, Category::PillowCovers);
    }

    #[test]
    fn price_accepts_numbers_and_rejects_bad_values() {
        let p: NewProduct = serde_json::from_value(json!({
            "name": "Runner", "description": "d", "price": 39.99,
            "category": "table-covers", "material": "Linen", "imageUrl": "/img/runner.jpg"
        }))
        .unwrap();
        assert_eq!(p.validated().unwrap().price.to_string(), "39.99");

        assert!(normalize_price(Decimal::ZERO).is_err());
        assert!(normalize_price(Decimal::new(-100, 2)).is_err());
        assert!(normalize_price(Decimal::new(12345, 3)).is_err());
        assert!(normalize_price(Decimal::new(1_000_000_000, 1)).is_err());
        assert_eq!(normalize_price(Decimal::new(12340, 3)).unwrap().to_string(), "12.34");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let res: Result<NewProduct, _> = serde_json::from_value(json!({
            "name": "x", "description": "d", "price": "1.00",
            "category": "curtains", "material": "m", "imageUrl": "/x.jpg"
        }));
        assert!(res.is_err());
        assert!("curtains".parse::<Category>().is_err());
        assert_eq!("table-covers".parse::<Category>().unwrap(), Category::TableCovers);
    }

    #[test]
    fn blank_fields_and_bad_urls_fail_validation() {
        let mut p = sample();
        p.name = "   ".into();
        assert!(p.validated().is_err());

        let mut p = sample();
        p.image_url = "javascript-free-but-not-a-url".into();
        assert!(p.validated().is_err());
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let original = Product {
            id: 7,
            name: "Linen Table Runner".into(),
            description: "Natural linen".into(),
            price: Decimal::new(3999, 2),
            category: Category::TableCovers,
            material: "Linen".into(),
            image_url: "/runner.jpg".into(),
            in_stock: true,
            featured: true,
        };
        let patch = ProductPatch { price: Some(Decimal::new(2999, 2)), in_stock: Some(false), ..Default::default() };
        assert!(!patch.is_empty());
        let updated = patch.apply_to(original.clone()).unwrap();
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.price.to_string(), "29.99");
        assert!(!updated.in_stock);
        assert!(updated.featured);
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn product_serializes_camel_case_with_string_price() {
        let p = Product {
            id: 1,
            name: "Premium Cotton Sheets".into(),
            description: "d".into(),
            price: Decimal::new(8999, 2),
            category: Category::Bedsheets,
            material: "Cotton".into(),
            image_url: "/a.jpg".into(),
            in_stock: true,
            featured: false,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["price"], "89.99");
        assert_eq!(v["imageUrl"], "/a.jpg");
        assert_eq!(v["inStock"], true);
        assert_eq!(v["category"], "bedsheets");
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
    }
}
