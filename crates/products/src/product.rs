use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use stockroom_core::validate::required_text;
use stockroom_core::{DomainError, DomainResult, ListField, ProductId, SortSpec};

const MAX_TEXT_LEN: usize = 100;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Unit price; always finite and positive.
    pub price: f64,
    /// Units in stock; never negative.
    pub quantity: i64,
}

fn check_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::validation("Price must be a positive number"));
    }
    Ok(())
}

fn check_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation("Quantity must be greater than or equal to 0"));
    }
    Ok(())
}

/// Input: create a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        required_text("Name", &self.name, MAX_TEXT_LEN)?;
        required_text("Category", &self.category, MAX_TEXT_LEN)?;
        check_price(self.price)?;
        check_quantity(self.quantity)
    }

    /// Validate and assign a fresh id.
    pub fn into_product(self) -> DomainResult<Product> {
        self.validate()?;
        Ok(Product {
            id: ProductId::new(),
            name: self.name,
            category: self.category,
            price: self.price,
            quantity: self.quantity,
        })
    }
}

/// Input: partial update. Price changes go through [`ChangePrice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl UpdateProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            required_text("Name", name, MAX_TEXT_LEN)?;
        }
        if let Some(category) = &self.category {
            required_text("Category", category, MAX_TEXT_LEN)?;
        }
        if let Some(quantity) = self.quantity {
            check_quantity(quantity)?;
        }
        Ok(())
    }

    pub fn apply_to(self, product: &mut Product) -> DomainResult<()> {
        self.validate()?;
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        Ok(())
    }
}

/// Input: set a new unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePrice {
    #[serde(alias = "newPrice")]
    pub price: f64,
}

impl ChangePrice {
    pub fn validate(&self) -> DomainResult<()> {
        check_price(self.price)
    }
}

/// Response shape for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            category: p.category,
            price: p.price,
            quantity: p.quantity,
        }
    }
}

/// Fields accepted by `search` and `sort` on the product list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProductField {
    Name,
    Category,
    Price,
    Quantity,
}

impl ProductField {
    /// Column / JSON name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Category => "category",
            Self::Price => "price",
            Self::Quantity => "quantity",
        }
    }

    /// Text value of a searchable field.
    pub fn text(self, product: &Product) -> Option<&str> {
        match self {
            Self::Name => Some(&product.name),
            Self::Category => Some(&product.category),
            Self::Price | Self::Quantity => None,
        }
    }

    /// Ascending comparison of two products on this field.
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::Category => a.category.cmp(&b.category),
            Self::Price => a.price.total_cmp(&b.price),
            Self::Quantity => a.quantity.cmp(&b.quantity),
        }
    }
}

impl ListField for ProductField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "category" => Some(Self::Category),
            "price" => Some(Self::Price),
            "quantity" => Some(Self::Quantity),
            _ => None,
        }
    }

    fn is_searchable(self) -> bool {
        matches!(self, Self::Name | Self::Category)
    }

    fn default_sort() -> SortSpec<Self> {
        SortSpec::asc(Self::Name)
    }
}
