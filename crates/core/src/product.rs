use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One priced line item recognized on a menu.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Nearest heading above this product, or empty when none was seen yet.
    pub category: String,
    /// Price text exactly as matched, e.g. `7,50€` or `8.50`.
    pub price: String,
}

impl Product {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Product {
            name: name.into(),
            category: category.into(),
            price: price.into(),
        }
    }

    pub fn get(&self, field: ProductField) -> &str {
        match field {
            ProductField::Category => &self.category,
            ProductField::Name => &self.name,
            ProductField::Price => &self.price,
        }
    }

    pub fn set(&mut self, field: ProductField, value: impl Into<String>) {
        let slot = match field {
            ProductField::Category => &mut self.category,
            ProductField::Name => &mut self.name,
            ProductField::Price => &mut self.price,
        };
        *slot = value.into();
    }
}

/// The editable fields of a [`Product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    Category,
    Name,
    Price,
}

impl ProductField {
    pub const ALL: [ProductField; 3] =
        [ProductField::Category, ProductField::Name, ProductField::Price];
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductField::Category => write!(f, "category"),
            ProductField::Name => write!(f, "name"),
            ProductField::Price => write!(f, "price"),
        }
    }
}

impl std::str::FromStr for ProductField {
    type Err = EditError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(ProductField::Category),
            "name" => Ok(ProductField::Name),
            "price" => Ok(ProductField::Price),
            other => Err(EditError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Unknown product field: '{0}'")]
    UnknownField(String),
    #[error("Row {index} out of range ({len} products)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A correction to one cell, keyed the way the editing grid sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    pub index: usize,
    pub field: String,
    pub value: String,
}

/// Products held for manual correction between extraction and export.
///
/// Edits overwrite a single field in place; rows are never reordered and the
/// source text is never re-extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductSheet {
    products: Vec<Product>,
}

impl ProductSheet {
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn set(
        &mut self,
        index: usize,
        field: ProductField,
        value: impl Into<String>,
    ) -> Result<(), EditError> {
        let len = self.products.len();
        let product = self
            .products
            .get_mut(index)
            .ok_or(EditError::IndexOutOfRange { index, len })?;
        product.set(field, value);
        Ok(())
    }

    /// Same as [`ProductSheet::set`] with the field given by its key.
    pub fn set_by_key(&mut self, index: usize, key: &str, value: impl Into<String>) -> Result<(), EditError> {
        let field = key.parse::<ProductField>()?;
        self.set(index, field, value)
    }

    /// Apply `edits` in order, stopping at the first one that does not fit.
    pub fn apply(&mut self, edits: &[CellEdit]) -> Result<(), EditError> {
        for edit in edits {
            self.set_by_key(edit.index, &edit.field, edit.value.as_str())?;
        }
        Ok(())
    }
}

impl From<Vec<Product>> for ProductSheet {
    fn from(products: Vec<Product>) -> Self {
        ProductSheet { products }
    }
}
