use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Product categories, serialized exactly as the mobile client sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Books,
    Sports,
    Toys,
    Others,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Fashion => "Fashion",
            Category::Home => "Home",
            Category::Books => "Books",
            Category::Sports => "Sports",
            Category::Toys => "Toys",
            Category::Others => "Others",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Electronics" => Ok(Category::Electronics),
            "Fashion" => Ok(Category::Fashion),
            "Home" => Ok(Category::Home),
            "Books" => Ok(Category::Books),
            "Sports" => Ok(Category::Sports),
            "Toys" => Ok(Category::Toys),
            "Others" => Ok(Category::Others),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Available,
    Exchanged,
    Pending,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Exchanged => "exchanged",
            ProductStatus::Pending => "pending",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ProductStatus::Available),
            "exchanged" => Ok(ProductStatus::Exchanged),
            "pending" => Ok(ProductStatus::Pending),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Split a comma-separated wanted-items string into trimmed, non-empty parts.
pub fn split_wanted_items(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
