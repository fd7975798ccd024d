use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{CategoryId, ProductId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    OnSale,
    Reserved,
    SoldOut,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnSale => "ON_SALE",
            Self::Reserved => "RESERVED",
            Self::SoldOut => "SOLD_OUT",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ON_SALE" => Ok(Self::OnSale),
            "RESERVED" => Ok(Self::Reserved),
            "SOLD_OUT" => Ok(Self::SoldOut),
            other => Err(DomainError::invalid_argument(
                "product_status",
                format!("unknown status {other}"),
            )),
        }
    }
}

/// 商品。聊天室与点赞只需要它的存在性和卖家。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub price: i64,
    pub status: ProductStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub seller_id: UserId,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub price: i64,
    pub created_at: Timestamp,
}

impl NewProduct {
    pub fn new(
        seller_id: UserId,
        category_id: Option<CategoryId>,
        title: impl Into<String>,
        price: i64,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty"));
        }
        if price < 0 {
            return Err(DomainError::invalid_argument("price", "cannot be negative"));
        }
        Ok(Self {
            seller_id,
            category_id,
            title,
            price,
            created_at,
        })
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            seller_id: self.seller_id,
            category_id: self.category_id,
            title: self.title,
            price: self.price,
            status: ProductStatus::default(),
            created_at: self.created_at,
        }
    }
}
