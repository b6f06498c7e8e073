// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Product listing records and field-level warnings.

use serde::{Deserialize, Serialize};

/// One product listing, accumulated across both scrape phases.
///
/// Phase one fills `name`, `price`, `image_url` and `detail_reference`.
/// Phase two fills `merchant` and `rating` independently; either may stay
/// `None` when its lookup fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "ImageURL")]
    pub image_url: String,
    /// Directly navigable detail-page URL (never a redirect wrapper).
    #[serde(rename = "DetailProdukURL")]
    pub detail_reference: String,
    #[serde(rename = "Merchant")]
    pub merchant: Option<String>,
    #[serde(rename = "Rating")]
    pub rating: Option<String>,
}

impl Record {
    /// Build a record from its phase-one fields.
    pub fn listing(
        name: impl Into<String>,
        price: impl Into<String>,
        image_url: impl Into<String>,
        detail_reference: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            image_url: image_url.into(),
            detail_reference: detail_reference.into(),
            merchant: None,
            rating: None,
        }
    }

    /// True when both detail fields were filled.
    pub fn is_fully_enriched(&self) -> bool {
        self.merchant.is_some() && self.rating.is_some()
    }
}

/// A named column of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Price,
    ImageUrl,
    DetailReference,
    Merchant,
    Rating,
}

impl Field {
    /// Column order of the output file.
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::Price,
        Field::ImageUrl,
        Field::DetailReference,
        Field::Merchant,
        Field::Rating,
    ];

    /// Header text used for this column.
    pub fn header(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Price => "Price",
            Self::ImageUrl => "ImageURL",
            Self::DetailReference => "DetailProdukURL",
            Self::Merchant => "Merchant",
            Self::Rating => "Rating",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// A recoverable miss while enriching one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWarning {
    pub field: Field,
    pub reason: String,
}
