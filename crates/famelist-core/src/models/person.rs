use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::contains_ignore_case;

/// Catalog category a person is filed under.
///
/// The recognized tags form a closed set. Anything else is kept verbatim in
/// `Unknown` so a dataset round-trips through the cache unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Media,
    Fame,
    Mid,
    Small,
    Bomg,
    Product,
    Admin,
    Coder,
    Other,
    Unknown(String),
}

impl Category {
    /// Every recognized category, in display order.
    pub const RECOGNIZED: [Category; 9] = [
        Category::Media,
        Category::Fame,
        Category::Mid,
        Category::Small,
        Category::Bomg,
        Category::Product,
        Category::Admin,
        Category::Coder,
        Category::Other,
    ];

    /// Parse a raw tag. Matching is exact, like the tags stored in the data file.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "media" => Category::Media,
            "fame" => Category::Fame,
            "mid" => Category::Mid,
            "small" => Category::Small,
            "bomg" => Category::Bomg,
            "product" => Category::Product,
            "admin" => Category::Admin,
            "coder" => Category::Coder,
            "other" => Category::Other,
            other => Category::Unknown(other.to_string()),
        }
    }

    /// The wire tag for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Media => "media",
            Category::Fame => "fame",
            Category::Mid => "mid",
            Category::Small => "small",
            Category::Bomg => "bomg",
            Category::Product => "product",
            Category::Admin => "admin",
            Category::Coder => "coder",
            Category::Other => "other",
            Category::Unknown(tag) => tag,
        }
    }

    /// Human readable label. Unknown categories show their raw tag.
    pub fn label(&self) -> &str {
        match self {
            Category::Media => "Media",
            Category::Fame => "Fame",
            Category::Mid => "Mid fame",
            Category::Small => "Small fame",
            Category::Bomg => "Bums/Scam",
            Category::Product => "Products",
            Category::Admin => "Admins",
            Category::Coder => "Coders",
            Category::Other => "Other",
            Category::Unknown(tag) => tag,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Category::Unknown(_))
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        match Category::parse(&tag) {
            // Reuse the allocation we were handed
            Category::Unknown(_) => Category::Unknown(tag),
            known => known,
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category restriction used by searches. `all` disables the restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => CategoryFilter::All,
            tag => CategoryFilter::Only(Category::parse(tag)),
        })
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Person {
    pub id: i64,
    pub name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub category: Category,
    #[serde(default)]
    pub info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(rename = "badgeText", default, skip_serializing_if = "Option::is_none")]
    pub badge_text: Option<String>,
    /// Price tier label to price, in file order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(type = "Record<string, string | number> | null"))]
    pub prices: Option<Map<String, Value>>,
}

impl Person {
    /// Minimal record with only the required fields set.
    pub fn new(id: i64, name: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            info: String::new(),
            img: None,
            channel: None,
            dm: None,
            seller: None,
            badge: None,
            badge_text: None,
            prices: None,
        }
    }

    /// Case-insensitive substring match against name and bio.
    /// `query` should already be lowercased.
    pub fn matches_query(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query) || contains_ignore_case(&self.info, query)
    }

    /// Price list as display lines, e.g. `POST: 500`.
    pub fn price_lines(&self) -> Vec<String> {
        let Some(ref prices) = self.prices else {
            return Vec::new();
        };
        prices
            .iter()
            .map(|(tier, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{}: {}", tier.to_uppercase(), value)
            })
            .collect()
    }

    pub fn badge_display(&self) -> &str {
        self.badge_text.as_deref().unwrap_or("")
    }
}
