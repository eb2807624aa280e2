//! Shop catalog feeds.
//!
//! A shop refreshes its catalog by uploading a feed document:
//!
//! ```yaml
//! shop: Связной
//! url: https://www.svyaznoy.ru
//! categories:
//!   - id: 224
//!     name: Смартфоны
//! goods:
//!   - id: 4216292
//!     category: 224
//!     model: apple/iphone/xs-max
//!     name: Смартфон Apple iPhone XS Max 512GB (золотистый)
//!     price: 110000
//!     price_rrc: 116990
//!     quantity: 14
//!     parameters:
//!       "Диагональ (дюйм)": 6.5
//!       Цвет: золотистый
//! ```
//!
//! [`FeedDocument`] is the parsed shape; every field that a shop can get
//! wrong is optional here so [`FeedDocument::into_plan`] can report it by
//! name instead of failing deserialization. The resulting [`IngestionPlan`]
//! is fully validated and is what the stores apply atomically.

use core::fmt;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Price;
use crate::validation::{FieldError, ValidationErrors};

/// Maximum length of a shop name.
pub const SHOP_NAME_MAX: usize = 50;
/// Maximum length of a category name.
pub const CATEGORY_NAME_MAX: usize = 50;
/// Maximum length of a product name.
pub const PRODUCT_NAME_MAX: usize = 50;
/// Maximum length of a listing model.
pub const MODEL_MAX: usize = 50;
/// Maximum length of a parameter name.
pub const PARAMETER_NAME_MAX: usize = 60;
/// Maximum length of a parameter value.
pub const PARAMETER_VALUE_MAX: usize = 50;

/// Size limits applied while planning an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    /// Maximum number of goods in one feed.
    pub max_goods: usize,
    /// Maximum number of parameters on one good.
    pub max_parameters: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            max_goods: 10_000,
            max_parameters: 64,
        }
    }
}

/// A catalog feed as uploaded by a shop.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub shop: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub categories: Vec<FeedCategory>,
    #[serde(default)]
    pub goods: Vec<FeedGood>,
}

/// A category declared by the feed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedCategory {
    /// Feed-local id that goods may refer to.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

/// How a good names its category: by feed-local id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(i64),
    Name(String),
}

/// A parameter value. Feeds carry numbers unquoted, so all scalars are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// One good (future listing) in the feed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedGood {
    /// The shop's own id for the good.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub price_rrc: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Why a feed was rejected. Nothing is written when planning fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The shop header or the category list is invalid.
    #[error("invalid feed header: {0}")]
    Header(ValidationErrors),
    /// The feed carries more goods than allowed.
    #[error("feed has {count} goods, the limit is {max}")]
    TooManyGoods { count: usize, max: usize },
    /// The first invalid good, with all of its offending fields.
    #[error("invalid good #{index} ({name}): {errors}")]
    Good {
        index: usize,
        name: String,
        errors: ValidationErrors,
    },
}

impl FeedError {
    /// Field-level details, empty for size-limit failures.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Header(errors) | Self::Good { errors, .. } => errors.errors(),
            Self::TooManyGoods { .. } => &[],
        }
    }
}

/// A validated feed, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionPlan {
    pub shop: String,
    pub url: Option<String>,
    /// Distinct category names in feed order.
    pub categories: Vec<String>,
    pub goods: Vec<PlannedListing>,
}

/// A validated good. `category` is always one of the plan's categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedListing {
    pub external_id: i64,
    pub category: String,
    pub name: String,
    pub model: String,
    pub price: Price,
    pub price_rrc: Price,
    pub quantity: i32,
    /// `(name, value)` pairs with distinct names.
    pub parameters: Vec<(String, String)>,
}

impl PlannedListing {
    /// Identity of the listing within a shop across runs.
    #[must_use]
    pub fn natural_key(&self) -> (&str, &str, i64) {
        (&self.name, &self.category, self.external_id)
    }
}

impl FeedDocument {
    /// Validate the feed into an [`IngestionPlan`].
    ///
    /// Every good binds to the category it declares itself. Planning stops
    /// at the first invalid good.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] naming the header fields or the good at fault.
    pub fn into_plan(self, limits: &FeedLimits) -> Result<IngestionPlan, FeedError> {
        if self.goods.len() > limits.max_goods {
            return Err(FeedError::TooManyGoods {
                count: self.goods.len(),
                max: limits.max_goods,
            });
        }

        let mut header = ValidationErrors::new();
        let shop = header.text("shop", Some(&self.shop), true, SHOP_NAME_MAX);
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .and_then(|url| match Url::parse(url) {
                Ok(parsed) if parsed.has_host() => Some(url.to_owned()),
                _ => {
                    header.push("url", "must be an absolute URL");
                    None
                }
            });

        let mut categories: Vec<String> = Vec::new();
        let mut by_id: HashMap<i64, String> = HashMap::new();
        for (index, category) in self.categories.iter().enumerate() {
            let field = format!("categories[{index}].name");
            let Some(name) = header.text(&field, Some(&category.name), true, CATEGORY_NAME_MAX)
            else {
                continue;
            };
            if let Some(id) = category.id {
                match by_id.get(&id) {
                    Some(existing) if *existing != name => {
                        header.push(
                            format!("categories[{index}].id"),
                            format!("id {id} is already used by category {existing}"),
                        );
                    }
                    _ => {
                        by_id.insert(id, name.clone());
                    }
                }
            }
            if !categories.contains(&name) {
                categories.push(name);
            }
        }

        let Some(shop) = shop else {
            return Err(FeedError::Header(header));
        };
        if !header.is_empty() {
            return Err(FeedError::Header(header));
        }

        let mut seen = HashSet::new();
        let mut goods = Vec::with_capacity(self.goods.len());
        for (index, good) in self.goods.into_iter().enumerate() {
            let label = good
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or("<unnamed>")
                .to_owned();
            let planned = plan_good(index, good, &categories, &by_id, limits)
                .map_err(|errors| FeedError::Good {
                    index,
                    name: label.clone(),
                    errors,
                })?;

            let key = (
                planned.name.clone(),
                planned.category.clone(),
                planned.external_id,
            );
            if !seen.insert(key) {
                return Err(FeedError::Good {
                    index,
                    name: label,
                    errors: ValidationErrors::single(
                        format!("goods[{index}].id"),
                        "duplicates another good with the same name, category and id",
                    ),
                });
            }
            goods.push(planned);
        }

        Ok(IngestionPlan {
            shop,
            url,
            categories,
            goods,
        })
    }
}

fn plan_good(
    index: usize,
    good: FeedGood,
    categories: &[String],
    by_id: &HashMap<i64, String>,
    limits: &FeedLimits,
) -> Result<PlannedListing, ValidationErrors> {
    let prefix = format!("goods[{index}]");
    let mut errors = ValidationErrors::new();

    let name = errors.text(
        &format!("{prefix}.name"),
        good.name.as_deref(),
        true,
        PRODUCT_NAME_MAX,
    );
    let model = errors.text(
        &format!("{prefix}.model"),
        good.model.as_deref(),
        false,
        MODEL_MAX,
    );
    let external_id = errors.non_negative(&format!("{prefix}.id"), good.id);
    let price = errors
        .non_negative(&format!("{prefix}.price"), good.price)
        .and_then(Price::new);
    let price_rrc = errors
        .non_negative(&format!("{prefix}.price_rrc"), good.price_rrc)
        .and_then(Price::new);
    let quantity = errors
        .non_negative(&format!("{prefix}.quantity"), good.quantity)
        .and_then(|q| {
            let fitted = i32::try_from(q).ok();
            if fitted.is_none() {
                errors.push(format!("{prefix}.quantity"), "is too large");
            }
            fitted
        });

    let category = match &good.category {
        None => {
            errors.push(format!("{prefix}.category"), "this field is required");
            None
        }
        Some(CategoryRef::Id(id)) => {
            let resolved = by_id.get(id).cloned();
            if resolved.is_none() {
                errors.push(
                    format!("{prefix}.category"),
                    format!("category id {id} is not declared in the feed"),
                );
            }
            resolved
        }
        Some(CategoryRef::Name(name)) => {
            let name = name.trim();
            let resolved = categories.iter().find(|c| c.as_str() == name).cloned();
            if resolved.is_none() {
                errors.push(
                    format!("{prefix}.category"),
                    format!("category {name} is not declared in the feed"),
                );
            }
            resolved
        }
    };

    if good.parameters.len() > limits.max_parameters {
        errors.push(
            format!("{prefix}.parameters"),
            format!("at most {} parameters are allowed", limits.max_parameters),
        );
    }
    let mut parameters = Vec::with_capacity(good.parameters.len());
    let mut parameter_names = HashSet::new();
    for (key, value) in &good.parameters {
        let field = format!("{prefix}.parameters.{key}");
        let Some(name) = errors.text(&field, Some(key), true, PARAMETER_NAME_MAX) else {
            continue;
        };
        let Some(value) = errors.text(&field, Some(&value.to_string()), false, PARAMETER_VALUE_MAX)
        else {
            continue;
        };
        if parameter_names.insert(name.clone()) {
            parameters.push((name, value));
        } else {
            errors.push(field, "duplicate parameter name");
        }
    }

    match (name, model, external_id, price, price_rrc, quantity, category) {
        (
            Some(name),
            Some(model),
            Some(external_id),
            Some(price),
            Some(price_rrc),
            Some(quantity),
            Some(category),
        ) if errors.is_empty() => Ok(PlannedListing {
            external_id,
            category,
            name,
            model,
            price,
            price_rrc,
            quantity,
            parameters,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn good(id: i64, category: CategoryRef, name: &str) -> FeedGood {
        FeedGood {
            id: Some(id),
            category: Some(category),
            model: Some("m".to_owned()),
            name: Some(name.to_owned()),
            price: Some(100),
            price_rrc: Some(120),
            quantity: Some(3),
            parameters: BTreeMap::new(),
        }
    }

    fn feed() -> FeedDocument {
        FeedDocument {
            shop: "Связной".to_owned(),
            url: Some("https://www.svyaznoy.ru".to_owned()),
            categories: vec![
                FeedCategory {
                    id: Some(224),
                    name: "Смартфоны".to_owned(),
                },
                FeedCategory {
                    id: Some(15),
                    name: "Аксессуары".to_owned(),
                },
            ],
            goods: vec![
                good(1, CategoryRef::Id(224), "Phone"),
                good(2, CategoryRef::Id(15), "Case"),
                good(3, CategoryRef::Name("Смартфоны".to_owned()), "Phone Max"),
            ],
        }
    }

    #[test]
    fn test_each_good_keeps_its_own_category() {
        let plan = feed().into_plan(&FeedLimits::default()).unwrap();
        let categories: Vec<_> = plan.goods.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, ["Смартфоны", "Аксессуары", "Смартфоны"]);
    }

    #[test]
    fn test_missing_numbers_name_the_good() {
        let mut doc = feed();
        doc.goods[1].price = None;
        doc.goods[1].quantity = None;
        let err = doc.into_plan(&FeedLimits::default()).unwrap_err();
        let FeedError::Good {
            index,
            name,
            errors,
        } = err
        else {
            panic!("expected a good error");
        };
        assert_eq!(index, 1);
        assert_eq!(name, "Case");
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["goods[1].price", "goods[1].quantity"]);
    }

    #[test]
    fn test_undeclared_category_rejected() {
        let mut doc = feed();
        doc.goods[0].category = Some(CategoryRef::Id(999));
        let err = doc.into_plan(&FeedLimits::default()).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "goods[0].category");
    }

    #[test]
    fn test_duplicate_natural_key_rejected() {
        let mut doc = feed();
        doc.goods.push(good(1, CategoryRef::Id(224), "Phone"));
        let err = doc.into_plan(&FeedLimits::default()).unwrap_err();
        assert!(matches!(err, FeedError::Good { index: 3, .. }));
    }

    #[test]
    fn test_header_errors() {
        let mut doc = feed();
        doc.shop = "  ".to_owned();
        doc.url = Some("not a url".to_owned());
        let err = doc.into_plan(&FeedLimits::default()).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["shop", "url"]);
    }

    #[test]
    fn test_limits() {
        let limits = FeedLimits {
            max_goods: 2,
            max_parameters: 1,
        };
        assert_eq!(
            feed().into_plan(&limits).unwrap_err(),
            FeedError::TooManyGoods { count: 3, max: 2 }
        );

        let mut doc = feed();
        doc.goods.truncate(1);
        doc.goods[0]
            .parameters
            .insert("a".to_owned(), ParameterValue::Integer(1));
        doc.goods[0]
            .parameters
            .insert("b".to_owned(), ParameterValue::Integer(2));
        let err = doc.into_plan(&limits).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "goods[0].parameters");
    }

    #[test]
    fn test_parameter_values_are_stringified() {
        let json = r#"{"shop":"S","categories":[{"id":1,"name":"C"}],
            "goods":[{"id":7,"category":1,"name":"N","price":1,"price_rrc":2,"quantity":0,
            "parameters":{"Диагональ (дюйм)":6.5,"RAM":512,"Цвет":"золотистый"}}]}"#;
        let doc: FeedDocument = serde_json::from_str(json).unwrap();
        let plan = doc.into_plan(&FeedLimits::default()).unwrap();
        let params = &plan.goods[0].parameters;
        assert!(params.contains(&("Диагональ (дюйм)".to_owned(), "6.5".to_owned())));
        assert!(params.contains(&("RAM".to_owned(), "512".to_owned())));
        assert_eq!(plan.goods[0].model, "");
    }
}
