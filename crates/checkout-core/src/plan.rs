//! Plans and Pricing

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::money::MajorAmount;

/// Product name shown on the provider's checkout page
pub const PRODUCT_NAME: &str = "Zero Cost Website";

/// Plan a visitor can buy from the landing page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Plan {
    Monthly,
    Annual,
    /// Low-value plan for exercising live checkout end to end
    Test,
    /// Any other label sent by the front end; needs an explicit amount
    Custom(String),
}

impl Plan {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensal" => Self::Monthly,
            "annual" | "yearly" | "anual" => Self::Annual,
            "test" | "teste" => Self::Test,
            _ => Self::Custom(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
            Self::Test => "test",
            Self::Custom(name) => name,
        }
    }

    /// Listed price, if the plan has one
    pub fn default_amount(&self) -> Option<MajorAmount> {
        match self {
            Self::Monthly => Some(MajorAmount::new(dec!(89.90))),
            Self::Annual => Some(MajorAmount::new(dec!(899.00))),
            Self::Test => Some(MajorAmount::new(dec!(1.00))),
            Self::Custom(_) => None,
        }
    }

    /// Human-readable line-item description
    pub fn description(&self) -> String {
        match self {
            Self::Monthly => format!("{PRODUCT_NAME} - Monthly plan"),
            Self::Annual => format!("{PRODUCT_NAME} - Annual plan"),
            Self::Test => format!("{PRODUCT_NAME} - Test payment"),
            Self::Custom(name) => format!("{PRODUCT_NAME} - {name}"),
        }
    }
}

impl From<String> for Plan {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Plan> for String {
    fn from(value: Plan) -> Self {
        value.as_str().to_string()
    }
}
