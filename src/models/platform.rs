//! Marketplace, operation and HTTP verb enumerations shared by runs and steps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace a run publishes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Vinted,
    Ebay,
    Etsy,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Vinted, Platform::Ebay, Platform::Etsy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vinted => "vinted",
            Self::Ebay => "ebay",
            Self::Etsy => "etsy",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vinted" => Ok(Self::Vinted),
            "ebay" => Ok(Self::Ebay),
            "etsy" => Ok(Self::Etsy),
            _ => Err(format!("Unsupported platform: {s}")),
        }
    }
}

/// Symbolic intent of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    PublishProduct,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublishProduct => crate::constants::PUBLISH_PRODUCT_OPERATION,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            crate::constants::PUBLISH_PRODUCT_OPERATION => Ok(Self::PublishProduct),
            _ => Err(format!("Unsupported operation: {s}")),
        }
    }
}

/// HTTP verb the executor must use for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Invalid HTTP method: {s}")),
        }
    }
}
