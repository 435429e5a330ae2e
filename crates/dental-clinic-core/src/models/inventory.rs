//! Stock items for the implant, surgery and restorative inventories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImplantItem {
    pub id: String,
    #[serde(rename = "type")]
    pub implant_type: String,
    pub length_mm: Option<f64>,
    pub diameter_mm: Option<f64>,
    pub quantity: i64,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurgeryItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestorativeItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
