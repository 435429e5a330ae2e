//! Inventory item payloads.
//!
//! Creation requires the identifying field and a quantity; anything else
//! is optional. Patches change only the fields that are present.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::{optional_count, optional_number, optional_text, NumberInput, ValidationErrors, ValidationResult};
use crate::models::{new_id, timestamp_now, ImplantItem, RestorativeItem, SurgeryItem};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryInputError {
    #[error("Missing fields")]
    MissingFields,

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// A JSON body for one inventory collection.
pub trait InventoryInput: DeserializeOwned + Send + 'static {
    type Item;
    type Patch: InventoryPatch<Self::Item>;

    fn into_item(self) -> Result<Self::Item, InventoryInputError>;

    fn into_patch(self) -> ValidationResult<Self::Patch>;
}

pub trait InventoryPatch<T> {
    fn apply_to(self, item: &mut T);
}

fn required_count(
    errors: &mut ValidationErrors,
    value: Option<NumberInput>,
) -> Result<i64, InventoryInputError> {
    match value {
        None => Err(InventoryInputError::MissingFields),
        Some(NumberInput::Text(t)) if t.trim().is_empty() => Err(InventoryInputError::MissingFields),
        value => Ok(optional_count(errors, "quantity", value).unwrap_or(0)),
    }
}

fn required_label(value: Option<String>) -> Result<String, InventoryInputError> {
    optional_text(value).ok_or(InventoryInputError::MissingFields)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImplantInput {
    #[serde(rename = "type")]
    pub implant_type: Option<String>,
    pub length_mm: Option<NumberInput>,
    pub diameter_mm: Option<NumberInput>,
    pub quantity: Option<NumberInput>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplantPatch {
    pub implant_type: Option<String>,
    pub length_mm: Option<f64>,
    pub diameter_mm: Option<f64>,
    pub quantity: Option<i64>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
}

impl InventoryInput for ImplantInput {
    type Item = ImplantItem;
    type Patch = ImplantPatch;

    fn into_item(self) -> Result<ImplantItem, InventoryInputError> {
        let implant_type = required_label(self.implant_type)?;
        let mut errors = ValidationErrors::new();
        let quantity = required_count(&mut errors, self.quantity)?;
        let length_mm = optional_number(&mut errors, "lengthMm", self.length_mm);
        let diameter_mm = optional_number(&mut errors, "diameterMm", self.diameter_mm);
        let now = timestamp_now();
        let item = ImplantItem {
            id: new_id(),
            implant_type,
            length_mm,
            diameter_mm,
            quantity,
            brand: optional_text(self.brand),
            image_url: optional_text(self.image_url),
            created_at: now,
            updated_at: now,
        };
        Ok(errors.into_result(item)?)
    }

    fn into_patch(self) -> ValidationResult<ImplantPatch> {
        let mut errors = ValidationErrors::new();
        let patch = ImplantPatch {
            implant_type: optional_text(self.implant_type),
            length_mm: optional_number(&mut errors, "lengthMm", self.length_mm),
            diameter_mm: optional_number(&mut errors, "diameterMm", self.diameter_mm),
            quantity: optional_count(&mut errors, "quantity", self.quantity),
            brand: optional_text(self.brand),
            image_url: optional_text(self.image_url),
        };
        errors.into_result(patch)
    }
}

impl InventoryPatch<ImplantItem> for ImplantPatch {
    fn apply_to(self, item: &mut ImplantItem) {
        if let Some(v) = self.implant_type {
            item.implant_type = v;
        }
        if let Some(v) = self.length_mm {
            item.length_mm = Some(v);
        }
        if let Some(v) = self.diameter_mm {
            item.diameter_mm = Some(v);
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = self.brand {
            item.brand = Some(v);
        }
        if let Some(v) = self.image_url {
            item.image_url = Some(v);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurgeryInput {
    pub name: Option<String>,
    pub quantity: Option<NumberInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurgeryPatch {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub notes: Option<String>,
}

impl InventoryInput for SurgeryInput {
    type Item = SurgeryItem;
    type Patch = SurgeryPatch;

    fn into_item(self) -> Result<SurgeryItem, InventoryInputError> {
        let name = required_label(self.name)?;
        let mut errors = ValidationErrors::new();
        let quantity = required_count(&mut errors, self.quantity)?;
        let now = timestamp_now();
        let item = SurgeryItem {
            id: new_id(),
            name,
            quantity,
            notes: optional_text(self.notes),
            created_at: now,
            updated_at: now,
        };
        Ok(errors.into_result(item)?)
    }

    fn into_patch(self) -> ValidationResult<SurgeryPatch> {
        let mut errors = ValidationErrors::new();
        let patch = SurgeryPatch {
            name: optional_text(self.name),
            quantity: optional_count(&mut errors, "quantity", self.quantity),
            notes: optional_text(self.notes),
        };
        errors.into_result(patch)
    }
}

impl InventoryPatch<SurgeryItem> for SurgeryPatch {
    fn apply_to(self, item: &mut SurgeryItem) {
        if let Some(v) = self.name {
            item.name = v;
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = self.notes {
            item.notes = Some(v);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestorativeInput {
    pub name: Option<String>,
    pub quantity: Option<NumberInput>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestorativePatch {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

impl InventoryInput for RestorativeInput {
    type Item = RestorativeItem;
    type Patch = RestorativePatch;

    fn into_item(self) -> Result<RestorativeItem, InventoryInputError> {
        let name = required_label(self.name)?;
        let mut errors = ValidationErrors::new();
        let quantity = required_count(&mut errors, self.quantity)?;
        let now = timestamp_now();
        let item = RestorativeItem {
            id: new_id(),
            name,
            quantity,
            color: optional_text(self.color),
            notes: optional_text(self.notes),
            created_at: now,
            updated_at: now,
        };
        Ok(errors.into_result(item)?)
    }

    fn into_patch(self) -> ValidationResult<RestorativePatch> {
        let mut errors = ValidationErrors::new();
        let patch = RestorativePatch {
            name: optional_text(self.name),
            quantity: optional_count(&mut errors, "quantity", self.quantity),
            color: optional_text(self.color),
            notes: optional_text(self.notes),
        };
        errors.into_result(patch)
    }
}

impl InventoryPatch<RestorativeItem> for RestorativePatch {
    fn apply_to(self, item: &mut RestorativeItem) {
        if let Some(v) = self.name {
            item.name = v;
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = self.color {
            item.color = Some(v);
        }
        if let Some(v) = self.notes {
            item.notes = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implant_missing_fields() {
        let input: ImplantInput = serde_json::from_str(r#"{"quantity": 3}"#).unwrap();
        assert_eq!(input.into_item().unwrap_err(), InventoryInputError::MissingFields);

        let input: ImplantInput = serde_json::from_str(r#"{"type": "Cone Morse"}"#).unwrap();
        assert_eq!(input.into_item().unwrap_err(), InventoryInputError::MissingFields);
    }

    #[test]
    fn test_implant_accepts_numeric_strings() {
        let input: ImplantInput = serde_json::from_str(
            r#"{"type": "Cone Morse", "quantity": "12", "lengthMm": "11.5", "diameterMm": 3.75}"#,
        )
        .unwrap();
        let item = input.into_item().unwrap();
        assert_eq!(item.quantity, 12);
        assert_eq!(item.length_mm, Some(11.5));
        assert_eq!(item.diameter_mm, Some(3.75));
        assert_eq!(item.brand, None);
    }

    #[test]
    fn test_bad_quantity_is_invalid_not_missing() {
        let input: SurgeryInput = serde_json::from_str(r#"{"name": "Fio de sutura", "quantity": "muitos"}"#).unwrap();
        match input.into_item().unwrap_err() {
            InventoryInputError::Invalid(errors) => assert!(errors.has("quantity")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut item = RestorativeInput {
            name: Some("Resina A2".into()),
            quantity: Some(NumberInput::Number(4.0)),
            color: Some("A2".into()),
            notes: None,
        }
        .into_item()
        .unwrap();

        let patch: RestorativeInput = serde_json::from_str(r#"{"quantity": 1}"#).unwrap();
        patch.into_patch().unwrap().apply_to(&mut item);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.name, "Resina A2");
        assert_eq!(item.color.as_deref(), Some("A2"));
    }
}
