//! Stock collections. These back the public inventory endpoints, which
//! carry no session, so none of them take an actor.

use tracing::{debug, info};

use super::{Clinic, ClinicError, ClinicResult};
use crate::db::InventoryRecord;
use crate::models::timestamp_now;
use crate::validation::{InventoryInput, InventoryPatch};

impl Clinic {
    /// Every item of the collection `I` describes, newest first.
    pub fn list_inventory<I>(&self) -> ClinicResult<Vec<I::Item>>
    where
        I: InventoryInput,
        I::Item: InventoryRecord,
    {
        let db = self.lock();
        let items = db.list_inventory::<I::Item>()?;
        debug!(table = I::Item::TABLE, count = items.len(), "Listed inventory");
        Ok(items)
    }

    pub fn create_inventory_item<I>(&self, input: I) -> ClinicResult<I::Item>
    where
        I: InventoryInput,
        I::Item: InventoryRecord,
    {
        let item = input.into_item()?;
        let db = self.lock();
        db.insert_inventory_item(&item)?;
        info!(table = I::Item::TABLE, id = item.id(), "Inventory item created");
        Ok(item)
    }

    /// Change only the fields present in `input`.
    pub fn update_inventory_item<I>(&self, id: &str, input: I) -> ClinicResult<I::Item>
    where
        I: InventoryInput,
        I::Item: InventoryRecord,
    {
        let patch = input.into_patch()?;
        let db = self.lock();
        let mut item = db
            .get_inventory_item::<I::Item>(id)?
            .ok_or_else(|| ClinicError::NotFound(format!("{} {}", I::Item::TABLE, id)))?;

        patch.apply_to(&mut item);
        item.set_updated_at(timestamp_now());
        if !db.update_inventory_item(&item)? {
            return Err(ClinicError::NotFound(format!("{} {}", I::Item::TABLE, id)));
        }
        info!(table = I::Item::TABLE, id, "Inventory item updated");
        Ok(item)
    }

    pub fn delete_inventory_item<I>(&self, id: &str) -> ClinicResult<()>
    where
        I: InventoryInput,
        I::Item: InventoryRecord,
    {
        let db = self.lock();
        if !db.delete_inventory_item::<I::Item>(id)? {
            return Err(ClinicError::NotFound(format!("{} {}", I::Item::TABLE, id)));
        }
        info!(table = I::Item::TABLE, id, "Inventory item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SurgeryItem;
    use crate::validation::{ImplantInput, NumberInput, SurgeryInput};

    fn clinic() -> Clinic {
        Clinic::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_requires_fields() {
        let clinic = clinic();
        let err = clinic
            .create_inventory_item(ImplantInput {
                implant_type: Some("Cone Morse".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ClinicError::MissingFields));
        assert_eq!(err.to_string(), "Missing fields");
        assert!(clinic.list_inventory::<ImplantInput>().unwrap().is_empty());
    }

    #[test]
    fn test_patch_changes_only_given_fields() {
        let clinic = clinic();
        let created = clinic
            .create_inventory_item(SurgeryInput {
                name: Some("Fio de sutura".into()),
                quantity: Some(NumberInput::Text("12".into())),
                notes: Some("4-0".into()),
            })
            .unwrap();

        let patched: SurgeryItem = clinic
            .update_inventory_item(
                &created.id,
                SurgeryInput {
                    quantity: Some(NumberInput::Number(9.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.quantity, 9);
        assert_eq!(patched.name, "Fio de sutura");
        assert_eq!(patched.notes.as_deref(), Some("4-0"));
        assert!(patched.updated_at >= created.updated_at);
        assert_eq!(clinic.list_inventory::<SurgeryInput>().unwrap(), vec![patched]);
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let clinic = clinic();
        let err = clinic
            .update_inventory_item("nope", SurgeryInput::default())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        let err = clinic.delete_inventory_item::<SurgeryInput>("nope").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
