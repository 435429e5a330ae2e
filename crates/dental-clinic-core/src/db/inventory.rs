//! Inventory database operations.
//!
//! The three stock collections share one shape (id, a few item columns,
//! timestamps), so a single set of generic operations serves all of them.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension};

use super::{classify, ts_from_sql, ts_to_sql, Database, DbResult};
use crate::models::{ImplantItem, RestorativeItem, SurgeryItem};

/// A row type stored in one inventory table.
pub trait InventoryRecord: Sized {
    const TABLE: &'static str;

    /// Column names in storage order; `id` first.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Values in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;

    fn read(row: &rusqlite::Row<'_>) -> DbResult<Self>;
}

impl Database {
    /// Every item in the collection, newest first.
    pub fn list_inventory<T: InventoryRecord>(&self) -> DbResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, rowid DESC",
            T::COLUMNS.join(", "),
            T::TABLE
        ))?;
        let mut rows = stmt.query([])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(T::read(row)?);
        }
        Ok(items)
    }

    pub fn get_inventory_item<T: InventoryRecord>(&self, id: &str) -> DbResult<Option<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE id = ?",
            T::COLUMNS.join(", "),
            T::TABLE
        ))?;
        let mut rows = stmt.query([id])?;
        rows.next()?.map(T::read).transpose()
    }

    pub fn insert_inventory_item<T: InventoryRecord>(&self, item: &T) -> DbResult<()> {
        let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    T::TABLE,
                    T::COLUMNS.join(", "),
                    placeholders.join(", ")
                ),
                params_from_iter(item.values()),
            )
            .map_err(classify)?;
        Ok(())
    }

    /// Overwrite every column of an existing item.
    pub fn update_inventory_item<T: InventoryRecord>(&self, item: &T) -> DbResult<bool> {
        let assignments: Vec<String> = T::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let rows_affected = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET {} WHERE id = ?1",
                    T::TABLE,
                    assignments.join(", ")
                ),
                params_from_iter(item.values()),
            )
            .map_err(classify)?;
        Ok(rows_affected > 0)
    }

    pub fn delete_inventory_item<T: InventoryRecord>(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?", T::TABLE), [id])?;
        Ok(rows_affected > 0)
    }

    /// Whether any collection row with this id exists.
    pub fn inventory_item_exists<T: InventoryRecord>(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(&format!("SELECT 1 FROM {} WHERE id = ?", T::TABLE), [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

impl InventoryRecord for ImplantItem {
    const TABLE: &'static str = "implant_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "type",
        "length_mm",
        "diameter_mm",
        "quantity",
        "brand",
        "image_url",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.implant_type.clone().into(),
            self.length_mm.into(),
            self.diameter_mm.into(),
            self.quantity.into(),
            self.brand.clone().into(),
            self.image_url.clone().into(),
            ts_to_sql(&self.created_at).into(),
            ts_to_sql(&self.updated_at).into(),
        ]
    }

    fn read(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Ok(ImplantItem {
            id: row.get(0)?,
            implant_type: row.get(1)?,
            length_mm: row.get(2)?,
            diameter_mm: row.get(3)?,
            quantity: row.get(4)?,
            brand: row.get(5)?,
            image_url: row.get(6)?,
            created_at: ts_from_sql(&row.get::<_, String>(7)?)?,
            updated_at: ts_from_sql(&row.get::<_, String>(8)?)?,
        })
    }
}

impl InventoryRecord for SurgeryItem {
    const TABLE: &'static str = "surgery_items";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "quantity", "notes", "created_at", "updated_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.quantity.into(),
            self.notes.clone().into(),
            ts_to_sql(&self.created_at).into(),
            ts_to_sql(&self.updated_at).into(),
        ]
    }

    fn read(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Ok(SurgeryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            notes: row.get(3)?,
            created_at: ts_from_sql(&row.get::<_, String>(4)?)?,
            updated_at: ts_from_sql(&row.get::<_, String>(5)?)?,
        })
    }
}

impl InventoryRecord for RestorativeItem {
    const TABLE: &'static str = "restorative_items";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "quantity", "color", "notes", "created_at", "updated_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.clone().into(),
            self.name.clone().into(),
            self.quantity.into(),
            self.color.clone().into(),
            self.notes.clone().into(),
            ts_to_sql(&self.created_at).into(),
            ts_to_sql(&self.updated_at).into(),
        ]
    }

    fn read(row: &rusqlite::Row<'_>) -> DbResult<Self> {
        Ok(RestorativeItem {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            color: row.get(3)?,
            notes: row.get(4)?,
            created_at: ts_from_sql(&row.get::<_, String>(5)?)?,
            updated_at: ts_from_sql(&row.get::<_, String>(6)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_id, timestamp_now};
    use chrono::Duration;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn implant(kind: &str, quantity: i64) -> ImplantItem {
        let now = timestamp_now();
        ImplantItem {
            id: new_id(),
            implant_type: kind.into(),
            length_mm: Some(11.5),
            diameter_mm: None,
            quantity,
            brand: Some("Neodent".into()),
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_implant_crud() {
        let db = setup_db();
        let mut item = implant("Cone Morse", 10);
        db.insert_inventory_item(&item).unwrap();
        assert_eq!(db.get_inventory_item::<ImplantItem>(&item.id).unwrap(), Some(item.clone()));

        item.quantity = 7;
        item.diameter_mm = Some(3.75);
        assert!(db.update_inventory_item(&item).unwrap());
        assert_eq!(db.get_inventory_item::<ImplantItem>(&item.id).unwrap(), Some(item.clone()));

        assert!(db.delete_inventory_item::<ImplantItem>(&item.id).unwrap());
        assert!(!db.delete_inventory_item::<ImplantItem>(&item.id).unwrap());
        assert!(!db.inventory_item_exists::<ImplantItem>(&item.id).unwrap());
    }

    #[test]
    fn test_list_newest_first() {
        let db = setup_db();
        let mut old = implant("Hexágono externo", 2);
        old.created_at = old.created_at - Duration::days(1);
        let new = implant("Cone Morse", 5);
        db.insert_inventory_item(&old).unwrap();
        db.insert_inventory_item(&new).unwrap();

        let listed: Vec<ImplantItem> = db.list_inventory().unwrap();
        assert_eq!(listed, vec![new, old]);
    }

    #[test]
    fn test_collections_are_separate() {
        let db = setup_db();
        let now = timestamp_now();
        let gauze = SurgeryItem {
            id: new_id(),
            name: "Gaze estéril".into(),
            quantity: 40,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let resin = RestorativeItem {
            id: new_id(),
            name: "Resina composta".into(),
            quantity: 3,
            color: Some("A2".into()),
            notes: Some("fotopolimerizável".into()),
            created_at: now,
            updated_at: now,
        };
        db.insert_inventory_item(&gauze).unwrap();
        db.insert_inventory_item(&resin).unwrap();

        assert_eq!(db.list_inventory::<SurgeryItem>().unwrap(), vec![gauze.clone()]);
        assert_eq!(db.list_inventory::<RestorativeItem>().unwrap(), vec![resin]);
        assert!(db.get_inventory_item::<RestorativeItem>(&gauze.id).unwrap().is_none());
    }
}
