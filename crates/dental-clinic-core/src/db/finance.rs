//! Financial transaction database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{
    classify, date_to_sql, enum_from_sql, opt_date_from_sql, opt_ts_from_sql, ts_from_sql,
    ts_to_sql, Database, DbError, DbResult,
};
use crate::models::{Cents, FinancialTransaction};

const TRANSACTION_COLUMNS: &str = "id, type, status, category, description, amount_cents, \
     patient_id, appointment_id, due_date, paid_at, notes, created_at, updated_at";

impl Database {
    pub fn insert_transaction(&self, tx: &FinancialTransaction) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO financial_transactions (
                    id, type, status, category, description, amount_cents, patient_id,
                    appointment_id, due_date, paid_at, notes, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    tx.id,
                    tx.transaction_type.as_str(),
                    tx.status.as_str(),
                    tx.category,
                    tx.description,
                    tx.amount.as_i64(),
                    tx.patient_id,
                    tx.appointment_id,
                    tx.due_date.as_ref().map(date_to_sql),
                    tx.paid_at.as_ref().map(ts_to_sql),
                    tx.notes,
                    ts_to_sql(&tx.created_at),
                    ts_to_sql(&tx.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    pub fn update_transaction(&self, tx: &FinancialTransaction) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE financial_transactions SET
                    type = ?2,
                    status = ?3,
                    category = ?4,
                    description = ?5,
                    amount_cents = ?6,
                    patient_id = ?7,
                    appointment_id = ?8,
                    due_date = ?9,
                    paid_at = ?10,
                    notes = ?11,
                    updated_at = ?12
                WHERE id = ?1
                "#,
                params![
                    tx.id,
                    tx.transaction_type.as_str(),
                    tx.status.as_str(),
                    tx.category,
                    tx.description,
                    tx.amount.as_i64(),
                    tx.patient_id,
                    tx.appointment_id,
                    tx.due_date.as_ref().map(date_to_sql),
                    tx.paid_at.as_ref().map(ts_to_sql),
                    tx.notes,
                    ts_to_sql(&tx.updated_at),
                ],
            )
            .map_err(classify)?;
        Ok(rows_affected > 0)
    }

    pub fn get_transaction(&self, id: &str) -> DbResult<Option<FinancialTransaction>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM financial_transactions WHERE id = ?", TRANSACTION_COLUMNS),
                [id],
                read_transaction_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn delete_transaction(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM financial_transactions WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Transactions created in `[start, end)`, oldest first.
    pub fn list_transactions_between(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> DbResult<Vec<FinancialTransaction>> {
        self.query_transactions(
            &format!(
                "SELECT {} FROM financial_transactions
                 WHERE created_at >= ?1 AND created_at < ?2
                 ORDER BY created_at ASC",
                TRANSACTION_COLUMNS
            ),
            params![ts_to_sql(start), ts_to_sql(end)],
        )
    }

    /// Most recently created transactions, newest first.
    pub fn recent_transactions(&self, limit: usize) -> DbResult<Vec<FinancialTransaction>> {
        self.query_transactions(
            &format!(
                "SELECT {} FROM financial_transactions ORDER BY created_at DESC LIMIT ?1",
                TRANSACTION_COLUMNS
            ),
            params![limit as i64],
        )
    }

    pub fn recent_transactions_for_patient(
        &self,
        patient_id: &str,
        limit: usize,
    ) -> DbResult<Vec<FinancialTransaction>> {
        self.query_transactions(
            &format!(
                "SELECT {} FROM financial_transactions
                 WHERE patient_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                TRANSACTION_COLUMNS
            ),
            params![patient_id, limit as i64],
        )
    }

    /// Count of transactions not yet settled.
    pub fn count_unsettled_transactions(&self) -> DbResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM financial_transactions WHERE status <> 'PAID'",
            [],
            |row| row.get(0),
        )?)
    }

    fn query_transactions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> DbResult<Vec<FinancialTransaction>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_transaction_row)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?.try_into()?);
        }
        Ok(transactions)
    }
}

/// Intermediate row struct for database mapping.
struct TransactionRow {
    id: String,
    transaction_type: String,
    status: String,
    category: String,
    description: Option<String>,
    amount_cents: i64,
    patient_id: Option<String>,
    appointment_id: Option<String>,
    due_date: Option<String>,
    paid_at: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_transaction_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        transaction_type: row.get(1)?,
        status: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        amount_cents: row.get(5)?,
        patient_id: row.get(6)?,
        appointment_id: row.get(7)?,
        due_date: row.get(8)?,
        paid_at: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl TryFrom<TransactionRow> for FinancialTransaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(FinancialTransaction {
            id: row.id,
            transaction_type: enum_from_sql(&row.transaction_type)?,
            status: enum_from_sql(&row.status)?,
            category: row.category,
            description: row.description,
            amount: Cents::new(row.amount_cents),
            patient_id: row.patient_id,
            appointment_id: row.appointment_id,
            due_date: opt_date_from_sql(row.due_date)?,
            paid_at: opt_ts_from_sql(row.paid_at)?,
            notes: row.notes,
            created_at: ts_from_sql(&row.created_at)?,
            updated_at: ts_from_sql(&row.updated_at)?,
        })
    }
}
