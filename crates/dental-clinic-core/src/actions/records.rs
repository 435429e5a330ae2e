//! Patient, appointment, transaction and attachment actions.

use tracing::info;

use super::{
    authorize, patient_path, Clinic, ClinicError, ClinicResult, DASHBOARD_PATH, FINANCE_PATH,
    PATIENTS_PATH, SCHEDULE_PATH,
};
use crate::db::Database;
use crate::models::{
    new_id, timestamp_now, Actor, Appointment, Attachment, FinancialTransaction, Patient,
};
use crate::validation::{
    validate_appointment, validate_attachment, validate_patient, validate_transaction,
    AppointmentInput, AttachmentInput, PatientInput, TransactionInput,
};

fn require_patient(db: &Database, patient_id: &str) -> ClinicResult<()> {
    if db.get_patient(patient_id)?.is_none() {
        return Err(ClinicError::NotFound(format!("patient {}", patient_id)));
    }
    Ok(())
}

impl Clinic {
    // =========================================================================
    // Patients
    // =========================================================================

    /// Register a new patient. An email already used by another patient is
    /// rejected and no row is written.
    pub fn create_patient(&self, actor: Option<&Actor>, input: PatientInput) -> ClinicResult<Patient> {
        let db = self.lock();
        authorize(&db, actor)?;
        let fields = validate_patient(input, timestamp_now().date_naive())?;

        if let Some(email) = &fields.email {
            if db.patient_email_taken(email, None)? {
                return Err(ClinicError::EmailAlreadyExists);
            }
        }

        let patient = fields.into_patient();
        db.insert_patient(&patient)?;
        drop(db);

        info!(patient_id = %patient.id, "Patient created");
        self.invalidate(&[PATIENTS_PATH, DASHBOARD_PATH]);
        Ok(patient)
    }

    pub fn update_patient(
        &self,
        actor: Option<&Actor>,
        patient_id: &str,
        input: PatientInput,
    ) -> ClinicResult<Patient> {
        let db = self.lock();
        authorize(&db, actor)?;
        let fields = validate_patient(input, timestamp_now().date_naive())?;

        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("patient {}", patient_id)))?;
        if let Some(email) = &fields.email {
            if db.patient_email_taken(email, Some(patient_id))? {
                return Err(ClinicError::EmailAlreadyExists);
            }
        }

        fields.apply_to(&mut patient);
        patient.updated_at = timestamp_now();
        if !db.update_patient(&patient)? {
            return Err(ClinicError::NotFound(format!("patient {}", patient_id)));
        }
        drop(db);

        info!(patient_id, "Patient updated");
        self.invalidate(&[PATIENTS_PATH.to_string(), patient_path(patient_id), DASHBOARD_PATH.to_string()]);
        Ok(patient)
    }

    /// Delete a patient along with the records that belong to them.
    pub fn delete_patient(&self, actor: Option<&Actor>, patient_id: &str) -> ClinicResult<()> {
        let db = self.lock();
        authorize(&db, actor)?;
        if !db.delete_patient(patient_id)? {
            return Err(ClinicError::NotFound(format!("patient {}", patient_id)));
        }
        drop(db);

        info!(patient_id, "Patient deleted");
        self.invalidate(&[PATIENTS_PATH, SCHEDULE_PATH, DASHBOARD_PATH, FINANCE_PATH]);
        Ok(())
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Create an appointment, or update it when the input carries an id.
    pub fn save_appointment(
        &self,
        actor: Option<&Actor>,
        input: AppointmentInput,
    ) -> ClinicResult<Appointment> {
        let db = self.lock();
        authorize(&db, actor)?;
        let fields = validate_appointment(input)?;

        require_patient(&db, &fields.patient_id)?;
        if db.get_user(&fields.provider_id)?.is_none() {
            return Err(ClinicError::NotFound(format!("provider {}", fields.provider_id)));
        }

        let appointment = match fields.id.clone() {
            Some(id) => {
                let mut appointment = db
                    .get_appointment(&id)?
                    .ok_or_else(|| ClinicError::NotFound(format!("appointment {}", id)))?;
                let previous_patient = appointment.patient_id.clone();
                fields.apply_to(&mut appointment);
                appointment.updated_at = timestamp_now();
                if !db.update_appointment(&appointment)? {
                    return Err(ClinicError::NotFound(format!("appointment {}", id)));
                }
                if previous_patient != appointment.patient_id {
                    self.invalidate(&[patient_path(&previous_patient)]);
                }
                info!(appointment_id = %appointment.id, "Appointment updated");
                appointment
            }
            None => {
                let appointment = fields.into_appointment();
                db.insert_appointment(&appointment)?;
                info!(appointment_id = %appointment.id, "Appointment created");
                appointment
            }
        };
        drop(db);

        self.invalidate(&[
            SCHEDULE_PATH.to_string(),
            patient_path(&appointment.patient_id),
            DASHBOARD_PATH.to_string(),
        ]);
        Ok(appointment)
    }

    pub fn delete_appointment(&self, actor: Option<&Actor>, appointment_id: &str) -> ClinicResult<()> {
        let db = self.lock();
        authorize(&db, actor)?;
        let appointment = db
            .get_appointment(appointment_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("appointment {}", appointment_id)))?;
        db.delete_appointment(appointment_id)?;
        drop(db);

        info!(appointment_id, "Appointment deleted");
        self.invalidate(&[
            SCHEDULE_PATH.to_string(),
            patient_path(&appointment.patient_id),
            DASHBOARD_PATH.to_string(),
        ]);
        Ok(())
    }

    // =========================================================================
    // Financial transactions
    // =========================================================================

    /// Create a transaction, or update it when the input carries an id.
    pub fn save_transaction(
        &self,
        actor: Option<&Actor>,
        input: TransactionInput,
    ) -> ClinicResult<FinancialTransaction> {
        let db = self.lock();
        authorize(&db, actor)?;
        let fields = validate_transaction(input)?;

        if let Some(patient_id) = &fields.patient_id {
            require_patient(&db, patient_id)?;
        }
        if let Some(appointment_id) = &fields.appointment_id {
            if db.get_appointment(appointment_id)?.is_none() {
                return Err(ClinicError::NotFound(format!("appointment {}", appointment_id)));
            }
        }

        let tx = match fields.id.clone() {
            Some(id) => {
                let mut tx = db
                    .get_transaction(&id)?
                    .ok_or_else(|| ClinicError::NotFound(format!("transaction {}", id)))?;
                fields.apply_to(&mut tx);
                tx.updated_at = timestamp_now();
                if !db.update_transaction(&tx)? {
                    return Err(ClinicError::NotFound(format!("transaction {}", id)));
                }
                info!(transaction_id = %tx.id, "Transaction updated");
                tx
            }
            None => {
                let tx = fields.into_transaction();
                db.insert_transaction(&tx)?;
                info!(transaction_id = %tx.id, amount = %tx.amount, "Transaction recorded");
                tx
            }
        };
        drop(db);

        let mut paths = vec![FINANCE_PATH.to_string(), DASHBOARD_PATH.to_string()];
        if let Some(patient_id) = &tx.patient_id {
            paths.push(patient_path(patient_id));
        }
        self.invalidate(&paths);
        Ok(tx)
    }

    pub fn delete_transaction(&self, actor: Option<&Actor>, transaction_id: &str) -> ClinicResult<()> {
        let db = self.lock();
        authorize(&db, actor)?;
        let tx = db
            .get_transaction(transaction_id)?
            .ok_or_else(|| ClinicError::NotFound(format!("transaction {}", transaction_id)))?;
        db.delete_transaction(transaction_id)?;
        drop(db);

        info!(transaction_id, "Transaction deleted");
        let mut paths = vec![FINANCE_PATH.to_string(), DASHBOARD_PATH.to_string()];
        if let Some(patient_id) = &tx.patient_id {
            paths.push(patient_path(patient_id));
        }
        self.invalidate(&paths);
        Ok(())
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Record an uploaded file's metadata against a patient.
    pub fn record_attachment(
        &self,
        actor: Option<&Actor>,
        input: AttachmentInput,
    ) -> ClinicResult<Attachment> {
        let db = self.lock();
        let actor = authorize(&db, actor)?;
        let fields = validate_attachment(input)?;
        require_patient(&db, &fields.patient_id)?;

        let now = timestamp_now();
        let attachment = Attachment {
            id: new_id(),
            patient_id: fields.patient_id,
            appointment_id: fields.appointment_id,
            response_set_id: fields.response_set_id,
            uploaded_by_id: actor.user_id.clone(),
            name: fields.name,
            url: fields.url,
            mime_type: fields.mime_type,
            size_bytes: fields.size_bytes,
            created_at: now,
            updated_at: now,
        };
        db.insert_attachment(&attachment)?;
        drop(db);

        info!(attachment_id = %attachment.id, patient_id = %attachment.patient_id, "Attachment recorded");
        self.invalidate(&[patient_path(&attachment.patient_id)]);
        Ok(attachment)
    }

    /// Remove an attachment. It must belong to `patient_id`.
    pub fn delete_attachment(
        &self,
        actor: Option<&Actor>,
        attachment_id: &str,
        patient_id: &str,
    ) -> ClinicResult<()> {
        let db = self.lock();
        authorize(&db, actor)?;
        if !db.delete_attachment(attachment_id, patient_id)? {
            return Err(ClinicError::NotFound(format!("attachment {}", attachment_id)));
        }
        drop(db);

        info!(attachment_id, patient_id, "Attachment deleted");
        self.invalidate(&[patient_path(patient_id)]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fixture;
    use super::*;
    use crate::db::PatientSearch;
    use crate::models::Cents;

    fn patient_input(first: &str, email: Option<&str>) -> PatientInput {
        PatientInput {
            first_name: Some(first.into()),
            last_name: Some("Lima".into()),
            email: email.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_writes_require_actor() {
        let f = fixture();
        let err = f.clinic.create_patient(None, patient_input("Maria", None)).unwrap_err();
        assert!(matches!(err, ClinicError::Unauthorized));

        // Authorization is checked before validation
        let err = f.clinic.create_patient(None, PatientInput::default()).unwrap_err();
        assert!(matches!(err, ClinicError::Unauthorized));
        assert!(f.views.paths().is_empty());
    }

    #[test]
    fn test_create_patient_invalidates_views() {
        let f = fixture();
        let patient = f
            .clinic
            .create_patient(Some(&f.actor), patient_input("Maria", Some("Maria@Mail.com")))
            .unwrap();
        assert_eq!(patient.full_name, "Maria Lima");
        assert_eq!(patient.email.as_deref(), Some("maria@mail.com"));
        assert_eq!(f.views.take(), vec!["/patients", "/dashboard"]);
    }

    #[test]
    fn test_duplicate_email_creates_no_row() {
        let f = fixture();
        f.clinic
            .create_patient(Some(&f.actor), patient_input("Maria", Some("maria@mail.com")))
            .unwrap();

        let err = f
            .clinic
            .create_patient(Some(&f.actor), patient_input("Marta", Some("MARIA@mail.com")))
            .unwrap_err();
        assert_eq!(err.code(), "EMAIL_ALREADY_EXISTS");

        let all = f.clinic.search_patients(&PatientSearch::default()).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_update_patient_keeps_own_email() {
        let f = fixture();
        let patient = f
            .clinic
            .create_patient(Some(&f.actor), patient_input("Maria", Some("maria@mail.com")))
            .unwrap();
        f.views.take();

        let updated = f
            .clinic
            .update_patient(Some(&f.actor), &patient.id, patient_input("Mariana", Some("maria@mail.com")))
            .unwrap();
        assert_eq!(updated.full_name, "Mariana Lima");
        assert!(updated.updated_at >= patient.updated_at);
        assert!(f.views.paths().contains(&format!("/patients/{}", patient.id)));

        let err = f
            .clinic
            .update_patient(Some(&f.actor), "missing", patient_input("X", None))
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_appointment_upsert() {
        let f = fixture();
        let patient = f.clinic.create_patient(Some(&f.actor), patient_input("Maria", None)).unwrap();

        let input = AppointmentInput {
            patient_id: Some(patient.id.clone()),
            provider_id: Some(f.provider.id.clone()),
            title: Some("Avaliação".into()),
            fee: Some("200,00".into()),
            start_at: Some("2026-03-02T09:00:00Z".into()),
            end_at: Some("2026-03-02T09:45:00Z".into()),
            ..Default::default()
        };
        let created = f.clinic.save_appointment(Some(&f.actor), input.clone()).unwrap();
        assert_eq!(created.fee, Some(Cents::from_units(200)));

        let updated = f
            .clinic
            .save_appointment(
                Some(&f.actor),
                AppointmentInput {
                    id: Some(created.id.clone()),
                    title: Some("Retorno".into()),
                    ..input
                },
            )
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "Retorno");
        assert!(f.views.paths().contains(&"/schedule".to_string()));

        f.clinic.delete_appointment(Some(&f.actor), &created.id).unwrap();
        let err = f.clinic.delete_appointment(Some(&f.actor), &created.id).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_appointment_unknown_provider() {
        let f = fixture();
        let patient = f.clinic.create_patient(Some(&f.actor), patient_input("Maria", None)).unwrap();
        let err = f
            .clinic
            .save_appointment(
                Some(&f.actor),
                AppointmentInput {
                    patient_id: Some(patient.id),
                    provider_id: Some("nobody".into()),
                    title: Some("Avaliação".into()),
                    start_at: Some("2026-03-02T09:00:00Z".into()),
                    end_at: Some("2026-03-02T09:45:00Z".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_transaction_upsert_and_delete() {
        let f = fixture();
        let tx = f
            .clinic
            .save_transaction(
                Some(&f.actor),
                TransactionInput {
                    transaction_type: Some("EXPENSE".into()),
                    category: Some("Materiais".into()),
                    amount: Some("89.90".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(f.views.take(), vec!["/finance", "/dashboard"]);

        let edited = f
            .clinic
            .save_transaction(
                Some(&f.actor),
                TransactionInput {
                    id: Some(tx.id.clone()),
                    transaction_type: Some("EXPENSE".into()),
                    status: Some("PAID".into()),
                    category: Some("Materiais".into()),
                    amount: Some("89.90".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.id, tx.id);
        assert_eq!(f.clinic.finance_overview().unwrap().unsettled_count, 0);

        f.clinic.delete_transaction(Some(&f.actor), &tx.id).unwrap();
        assert!(f.clinic.finance_overview().unwrap().transactions.is_empty());
    }

    #[test]
    fn test_transaction_amounts_are_capped() {
        let f = fixture();
        let income = |amount: &str| TransactionInput {
            transaction_type: Some("INCOME".into()),
            category: Some("Implantes".into()),
            amount: Some(amount.into()),
            ..Default::default()
        };

        let err = f
            .clinic
            .save_transaction(Some(&f.actor), income("90000000000000000"))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(matches!(&err, ClinicError::Validation(errors) if errors.has("amount")));

        for _ in 0..2 {
            f.clinic.save_transaction(Some(&f.actor), income("1000000000000")).unwrap();
        }
        let overview = f.clinic.finance_overview().unwrap();
        assert_eq!(overview.totals.income, Cents::MAX.checked_add(Cents::MAX).unwrap());
        assert_eq!(overview.net_balance, overview.totals.income);
        assert!(f.clinic.search_patients(&PatientSearch::default()).unwrap().is_empty());
    }

    #[test]
    fn test_attachment_scoped_to_patient() {
        let f = fixture();
        let patient = f.clinic.create_patient(Some(&f.actor), patient_input("Maria", None)).unwrap();
        let attachment = f
            .clinic
            .record_attachment(
                Some(&f.actor),
                AttachmentInput {
                    patient_id: Some(patient.id.clone()),
                    name: Some("raio-x.png".into()),
                    url: Some("https://files.clinic.test/raio-x.png".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(attachment.uploaded_by_id, f.actor.user_id);

        let err = f
            .clinic
            .delete_attachment(Some(&f.actor), &attachment.id, "other-patient")
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        f.clinic
            .delete_attachment(Some(&f.actor), &attachment.id, &patient.id)
            .unwrap();
        assert!(f.clinic.patient_detail(&patient.id).unwrap().attachments.is_empty());
    }
}
