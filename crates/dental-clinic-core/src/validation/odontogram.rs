//! Odontogram save payload validation.

use serde::Deserialize;

use super::{enum_or_default, optional_text, required_text, ValidationErrors, ValidationResult};
use crate::models::{ChartType, ResponseStatus, ToothStatus};

/// A tooth-chart save as submitted by the chart editor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OdontogramPayload {
    pub patient_id: Option<String>,
    pub response_set_id: Option<String>,
    pub template_id: Option<String>,
    pub chart_type: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    /// Response set version the editor loaded; a mismatch rejects the save
    pub expected_version: Option<i64>,
    pub entries: Vec<OdontogramEntryInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OdontogramEntryInput {
    pub tooth_number: Option<String>,
    pub region: Option<String>,
    pub annotations: Option<String>,
    pub status: Option<String>,
}

/// Which response set a save writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Existing {
        response_set_id: String,
        expected_version: Option<i64>,
    },
    New {
        template_id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OdontogramSave {
    pub patient_id: String,
    pub target: SaveTarget,
    pub chart_type: ChartType,
    /// `None` leaves existing notes untouched
    pub notes: Option<String>,
    pub status: ResponseStatus,
    pub entries: Vec<EntryFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub tooth_number: String,
    pub region: Option<String>,
    pub annotations: Option<String>,
    pub status: ToothStatus,
}

pub fn validate_odontogram(payload: OdontogramPayload) -> ValidationResult<OdontogramSave> {
    let mut errors = ValidationErrors::new();

    let patient_id = required_text(&mut errors, "patientId", payload.patient_id, 1);
    let chart_type = enum_or_default(&mut errors, "chartType", payload.chart_type, ChartType::default());
    let status = enum_or_default(&mut errors, "status", payload.status, ResponseStatus::default());

    let target = match optional_text(payload.response_set_id) {
        Some(response_set_id) => Some(SaveTarget::Existing {
            response_set_id,
            expected_version: payload.expected_version,
        }),
        None => match optional_text(payload.template_id) {
            Some(template_id) => Some(SaveTarget::New { template_id }),
            None => {
                errors.push("templateId", "is required when creating a response set");
                None
            }
        },
    };

    let entries: Vec<EntryFields> = payload
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let field = |name: &str| format!("entries[{}].{}", index, name);
            EntryFields {
                tooth_number: required_text(&mut errors, &field("toothNumber"), entry.tooth_number, 1),
                region: optional_text(entry.region),
                annotations: optional_text(entry.annotations),
                status: enum_or_default(&mut errors, &field("status"), entry.status, ToothStatus::Open),
            }
        })
        .collect();

    let Some(target) = target else {
        return Err(errors);
    };

    let save = OdontogramSave {
        patient_id,
        target,
        chart_type,
        notes: optional_text(payload.notes),
        status,
        entries,
    };

    errors.into_result(save)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tooth: &str, status: &str) -> OdontogramEntryInput {
        OdontogramEntryInput {
            tooth_number: Some(tooth.into()),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_template() {
        let errors = validate_odontogram(OdontogramPayload {
            patient_id: Some("p".into()),
            entries: vec![entry("11", "OPEN")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.has("templateId"));
    }

    #[test]
    fn test_update_does_not_need_template() {
        let save = validate_odontogram(OdontogramPayload {
            patient_id: Some("p".into()),
            response_set_id: Some("rs".into()),
            expected_version: Some(3),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            save.target,
            SaveTarget::Existing {
                response_set_id: "rs".into(),
                expected_version: Some(3)
            }
        );
        assert!(save.entries.is_empty());
        assert_eq!(save.chart_type, ChartType::Permanent);
        assert_eq!(save.status, ResponseStatus::Open);
    }

    #[test]
    fn test_entries_are_trimmed_and_checked() {
        let errors = validate_odontogram(OdontogramPayload {
            patient_id: Some("p".into()),
            template_id: Some("t".into()),
            entries: vec![entry(" 11 ", "COMPLETED"), entry("  ", "OPEN"), entry("12", "BROKEN")],
            ..Default::default()
        })
        .unwrap_err();
        assert!(!errors.has("entries[0].toothNumber"));
        assert!(errors.has("entries[1].toothNumber"));
        assert!(errors.has("entries[2].status"));

        let save = validate_odontogram(OdontogramPayload {
            patient_id: Some("p".into()),
            template_id: Some("t".into()),
            chart_type: Some("DECIDUOUS".into()),
            entries: vec![entry(" 51 ", "IN_PROGRESS")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(save.entries[0].tooth_number, "51");
        assert_eq!(save.entries[0].status, ToothStatus::InProgress);
        assert_eq!(save.chart_type, ChartType::Deciduous);
    }

    #[test]
    fn test_payload_json_shape() {
        let payload: OdontogramPayload = serde_json::from_str(
            r#"{"patientId":"p","responseSetId":"rs","entries":[{"toothNumber":"11","status":"NOTE","annotations":"fratura"}]}"#,
        )
        .unwrap();
        let save = validate_odontogram(payload).unwrap();
        assert_eq!(save.entries[0].annotations.as_deref(), Some("fratura"));
        assert_eq!(save.entries[0].status, ToothStatus::Note);
    }
}
