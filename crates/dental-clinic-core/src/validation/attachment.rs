//! Attachment metadata validation. The file itself has already been
//! stored by the caller; only its descriptor is checked here.

use serde::Deserialize;

use super::{optional_count, optional_text, required_text, NumberInput, ValidationErrors, ValidationResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentInput {
    pub patient_id: Option<String>,
    pub appointment_id: Option<String>,
    pub response_set_id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<NumberInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentFields {
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub response_set_id: Option<String>,
    pub name: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
}

pub fn validate_attachment(input: AttachmentInput) -> ValidationResult<AttachmentFields> {
    let mut errors = ValidationErrors::new();

    let patient_id = required_text(&mut errors, "patientId", input.patient_id, 1);
    let name = required_text(&mut errors, "name", input.name, 1);
    let url = required_text(&mut errors, "url", input.url, 1);
    let size_bytes = optional_count(&mut errors, "sizeBytes", input.size_bytes).unwrap_or(0);

    let fields = AttachmentFields {
        patient_id,
        appointment_id: optional_text(input.appointment_id),
        response_set_id: optional_text(input.response_set_id),
        name,
        url,
        mime_type: optional_text(input.mime_type),
        size_bytes,
    };

    errors.into_result(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_requires_patient_and_file() {
        let errors = validate_attachment(AttachmentInput::default()).unwrap_err();
        assert!(errors.has("patientId"));
        assert!(errors.has("name"));
        assert!(errors.has("url"));
    }

    #[test]
    fn test_attachment_optional_links() {
        let fields = validate_attachment(AttachmentInput {
            patient_id: Some("p".into()),
            appointment_id: Some("".into()),
            name: Some("raio-x.png".into()),
            url: Some("https://blob.example/raio-x.png".into()),
            size_bytes: Some(NumberInput::Number(2048.0)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fields.appointment_id, None);
        assert_eq!(fields.size_bytes, 2048);
    }
}
