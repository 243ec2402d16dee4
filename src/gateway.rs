use crate::config::{Config, FieldType};
use crate::sanitize;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One entry of the inbound JSON array. `value` is rewritten in place by the
/// sanitization pipeline before it is evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// The verdict returned to the browser. Serialized with the field names the
/// web clients expect: `{"Valid": bool, "BadFields": [...]|null}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormResponse {
    pub valid: bool,
    pub bad_fields: Option<Vec<String>>,
}

impl FormResponse {
    fn record_bad_field(&mut self, name: &str) {
        self.bad_fields
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
    }

    fn finalize(&mut self) {
        self.valid = self.bad_fields.is_none();
    }
}

/// Request metadata forwarded into the email templates. Operator-visible
/// diagnostics, never echoed back to the submitter, so they pass through
/// unsanitized.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub remote_ip: String,
    pub x_forwarded_for: String,
    pub user_agent: String,
}

/// Data handed to the email templates on a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct EmailTemplateData {
    pub form_data: HashMap<String, String>,
    pub user_agent: String,
    pub remote_ip: String,
    pub x_forwarded_for: String,
}

impl EmailTemplateData {
    /// Build template data from every submitted field, configured or not.
    /// Validation only looks at configured fields; the templates get the lot.
    /// Keys are lowercased so templates can address them predictably no
    /// matter how the client cased the field names; names differing only by
    /// case collapse, last write wins.
    pub fn new(fields: &[FormField], meta: RequestMeta) -> Self {
        let form_data = fields
            .iter()
            .map(|f| (f.name.to_lowercase(), f.value.clone()))
            .collect();
        EmailTemplateData {
            form_data,
            user_agent: meta.user_agent,
            remote_ip: meta.remote_ip,
            x_forwarded_for: meta.x_forwarded_for,
        }
    }

    /// Case-insensitive lookup, used to address the customer email from the
    /// submitted `name` and `email` fields.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.form_data.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Runs the validation side of a request: match each configured field against
/// the submission, sanitize it, evaluate it, and accumulate the verdict.
#[derive(Clone)]
pub struct GatewayEngine {
    config: Arc<Config>,
}

impl GatewayEngine {
    pub fn new(config: Arc<Config>) -> Self {
        GatewayEngine { config }
    }

    /// Decode the JSON array of `{"name": ..., "value": ...}` pairs. A
    /// malformed body is treated as an empty submission rather than an error,
    /// so every configured field ends up reported as bad.
    pub fn parse_fields(body: &[u8]) -> Vec<FormField> {
        match serde_json::from_slice(body) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("could not decode form JSON: {e}");
                Vec::new()
            }
        }
    }

    /// Validate the submission against the configured field policies.
    /// Matched values are sanitized in place; `bad_fields` collects failures
    /// in policy order, one entry per configured field at most.
    pub fn scrub_fields(&self, fields: &mut [FormField]) -> FormResponse {
        let mut response = FormResponse::default();
        for policy in &self.config.fields {
            let Some(field_type) = policy.policy_type() else {
                log::warn!(
                    "field {:?} has unknown type {:?}, skipping",
                    policy.name,
                    policy.field_type
                );
                continue;
            };
            match find_field(&policy.name, fields) {
                Some(field) => {
                    field.value = sanitize::sanitize(&field.value);
                    let valid = match field_type {
                        FieldType::Email => validation::validate_as_email(&field.value),
                        FieldType::RestrictedText => {
                            validation::validate_as_restricted_text(&field.value)
                        }
                        FieldType::UnrestrictedText => {
                            validation::validate_as_unrestricted_text(&field.value)
                        }
                    };
                    if !valid {
                        log::debug!("field {:?} failed {field_type:?} validation", policy.name);
                        response.record_bad_field(&policy.name);
                    }
                }
                None => {
                    log::debug!("no submitted field named {:?}", policy.name);
                    response.record_bad_field(&policy.name);
                }
            }
        }
        response.finalize();
        response
    }
}

/// Case-insensitive scan of the submitted fields, first match wins. The list
/// is a handful of entries, so a linear scan is fine.
fn find_field<'a>(name: &str, fields: &'a mut [FormField]) -> Option<&'a mut FormField> {
    fields
        .iter_mut()
        .find(|f| f.name.to_lowercase() == name.to_lowercase())
}
