use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerData,
    pub smtp: SmtpData,
    #[serde(default)]
    pub auth: AuthData,
    pub addresses: EmailAddressData,
    pub subjects: EmailSubjectData,
    pub templates: EmailTemplatesData,
    pub fields: Vec<FieldPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerData {
    pub host: String,
    pub port: u16,
    /// URL path the form data is POSTed to.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpData {
    pub host: String,
    pub port: u16,
}

/// SMTP credentials. Leave both fields empty for an unauthenticated relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddressData {
    pub customer_from: String,
    pub customer_from_name: String,
    pub customer_reply_to: String,
    pub system_to: String,
    pub system_to_name: String,
    pub system_from: String,
    pub system_from_name: String,
    pub system_reply_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSubjectData {
    pub customer: String,
    pub system: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplatesData {
    pub dir: String,
    pub customer_text: String,
    pub customer_html: String,
    pub system_text: String,
    pub system_html: String,
}

impl EmailTemplatesData {
    pub fn customer_text_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.customer_text)
    }

    pub fn customer_html_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.customer_html)
    }

    pub fn system_text_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.system_text)
    }

    pub fn system_html_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.system_html)
    }
}

/// Declares one expected form field and how to validate it. Policies are
/// applied in the order they appear in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub name: String,
    /// Kept as a free string so that an unknown type skips the field instead
    /// of failing the whole config parse.
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Email,
    RestrictedText,
    UnrestrictedText,
}

impl FieldPolicy {
    /// Map the declared type string, case-insensitively, to a known field
    /// type. `None` means the field is skipped: never validated, never
    /// reported bad.
    pub fn policy_type(&self) -> Option<FieldType> {
        match self.field_type.to_lowercase().as_str() {
            "email" => Some(FieldType::Email),
            "textrestricted" => Some(FieldType::RestrictedText),
            "textunrestricted" => Some(FieldType::UnrestrictedText),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerData {
                host: "localhost".to_string(),
                port: 9301,
                path: "/".to_string(),
            },
            smtp: SmtpData {
                host: "localhost".to_string(),
                port: 25,
            },
            auth: AuthData::default(),
            addresses: EmailAddressData {
                customer_from: "no-reply@example.com".to_string(),
                customer_from_name: "Example Feedback".to_string(),
                customer_reply_to: "no-reply@example.com".to_string(),
                system_to: "feedback@example.com".to_string(),
                system_to_name: "Feedback".to_string(),
                system_from: "gateway@example.com".to_string(),
                system_from_name: "Form Gateway".to_string(),
                system_reply_to: "no-reply@example.com".to_string(),
            },
            subjects: EmailSubjectData {
                customer: "Thank you for your feedback".to_string(),
                system: "New feedback form submission".to_string(),
            },
            templates: EmailTemplatesData {
                dir: "templates".to_string(),
                customer_text: "customer.txt".to_string(),
                customer_html: "customer.html".to_string(),
                system_text: "system.txt".to_string(),
                system_html: "system.html".to_string(),
            },
            fields: vec![
                FieldPolicy {
                    name: "name".to_string(),
                    field_type: "textRestricted".to_string(),
                },
                FieldPolicy {
                    name: "email".to_string(),
                    field_type: "email".to_string(),
                },
                FieldPolicy {
                    name: "subject".to_string(),
                    field_type: "textRestricted".to_string(),
                },
                FieldPolicy {
                    name: "feedback".to_string(),
                    field_type: "textUnrestricted".to_string(),
                },
            ],
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
