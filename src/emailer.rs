use crate::config::Config;
use crate::gateway::EmailTemplateData;
use anyhow::Context as _;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tera::Tera;

// Logical template names. The `.html` suffix switches on tera's autoescaping
// for the HTML bodies.
const CUSTOMER_TEXT: &str = "customer.txt";
const CUSTOMER_HTML: &str = "customer.html";
const SYSTEM_TEXT: &str = "system.txt";
const SYSTEM_HTML: &str = "system.html";

/// Renders the two outbound emails and dispatches them over SMTP. The
/// templates are loaded once at construction; a missing or unparsable
/// template file fails startup rather than the first request.
pub struct Emailer {
    config: Arc<Config>,
    templates: Tera,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Emailer {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let t = &config.templates;
        let mut templates = Tera::default();
        templates
            .add_template_files(vec![
                (t.customer_text_path(), Some(CUSTOMER_TEXT)),
                (t.customer_html_path(), Some(CUSTOMER_HTML)),
                (t.system_text_path(), Some(SYSTEM_TEXT)),
                (t.system_html_path(), Some(SYSTEM_HTML)),
            ])
            .with_context(|| format!("loading email templates from {:?}", t.dir))?;
        let transport = build_transport(&config)?;
        Ok(Emailer {
            config,
            templates,
            transport,
        })
    }

    /// Compose and send both emails: the acknowledgement to the submitter and
    /// the copy to the internal recipient. Runs strictly after the HTTP
    /// response; any error here is the caller's to log, never the client's.
    pub async fn send(&self, data: &EmailTemplateData) -> anyhow::Result<()> {
        let customer = self.customer_message(data)?;
        let system = self.system_message(data)?;

        self.transport
            .send(customer)
            .await
            .context("sending customer email")?;
        self.transport
            .send(system)
            .await
            .context("sending system email")?;
        log::info!(
            "sent gateway emails to {:?} and {:?}",
            data.lookup("email").unwrap_or_default(),
            self.config.addresses.system_to
        );
        Ok(())
    }

    fn render(&self, name: &str, data: &EmailTemplateData) -> anyhow::Result<String> {
        let ctx = tera::Context::from_serialize(data)?;
        self.templates
            .render(name, &ctx)
            .with_context(|| format!("rendering template {name:?}"))
    }

    /// The acknowledgement sent back to the submitter, addressed from the
    /// sanitized `name` and `email` form fields.
    fn customer_message(&self, data: &EmailTemplateData) -> anyhow::Result<Message> {
        let addr = &self.config.addresses;
        let email = data
            .lookup("email")
            .ok_or_else(|| anyhow::anyhow!("submission has no email field"))?;
        let to = Mailbox::new(
            data.lookup("name").map(str::to_string),
            email.parse().context("customer to address")?,
        );
        self.message(
            &addr.customer_from_name,
            &addr.customer_from,
            &addr.customer_reply_to,
            to,
            &self.config.subjects.customer,
            CUSTOMER_TEXT,
            CUSTOMER_HTML,
            data,
        )
    }

    /// The copy delivered to the configured internal recipient.
    fn system_message(&self, data: &EmailTemplateData) -> anyhow::Result<Message> {
        let addr = &self.config.addresses;
        let to = Mailbox::new(
            Some(addr.system_to_name.clone()),
            addr.system_to.parse().context("system to address")?,
        );
        self.message(
            &addr.system_from_name,
            &addr.system_from,
            &addr.system_reply_to,
            to,
            &self.config.subjects.system,
            SYSTEM_TEXT,
            SYSTEM_HTML,
            data,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn message(
        &self,
        from_name: &str,
        from: &str,
        reply_to: &str,
        to: Mailbox,
        subject: &str,
        text_template: &str,
        html_template: &str,
        data: &EmailTemplateData,
    ) -> anyhow::Result<Message> {
        let text = self.render(text_template, data)?;
        let html = self.render(html_template, data)?;
        let message = Message::builder()
            .from(Mailbox::new(
                Some(from_name.to_string()),
                from.parse().context("from address")?,
            ))
            .reply_to(Mailbox::new(None, reply_to.parse().context("reply-to address")?))
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text, html))
            .context("building email message")?;
        Ok(message)
    }
}

/// TLS relay with PLAIN auth when credentials are configured, a plain
/// connection otherwise.
fn build_transport(config: &Config) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
    let smtp = &config.smtp;
    let auth = &config.auth;
    let transport = if !auth.username.is_empty() && !auth.password.is_empty() {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .context("building SMTP transport")?
            .port(smtp.port)
            .credentials(Credentials::new(
                auth.username.clone(),
                auth.password.clone(),
            ))
            .build()
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
            .port(smtp.port)
            .build()
    };
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RequestMeta;
    use std::collections::HashMap;

    fn write_templates(dir: &std::path::Path) {
        std::fs::write(
            dir.join("customer.txt"),
            "Hello {{ form_data.name }}, thanks for writing about {{ form_data.subject }}.",
        )
        .unwrap();
        std::fs::write(
            dir.join("customer.html"),
            "<p>Hello {{ form_data.name }}</p>",
        )
        .unwrap();
        std::fs::write(
            dir.join("system.txt"),
            "From {{ remote_ip }} ({{ user_agent }}): {{ form_data.feedback }}",
        )
        .unwrap();
        std::fs::write(
            dir.join("system.html"),
            "<p>{{ form_data.feedback }}</p>",
        )
        .unwrap();
    }

    fn template_data() -> EmailTemplateData {
        let mut form_data = HashMap::new();
        form_data.insert("name".to_string(), "Joe Blogs".to_string());
        form_data.insert("email".to_string(), "joe@example.com".to_string());
        form_data.insert("subject".to_string(), "Hello".to_string());
        form_data.insert("feedback".to_string(), "Good job!".to_string());
        let meta = RequestMeta {
            remote_ip: "192.0.2.1".to_string(),
            x_forwarded_for: String::new(),
            user_agent: "tester".to_string(),
        };
        EmailTemplateData {
            form_data,
            user_agent: meta.user_agent,
            remote_ip: meta.remote_ip,
            x_forwarded_for: meta.x_forwarded_for,
        }
    }

    fn emailer_with_templates(dir: &std::path::Path) -> Emailer {
        let mut config = Config::default();
        config.templates.dir = dir.to_str().unwrap().to_string();
        Emailer::new(Arc::new(config)).unwrap()
    }

    #[tokio::test]
    async fn test_render_templates() {
        let dir = tempfile::TempDir::new().unwrap();
        write_templates(dir.path());
        let emailer = emailer_with_templates(dir.path());

        let data = template_data();
        assert_eq!(
            emailer.render(CUSTOMER_TEXT, &data).unwrap(),
            "Hello Joe Blogs, thanks for writing about Hello."
        );
        assert_eq!(
            emailer.render(SYSTEM_TEXT, &data).unwrap(),
            "From 192.0.2.1 (tester): Good job!"
        );
    }

    #[test]
    fn test_missing_template_fails_construction() {
        let dir = tempfile::TempDir::new().unwrap();
        // no template files written
        let mut config = Config::default();
        config.templates.dir = dir.path().to_str().unwrap().to_string();
        assert!(Emailer::new(Arc::new(config)).is_err());
    }

    #[tokio::test]
    async fn test_customer_message_addresses_submitter() {
        let dir = tempfile::TempDir::new().unwrap();
        write_templates(dir.path());
        let emailer = emailer_with_templates(dir.path());

        let message = emailer.customer_message(&template_data()).unwrap();
        let rendered = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(rendered.contains("joe@example.com"));
        assert!(rendered.contains("Thank you for your feedback"));
        assert!(rendered.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_customer_message_requires_email_field() {
        let dir = tempfile::TempDir::new().unwrap();
        write_templates(dir.path());
        let emailer = emailer_with_templates(dir.path());

        let mut data = template_data();
        data.form_data.remove("email");
        assert!(emailer.customer_message(&data).is_err());
    }

    #[tokio::test]
    async fn test_system_message_uses_configured_recipient() {
        let dir = tempfile::TempDir::new().unwrap();
        write_templates(dir.path());
        let emailer = emailer_with_templates(dir.path());

        let message = emailer.system_message(&template_data()).unwrap();
        let rendered = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(rendered.contains("feedback@example.com"));
        assert!(rendered.contains("New feedback form submission"));
    }
}
