//! src/domain/alert.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Alert subject is required.")]
    EmptySubject,
    #[error("Alert body is required.")]
    EmptyBody,
}

#[derive(Debug, Clone)]
pub struct AlertMessage {
    subject: String,
    body: String,
}

impl AlertMessage {
    pub fn parse(subject: String, body: String) -> Result<Self, Error> {
        if subject.trim().is_empty() {
            return Err(Error::EmptySubject);
        }
        if body.trim().is_empty() {
            return Err(Error::EmptyBody);
        }

        Ok(Self { subject, body })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// The content actually handed to a mail transport, identical for every
/// recipient of one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEmail {
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
}

#[derive(Debug, Clone)]
pub struct AlertTemplate {
    website_url: String,
}

impl AlertTemplate {
    pub fn new(website_url: String) -> Self {
        Self { website_url }
    }

    /// The body is trusted operator content and goes into the HTML part as
    /// given; only the subject is escaped.
    pub fn render(&self, message: &AlertMessage) -> AlertEmail {
        let html_content = format!(
            "<h2>{}</h2>\n<p>{}</p>\n<p><a href=\"{}\" target=\"_blank\">Visit us</a></p>",
            htmlescape::encode_minimal(message.subject()),
            message.body(),
            htmlescape::encode_minimal(&self.website_url),
        );

        let text_content = format!(
            "{}\n\nVisit our website to check it out: {}\n\n\
            To unsubscribe, please use the unsubscribe option on our site.",
            message.body(),
            self.website_url,
        );

        AlertEmail {
            subject: message.subject().to_string(),
            html_content,
            text_content,
        }
    }
}
