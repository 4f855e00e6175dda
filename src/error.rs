//! Error types for the arrangement stub.

use thiserror::Error;

/// Failures raised while loading, querying or rendering the response template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template resource missing: {0}")]
    ResourceMissing(String),

    #[error("template is not well-formed XML: {0}")]
    Parse(String),

    #[error("path expression '{expression}' failed: {reason}")]
    PathEvaluation { expression: String, reason: String },

    #[error("failed to serialize response document: {0}")]
    Serialization(String),
}

impl TemplateError {
    pub(crate) fn path(expression: &str, reason: impl Into<String>) -> Self {
        Self::PathEvaluation {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Arrangement stub errors.
#[derive(Error, Debug)]
pub enum StubError {
    /// Any template failure during business rule processing. No partial
    /// response is written when this is returned.
    #[error("business rule processing failed: {0}")]
    BusinessRule(#[from] TemplateError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a SOAP 1.1 server fault carrying `message`.
pub fn soap_fault_response(message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>{}</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        xml_escape(message)
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
