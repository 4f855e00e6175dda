//! Inbound request model and parameter extraction.
//!
//! The request is expected to have passed schema validation upstream, so
//! extraction never fails. [`parse_validate_request`] decodes a SOAP
//! envelope for callers that receive raw bytes instead of a bound object.

use crate::error::StubError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Validate payment arrangement request, reduced to the fields the stub reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateArrangementRequest {
    pub account_identifier: AccountIdentifier,
}

/// Identifier of the account the arrangement is drawn against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountIdentifier {
    /// Account identifier as supplied (IBAN or domestic account number)
    pub identifier: Option<String>,
    /// Identifier scheme context
    pub context: IdentifierContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierContext {
    /// Scheme code distinguishing international from domestic identifiers
    pub code_value: String,
}

impl ValidateArrangementRequest {
    pub fn new(identifier: Option<&str>, code_value: &str) -> Self {
        Self {
            account_identifier: AccountIdentifier {
                identifier: identifier.map(String::from),
                context: IdentifierContext {
                    code_value: code_value.to_string(),
                },
            },
        }
    }
}

/// Normalized parameters used for scenario matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub identifier: Option<String>,
    pub code_value: String,
    /// Length of `identifier`, 0 when absent
    pub number_of_digits: usize,
}

/// Pull the matching parameters out of a request.
pub fn extract(request: &ValidateArrangementRequest) -> RequestParams {
    let account = &request.account_identifier;
    let number_of_digits = account
        .identifier
        .as_deref()
        .map(|id| id.chars().count())
        .unwrap_or(0);

    let params = RequestParams {
        identifier: account.identifier.clone(),
        code_value: account.context.code_value.clone(),
        number_of_digits,
    };

    debug!(
        identifier = ?params.identifier,
        code_value = %params.code_value,
        number_of_digits = params.number_of_digits,
        "Extracted request parameters"
    );

    params
}

/// Decode a validate arrangement SOAP request.
///
/// Elements are matched by local name so any namespace prefix is accepted.
pub fn parse_validate_request(data: &[u8]) -> Result<ValidateArrangementRequest, StubError> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| StubError::InvalidRequest(format!("Invalid UTF-8: {}", e)))?;

    // Text is kept verbatim, identifiers are matched without normalization
    let mut reader = Reader::from_str(xml_str);

    let mut path: Vec<String> = Vec::new();
    let mut seen_account = false;
    let mut identifier = CapturedText::default();
    let mut code_value = CapturedText::default();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                path.push(local_name_str(e));
                seen_account |= is_account_identifier(&path);
                if let Some(field) = select_field(&path, &mut identifier, &mut code_value) {
                    field.open();
                }
            }

            Ok(Event::Empty(ref e)) => {
                path.push(local_name_str(e));
                seen_account |= is_account_identifier(&path);
                if let Some(field) = select_field(&path, &mut identifier, &mut code_value) {
                    field.open();
                    field.close();
                }
                path.pop();
            }

            Ok(Event::End(_)) => {
                if let Some(field) = select_field(&path, &mut identifier, &mut code_value) {
                    field.close();
                }
                path.pop();
            }

            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| {
                    StubError::InvalidRequest(format!("XML parse error: {}", e))
                })?;
                if let Some(field) = select_field(&path, &mut identifier, &mut code_value) {
                    field.push(&text);
                }
            }

            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e);
                if let Some(field) = select_field(&path, &mut identifier, &mut code_value) {
                    field.push(&text);
                }
            }

            Ok(Event::DocType(_)) => {
                return Err(StubError::InvalidRequest(
                    "DOCTYPE declarations are not allowed".to_string(),
                ));
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(StubError::InvalidRequest(format!("XML parse error: {}", e)));
            }

            _ => {}
        }

        buf.clear();
    }

    if !path.is_empty() {
        return Err(StubError::InvalidRequest(format!(
            "unclosed element <{}>",
            path.join("/")
        )));
    }
    if !seen_account {
        return Err(StubError::InvalidRequest(
            "missing accountIdentifier element".to_string(),
        ));
    }
    let code_value = code_value.value.ok_or_else(|| {
        StubError::InvalidRequest(
            "missing accountIdentifier/context/codeValue element".to_string(),
        )
    })?;

    Ok(ValidateArrangementRequest {
        account_identifier: AccountIdentifier {
            identifier: identifier.value,
            context: IdentifierContext { code_value },
        },
    })
}

/// Text of the first occurrence of a request field. Later occurrences
/// are ignored.
#[derive(Debug, Default)]
struct CapturedText {
    value: Option<String>,
    open: bool,
}

impl CapturedText {
    fn open(&mut self) {
        if self.value.is_none() {
            self.value = Some(String::new());
            self.open = true;
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn push(&mut self, text: &str) {
        if let (true, Some(value)) = (self.open, self.value.as_mut()) {
            value.push_str(text);
        }
    }
}

fn is_account_identifier(path: &[String]) -> bool {
    path.last().map(String::as_str) == Some("accountIdentifier")
}

fn select_field<'a>(
    path: &[String],
    identifier: &'a mut CapturedText,
    code_value: &'a mut CapturedText,
) -> Option<&'a mut CapturedText> {
    if ends_with(path, &["accountIdentifier", "identifier"]) {
        Some(identifier)
    } else if ends_with(path, &["accountIdentifier", "context", "codeValue"]) {
        Some(code_value)
    } else {
        None
    }
}

fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart) -> String {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .unwrap_or("")
        .to_string()
}
