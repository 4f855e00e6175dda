//! Stub responder for the validate payment arrangement SOAP operation.
//!
//! Classifies a request by its account identifier against a fixed table of
//! test scenarios and rewrites the status fields of a canned response
//! envelope to match.
//!
//! # Features
//!
//! - Long form (IBAN) and short form (account number) identifier matching
//! - First-match-wins scenario table
//! - Namespace-agnostic template rewriting by element local name
//! - Fresh transaction id on every response
//!
//! # Example
//!
//! ```ignore
//! use arrangement_stub::{ArrangementResponder, OutboundMessage, ValidateArrangementRequest};
//!
//! let responder = ArrangementResponder::bundled();
//! let request = ValidateArrangementRequest::new(Some("GB29NWBK60161331926801"), "IBAN");
//! let mut outbound = OutboundMessage::new("text/xml; charset=utf-8");
//! responder.apply_business_rules(&request, &mut outbound)?;
//! ```

pub mod config;
pub mod error;
pub mod request;
pub mod responder;
pub mod scenario;
pub mod template;
pub mod transaction;

pub use config::StubConfig;
pub use error::{StubError, TemplateError};
pub use request::{extract, parse_validate_request, RequestParams, ValidateArrangementRequest};
pub use responder::{ArrangementResponder, OutboundMessage, ResponderStats};
pub use scenario::{ResponseConfig, ScenarioMatcher};
pub use template::{BundledTemplate, FileTemplate, TemplateMutator, TemplateSource};
pub use transaction::{RandomTransactionIds, TransactionIdGenerator};
