//! Response orchestration.
//!
//! Drives a single validate arrangement invocation: load and parse the
//! template, classify the request, stamp a transaction id and the matched
//! status codes, and write the rendered document into the outbound message.

use crate::error::{StubError, TemplateError};
use crate::request::{extract, ValidateArrangementRequest};
use crate::scenario::ScenarioMatcher;
use crate::template::{BundledTemplate, ResponseDocument, TemplateMutator, TemplateSource};
use crate::transaction::{RandomTransactionIds, TransactionIdGenerator};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

/// Carrier for the outbound SOAP payload. Built by the caller; the
/// responder only replaces its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub payload: Vec<u8>,
    pub content_type: String,
}

impl OutboundMessage {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            payload: Vec::new(),
            content_type: content_type.into(),
        }
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }
}

/// Snapshot of responder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponderStats {
    pub responses_generated: u64,
    pub requests_unmatched: u64,
    pub failures: u64,
}

/// Stub responder for the validate payment arrangement operation.
///
/// Holds no per-request state; every call parses its own copy of the
/// template, so a responder can be shared across threads.
pub struct ArrangementResponder<S = BundledTemplate, G = RandomTransactionIds> {
    template: S,
    transaction_ids: G,
    matcher: ScenarioMatcher,
    mutator: TemplateMutator,
    /// Metrics tracking
    responses_generated: AtomicU64,
    requests_unmatched: AtomicU64,
    failures: AtomicU64,
}

impl ArrangementResponder {
    /// Responder over the bundled template and built-in scenarios.
    pub fn bundled() -> Self {
        Self::new(BundledTemplate, RandomTransactionIds)
    }
}

impl<S: TemplateSource, G: TransactionIdGenerator> ArrangementResponder<S, G> {
    pub fn new(template: S, transaction_ids: G) -> Self {
        Self {
            template,
            transaction_ids,
            matcher: ScenarioMatcher::new(),
            mutator: TemplateMutator::default(),
            responses_generated: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn with_matcher(mut self, matcher: ScenarioMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_mutator(mut self, mutator: TemplateMutator) -> Self {
        self.mutator = mutator;
        self
    }

    /// Apply the scenario rules to `request` and write the response into
    /// `outbound`.
    ///
    /// `request` must already have passed schema validation. On error the
    /// outbound payload is left untouched.
    pub fn apply_business_rules(
        &self,
        request: &ValidateArrangementRequest,
        outbound: &mut OutboundMessage,
    ) -> Result<(), StubError> {
        match self.render(request) {
            Ok(payload) => {
                outbound.set_payload(payload);
                self.responses_generated.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Failed to apply business rules");
                Err(StubError::BusinessRule(e))
            }
        }
    }

    pub fn stats(&self) -> ResponderStats {
        ResponderStats {
            responses_generated: self.responses_generated.load(Ordering::Relaxed),
            requests_unmatched: self.requests_unmatched.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn render(&self, request: &ValidateArrangementRequest) -> Result<Vec<u8>, TemplateError> {
        let template = self.template.load()?;
        let mut document = ResponseDocument::parse(&template)?;

        let params = extract(request);
        let config = self.matcher.match_params(&params);
        if config.is_none() {
            self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
        }

        let transaction_id = self.transaction_ids.generate();
        info!(
            transaction_id = %transaction_id,
            matched = config.is_some(),
            "Generating validate arrangement response"
        );

        self.mutator
            .apply(&mut document, config.as_ref(), &transaction_id)?;

        let payload = document.to_bytes()?;
        debug!(bytes = payload.len(), "Response rendered");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{
        InMemoryTemplate, LocalNamePath, TargetPaths, ACCOUNT_STATUS_PATH, TRANSACTION_ID_PATH,
    };
    use std::borrow::Cow;

    struct FixedIds(&'static str);

    impl TransactionIdGenerator for FixedIds {
        fn generate(&self) -> String {
            self.0.to_string()
        }
    }

    struct MissingTemplate;

    impl TemplateSource for MissingTemplate {
        fn load(&self) -> Result<Cow<'_, [u8]>, TemplateError> {
            Err(TemplateError::ResourceMissing("validate_arrangement_response.xml".to_string()))
        }
    }

    fn text(payload: &[u8], expression: &str) -> Option<String> {
        let doc = ResponseDocument::parse(payload).unwrap();
        doc.text(&LocalNamePath::parse(expression).unwrap()).unwrap()
    }

    #[test]
    fn test_matched_request() {
        let responder = ArrangementResponder::new(BundledTemplate, FixedIds("3flSfixedh"));
        let request = ValidateArrangementRequest::new(Some("GB29NWBK60161331926801"), "IBAN");
        let mut outbound = OutboundMessage::new("text/xml");

        responder.apply_business_rules(&request, &mut outbound).unwrap();

        assert_eq!(text(&outbound.payload, TRANSACTION_ID_PATH).as_deref(), Some("3flSfixedh"));
        assert_eq!(
            text(&outbound.payload, ACCOUNT_STATUS_PATH).as_deref(),
            Some("DOMESTIC_RESTRICTED")
        );
        assert_eq!(outbound.content_type, "text/xml");
        assert_eq!(
            responder.stats(),
            ResponderStats {
                responses_generated: 1,
                requests_unmatched: 0,
                failures: 0,
            }
        );
    }

    #[test]
    fn test_unmatched_request_counts() {
        let responder = ArrangementResponder::bundled();
        let request = ValidateArrangementRequest::new(Some("99999999"), "BBAN");
        let mut outbound = OutboundMessage::default();

        responder.apply_business_rules(&request, &mut outbound).unwrap();

        assert!(!outbound.payload.is_empty());
        assert_eq!(responder.stats().requests_unmatched, 1);
        assert_eq!(responder.stats().responses_generated, 1);
    }

    #[test]
    fn test_missing_template_leaves_payload() {
        let responder = ArrangementResponder::new(MissingTemplate, RandomTransactionIds);
        let request = ValidateArrangementRequest::new(Some("31926801"), "BBAN");
        let mut outbound = OutboundMessage::default();
        outbound.set_payload(b"previous".to_vec());

        let err = responder.apply_business_rules(&request, &mut outbound).unwrap_err();

        assert!(matches!(
            err,
            StubError::BusinessRule(TemplateError::ResourceMissing(_))
        ));
        assert_eq!(outbound.payload, b"previous");
        assert_eq!(responder.stats().failures, 1);
        assert_eq!(responder.stats().responses_generated, 0);
    }

    #[test]
    fn test_malformed_template_fails() {
        let responder = ArrangementResponder::new(
            InMemoryTemplate(b"<Envelope><Body></Envelope>".to_vec()),
            RandomTransactionIds,
        );
        let request = ValidateArrangementRequest::new(Some("31926801"), "BBAN");
        let mut outbound = OutboundMessage::default();

        let err = responder.apply_business_rules(&request, &mut outbound).unwrap_err();
        assert!(matches!(err, StubError::BusinessRule(TemplateError::Parse(_))));
        assert!(outbound.payload.is_empty());
    }

    #[test]
    fn test_custom_mutator_targets() {
        let mutator = TemplateMutator::new(&TargetPaths {
            account_status: "//responseStatus/code".to_string(),
            ..Default::default()
        })
        .unwrap();
        let responder = ArrangementResponder::new(BundledTemplate, FixedIds("3flSfixedh"))
            .with_mutator(mutator);
        let request = ValidateArrangementRequest::new(Some("31926801"), "BBAN");
        let mut outbound = OutboundMessage::default();

        responder.apply_business_rules(&request, &mut outbound).unwrap();

        assert_eq!(
            text(&outbound.payload, "//responseStatus/code").as_deref(),
            Some("DOMESTIC_RESTRICTED")
        );
        assert_eq!(
            text(&outbound.payload, ACCOUNT_STATUS_PATH).as_deref(),
            Some("DOMESTIC_UNRESTRICTED")
        );
    }

    #[test]
    fn test_responder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArrangementResponder>();
    }
}
