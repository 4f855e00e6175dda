//! Scenario table and matching.
//!
//! Each [`Scenario`] pairs an international (IBAN) identifier with its
//! domestic account number suffix. Either form selects the same canned
//! [`ResponseConfig`]. The table is evaluated in declaration order and the
//! first matching scenario wins.

use crate::request::RequestParams;
use std::borrow::Cow;
use tracing::debug;

/// Account status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    DomesticRestricted,
    DomesticUnrestricted,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomesticRestricted => "DOMESTIC_RESTRICTED",
            Self::DomesticUnrestricted => "DOMESTIC_UNRESTRICTED",
        }
    }
}

/// Account switching status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchingStatus {
    Switched,
    NotSwitched,
}

impl SwitchingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switched => "SWITCHED",
            Self::NotSwitched => "NOT_SWITCHED",
        }
    }
}

/// Modulus check status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulusCheckStatus {
    Pass,
    Failed,
}

impl ModulusCheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Failed => "FAILED",
        }
    }
}

/// Status codes written into the response for a matched scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConfig {
    pub account_status: AccountStatus,
    pub switching_status: SwitchingStatus,
    pub modulus_check_status: ModulusCheckStatus,
}

impl ResponseConfig {
    pub const fn new(
        account_status: AccountStatus,
        switching_status: SwitchingStatus,
        modulus_check_status: ModulusCheckStatus,
    ) -> Self {
        Self {
            account_status,
            switching_status,
            modulus_check_status,
        }
    }
}

/// One identifier form accepted by a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRule {
    pub identifier: &'static str,
    pub length: usize,
    /// Required scheme code, if any
    pub code: Option<&'static str>,
}

impl IdentifierRule {
    pub const fn new(identifier: &'static str, length: usize) -> Self {
        Self {
            identifier,
            length,
            code: None,
        }
    }

    pub const fn with_code(self, code: &'static str) -> Self {
        Self {
            identifier: self.identifier,
            length: self.length,
            code: Some(code),
        }
    }

    /// Exact, case-sensitive comparison. No trimming.
    pub fn matches(&self, params: &RequestParams) -> bool {
        params.number_of_digits == self.length
            && params.identifier.as_deref() == Some(self.identifier)
            && self.code.map_or(true, |code| params.code_value == code)
    }
}

/// A row of the scenario table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub long_form: IdentifierRule,
    pub short_form: IdentifierRule,
    pub result: ResponseConfig,
}

impl Scenario {
    /// Check both identifier forms, long form first.
    pub fn matches(&self, params: &RequestParams) -> bool {
        self.long_form.matches(params) || self.short_form.matches(params)
    }
}

/// Built-in test scenarios.
pub static SCENARIOS: [Scenario; 4] = [
    Scenario {
        name: "restricted-switched-pass",
        long_form: IdentifierRule::new("GB29NWBK60161331926801", 22),
        short_form: IdentifierRule::new("31926801", 8),
        result: ResponseConfig::new(
            AccountStatus::DomesticRestricted,
            SwitchingStatus::Switched,
            ModulusCheckStatus::Pass,
        ),
    },
    Scenario {
        name: "unrestricted-not-switched-pass",
        long_form: IdentifierRule::new("GB82WEST12345698765432", 22),
        short_form: IdentifierRule::new("98765432", 8),
        result: ResponseConfig::new(
            AccountStatus::DomesticUnrestricted,
            SwitchingStatus::NotSwitched,
            ModulusCheckStatus::Pass,
        ),
    },
    Scenario {
        name: "restricted-not-switched-failed",
        long_form: IdentifierRule::new("GB33BUKB20201555555555", 22),
        short_form: IdentifierRule::new("55555555", 8),
        result: ResponseConfig::new(
            AccountStatus::DomesticRestricted,
            SwitchingStatus::NotSwitched,
            ModulusCheckStatus::Failed,
        ),
    },
    Scenario {
        name: "unrestricted-switched-failed",
        long_form: IdentifierRule::new("GB94BARC10201530093459", 22),
        short_form: IdentifierRule::new("30093459", 8),
        result: ResponseConfig::new(
            AccountStatus::DomesticUnrestricted,
            SwitchingStatus::Switched,
            ModulusCheckStatus::Failed,
        ),
    },
];

/// Ordered, first-match-wins scenario lookup.
#[derive(Debug, Clone)]
pub struct ScenarioMatcher {
    scenarios: Cow<'static, [Scenario]>,
}

impl Default for ScenarioMatcher {
    fn default() -> Self {
        Self {
            scenarios: Cow::Borrowed(&SCENARIOS[..]),
        }
    }
}

impl ScenarioMatcher {
    /// Matcher over the built-in scenario table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher over a custom table, evaluated in the given order.
    pub fn with_scenarios(scenarios: Vec<Scenario>) -> Self {
        Self {
            scenarios: Cow::Owned(scenarios),
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Find the response configuration for `params`.
    ///
    /// `None` is the normal outcome for identifiers outside the table.
    pub fn match_params(&self, params: &RequestParams) -> Option<ResponseConfig> {
        match self.scenarios.iter().find(|s| s.matches(params)) {
            Some(scenario) => {
                debug!(
                    scenario = scenario.name,
                    identifier = ?params.identifier,
                    "Scenario matched"
                );
                Some(scenario.result)
            }
            None => {
                debug!(
                    identifier = ?params.identifier,
                    number_of_digits = params.number_of_digits,
                    "No scenario matched, template defaults apply"
                );
                None
            }
        }
    }
}
