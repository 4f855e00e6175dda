//! Response template handling.
//!
//! Targets are located with [`LocalNamePath`] expressions that compare
//! element local names only, so the prefixes and namespace bindings used by
//! a template do not matter.

use crate::error::TemplateError;
use crate::scenario::ResponseConfig;
use quick_xml::events::{BytesEnd, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TRANSACTION_ID_PATH: &str = "//transactionId";
pub const ACCOUNT_STATUS_PATH: &str = "//accountingUnits//status/code";
pub const SWITCHING_STATUS_PATH: &str = "//switchingStatus/code";
pub const MODULUS_CHECK_STATUS_PATH: &str = "//modulusCheckStatus/code";

const BUNDLED_TEMPLATE: &[u8] = include_bytes!("../resources/validate_arrangement_response.xml");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Local(String),
}

impl NameTest {
    fn accepts(&self, local_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Local(name) => name == local_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
}

/// Absolute path over element local names.
///
/// `/name` selects a child, `//name` any descendant, and `*` matches any
/// element. `//accountingUnits//status/code` selects a `code` element whose
/// parent is a `status` somewhere below an `accountingUnits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNamePath {
    expression: String,
    steps: Vec<Step>,
}

impl LocalNamePath {
    pub fn parse(expression: &str) -> Result<Self, TemplateError> {
        if expression.is_empty() {
            return Err(TemplateError::path(expression, "empty expression"));
        }
        if !expression.starts_with('/') {
            return Err(TemplateError::path(
                expression,
                "expression must start with '/' or '//'",
            ));
        }

        let mut steps = Vec::new();
        let mut rest = expression;
        while !rest.is_empty() {
            let (axis, after) = match rest.strip_prefix("//") {
                Some(after) => (Axis::Descendant, after),
                None => (Axis::Child, &rest[1..]),
            };
            let end = after.find('/').unwrap_or(after.len());
            let test = parse_name_test(expression, &after[..end])?;
            steps.push(Step { axis, test });
            rest = &after[end..];
        }

        Ok(Self {
            expression: expression.to_string(),
            steps,
        })
    }

    /// Build from steps whose names are known to be valid.
    fn from_steps(expression: &str, steps: &[(Axis, &str)]) -> Self {
        Self {
            expression: expression.to_string(),
            steps: steps
                .iter()
                .map(|&(axis, name)| Step {
                    axis,
                    test: NameTest::Local(name.to_string()),
                })
                .collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Whether an element with the given ancestor-or-self local names
    /// (root first) is selected.
    pub fn matches<S: AsRef<str>>(&self, chain: &[S]) -> bool {
        matches_from(&self.steps, chain, 0)
    }
}

fn parse_name_test(expression: &str, name: &str) -> Result<NameTest, TemplateError> {
    if name.is_empty() {
        return Err(TemplateError::path(expression, "empty step"));
    }
    if name == "*" {
        return Ok(NameTest::Any);
    }
    if name.contains(':') {
        return Err(TemplateError::path(
            expression,
            format!("prefixed name '{}' not supported, use the local name", name),
        ));
    }

    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err(TemplateError::path(
            expression,
            format!("invalid element name '{}'", name),
        ));
    }

    Ok(NameTest::Local(name.to_string()))
}

fn matches_from<S: AsRef<str>>(steps: &[Step], chain: &[S], pos: usize) -> bool {
    match steps.split_first() {
        None => pos == chain.len(),
        Some((step, rest)) => match step.axis {
            Axis::Child => {
                pos < chain.len()
                    && step.test.accepts(chain[pos].as_ref())
                    && matches_from(rest, chain, pos + 1)
            }
            Axis::Descendant => (pos..chain.len())
                .any(|i| step.test.accepts(chain[i].as_ref()) && matches_from(rest, chain, i + 1)),
        },
    }
}

/// A parsed response document.
///
/// Held as the owned event stream of the template so untouched markup is
/// written back byte for byte.
#[derive(Debug, Clone)]
pub struct ResponseDocument {
    events: Vec<Event<'static>>,
}

impl ResponseDocument {
    pub fn parse(data: &[u8]) -> Result<Self, TemplateError> {
        let mut reader = Reader::from_reader(data);

        let mut events = Vec::new();
        let mut depth = 0usize;
        let mut roots = 0usize;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| TemplateError::Parse(e.to_string()))?;

            match &event {
                Event::Start(_) => {
                    if depth == 0 {
                        roots += 1;
                    }
                    depth += 1;
                }
                Event::Empty(_) if depth == 0 => roots += 1,
                Event::End(_) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| TemplateError::Parse("unexpected end tag".to_string()))?;
                }
                Event::Eof => break,
                _ => {}
            }

            events.push(event.into_owned());
            buf.clear();
        }

        if depth != 0 {
            return Err(TemplateError::Parse(format!(
                "{} element(s) left unclosed",
                depth
            )));
        }
        match roots {
            0 => Err(TemplateError::Parse("no root element".to_string())),
            1 => Ok(Self { events }),
            n => Err(TemplateError::Parse(format!("{} root elements", n))),
        }
    }

    /// Text content of the first element selected by `path`.
    pub fn text(&self, path: &LocalNamePath) -> Result<Option<String>, TemplateError> {
        let Some(start) = self.locate(path) else {
            return Ok(None);
        };
        if let Event::Empty(_) = self.events[start] {
            return Ok(Some(String::new()));
        }

        let end = self.matching_end(start)?;
        let mut text = String::new();
        for event in &self.events[start + 1..end] {
            match event {
                Event::Text(t) => {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| TemplateError::Parse(e.to_string()))?;
                    text.push_str(&unescaped);
                }
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(c)),
                _ => {}
            }
        }
        Ok(Some(text))
    }

    /// Replace the content of the first element selected by `path` with
    /// `value`. Returns `false` when nothing is selected.
    pub fn set_text(&mut self, path: &LocalNamePath, value: &str) -> Result<bool, TemplateError> {
        let Some(start) = self.locate(path) else {
            return Ok(false);
        };
        let text = Event::Text(BytesText::new(value).into_owned());

        let expanded = match &self.events[start] {
            Event::Empty(e) => Some(e.clone()),
            _ => None,
        };
        match expanded {
            Some(open) => {
                let name = String::from_utf8_lossy(open.name().as_ref()).into_owned();
                self.events.splice(
                    start..start + 1,
                    [Event::Start(open), text, Event::End(BytesEnd::new(name))],
                )
                .for_each(drop);
            }
            None => {
                let end = self.matching_end(start)?;
                self.events.splice(start + 1..end, [text]).for_each(drop);
            }
        }
        Ok(true)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event.clone())
                .map_err(|e| TemplateError::Serialization(e.to_string()))?;
        }
        Ok(writer.into_inner())
    }

    /// Index of the first Start/Empty event selected by `path`.
    fn locate(&self, path: &LocalNamePath) -> Option<usize> {
        let mut chain: Vec<String> = Vec::new();
        for (i, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(e) | Event::Empty(e) => {
                    chain.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    if path.matches(&chain) {
                        return Some(i);
                    }
                    if let Event::Empty(_) = event {
                        chain.pop();
                    }
                }
                Event::End(_) => {
                    chain.pop();
                }
                _ => {}
            }
        }
        None
    }

    fn matching_end(&self, start: usize) -> Result<usize, TemplateError> {
        let mut depth = 0usize;
        for (i, event) in self.events.iter().enumerate().skip(start + 1) {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(i),
                Event::End(_) => depth -= 1,
                _ => {}
            }
        }
        Err(TemplateError::Parse("unbalanced element".to_string()))
    }
}

/// Where the response template bytes come from.
pub trait TemplateSource {
    /// Load the template. Called once per response.
    fn load(&self) -> Result<Cow<'_, [u8]>, TemplateError>;
}

/// Template compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplate;

impl TemplateSource for BundledTemplate {
    fn load(&self) -> Result<Cow<'_, [u8]>, TemplateError> {
        Ok(Cow::Borrowed(BUNDLED_TEMPLATE))
    }
}

/// Template read from disk on every load.
#[derive(Debug, Clone)]
pub struct FileTemplate {
    path: PathBuf,
}

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateSource for FileTemplate {
    fn load(&self) -> Result<Cow<'_, [u8]>, TemplateError> {
        std::fs::read(&self.path).map(Cow::Owned).map_err(|e| {
            TemplateError::ResourceMissing(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Template held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryTemplate(pub Vec<u8>);

impl TemplateSource for InMemoryTemplate {
    fn load(&self) -> Result<Cow<'_, [u8]>, TemplateError> {
        Ok(Cow::Borrowed(&self.0))
    }
}

/// Path expressions for the four response fields the stub rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    pub transaction_id: String,
    pub account_status: String,
    pub switching_status: String,
    pub modulus_check_status: String,
}

impl Default for TargetPaths {
    fn default() -> Self {
        Self {
            transaction_id: TRANSACTION_ID_PATH.to_string(),
            account_status: ACCOUNT_STATUS_PATH.to_string(),
            switching_status: SWITCHING_STATUS_PATH.to_string(),
            modulus_check_status: MODULUS_CHECK_STATUS_PATH.to_string(),
        }
    }
}

/// Writes the transaction id and scenario status codes into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMutator {
    transaction_id: LocalNamePath,
    account_status: LocalNamePath,
    switching_status: LocalNamePath,
    modulus_check_status: LocalNamePath,
}

impl Default for TemplateMutator {
    fn default() -> Self {
        use self::Axis::{Child, Descendant};

        Self {
            transaction_id: LocalNamePath::from_steps(
                TRANSACTION_ID_PATH,
                &[(Descendant, "transactionId")],
            ),
            account_status: LocalNamePath::from_steps(
                ACCOUNT_STATUS_PATH,
                &[
                    (Descendant, "accountingUnits"),
                    (Descendant, "status"),
                    (Child, "code"),
                ],
            ),
            switching_status: LocalNamePath::from_steps(
                SWITCHING_STATUS_PATH,
                &[(Descendant, "switchingStatus"), (Child, "code")],
            ),
            modulus_check_status: LocalNamePath::from_steps(
                MODULUS_CHECK_STATUS_PATH,
                &[(Descendant, "modulusCheckStatus"), (Child, "code")],
            ),
        }
    }
}

impl TemplateMutator {
    /// Compile the target expressions. A malformed expression is a
    /// `PathEvaluation` error.
    pub fn new(targets: &TargetPaths) -> Result<Self, TemplateError> {
        Ok(Self {
            transaction_id: LocalNamePath::parse(&targets.transaction_id)?,
            account_status: LocalNamePath::parse(&targets.account_status)?,
            switching_status: LocalNamePath::parse(&targets.switching_status)?,
            modulus_check_status: LocalNamePath::parse(&targets.modulus_check_status)?,
        })
    }

    /// The transaction id is always written. Status codes are written only
    /// when a scenario matched; otherwise the template defaults stay.
    /// Targets missing from the template are skipped.
    pub fn apply(
        &self,
        document: &mut ResponseDocument,
        config: Option<&ResponseConfig>,
        transaction_id: &str,
    ) -> Result<(), TemplateError> {
        set_target(document, &self.transaction_id, transaction_id)?;

        if let Some(config) = config {
            set_target(document, &self.account_status, config.account_status.as_str())?;
            set_target(document, &self.switching_status, config.switching_status.as_str())?;
            set_target(
                document,
                &self.modulus_check_status,
                config.modulus_check_status.as_str(),
            )?;
        }

        Ok(())
    }
}

fn set_target(
    document: &mut ResponseDocument,
    path: &LocalNamePath,
    value: &str,
) -> Result<(), TemplateError> {
    if !document.set_text(path, value)? {
        debug!(path = path.as_str(), "Target node not in template, skipping");
    }
    Ok(())
}
