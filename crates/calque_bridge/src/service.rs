//! Position-translated queries against the host language engine.
//!
//! The engine only understands the generated document; every query here is
//! one translate -> delegate -> translate round trip. Engine failures are
//! absorbed at this boundary: a query that cannot be translated or answered
//! degrades to "no result", never to an error surfaced upwards.

use calque_trace::{DocId, SourceRange};

use crate::diagnostics::{DiagnosticKinds, GeneratedDiagnostic};
use crate::virtual_doc::GeneratedView;

/// Error from the host language engine.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The engine process is not running or not ready.
    #[error("language service unavailable")]
    Unavailable,

    /// The engine answered with something unexpected.
    #[error("malformed service response: {0}")]
    Protocol(String),

    /// The request itself failed.
    #[error("service request failed: {0}")]
    Request(String),
}

/// The closed set of position-addressed query variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostQuery {
    /// Type of the expression covering a generated range
    ElementType { range: SourceRange },
    /// Declared type of the symbol covering a generated range
    SymbolType { range: SourceRange },
    /// Members of the type covering a generated range
    TypeProperties { range: SourceRange },
}

/// Type information as reported by the engine. Any range is in generated
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostType {
    /// Rendered type text
    pub display: String,
    /// Range of the typed expression in the generated document, if reported
    pub range: Option<SourceRange>,
}

/// One member of a queried type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProperty {
    /// Member name
    pub name: String,
    /// Rendered type text of the member
    pub type_display: String,
}

/// Engine answer, one variant per query variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAnswer {
    ElementType(Option<HostType>),
    SymbolType(Option<HostType>),
    TypeProperties(Vec<HostProperty>),
}

/// The host language engine, consumed as a black box.
///
/// Documents are addressed by the primary source file's id; the engine is
/// expected to hold the matching generated content for it.
pub trait HostLanguageService {
    /// Diagnostics of the requested kinds against the generated document.
    fn diagnostics(
        &self,
        doc: DocId,
        kinds: DiagnosticKinds,
    ) -> Result<Vec<GeneratedDiagnostic>, ServiceError>;

    /// Answer one position-addressed query against the generated document.
    fn query(&self, doc: DocId, query: HostQuery) -> Result<HostAnswer, ServiceError>;
}

/// A type answer translated back into source terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Rendered type text
    pub display: String,
    /// Where the typed expression lives in real source, when known
    pub source: Option<(DocId, SourceRange)>,
}

/// Translates source positions into the generated document, delegates to the
/// engine, and maps position-bearing answers back.
pub struct QueryBridge<'a> {
    service: &'a dyn HostLanguageService,
}

impl<'a> QueryBridge<'a> {
    /// Wrap an engine.
    pub fn new(service: &'a dyn HostLanguageService) -> Self {
        Self { service }
    }

    /// Type of the expression at a source range.
    ///
    /// The answer's range (if any) is mapped back to source coordinates.
    pub fn element_type(
        &self,
        view: &GeneratedView,
        owner: DocId,
        range: SourceRange,
    ) -> Option<ResolvedType> {
        let generated = view.map.to_generated_range(owner, range)?;
        match self.send(view, HostQuery::ElementType { range: generated })? {
            HostAnswer::ElementType(answer) => answer.map(|host_type| ResolvedType {
                source: host_type
                    .range
                    .and_then(|range| range_to_source(view, range)),
                display: host_type.display,
            }),
            other => unexpected(other),
        }
    }

    /// Declared type of the symbol at a source range.
    ///
    /// The answer is taken as position-independent: only the rendered type
    /// text is meaningful, so nothing is mapped back.
    pub fn symbol_type(
        &self,
        view: &GeneratedView,
        owner: DocId,
        range: SourceRange,
    ) -> Option<String> {
        let generated = view.map.to_generated_range(owner, range)?;
        match self.send(view, HostQuery::SymbolType { range: generated })? {
            HostAnswer::SymbolType(answer) => answer.map(|host_type| host_type.display),
            other => unexpected(other),
        }
    }

    /// Members of the type at a source range.
    ///
    /// Like `symbol_type`, the answer carries no positions to map back.
    pub fn type_properties(
        &self,
        view: &GeneratedView,
        owner: DocId,
        range: SourceRange,
    ) -> Vec<HostProperty> {
        let Some(generated) = view.map.to_generated_range(owner, range) else {
            return Vec::new();
        };
        match self.send(view, HostQuery::TypeProperties { range: generated }) {
            Some(HostAnswer::TypeProperties(properties)) => properties,
            Some(other) => unexpected(other).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn send(&self, view: &GeneratedView, query: HostQuery) -> Option<HostAnswer> {
        match self.service.query(view.map.primary.doc, query) {
            Ok(answer) => Some(answer),
            Err(error) => {
                tracing::debug!(%error, "host service query failed");
                None
            }
        }
    }
}

fn unexpected<T>(answer: HostAnswer) -> Option<T> {
    tracing::debug!(?answer, "host service answered the wrong query variant");
    None
}

fn range_to_source(view: &GeneratedView, range: SourceRange) -> Option<(DocId, SourceRange)> {
    if range.is_empty() {
        return None;
    }
    let (doc, start) = view.map.to_source(range.start)?;
    let (end_doc, last) = view.map.to_source(range.end - 1)?;
    if doc != end_doc {
        return None;
    }
    Some((doc, SourceRange::new(start, last + 1)))
}
