//! Diagnostic collection and relocation back onto real source.
//!
//! Diagnostics arrive positioned against the generated document. Collection
//! maps each one back to its owning source file and rewrites synthetic
//! identifier names out of the message; relocation then anchors a record to
//! the narrowest enclosing syntax element of one concrete file, skipping
//! records that belong to a different file sharing the same logical
//! template.

use bitflags::bitflags;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use calque_trace::{DocId, SourceRange};

use crate::artifact::TranspiledArtifact;
use crate::service::HostLanguageService;
use crate::virtual_doc::GeneratedView;

bitflags! {
    /// Filter over diagnostic kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiagnosticKinds: u8 {
        const SYNTAX = 1 << 0;
        const SEMANTIC = 1 << 1;
        const SUGGESTION = 1 << 2;
    }
}

/// Kind of a single diagnostic, following the host engine's categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Syntax,
    Semantic,
    Suggestion,
}

impl From<DiagnosticKind> for DiagnosticKinds {
    fn from(kind: DiagnosticKind) -> Self {
        match kind {
            DiagnosticKind::Syntax => DiagnosticKinds::SYNTAX,
            DiagnosticKind::Semantic => DiagnosticKinds::SEMANTIC,
            DiagnosticKind::Suggestion => DiagnosticKinds::SUGGESTION,
        }
    }
}

/// Severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A proposed fix carried along with a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    /// User-visible action label
    pub label: String,
}

/// A diagnostic as reported by the host engine, positioned in the generated
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Severity as reported; engines may omit it
    pub severity: Option<Severity>,
    /// Start byte offset in the generated document
    pub start: u32,
    /// End byte offset in the generated document
    pub end: u32,
    pub quick_fixes: Vec<QuickFix>,
}

/// A collected diagnostic, tied to the top-level source file its mapped
/// position belongs to. The range stays in generated coordinates; relocation
/// re-derives source positions from the view it is given.
#[derive(Debug, Clone)]
pub struct DiagnosticRecord {
    pub kind: DiagnosticKind,
    pub message: String,
    pub severity: Option<Severity>,
    /// Range in the generated document
    pub generated: SourceRange,
    /// Owning top-level source file
    pub owner: DocId,
    pub quick_fixes: Vec<QuickFix>,
}

/// The narrowest syntax element enclosing an offset, in file-relative
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxElement {
    pub range: SourceRange,
}

/// Access to a file's syntax tree, injected by the host runtime.
pub trait SyntaxAccess {
    /// The narrowest element containing `offset`, if the tree has one.
    fn find_element_at(&self, doc: DocId, offset: u32) -> Option<SyntaxElement>;
}

/// Coordinate transform for files hosted inside another file (a template
/// held in a string literal of its component, for example).
pub trait InjectionMapper {
    /// Map a hosted file's whole content range into its host's coordinates.
    fn whole_file_range_in_host(&self, doc: DocId) -> Option<SourceRange>;
}

/// A concrete file diagnostics may be anchored into.
#[derive(Debug, Clone, Copy)]
pub struct HostFile {
    pub doc: DocId,
    /// Content length in bytes
    pub length: u32,
}

/// A diagnostic successfully anchored to a syntax element.
#[derive(Debug, Clone)]
pub struct ProblemReport {
    /// The anchoring element
    pub anchor: SyntaxElement,
    /// Highlighted sub-range, relative to the anchor
    pub range_in_anchor: SourceRange,
    pub message: String,
    pub severity: Severity,
    pub quick_fixes: Vec<QuickFix>,
}

/// Outcome of relocating one record into one file.
#[derive(Debug, Clone)]
pub enum Relocation {
    Report(ProblemReport),
    /// The record belongs elsewhere or cannot be anchored here
    Skipped,
}

/// Collects diagnostics from the host engine and relocates them onto real
/// source.
pub struct DiagnosticService;

impl DiagnosticService {
    /// Fetch diagnostics of the requested kinds for the view's generated
    /// document.
    ///
    /// An empty filter returns immediately without touching the engine.
    /// Engine failures degrade to an empty result. Diagnostics that map to
    /// no source position are dropped; messages are rewritten through the
    /// artifact's name maps so synthetic identifiers read as the template
    /// spells them.
    pub fn collect(
        view: &GeneratedView,
        service: &dyn HostLanguageService,
        kinds: DiagnosticKinds,
    ) -> Vec<DiagnosticRecord> {
        if kinds.is_empty() {
            return Vec::new();
        }

        let doc = view.map.primary.doc;
        let raw = match service.diagnostics(doc, kinds) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, "host service diagnostics failed");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter(|diagnostic| kinds.contains(diagnostic.kind.into()))
            .filter_map(|diagnostic| {
                let Some((owner, source_start)) = view.map.to_source(diagnostic.start) else {
                    tracing::debug!(
                        start = diagnostic.start,
                        "dropping diagnostic outside any mapping"
                    );
                    return None;
                };
                let generated =
                    SourceRange::new(diagnostic.start, diagnostic.end.max(diagnostic.start));
                let message = match &view.artifact {
                    Some(artifact) => rewrite_names(
                        &diagnostic.message,
                        artifact,
                        SourceRange::with_len(source_start, generated.len()),
                    ),
                    None => diagnostic.message,
                };
                Some(DiagnosticRecord {
                    kind: diagnostic.kind,
                    message,
                    severity: diagnostic.severity,
                    generated,
                    owner,
                    quick_fixes: diagnostic.quick_fixes,
                })
            })
            .collect()
    }

    /// Anchor one record into `host`, or decide it does not belong there.
    ///
    /// The record's generated range is mapped back to an absolute source
    /// offset; the offset must fall inside the host file's valid window -
    /// its full length when it is the owning top-level file, otherwise the
    /// window the injection transform assigns to it. Records that cannot be
    /// mapped, fall outside the window, or have no enclosing syntax element
    /// are skipped, never errors.
    pub fn relocate(
        record: &DiagnosticRecord,
        host: &HostFile,
        view: &GeneratedView,
        syntax: &dyn SyntaxAccess,
        injection: &dyn InjectionMapper,
    ) -> Relocation {
        let Some((_, source_start)) = view.map.to_source(record.generated.start) else {
            return Relocation::Skipped;
        };

        let valid = if host.doc == record.owner {
            SourceRange::new(0, host.length)
        } else {
            match injection.whole_file_range_in_host(host.doc) {
                Some(range) => range,
                None => return Relocation::Skipped,
            }
        };
        if !valid.contains(source_start) {
            return Relocation::Skipped;
        }

        let relative = source_start - valid.start;
        let Some(anchor) = syntax.find_element_at(host.doc, relative) else {
            tracing::debug!(offset = relative, "no syntax element to anchor diagnostic");
            return Relocation::Skipped;
        };

        let start_in_anchor = relative.saturating_sub(anchor.range.start);
        let available = anchor.range.len().saturating_sub(start_in_anchor);
        let len = record.generated.len().min(available);
        Relocation::Report(ProblemReport {
            anchor,
            range_in_anchor: SourceRange::with_len(start_in_anchor, len),
            message: record.message.clone(),
            severity: record.severity.unwrap_or(Severity::Warning),
            quick_fixes: record.quick_fixes.clone(),
        })
    }
}

/// Replace quoted generated identifiers with their source spelling, using
/// the name maps recorded for the diagnostic's source range.
fn rewrite_names(message: &str, artifact: &TranspiledArtifact, range: SourceRange) -> String {
    let mut message = message.to_string();
    for entry in &artifact.name_maps {
        if entry.source_offset < range.start || entry.source_offset >= range.end {
            continue;
        }
        for (generated, original) in &entry.names {
            let pattern = format!("'{}'", regex::escape(generated));
            if let Ok(re) = Regex::new(&pattern) {
                let replacement = format!("'{original}'");
                message = re.replace_all(&message, NoExpand(&replacement)).into_owned();
            }
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{NameMapEntry, RecordedFile};
    use crate::document::Snapshot;
    use crate::service::{HostAnswer, HostQuery, ServiceError};
    use crate::testing::StaticResolver;
    use crate::virtual_doc::VirtualDocument;
    use calque_trace::MappingRecord;
    use rustc_hash::FxHashMap;
    use std::sync::Arc;

    fn scenario_view(name_maps: Vec<NameMapEntry>) -> GeneratedView {
        let snapshot = Snapshot::new(DocId(0), "a.html", 1, "x".repeat(40));
        let artifact = TranspiledArtifact {
            generated: Arc::from("g".repeat(120)),
            primary: RecordedFile::of(&snapshot),
            associated: Vec::new(),
            records: vec![MappingRecord {
                owner: "a.html".to_string(),
                source_spans: vec![(5, 5), (20, 5)],
                generated_spans: vec![(30, 10), (60, 10)],
            }],
            name_maps,
        };
        let mut doc = VirtualDocument::new(snapshot.doc, snapshot.name.clone());
        doc.set_artifact(Some(Arc::new(artifact)));
        doc.update(&snapshot, &StaticResolver::default())
    }

    struct FixedDiagnostics(Vec<GeneratedDiagnostic>);

    impl HostLanguageService for FixedDiagnostics {
        fn diagnostics(
            &self,
            _doc: DocId,
            _kinds: DiagnosticKinds,
        ) -> Result<Vec<GeneratedDiagnostic>, ServiceError> {
            Ok(self.0.clone())
        }

        fn query(&self, _doc: DocId, _query: HostQuery) -> Result<HostAnswer, ServiceError> {
            Err(ServiceError::Unavailable)
        }
    }

    struct PanickingService;

    impl HostLanguageService for PanickingService {
        fn diagnostics(
            &self,
            _doc: DocId,
            _kinds: DiagnosticKinds,
        ) -> Result<Vec<GeneratedDiagnostic>, ServiceError> {
            panic!("service must not be queried for an empty filter");
        }

        fn query(&self, _doc: DocId, _query: HostQuery) -> Result<HostAnswer, ServiceError> {
            Err(ServiceError::Unavailable)
        }
    }

    struct FailingService;

    impl HostLanguageService for FailingService {
        fn diagnostics(
            &self,
            _doc: DocId,
            _kinds: DiagnosticKinds,
        ) -> Result<Vec<GeneratedDiagnostic>, ServiceError> {
            Err(ServiceError::Unavailable)
        }

        fn query(&self, _doc: DocId, _query: HostQuery) -> Result<HostAnswer, ServiceError> {
            Err(ServiceError::Unavailable)
        }
    }

    struct ElementsAt(Vec<SourceRange>);

    impl SyntaxAccess for ElementsAt {
        fn find_element_at(&self, _doc: DocId, offset: u32) -> Option<SyntaxElement> {
            self.0
                .iter()
                .find(|range| range.contains(offset))
                .map(|&range| SyntaxElement { range })
        }
    }

    struct NoInjection;

    impl InjectionMapper for NoInjection {
        fn whole_file_range_in_host(&self, _doc: DocId) -> Option<SourceRange> {
            None
        }
    }

    struct InjectedAt(SourceRange);

    impl InjectionMapper for InjectedAt {
        fn whole_file_range_in_host(&self, _doc: DocId) -> Option<SourceRange> {
            Some(self.0)
        }
    }

    fn semantic(message: &str, start: u32, end: u32) -> GeneratedDiagnostic {
        GeneratedDiagnostic {
            kind: DiagnosticKind::Semantic,
            message: message.to_string(),
            severity: Some(Severity::Error),
            start,
            end,
            quick_fixes: Vec::new(),
        }
    }

    #[test]
    fn test_generated_diagnostic_serialization() {
        let diagnostic = semantic("bad binding", 62, 64);
        let json = serde_json::to_string(&diagnostic).unwrap();
        let back: GeneratedDiagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, DiagnosticKind::Semantic);
        assert_eq!(back.message, "bad binding");
        assert_eq!(back.start, 62);
        assert_eq!(back.end, 64);
    }

    #[test]
    fn test_empty_filter_skips_the_engine() {
        let view = scenario_view(Vec::new());
        let records =
            DiagnosticService::collect(&view, &PanickingService, DiagnosticKinds::empty());
        assert!(records.is_empty());
    }

    #[test]
    fn test_engine_failure_degrades_to_empty() {
        let view = scenario_view(Vec::new());
        let records =
            DiagnosticService::collect(&view, &FailingService, DiagnosticKinds::SEMANTIC);
        assert!(records.is_empty());
    }

    #[test]
    fn test_collect_maps_owner_and_drops_unmapped() {
        let view = scenario_view(Vec::new());
        let service = FixedDiagnostics(vec![
            semantic("bad binding", 62, 64),
            // Outside every mapped range of the generated document
            semantic("orphan", 0, 2),
        ]);

        let records = DiagnosticService::collect(&view, &service, DiagnosticKinds::SEMANTIC);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner, DocId(0));
        assert_eq!(records[0].generated, SourceRange::new(62, 64));
    }

    #[test]
    fn test_collect_filters_by_kind() {
        let view = scenario_view(Vec::new());
        let mut suggestion = semantic("consider readonly", 62, 64);
        suggestion.kind = DiagnosticKind::Suggestion;
        let service = FixedDiagnostics(vec![semantic("bad binding", 30, 32), suggestion]);

        let records = DiagnosticService::collect(&view, &service, DiagnosticKinds::SEMANTIC);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiagnosticKind::Semantic);
    }

    #[test]
    fn test_collect_rewrites_generated_names() {
        let mut names = FxHashMap::default();
        names.insert("ctx_item".to_string(), "item".to_string());
        let view = scenario_view(vec![NameMapEntry {
            source_offset: 22,
            names,
        }]);
        let service = FixedDiagnostics(vec![semantic(
            "Property 'ctx_item' does not exist on type 'Ctx'",
            62,
            64,
        )]);

        let records = DiagnosticService::collect(&view, &service, DiagnosticKinds::SEMANTIC);
        assert_eq!(
            records[0].message,
            "Property 'item' does not exist on type 'Ctx'"
        );
    }

    #[test]
    fn test_relocate_anchors_into_owning_file() {
        let view = scenario_view(Vec::new());
        let service = FixedDiagnostics(vec![semantic("bad binding", 62, 64)]);
        let records = DiagnosticService::collect(&view, &service, DiagnosticKinds::SEMANTIC);

        // a.html is 40 chars; the element under offset 22 spans [20, 25).
        let host = HostFile {
            doc: DocId(0),
            length: 40,
        };
        let syntax = ElementsAt(vec![SourceRange::new(20, 25)]);
        let relocation =
            DiagnosticService::relocate(&records[0], &host, &view, &syntax, &NoInjection);

        let Relocation::Report(report) = relocation else {
            panic!("expected a report");
        };
        assert_eq!(report.anchor.range, SourceRange::new(20, 25));
        assert_eq!(report.range_in_anchor, SourceRange::new(2, 4));
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.message, "bad binding");
    }

    #[test]
    fn test_relocate_skips_out_of_window_records() {
        let view = scenario_view(Vec::new());
        let record = DiagnosticRecord {
            kind: DiagnosticKind::Semantic,
            message: "bad binding".to_string(),
            severity: None,
            generated: SourceRange::new(62, 64),
            owner: DocId(0),
            quick_fixes: Vec::new(),
        };

        // A different concrete file sharing the logical template, hosted at
        // [100, 140) of its component: source offset 22 is outside.
        let host = HostFile {
            doc: DocId(7),
            length: 40,
        };
        let syntax = ElementsAt(vec![SourceRange::new(0, 40)]);
        let relocation = DiagnosticService::relocate(
            &record,
            &host,
            &view,
            &syntax,
            &InjectedAt(SourceRange::new(100, 140)),
        );
        assert!(matches!(relocation, Relocation::Skipped));

        // And with no injection window at all, nothing can be decided.
        let relocation =
            DiagnosticService::relocate(&record, &host, &view, &syntax, &NoInjection);
        assert!(matches!(relocation, Relocation::Skipped));
    }

    #[test]
    fn test_relocate_inside_injection_window() {
        let view = scenario_view(Vec::new());
        let record = DiagnosticRecord {
            kind: DiagnosticKind::Semantic,
            message: "bad binding".to_string(),
            severity: None,
            generated: SourceRange::new(62, 64),
            owner: DocId(0),
            quick_fixes: Vec::new(),
        };

        // The template fragment occupies [10, 50) of its host; mapped source
        // offset 22 becomes fragment-relative offset 12.
        let host = HostFile {
            doc: DocId(7),
            length: 40,
        };
        let syntax = ElementsAt(vec![SourceRange::new(10, 15)]);
        let relocation = DiagnosticService::relocate(
            &record,
            &host,
            &view,
            &syntax,
            &InjectedAt(SourceRange::new(10, 50)),
        );

        let Relocation::Report(report) = relocation else {
            panic!("expected a report");
        };
        assert_eq!(report.anchor.range, SourceRange::new(10, 15));
        assert_eq!(report.range_in_anchor, SourceRange::new(2, 4));
        // No severity hint on the record: default to a warning.
        assert_eq!(report.severity, Severity::Warning);
    }

    #[test]
    fn test_relocate_skips_unanchorable_records() {
        let view = scenario_view(Vec::new());
        let service = FixedDiagnostics(vec![semantic("bad binding", 62, 64)]);
        let records = DiagnosticService::collect(&view, &service, DiagnosticKinds::SEMANTIC);

        let host = HostFile {
            doc: DocId(0),
            length: 40,
        };
        let relocation = DiagnosticService::relocate(
            &records[0],
            &host,
            &view,
            &ElementsAt(Vec::new()),
            &NoInjection,
        );
        assert!(matches!(relocation, Relocation::Skipped));
    }
}
