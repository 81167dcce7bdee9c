use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Document families the engine knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    W2,
    Form1040,
    Form1099Nec,
    Form1099Div,
    Paystub,
    Other,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::W2 => "w2",
            DocumentType::Form1040 => "1040",
            DocumentType::Form1099Nec => "1099_nec",
            DocumentType::Form1099Div => "1099_div",
            DocumentType::Paystub => "paystub",
            DocumentType::Other => "other",
        }
    }
}

/// Extraction source that produced a candidate observation.
///
/// Priority order for tie-breaking is the declaration order: structured
/// queries outrank forms, forms outrank tables, and the LLM ranks last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Query,
    Form,
    Table,
    Regex,
    Geometry,
    Llm,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            SourceKind::Query => "query",
            SourceKind::Form => "form",
            SourceKind::Table => "table",
            SourceKind::Regex => "regex",
            SourceKind::Geometry => "geometry",
            SourceKind::Llm => "llm",
        }
    }
}

/// Value family a field's schema declares, driving normalization and
/// plausibility scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Money,
    Ssn,
    Ein,
    Date,
    Text,
    Code,
    Boolean,
}

/// Pixel-space location of an observation on its page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// One untrusted observation of a field's value from one extraction source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub field_key: String,
    pub value: String,
    pub confidence: f32,
    pub source: SourceKind,
    pub page: u32,
    pub geometry: Option<BoundingBox>,
}

impl Candidate {
    pub fn new(
        field_key: impl Into<String>,
        value: impl Into<String>,
        confidence: f32,
        source: SourceKind,
    ) -> Self {
        Self {
            field_key: field_key.into(),
            value: value.into(),
            confidence,
            source,
            page: 1,
            geometry: None,
        }
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// The single value the engine commits to for a field after scoring all
/// candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub field_key: String,
    pub value: String,
    pub confidence: f32,
    pub source: SourceKind,
    pub cross_validated: bool,
}

impl ResolvedField {
    /// Numeric view of the normalized value, when it has one.
    pub fn amount(&self) -> Option<f64> {
        self.value.parse::<f64>().ok()
    }
}

/// Audit record kept when Layer 2 disagrees with an already-resolved field.
/// The retained value is never silently overwritten; both sides are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field_key: String,
    pub retained: ResolvedField,
    pub challenger: Candidate,
}

/// Escalation tiers the pipeline may run for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtractionLayer {
    Deterministic,
    Llm,
    RegexFallback,
}

impl ExtractionLayer {
    pub const fn label(self) -> &'static str {
        match self {
            ExtractionLayer::Deterministic => "layer1_deterministic",
            ExtractionLayer::Llm => "layer2_llm",
            ExtractionLayer::RegexFallback => "layer3_regex",
        }
    }
}

/// Overall outcome of a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

/// Derived result of the consistency rules; recomputed fully on each pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub needs_review: bool,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            status: ValidationStatus::Passed,
            errors: Vec::new(),
            warnings: Vec::new(),
            needs_review: false,
        }
    }
}

/// Aggregate produced by one pipeline invocation. Owns its field map; has no
/// relationship to any other document's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub document_type: DocumentType,
    pub classification_confidence: f32,
    pub resolved_fields: BTreeMap<String, ResolvedField>,
    pub validation: ValidationResult,
    pub layers_used: BTreeSet<ExtractionLayer>,
    pub conflicts: Vec<FieldConflict>,
}

impl ExtractionRecord {
    pub fn field(&self, key: &str) -> Option<&ResolvedField> {
        self.resolved_fields.get(key)
    }

    pub fn amount(&self, key: &str) -> Option<f64> {
        self.field(key).and_then(ResolvedField::amount)
    }
}
