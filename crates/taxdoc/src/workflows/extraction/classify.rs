use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::{CacheKey, ClassificationCache};
use super::domain::DocumentType;

/// Overlap ratio a type must clear to win outright on the priority scan.
const OUTRIGHT_THRESHOLD: f32 = 0.7;

/// Minimum overlap for any classification at all; below this the document is
/// routed to [`DocumentType::Other`].
const CLASSIFICATION_FLOOR: f32 = 0.3;

/// Keyword signature for one document type.
struct TypeSignature {
    document_type: DocumentType,
    keywords: &'static [&'static str],
}

impl TypeSignature {
    fn overlap(&self, haystack: &str) -> f32 {
        let matched = self
            .keywords
            .iter()
            .filter(|keyword| haystack.contains(*keyword))
            .count();
        matched as f32 / self.keywords.len() as f32
    }
}

/// Outcome of document-type routing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub document_type: DocumentType,
    pub confidence: f32,
    pub from_cache: bool,
}

/// Two-stage keyword classifier with an injected header-hash memo.
///
/// Signatures are ordered most specific first so a W-2 is recognised before
/// the 1099 family gets a look.
pub struct DocumentClassifier {
    signatures: Vec<TypeSignature>,
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self {
            signatures: vec![
                TypeSignature {
                    document_type: DocumentType::W2,
                    keywords: &[
                        "w-2",
                        "wage and tax statement",
                        "social security wages",
                        "medicare wages",
                        "employer identification number",
                    ],
                },
                TypeSignature {
                    document_type: DocumentType::Form1099Nec,
                    keywords: &[
                        "1099-nec",
                        "nonemployee compensation",
                        "payer's tin",
                        "recipient's tin",
                    ],
                },
                TypeSignature {
                    document_type: DocumentType::Form1099Div,
                    keywords: &[
                        "1099-div",
                        "dividends and distributions",
                        "ordinary dividends",
                        "qualified dividends",
                    ],
                },
                TypeSignature {
                    document_type: DocumentType::Form1040,
                    keywords: &[
                        "form 1040",
                        "individual income tax return",
                        "adjusted gross income",
                        "filing status",
                        "total tax",
                    ],
                },
                TypeSignature {
                    document_type: DocumentType::Paystub,
                    keywords: &[
                        "earnings statement",
                        "pay period",
                        "gross pay",
                        "net pay",
                        "ytd",
                    ],
                },
            ],
        }
    }

    /// Full two-stage classification, no memoization.
    pub fn classify(&self, raw_text: &str) -> Classification {
        let haystack = raw_text.to_ascii_lowercase();

        let mut best: Option<(DocumentType, f32)> = None;
        for signature in &self.signatures {
            let ratio = signature.overlap(&haystack);
            if ratio > OUTRIGHT_THRESHOLD {
                return Classification {
                    document_type: signature.document_type,
                    confidence: ratio,
                    from_cache: false,
                };
            }
            if best.map_or(true, |(_, best_ratio)| ratio > best_ratio) {
                best = Some((signature.document_type, ratio));
            }
        }

        match best {
            Some((document_type, ratio)) if ratio >= CLASSIFICATION_FLOOR => Classification {
                document_type,
                confidence: ratio,
                from_cache: false,
            },
            Some((_, ratio)) => Classification {
                document_type: DocumentType::Other,
                confidence: ratio,
                from_cache: false,
            },
            None => Classification {
                document_type: DocumentType::Other,
                confidence: 0.0,
                from_cache: false,
            },
        }
    }

    /// Classification with the header-hash memo consulted first. A miss
    /// always falls through to the full scan; the memo is purely a shortcut
    /// for recurring header layouts.
    pub fn classify_cached<C: ClassificationCache>(
        &self,
        cache: &C,
        raw_text: &str,
    ) -> Classification {
        let key = CacheKey::header(raw_text);
        if let Some((document_type, confidence)) = cache.get(&key) {
            debug!(
                document_type = document_type.label(),
                "classification served from header cache"
            );
            return Classification {
                document_type,
                confidence,
                from_cache: true,
            };
        }

        let classification = self.classify(raw_text);
        cache.put(
            key,
            classification.document_type,
            classification.confidence,
        );
        classification
    }
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
