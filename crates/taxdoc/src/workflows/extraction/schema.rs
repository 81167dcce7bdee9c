use std::collections::BTreeMap;

use regex::Regex;

use super::domain::{DocumentType, ValueType};

/// Declarative description of one logical field in a document type's schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub value_type: ValueType,
    pub required: bool,
    pub query_text: Option<String>,
    pub pattern: Option<Regex>,
    aliases: Vec<String>,
}

impl FieldSpec {
    pub fn matches_label(&self, normalized_label: &str) -> bool {
        self.aliases.iter().any(|alias| alias == normalized_label)
    }

    pub fn matches_query(&self, query: &str) -> bool {
        self.query_text
            .as_deref()
            .is_some_and(|text| text.eq_ignore_ascii_case(query.trim()))
    }
}

/// Coverage policy deciding when Layer-1 extraction is good enough to skip
/// the paid escalation tiers entirely.
#[derive(Debug, Clone)]
pub struct AcceptancePolicy {
    pub core_fields: Vec<String>,
    pub minimum_core_fields: usize,
    pub identity_fields: Vec<String>,
}

/// Read-only field schema for one document type. Compiled once at registry
/// construction; shared by reference across in-flight documents.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub document_type: DocumentType,
    fields: Vec<FieldSpec>,
    critical_fields: Vec<String>,
    acceptance: AcceptancePolicy,
}

impl FieldSchema {
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.key == key)
    }

    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        self.field(key).map(|spec| spec.value_type)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|spec| spec.required)
    }

    /// Fields eligible for the regex safety net after Layers 1-2.
    pub fn critical_fields(&self) -> &[String] {
        &self.critical_fields
    }

    pub fn acceptance(&self) -> &AcceptancePolicy {
        &self.acceptance
    }

    pub fn match_query(&self, query: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.matches_query(query))
    }

    pub fn match_label(&self, label: &str) -> Option<&FieldSpec> {
        let normalized = normalize_label(label);
        self.fields
            .iter()
            .find(|spec| spec.matches_label(&normalized))
    }
}

/// Canonical form used for alias lookups: lowercased, punctuation-trimmed,
/// whitespace-collapsed.
pub fn normalize_label(label: &str) -> String {
    let cleaned = label.replace(['\u{feff}', '\u{200b}'], "");
    let trimmed = cleaned.trim().trim_end_matches([':', '*']).trim();
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Raised when a schema definition cannot be compiled. A missing or invalid
/// schema for a classified type is the one configuration-fatal condition in
/// the engine.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        source: regex::Error,
    },
    #[error("duplicate field key '{key}' in {document_type:?} schema")]
    DuplicateField {
        document_type: DocumentType,
        key: String,
    },
}

/// Immutable set of field schemas, one per supported document type.
/// Hot-swappable only via full replacement.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<DocumentType, FieldSchema>,
}

impl SchemaRegistry {
    /// Build the registry for the supported IRS form family.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut schemas = BTreeMap::new();
        for schema in [
            w2_schema()?,
            form_1040_schema()?,
            form_1099_nec_schema()?,
            form_1099_div_schema()?,
            paystub_schema()?,
        ] {
            schemas.insert(schema.document_type, schema);
        }
        Ok(Self { schemas })
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&FieldSchema> {
        self.schemas.get(&document_type)
    }

    /// Replace the schema for one document type wholesale.
    pub fn replace(&mut self, schema: FieldSchema) {
        self.schemas.insert(schema.document_type, schema);
    }
}

/// Source template for one field, expanded into a compiled [`FieldSpec`].
struct FieldTemplate {
    key: &'static str,
    label: &'static str,
    value_type: ValueType,
    required: bool,
    query: Option<&'static str>,
    pattern: Option<String>,
    aliases: &'static [&'static str],
}

impl FieldTemplate {
    fn compile(&self) -> Result<FieldSpec, SchemaError> {
        let pattern = self
            .pattern
            .as_deref()
            .map(|source| {
                Regex::new(source).map_err(|source| SchemaError::InvalidPattern {
                    field: self.key.to_string(),
                    source,
                })
            })
            .transpose()?;

        let mut aliases: Vec<String> = self.aliases.iter().map(|a| normalize_label(a)).collect();
        let own_label = normalize_label(self.label);
        if !aliases.contains(&own_label) {
            aliases.push(own_label);
        }

        Ok(FieldSpec {
            key: self.key.to_string(),
            label: self.label.to_string(),
            value_type: self.value_type,
            required: self.required,
            query_text: self.query.map(str::to_string),
            pattern,
            aliases,
        })
    }
}

fn build_schema(
    document_type: DocumentType,
    templates: &[FieldTemplate],
    critical: &[&str],
    core: &[&str],
    minimum_core_fields: usize,
    identity: &[&str],
) -> Result<FieldSchema, SchemaError> {
    let mut fields: Vec<FieldSpec> = Vec::with_capacity(templates.len());
    for template in templates {
        let spec = template.compile()?;
        if fields.iter().any(|existing| existing.key == spec.key) {
            return Err(SchemaError::DuplicateField {
                document_type,
                key: spec.key,
            });
        }
        fields.push(spec);
    }

    Ok(FieldSchema {
        document_type,
        fields,
        critical_fields: critical.iter().map(|k| k.to_string()).collect(),
        acceptance: AcceptancePolicy {
            core_fields: core.iter().map(|k| k.to_string()).collect(),
            minimum_core_fields,
            identity_fields: identity.iter().map(|k| k.to_string()).collect(),
        },
    })
}

const SSN_PATTERN: &str = r"\b(\d{3}[- ]\d{2}[- ]\d{4})\b";
const EIN_PATTERN: &str = r"\b(\d{2}-\d{7})\b";
const YEAR_PATTERN: &str = r"\b(20\d{2})\b";

fn money_after(label: &str) -> String {
    format!(r"(?i){label}\D{{0,40}}?\$?\s*([0-9][0-9,]*\.?[0-9]{{0,2}})")
}

fn w2_schema() -> Result<FieldSchema, SchemaError> {
    let wages = money_after(r"wages,?\s+tips,?\s+other\s+comp\w*");
    let federal = money_after(r"federal\s+income\s+tax\s+withheld");
    let ss_wages = money_after(r"social\s+security\s+wages");
    let ss_tax = money_after(r"social\s+security\s+tax\s+withheld");
    let medicare_wages = money_after(r"medicare\s+wages\s+and\s+tips");
    let medicare_tax = money_after(r"medicare\s+tax\s+withheld");

    build_schema(
        DocumentType::W2,
        &[
            FieldTemplate {
                key: "employee_ssn",
                label: "Employee's social security number",
                value_type: ValueType::Ssn,
                required: true,
                query: Some("What is the employee's social security number?"),
                pattern: Some(SSN_PATTERN.to_string()),
                aliases: &["employee ssn", "ssn", "social security number"],
            },
            FieldTemplate {
                key: "employer_ein",
                label: "Employer identification number",
                value_type: ValueType::Ein,
                required: true,
                query: Some("What is the employer identification number?"),
                pattern: Some(EIN_PATTERN.to_string()),
                aliases: &["employer ein", "ein", "employer id number (ein)"],
            },
            FieldTemplate {
                key: "employee_name",
                label: "Employee's name",
                value_type: ValueType::Text,
                required: false,
                query: Some("What is the employee's name?"),
                pattern: None,
                aliases: &["employee name", "employee's name, address, and zip code"],
            },
            FieldTemplate {
                key: "employer_name",
                label: "Employer's name",
                value_type: ValueType::Text,
                required: false,
                query: Some("What is the employer's name?"),
                pattern: None,
                aliases: &["employer name", "employer's name, address, and zip code"],
            },
            FieldTemplate {
                key: "wages_income",
                label: "Wages, tips, other compensation",
                value_type: ValueType::Money,
                required: true,
                query: Some("What are the wages, tips, and other compensation?"),
                pattern: Some(wages),
                aliases: &["box 1", "wages tips other compensation", "wages"],
            },
            FieldTemplate {
                key: "federal_tax_withheld",
                label: "Federal income tax withheld",
                value_type: ValueType::Money,
                required: true,
                query: Some("How much federal income tax was withheld?"),
                pattern: Some(federal),
                aliases: &["box 2", "fed income tax withheld"],
            },
            FieldTemplate {
                key: "social_security_wages",
                label: "Social security wages",
                value_type: ValueType::Money,
                required: true,
                query: Some("What are the social security wages?"),
                pattern: Some(ss_wages),
                aliases: &["box 3"],
            },
            FieldTemplate {
                key: "social_security_tax",
                label: "Social security tax withheld",
                value_type: ValueType::Money,
                required: true,
                query: Some("How much social security tax was withheld?"),
                pattern: Some(ss_tax),
                aliases: &["box 4"],
            },
            FieldTemplate {
                key: "medicare_wages",
                label: "Medicare wages and tips",
                value_type: ValueType::Money,
                required: true,
                query: Some("What are the medicare wages and tips?"),
                pattern: Some(medicare_wages),
                aliases: &["box 5"],
            },
            FieldTemplate {
                key: "medicare_tax",
                label: "Medicare tax withheld",
                value_type: ValueType::Money,
                required: true,
                query: Some("How much medicare tax was withheld?"),
                pattern: Some(medicare_tax),
                aliases: &["box 6"],
            },
            FieldTemplate {
                key: "tax_year",
                label: "Tax year",
                value_type: ValueType::Code,
                required: false,
                query: Some("What tax year is this W-2 for?"),
                pattern: Some(YEAR_PATTERN.to_string()),
                aliases: &["year"],
            },
        ],
        &[
            "employee_ssn",
            "employer_ein",
            "wages_income",
            "federal_tax_withheld",
        ],
        &[
            "wages_income",
            "federal_tax_withheld",
            "social_security_wages",
            "medicare_wages",
        ],
        3,
        &["employee_ssn", "employer_ein"],
    )
}

fn form_1040_schema() -> Result<FieldSchema, SchemaError> {
    let wages_line = money_after(r"wages,?\s+salaries,?\s+tips");
    let agi = money_after(r"adjusted\s+gross\s+income");
    let total_tax = money_after(r"total\s+tax");
    let total_payments = money_after(r"total\s+payments");
    let refund = money_after(r"(?:refund|amount\s+to\s+be\s+refunded)");
    let owed = money_after(r"amount\s+you\s+owe");

    build_schema(
        DocumentType::Form1040,
        &[
            FieldTemplate {
                key: "taxpayer_ssn",
                label: "Your social security number",
                value_type: ValueType::Ssn,
                required: true,
                query: Some("What is the taxpayer's social security number?"),
                pattern: Some(SSN_PATTERN.to_string()),
                aliases: &["taxpayer ssn", "your ssn", "social security number"],
            },
            FieldTemplate {
                key: "filing_status",
                label: "Filing status",
                value_type: ValueType::Code,
                required: false,
                query: Some("What is the filing status?"),
                pattern: None,
                aliases: &[],
            },
            FieldTemplate {
                key: "wages_line",
                label: "Wages, salaries, tips",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the total wages amount?"),
                pattern: Some(wages_line),
                aliases: &["line 1a", "total amount from form(s) w-2, box 1"],
            },
            FieldTemplate {
                key: "agi",
                label: "Adjusted gross income",
                value_type: ValueType::Money,
                required: true,
                query: Some("What is the adjusted gross income?"),
                pattern: Some(agi),
                aliases: &["line 11"],
            },
            FieldTemplate {
                key: "total_tax",
                label: "Total tax",
                value_type: ValueType::Money,
                required: true,
                query: Some("What is the total tax?"),
                pattern: Some(total_tax),
                aliases: &["line 24"],
            },
            FieldTemplate {
                key: "total_payments",
                label: "Total payments",
                value_type: ValueType::Money,
                required: true,
                query: Some("What are the total payments?"),
                pattern: Some(total_payments),
                aliases: &["line 33"],
            },
            FieldTemplate {
                key: "refund_amount",
                label: "Refund",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the refund amount?"),
                pattern: Some(refund),
                aliases: &["line 35a", "overpayment refunded to you"],
            },
            FieldTemplate {
                key: "amount_owed",
                label: "Amount you owe",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the amount owed?"),
                pattern: Some(owed),
                aliases: &["line 37"],
            },
            FieldTemplate {
                key: "tax_year",
                label: "Tax year",
                value_type: ValueType::Code,
                required: false,
                query: Some("What tax year is this return for?"),
                pattern: Some(YEAR_PATTERN.to_string()),
                aliases: &["year"],
            },
        ],
        &["taxpayer_ssn", "agi", "total_tax"],
        &["agi", "total_tax", "total_payments"],
        2,
        &["taxpayer_ssn"],
    )
}

fn form_1099_nec_schema() -> Result<FieldSchema, SchemaError> {
    let compensation = money_after(r"nonemployee\s+compensation");
    let federal = money_after(r"federal\s+income\s+tax\s+withheld");

    build_schema(
        DocumentType::Form1099Nec,
        &[
            FieldTemplate {
                key: "payer_ein",
                label: "Payer's TIN",
                value_type: ValueType::Ein,
                required: true,
                query: Some("What is the payer's taxpayer identification number?"),
                pattern: Some(EIN_PATTERN.to_string()),
                aliases: &["payer tin", "payer's federal identification number"],
            },
            FieldTemplate {
                key: "recipient_ssn",
                label: "Recipient's TIN",
                value_type: ValueType::Ssn,
                required: true,
                query: Some("What is the recipient's taxpayer identification number?"),
                pattern: Some(SSN_PATTERN.to_string()),
                aliases: &["recipient tin", "recipient's identification number"],
            },
            FieldTemplate {
                key: "payer_name",
                label: "Payer's name",
                value_type: ValueType::Text,
                required: false,
                query: Some("What is the payer's name?"),
                pattern: None,
                aliases: &["payer name"],
            },
            FieldTemplate {
                key: "nonemployee_compensation",
                label: "Nonemployee compensation",
                value_type: ValueType::Money,
                required: true,
                query: Some("What is the nonemployee compensation amount?"),
                pattern: Some(compensation),
                aliases: &["box 1"],
            },
            FieldTemplate {
                key: "federal_tax_withheld",
                label: "Federal income tax withheld",
                value_type: ValueType::Money,
                required: false,
                query: Some("How much federal income tax was withheld?"),
                pattern: Some(federal),
                aliases: &["box 4"],
            },
            FieldTemplate {
                key: "tax_year",
                label: "Tax year",
                value_type: ValueType::Code,
                required: false,
                query: Some("What tax year is this 1099 for?"),
                pattern: Some(YEAR_PATTERN.to_string()),
                aliases: &["year"],
            },
        ],
        &["payer_ein", "recipient_ssn", "nonemployee_compensation"],
        &["nonemployee_compensation", "federal_tax_withheld"],
        1,
        &["recipient_ssn"],
    )
}

fn form_1099_div_schema() -> Result<FieldSchema, SchemaError> {
    let ordinary = money_after(r"total\s+ordinary\s+dividends");
    let qualified = money_after(r"qualified\s+dividends");
    let capital_gain = money_after(r"total\s+capital\s+gain\s+distr\w*");

    build_schema(
        DocumentType::Form1099Div,
        &[
            FieldTemplate {
                key: "payer_ein",
                label: "Payer's TIN",
                value_type: ValueType::Ein,
                required: true,
                query: Some("What is the payer's taxpayer identification number?"),
                pattern: Some(EIN_PATTERN.to_string()),
                aliases: &["payer tin"],
            },
            FieldTemplate {
                key: "recipient_ssn",
                label: "Recipient's TIN",
                value_type: ValueType::Ssn,
                required: true,
                query: Some("What is the recipient's taxpayer identification number?"),
                pattern: Some(SSN_PATTERN.to_string()),
                aliases: &["recipient tin"],
            },
            FieldTemplate {
                key: "ordinary_dividends",
                label: "Total ordinary dividends",
                value_type: ValueType::Money,
                required: true,
                query: Some("What are the total ordinary dividends?"),
                pattern: Some(ordinary),
                aliases: &["box 1a"],
            },
            FieldTemplate {
                key: "qualified_dividends",
                label: "Qualified dividends",
                value_type: ValueType::Money,
                required: false,
                query: Some("What are the qualified dividends?"),
                pattern: Some(qualified),
                aliases: &["box 1b"],
            },
            FieldTemplate {
                key: "capital_gain",
                label: "Total capital gain distributions",
                value_type: ValueType::Money,
                required: false,
                query: Some("What are the total capital gain distributions?"),
                pattern: Some(capital_gain),
                aliases: &["box 2a"],
            },
            FieldTemplate {
                key: "tax_year",
                label: "Tax year",
                value_type: ValueType::Code,
                required: false,
                query: Some("What tax year is this 1099 for?"),
                pattern: Some(YEAR_PATTERN.to_string()),
                aliases: &["year"],
            },
        ],
        &["recipient_ssn", "ordinary_dividends"],
        &["ordinary_dividends", "qualified_dividends"],
        1,
        &["recipient_ssn"],
    )
}

fn paystub_schema() -> Result<FieldSchema, SchemaError> {
    build_schema(
        DocumentType::Paystub,
        &[
            FieldTemplate {
                key: "employee_name",
                label: "Employee name",
                value_type: ValueType::Text,
                required: true,
                query: Some("What is the employee's name?"),
                pattern: None,
                aliases: &["employee"],
            },
            FieldTemplate {
                key: "employer_name",
                label: "Employer name",
                value_type: ValueType::Text,
                required: false,
                query: Some("What is the employer's name?"),
                pattern: None,
                aliases: &["employer", "company"],
            },
            FieldTemplate {
                key: "pay_date",
                label: "Pay date",
                value_type: ValueType::Date,
                required: true,
                query: Some("What is the pay date?"),
                pattern: None,
                aliases: &["check date"],
            },
            FieldTemplate {
                key: "pay_period_start",
                label: "Period beginning",
                value_type: ValueType::Date,
                required: false,
                query: Some("When does the pay period begin?"),
                pattern: None,
                aliases: &["pay period start", "period start"],
            },
            FieldTemplate {
                key: "pay_period_end",
                label: "Period ending",
                value_type: ValueType::Date,
                required: false,
                query: Some("When does the pay period end?"),
                pattern: None,
                aliases: &["pay period end", "period end"],
            },
            FieldTemplate {
                key: "gross_current",
                label: "Gross pay (current)",
                value_type: ValueType::Money,
                required: true,
                query: Some("What is the current gross pay?"),
                pattern: None,
                aliases: &["gross pay", "current gross"],
            },
            FieldTemplate {
                key: "gross_ytd",
                label: "Gross pay (YTD)",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the year-to-date gross pay?"),
                pattern: None,
                aliases: &["ytd gross"],
            },
            FieldTemplate {
                key: "net_current",
                label: "Net pay (current)",
                value_type: ValueType::Money,
                required: true,
                query: Some("What is the current net pay?"),
                pattern: None,
                aliases: &["net pay", "take home pay"],
            },
            FieldTemplate {
                key: "net_ytd",
                label: "Net pay (YTD)",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the year-to-date net pay?"),
                pattern: None,
                aliases: &["ytd net"],
            },
            FieldTemplate {
                key: "federal_tax_current",
                label: "Federal income tax (current)",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the current federal tax withholding?"),
                pattern: None,
                aliases: &["federal income tax", "fed tax"],
            },
            FieldTemplate {
                key: "federal_tax_ytd",
                label: "Federal income tax (YTD)",
                value_type: ValueType::Money,
                required: false,
                query: Some("What is the year-to-date federal tax withholding?"),
                pattern: None,
                aliases: &["ytd federal tax"],
            },
        ],
        &["gross_current", "net_current"],
        &["gross_current", "net_current", "gross_ytd"],
        2,
        &["employee_name"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_supported_types() {
        let registry = SchemaRegistry::builtin().expect("builtin schemas compile");
        for document_type in [
            DocumentType::W2,
            DocumentType::Form1040,
            DocumentType::Form1099Nec,
            DocumentType::Form1099Div,
            DocumentType::Paystub,
        ] {
            assert!(registry.get(document_type).is_some(), "{document_type:?}");
        }
        assert!(registry.get(DocumentType::Other).is_none());
    }

    #[test]
    fn label_matching_uses_normalized_aliases() {
        let registry = SchemaRegistry::builtin().expect("builtin schemas compile");
        let schema = registry.get(DocumentType::W2).expect("w2 schema");

        let spec = schema
            .match_label("  Employee SSN: ")
            .expect("alias resolves");
        assert_eq!(spec.key, "employee_ssn");

        let spec = schema.match_label("BOX 1").expect("box alias resolves");
        assert_eq!(spec.key, "wages_income");

        assert!(schema.match_label("unrelated label").is_none());
    }

    #[test]
    fn wage_pattern_captures_amount_after_label() {
        let registry = SchemaRegistry::builtin().expect("builtin schemas compile");
        let schema = registry.get(DocumentType::W2).expect("w2 schema");
        let spec = schema.field("wages_income").expect("wages field");
        let pattern = spec.pattern.as_ref().expect("wages pattern");

        let captures = pattern
            .captures("1 Wages, tips, other compensation  $50,000.00")
            .expect("pattern matches");
        assert_eq!(&captures[1], "50,000.00");
    }
}
