use clap::Args;
use taxdoc::config::EngineConfig;
use taxdoc::error::AppError;
use taxdoc::workflows::extraction::{
    DocumentInput, ExtractionOutcome, QueryAnswer, SourceOutputs,
};

use crate::infra::build_pipeline;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the resolved field table in addition to the summary
    #[arg(long)]
    pub(crate) list_fields: bool,
}

const SAMPLE_W2: &str = "Form W-2 Wage and Tax Statement 2023\n\
    Employer identification number 12-3456789\n\
    Employee's social security number 123-45-6789\n\
    1 Wages, tips, other compensation 50000.00\n\
    2 Federal income tax withheld 6800.00\n\
    3 Social security wages 50000.00\n\
    4 Social security tax withheld 3100.00\n\
    5 Medicare wages and tips 50000.00\n\
    6 Medicare tax withheld 725.00\n";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let pipeline = build_pipeline(EngineConfig::default())?;

    let input = DocumentInput::new(
        SAMPLE_W2,
        SourceOutputs {
            queries: Ok(vec![
                QueryAnswer {
                    query: "What are the wages, tips, and other compensation?".to_string(),
                    answer: "50000.00".to_string(),
                    confidence: 0.93,
                    page: 1,
                },
                QueryAnswer {
                    query: "How much federal income tax was withheld?".to_string(),
                    answer: "6800.00".to_string(),
                    confidence: 0.91,
                    page: 1,
                },
            ]),
            forms: Ok(Vec::new()),
            tables: Ok(Vec::new()),
        },
    );

    let outcome = pipeline.process(input).await?;
    render_outcome(&outcome, args.list_fields);
    Ok(())
}

fn render_outcome(outcome: &ExtractionOutcome, list_fields: bool) {
    let record = &outcome.record;

    println!("Tax document extraction demo");
    println!(
        "Document type: {} (classification confidence {:.2})",
        record.document_type.label(),
        record.classification_confidence
    );
    println!(
        "Layers used: {}",
        record
            .layers_used
            .iter()
            .map(|layer| layer.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\nValidation");
    if record.validation.errors.is_empty() && record.validation.warnings.is_empty() {
        println!("- all consistency rules passed");
    }
    for error in &record.validation.errors {
        println!("- error: {error}");
    }
    for warning in &record.validation.warnings {
        println!("- warning: {warning}");
    }
    println!("Needs review: {}", record.validation.needs_review);

    println!("\nMasked export");
    for (key, value) in &outcome.masked_fields {
        println!("- {key}: {value}");
    }

    if list_fields {
        println!("\nResolved fields");
        for field in record.resolved_fields.values() {
            let cross_validated = if field.cross_validated {
                " (cross-validated)"
            } else {
                ""
            };
            println!(
                "- {} = {} | confidence {:.2} | source {}{}",
                field.field_key,
                field.value,
                field.confidence,
                field.source.label(),
                cross_validated
            );
        }
    }
}
