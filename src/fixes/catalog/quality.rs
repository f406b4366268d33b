//! Answer quality remediations.

use std::sync::Arc;

use super::{call_only, raised_score};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{CallRecord, FactorId, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(GROUNDING, Arc::new(GroundingInstructions)),
        FixTemplate::new(TEMPERATURE, Arc::new(LowerTemperature)),
        FixTemplate::new(FEW_SHOT, Arc::new(FewShotExamples)),
        FixTemplate::new(SCHEMA, Arc::new(StructuredOutputSchema)),
    ]
}

/// Start a projection with the judge score raised by `delta`, when scored.
fn with_score(
    template: &'static str,
    call: &CallRecord,
    delta: f64,
) -> Result<MetricsBuilder, EngineError> {
    let metrics = MetricsBuilder::new(template);
    match call.judge_score() {
        Some(score) => metrics.score("Quality score", score, raised_score(score, delta)),
        None => Ok(metrics),
    }
}

const GROUNDING: TemplateMeta = TemplateMeta {
    id: "grounding_instructions",
    title: "Add grounding instructions",
    subtitle: "Tell the model to answer only from the supplied context",
    category: FixCategory::Quality,
    effort: Some(Effort::Low),
    stories: &[StoryId::Quality],
    trigger_factors: &[
        FactorId::HallucinationDetected,
        FactorId::PossibleHallucination,
        FactorId::LowGroundedness,
        FactorId::QualityOutlier,
    ],
    tradeoffs: &["More refusals when context is thin", "Slightly longer prompt"],
    benefits: &["Fewer unsupported claims", "Answers cite their sources"],
    best_for: "Retrieval-augmented answers over documents",
};

const GROUNDING_QUALITY: f64 = 0.15;
const GROUNDING_TOKENS: f64 = 150.0;

struct GroundingInstructions;

impl MetricGenerator for GroundingInstructions {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(GROUNDING.id, record)?;
        let prompt = call.prompt_tokens();
        with_score(GROUNDING.id, call, GROUNDING_QUALITY)?
            .tokens("Prompt tokens", prompt, prompt + GROUNDING_TOKENS)?
            .build()
    }
}

impl ActionGenerator for GroundingInstructions {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "SYSTEM_PROMPT = \"Answer the user's question.\"",
            "SYSTEM_PROMPT = \"\"\"Answer the user's question using ONLY the context below.\nIf the context does not contain the answer, say you don't know.\nCite the passage each claim comes from.\"\"\"",
        ))
    }
}

impl FixStrategy for GroundingInstructions {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.judge_score.is_some() || c.hallucination_flag == Some(true))
    }
}

const TEMPERATURE: TemplateMeta = TemplateMeta {
    id: "lower_temperature",
    title: "Lower the temperature",
    subtitle: "Sample more conservatively",
    category: FixCategory::Quality,
    effort: Some(Effort::Low),
    stories: &[StoryId::Quality],
    trigger_factors: &[
        FactorId::HighTemperature,
        FactorId::HallucinationDetected,
        FactorId::PossibleHallucination,
        FactorId::LowCoherence,
    ],
    tradeoffs: &["Less varied wording"],
    benefits: &["More consistent, reproducible answers"],
    best_for: "Factual and extraction tasks",
};

const TARGET_TEMPERATURE: f64 = 0.3;
const TEMPERATURE_QUALITY: f64 = 0.08;

struct LowerTemperature;

impl MetricGenerator for LowerTemperature {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(TEMPERATURE.id, record)?;
        with_score(TEMPERATURE.id, call, TEMPERATURE_QUALITY)?
            .temperature("Temperature", call.temperature(), TARGET_TEMPERATURE)?
            .build()
    }
}

impl ActionGenerator for LowerTemperature {
    fn action(&self, record: &Record) -> Result<FixAction, EngineError> {
        let call = call_only(TEMPERATURE.id, record)?;
        Ok(FixAction::new(
            format!("client.chat(messages=messages, temperature={:.1})", call.temperature()),
            format!("client.chat(messages=messages, temperature={TARGET_TEMPERATURE:.1})"),
        ))
    }
}

impl FixStrategy for LowerTemperature {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.temperature() > TARGET_TEMPERATURE)
    }
}

const FEW_SHOT: TemplateMeta = TemplateMeta {
    id: "few_shot_examples",
    title: "Add few-shot examples",
    subtitle: "Show the model what a good answer looks like",
    category: FixCategory::Quality,
    effort: Some(Effort::Medium),
    stories: &[StoryId::Quality],
    trigger_factors: &[
        FactorId::LowQualityScore,
        FactorId::LowRelevance,
        FactorId::LowCompleteness,
        FactorId::BudgetModelQuality,
        FactorId::QualityOutlier,
    ],
    tradeoffs: &["Longer prompt on every call", "Examples need curating"],
    benefits: &["Consistent format and depth", "Lets smaller models punch above their tier"],
    best_for: "Tasks with a recognisable answer shape",
};

const FEW_SHOT_QUALITY: f64 = 0.12;
const FEW_SHOT_TOKENS: f64 = 400.0;

struct FewShotExamples;

impl MetricGenerator for FewShotExamples {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(FEW_SHOT.id, record)?;
        let prompt = call.prompt_tokens();
        with_score(FEW_SHOT.id, call, FEW_SHOT_QUALITY)?
            .tokens("Prompt tokens", prompt, prompt + FEW_SHOT_TOKENS)?
            .build()
    }
}

impl ActionGenerator for FewShotExamples {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "messages = [system(SYSTEM_PROMPT), user(question)]",
            "messages = [\n    system(SYSTEM_PROMPT),\n    *[turn for ex in EXAMPLES[:3] for turn in (user(ex.question), assistant(ex.answer))],\n    user(question),\n]",
        ))
    }
}

impl FixStrategy for FewShotExamples {
    fn is_applicable(&self, record: &Record) -> bool {
        record.as_call().is_some_and(|c| c.judge_score.is_some())
    }
}

const SCHEMA: TemplateMeta = TemplateMeta {
    id: "structured_output_schema",
    title: "Structured output schema",
    subtitle: "Require a JSON schema for the answer",
    category: FixCategory::Quality,
    effort: Some(Effort::Medium),
    stories: &[StoryId::Quality, StoryId::Token],
    trigger_factors: &[
        FactorId::LowCompleteness,
        FactorId::LowCoherence,
        FactorId::LowQualityScore,
        FactorId::HighCompletionTokens,
    ],
    tradeoffs: &["Schema changes need code changes", "Free-form nuance is lost"],
    benefits: &["Every required field is present", "No prose padding around the answer"],
    best_for: "Answers consumed by code rather than people",
};

const SCHEMA_QUALITY: f64 = 0.10;
const SCHEMA_COMPLETION_CUT: f64 = 0.15;

struct StructuredOutputSchema;

impl MetricGenerator for StructuredOutputSchema {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(SCHEMA.id, record)?;
        let mut metrics = with_score(SCHEMA.id, call, SCHEMA_QUALITY)?;
        let completion = call.completion_tokens();
        if completion > 0.0 {
            metrics = metrics.tokens(
                "Completion tokens",
                completion,
                completion * (1.0 - SCHEMA_COMPLETION_CUT),
            )?;
        }
        metrics.build()
    }
}

impl ActionGenerator for StructuredOutputSchema {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "response = client.chat(messages=messages)\nanswer = response.text",
            "response = client.chat(\n    messages=messages,\n    response_format={\"type\": \"json_schema\", \"json_schema\": ANSWER_SCHEMA},\n)\nanswer = Answer.model_validate_json(response.text)",
        ))
    }
}

impl FixStrategy for StructuredOutputSchema {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_call()
            .is_some_and(|c| c.judge_score.is_some() || c.completion_tokens() > 0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::PatternRecord;
    use pretty_assertions::assert_eq;

    fn weak_answer() -> Record {
        Record::Call(CallRecord {
            prompt_tokens: Some(1_200),
            completion_tokens: Some(400),
            judge_score: Some(0.55),
            temperature: Some(0.9),
            ..Default::default()
        })
    }

    #[test]
    fn test_grounding_projection() {
        let metrics = GroundingInstructions.metrics(&weak_answer()).unwrap();
        assert_eq!(metrics[0].label, "Quality score");
        assert_eq!(metrics[0].before, "0.55");
        assert_eq!(metrics[0].after, "0.70");
        assert_eq!(metrics[1].after, "1,350");
    }

    #[test]
    fn test_grounding_applies_to_flagged_calls_without_score() {
        let record = Record::Call(CallRecord {
            hallucination_flag: Some(true),
            ..Default::default()
        });
        assert!(GroundingInstructions.is_applicable(&record));
        let metrics = GroundingInstructions.metrics(&record).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].change_percent, None);
    }

    #[test]
    fn test_lower_temperature() {
        let metrics = LowerTemperature.metrics(&weak_answer()).unwrap();
        assert_eq!(metrics[1], Metric::new("Temperature", "0.9", "0.3", Some(-66.7)));
        let cool = Record::Call(CallRecord {
            temperature: Some(0.2),
            ..Default::default()
        });
        assert!(!LowerTemperature.is_applicable(&cool));
    }

    #[test]
    fn test_few_shot_needs_a_score() {
        assert!(FewShotExamples.is_applicable(&weak_answer()));
        assert!(!FewShotExamples.is_applicable(&Record::Call(CallRecord::default())));
        let metrics = FewShotExamples.metrics(&weak_answer()).unwrap();
        assert_eq!(metrics[1].after, "1,600");
    }

    #[test]
    fn test_schema_cuts_completion() {
        let metrics = StructuredOutputSchema.metrics(&weak_answer()).unwrap();
        assert_eq!(metrics[0].after, "0.65");
        assert_eq!(metrics[1].after, "340");
    }

    #[test]
    fn test_quality_templates_ignore_patterns() {
        let pattern = Record::Pattern(PatternRecord::default());
        for template in templates() {
            assert!(!template.is_applicable(&pattern), "{}", template.id());
        }
    }
}
