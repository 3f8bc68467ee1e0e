use crate::plan::Artifact;

/// USD per 1M tokens as (model, prompt, completion).
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("gpt-3.5-turbo", 0.5, 1.5),
    ("gpt-4", 30.0, 60.0),
    ("gpt-4-turbo-preview", 10.0, 30.0),
    ("gpt-4.1", 2.5, 10.0),
    ("gpt-4.1-mini", 0.15, 0.6),
    ("gpt-4.1-nano", 0.075, 0.3),
    ("gpt-4o", 2.5, 10.0),
    ("gpt-4o-mini", 0.15, 0.6),
];

/// Pricing used for unknown models and artifacts without one.
const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

fn pricing_for(model: &str) -> (f64, f64) {
    MODEL_PRICING
        .iter()
        .find(|(name, _, _)| *name == model)
        .or_else(|| MODEL_PRICING.iter().find(|(name, _, _)| *name == FALLBACK_MODEL))
        .map(|(_, prompt, completion)| (*prompt, *completion))
        .unwrap_or((0.0, 0.0))
}

/// USD cost of producing one artifact, from its recorded token usage.
/// Rounded to four decimal places.
pub fn node_cost(artifact: &Artifact) -> f64 {
    let model = artifact.metadata.model.as_deref().unwrap_or(FALLBACK_MODEL);
    let (prompt_price, completion_price) = pricing_for(model);

    let mut cost = 0.0;
    if let Some(prompt_tokens) = artifact.metadata.prompt_tokens {
        cost += (prompt_tokens as f64 / 1_000_000.0) * prompt_price;
    }
    if let Some(completion_tokens) = artifact.metadata.completion_tokens {
        cost += (completion_tokens as f64 / 1_000_000.0) * completion_price;
    }

    round_usd(cost)
}

/// Rounds a USD amount to four decimal places.
pub fn round_usd(cost: f64) -> f64 {
    (cost * 10_000.0).round() / 10_000.0
}
