use super::{ComposedResponse, MultiCompletion};

/// Render a fan-out as one document with per-model attribution.
///
/// A lone successful outcome is passed through without headers.
pub fn merge_outcomes(multi: &MultiCompletion) -> ComposedResponse {
    let total_cost = multi.total_cost();

    if let [only] = multi.outcomes.as_slice() {
        if let Ok(completion) = &only.result {
            return ComposedResponse {
                content: completion.text.clone(),
                sources: vec![only.model.clone()],
                total_cost,
            };
        }
    }

    let mut content_parts = Vec::new();
    let mut sources = Vec::new();

    for outcome in &multi.outcomes {
        match &outcome.result {
            Ok(completion) => {
                sources.push(outcome.model.clone());
                let cached = if completion.cached { " (cached)" } else { "" };
                content_parts.push(format!(
                    "--- Response from {}{} ---\n{}\n",
                    outcome.model, cached, completion.text
                ));
            }
            Err(err) => {
                content_parts.push(format!("--- Error from {} ---\n{}\n", outcome.model, err));
            }
        }
    }

    ComposedResponse {
        content: content_parts.join("\n"),
        sources,
        total_cost,
    }
}
