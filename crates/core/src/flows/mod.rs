//! The three prompt-backed operations and the plumbing they share.

pub mod analyze;
pub mod explain;
pub mod weekly;

pub use analyze::RecommendationService;
pub use explain::RationaleExplainer;
pub use weekly::WeeklyTopGenerator;

use crate::domain::contract::OutputContract;
use crate::llm::error::{BackendError, BackendStage};
use crate::llm::prompt::PromptTemplate;
use crate::llm::{json, GenerativeBackend, PromptRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Every flow wired to one backend client, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub recommendations: RecommendationService,
    pub explainer: RationaleExplainer,
    pub weekly: WeeklyTopGenerator,
}

impl Services {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            recommendations: RecommendationService::new(backend.clone()),
            explainer: RationaleExplainer::new(backend.clone()),
            weekly: WeeklyTopGenerator::new(backend),
        }
    }
}

/// Renders `template` with `input`, makes one backend call and decodes the
/// reply into the contract `C`. Never retries.
pub(crate) async fn run_prompt<C, I>(
    backend: &dyn GenerativeBackend,
    template: &PromptTemplate,
    input: &I,
) -> Result<C::Output, BackendError>
where
    C: OutputContract,
    I: Serialize + Sync + ?Sized,
{
    let provider = backend.provider();
    let call_id = uuid::Uuid::new_v4();

    let prompt = template.render(input).map_err(|e| {
        BackendError::new(provider, template.name, BackendStage::Render, format!("{e:#}"))
    })?;

    let request = PromptRequest {
        prompt_name: template.name,
        system: template.system.map(str::to_string),
        prompt,
        output_schema: C::schema(),
    };

    let t0 = Instant::now();
    tracing::debug!(%call_id, %provider, prompt = template.name, "backend call started");

    let value = match backend.generate(request).await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                %call_id,
                prompt = template.name,
                elapsed_ms = t0.elapsed().as_millis(),
                error = %err,
                "backend call failed"
            );
            return Err(err);
        }
    };

    match json::decode_output::<C>(value.clone()) {
        Ok(output) => {
            tracing::info!(
                %call_id,
                prompt = template.name,
                elapsed_ms = t0.elapsed().as_millis(),
                "backend call completed"
            );
            Ok(output)
        }
        Err(e) => {
            tracing::warn!(%call_id, prompt = template.name, error = %e, "backend output rejected");
            Err(
                BackendError::new(provider, template.name, BackendStage::Shape, format!("{e:#}"))
                    .with_raw_output(value.to_string()),
            )
        }
    }
}
