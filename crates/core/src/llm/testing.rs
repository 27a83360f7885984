use crate::llm::error::{BackendError, BackendStage};
use crate::llm::{GenerativeBackend, PromptRequest, Provider};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Handler = Box<dyn Fn(&PromptRequest) -> Result<Value, BackendError> + Send + Sync>;

/// In-process backend for tests: replies through a closure, records every
/// request, and can hold calls whose prompt contains a given text until
/// the matching gate is released.
pub(crate) struct ScriptedBackend {
    handler: Handler,
    gates: Vec<(String, Arc<Notify>)>,
    calls: Mutex<Vec<PromptRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new(
        handler: impl Fn(&PromptRequest) -> Result<Value, BackendError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            gates: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    pub(crate) fn failing(detail: &'static str) -> Self {
        Self::new(move |req| {
            Err(BackendError::new(
                Provider::Other("scripted"),
                req.prompt_name,
                BackendStage::Http,
                detail,
            ))
        })
    }

    /// Calls whose prompt contains `needle` wait until the returned gate is
    /// notified.
    pub(crate) fn gate(&mut self, needle: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.push((needle.to_string(), notify.clone()));
        notify
    }

    pub(crate) fn calls(&self) -> Vec<PromptRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn provider(&self) -> Provider {
        Provider::Other("scripted")
    }

    async fn generate(&self, request: PromptRequest) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push(request.clone());
        for (needle, gate) in &self.gates {
            if request.prompt.contains(needle.as_str()) {
                gate.notified().await;
            }
        }
        (self.handler)(&request)
    }
}
