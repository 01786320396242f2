//! LlmOracle - asks a language model for the next step

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use super::{PlanDecision, PlanningError, PlanningOracle, ProposedCall};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message};
use crate::orchestrator::ExecutionHistory;
use crate::prompts::{PlannerContext, PromptLoader};

static FENCED_JSON: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok());

/// Reply body the planner is asked to produce
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply {
    Call {
        #[serde(alias = "operation_name")]
        operation: String,
        #[serde(default)]
        arguments: Value,
    },
    Status {
        status: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Planner backed by an [`LlmClient`]
pub struct LlmOracle {
    client: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    input_root: String,
    output_root: String,
    file_types: Vec<String>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmOracle {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptLoader, config: &Config) -> Self {
        debug!(provider = %config.llm.provider, model = %config.llm.model, "LlmOracle::new: called");
        Self {
            client,
            prompts,
            input_root: display(&config.paths.input),
            output_root: display(&config.paths.output),
            file_types: config.file_types.iter().map(|t| t.to_ascii_uppercase()).collect(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        }
    }

    fn build_request(
        &self,
        goal: &str,
        catalog: &Catalog,
        history: &ExecutionHistory,
    ) -> Result<CompletionRequest, PlanningError> {
        let render_err = |e: eyre::Report| PlanningError::unreachable(format!("cannot build prompt: {}", e));
        let operations = serde_json::to_string_pretty(catalog.describe())
            .map_err(|e| PlanningError::unreachable(e.to_string()))?;
        let history_json =
            serde_json::to_string_pretty(history).map_err(|e| PlanningError::unreachable(e.to_string()))?;

        let context = PlannerContext {
            goal: goal.to_string(),
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
            file_types: self.file_types.clone(),
            operations,
            history: history_json,
            has_history: !history.is_empty(),
            step_count: history.len(),
        };

        Ok(CompletionRequest {
            system_prompt: self.prompts.system_prompt().map_err(render_err)?,
            messages: vec![Message::user(
                self.prompts.render("planner-request", &context).map_err(render_err)?,
            )],
            tools: catalog.tool_definitions(),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        })
    }
}

fn display(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Turn a model reply into a decision, checking any call against the catalog
pub fn decode_reply(response: &CompletionResponse, catalog: &Catalog) -> Result<PlanDecision, PlanningError> {
    let decision = match response.tool_calls.as_slice() {
        [call] => PlanDecision::Propose(ProposedCall::new(call.name.clone(), call.input.clone())),
        [] => {
            let text = response.content.as_deref().unwrap_or_default();
            decode_text(text)?
        }
        calls => {
            return Err(PlanningError::malformed(format!(
                "expected one operation per reply, got {}",
                calls.len()
            )));
        }
    };

    if let PlanDecision::Propose(ref call) = decision {
        catalog
            .validate(&call.operation_name, &call.arguments)
            .map_err(|e| PlanningError::malformed(e.to_string()))?;
    }
    Ok(decision)
}

fn decode_text(text: &str) -> Result<PlanDecision, PlanningError> {
    let json = extract_json(text).ok_or_else(|| PlanningError::malformed(format!("no JSON object in reply: {}", snippet(text))))?;
    let reply: Reply =
        serde_json::from_str(json).map_err(|e| PlanningError::malformed(format!("unreadable reply ({}): {}", e, snippet(json))))?;

    match reply {
        Reply::Call { operation, arguments } => Ok(PlanDecision::Propose(ProposedCall::new(operation, arguments))),
        Reply::Status { status, reason } => match status.to_ascii_lowercase().as_str() {
            "done" => Ok(PlanDecision::Done),
            "abort" => Ok(PlanDecision::Abort {
                reason: reason.unwrap_or_else(|| "no reason given".to_string()),
            }),
            other => Err(PlanningError::malformed(format!("unknown status '{}'", other))),
        },
    }
}

/// The JSON object in a reply: a fenced block if present, else the outermost braces
fn extract_json(text: &str) -> Option<&str> {
    if let Some(re) = FENCED_JSON.as_ref()
        && let Some(m) = re.captures(text).and_then(|c| c.get(1))
    {
        return Some(m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[async_trait]
impl PlanningOracle for LlmOracle {
    async fn next_step(
        &self,
        goal: &str,
        catalog: &Catalog,
        history: &ExecutionHistory,
    ) -> Result<PlanDecision, PlanningError> {
        debug!(steps = history.len(), "LlmOracle::next_step: called");
        let request = self.build_request(goal, catalog, history)?;
        let response = self.client.complete(request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LlmOracle::next_step: reply received"
        );

        match decode_reply(&response, catalog) {
            Ok(decision) => {
                info!(?decision, "LlmOracle::next_step: decided");
                Ok(decision)
            }
            Err(e) => {
                warn!(error = %e, "LlmOracle::next_step: unusable reply");
                Err(e)
            }
        }
    }
}
