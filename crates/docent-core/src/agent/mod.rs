//! Question-answering loop: system prompt, tool round-trips, fixed fallbacks.

mod error;

pub use error::AgentError;

use docent_llm::LlmProvider;
use docent_llm::provider::Message;
use docent_tools::{
    TOOL_CALL_TAG, ToolCall, ToolError, ToolExecutor, ToolOutput, ToolRegistry,
    extract_fenced_blocks, truncate_tool_output,
};

use crate::channel::Channel;

/// Reply to empty or whitespace-only input.
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a question.";
/// Reply when the model produced only whitespace.
pub const NO_RESPONSE_MESSAGE: &str = "No response generated.";
/// Reply when the model, a tool, or the store failed.
pub const FAILURE_MESSAGE: &str = "Something went wrong while generating a response.";

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 3;

fn format_tool_output(tool_name: &str, body: &str) -> String {
    format!("[tool output: {tool_name}]\n```\n{body}\n```")
}

/// Combine the role instruction with the tool catalogue advertised to the model.
#[must_use]
pub fn build_system_prompt(base: &str, registry: &ToolRegistry) -> String {
    if registry.tools().is_empty() {
        return base.to_owned();
    }
    format!(
        "{base}\n\nUse the tools below to look up information in the indexed sources \
         before answering. Cite the sources you relied on.\n\n{}",
        registry.format_for_prompt()
    )
}

/// Each question is answered independently: the conversation starts from the
/// system prompt on every turn and nothing is carried between turns.
pub struct Agent<P: LlmProvider, C: Channel, T: ToolExecutor> {
    provider: P,
    channel: C,
    tool_executor: T,
    system_prompt: String,
    max_tool_iterations: usize,
}

impl<P: LlmProvider, C: Channel, T: ToolExecutor> Agent<P, C, T> {
    #[must_use]
    pub fn new(provider: P, channel: C, tool_executor: T, system_prompt: &str) -> Self {
        let registry = ToolRegistry::from_definitions(tool_executor.tool_definitions());
        Self {
            provider,
            channel,
            tool_executor,
            system_prompt: build_system_prompt(system_prompt, &registry),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    #[must_use]
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run the chat loop, answering each received message until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error only if channel I/O fails; answer failures are
    /// reported to the user as [`FAILURE_MESSAGE`].
    pub async fn run(&mut self) -> Result<(), AgentError> {
        while let Some(incoming) = self.channel.recv().await? {
            self.channel.send_typing().await?;
            let reply = self.answer(&incoming.text).await;
            self.channel.send(&reply).await?;
        }
        tracing::debug!("channel closed, agent loop finished");
        Ok(())
    }

    /// Answer one question. Never fails: errors become [`FAILURE_MESSAGE`].
    pub async fn answer(&self, text: &str) -> String {
        let question = text.trim();
        if question.is_empty() {
            return EMPTY_INPUT_MESSAGE.to_owned();
        }

        match self.process(question).await {
            Ok(Some(reply)) => reply,
            Ok(None) => NO_RESPONSE_MESSAGE.to_owned(),
            Err(e) => {
                tracing::error!("agent failed: {e:#}");
                FAILURE_MESSAGE.to_owned()
            }
        }
    }

    async fn process(&self, question: &str) -> Result<Option<String>, AgentError> {
        let mut messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(question),
        ];

        for iteration in 0..=self.max_tool_iterations {
            let response = self.provider.chat(&messages).await?;
            let reply = response.trim();
            if reply.is_empty() {
                tracing::warn!(iteration, "received empty response from LLM");
                return Ok(None);
            }

            if iteration == self.max_tool_iterations {
                tracing::warn!(iteration, "tool iteration limit reached");
                return Ok(Some(reply.to_owned()));
            }

            let output = match self.run_tools(&response).await {
                Ok(None) => return Ok(Some(reply.to_owned())),
                Ok(Some(output)) => output,
                Err(ToolError::InvalidParams { message }) => {
                    tracing::warn!(iteration, "invalid tool invocation: {message}");
                    messages.push(Message::assistant(response.clone()));
                    messages.push(Message::user(format!(
                        "[tool error]\ninvalid tool parameters: {message}"
                    )));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            tracing::debug!(
                iteration,
                tool = %output.tool_name,
                blocks = output.blocks_executed,
                "tool executed"
            );
            messages.push(Message::assistant(response.clone()));
            messages.push(Message::user(format_tool_output(
                &output.tool_name,
                &truncate_tool_output(&output.summary),
            )));
        }

        Ok(None)
    }

    /// Fenced tool blocks first, then structured ` ```tool_call ` JSON blocks.
    async fn run_tools(&self, response: &str) -> Result<Option<ToolOutput>, ToolError> {
        if let Some(output) = self.tool_executor.execute(response).await? {
            return Ok(Some(output));
        }

        let mut outputs: Vec<ToolOutput> = Vec::new();
        for block in extract_fenced_blocks(response, TOOL_CALL_TAG) {
            let call: ToolCall =
                serde_json::from_str(block).map_err(|e| ToolError::InvalidParams {
                    message: e.to_string(),
                })?;
            match self.tool_executor.execute_tool_call(&call).await? {
                Some(output) => outputs.push(output),
                None => {
                    return Err(ToolError::InvalidParams {
                        message: format!("unknown tool: {}", call.tool_id),
                    });
                }
            }
        }

        let Some(first) = outputs.first() else {
            return Ok(None);
        };
        let tool_name = first.tool_name.clone();
        #[allow(clippy::cast_possible_truncation)]
        let blocks_executed = outputs.len() as u32;
        let summary = outputs
            .into_iter()
            .map(|o| o.summary)
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(ToolOutput {
            tool_name,
            summary,
            blocks_executed,
        }))
    }
}
