mod builder;
mod config;

use std::fmt::{self, Debug};
use std::sync::Arc;

use alfred_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ToolCallResult,
};
use serde_json::Value;
use tracing::Instrument;

pub use builder::AgentBuilder;
pub use config::AgentConfig;

use crate::conversation::{Conversation, TranscriptSource};
use crate::error::Error;
use crate::model_client::{
    ModelClient, ModelClientResponse, RetryPolicy, TranscriptFn,
};
use crate::model_ref::{ModelRef, ModelResolver};
use crate::tool::Executor as ToolExecutor;

type OnTranscript = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Runtime knobs that are not part of an [`AgentConfig`].
#[derive(Clone)]
pub struct AgentOptions {
    max_steps: usize,
    retry: RetryPolicy,
    on_transcript: Option<OnTranscript>,
}

impl AgentOptions {
    /// Limits model round trips per user turn. At least one step is
    /// always allowed.
    #[inline]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Sets how rate limited model requests are retried.
    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Attaches a callback receiving assistant text as it streams in, and
    /// every tool output once the call finishes.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Returns the step budget.
    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Returns the retry policy.
    #[inline]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_steps: 16,
            retry: RetryPolicy::default(),
            on_transcript: None,
        }
    }
}

impl Debug for AgentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentOptions")
            .field("max_steps", &self.max_steps)
            .field("retry", &self.retry)
            .field("on_transcript", &self.on_transcript.is_some())
            .finish()
    }
}

/// The answer to one user message.
#[derive(Clone, Debug)]
pub struct Reply {
    /// Text of the final assistant message.
    pub text: String,
    /// Tool calls made during the turn, in execution order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model round trips the turn took.
    pub steps: usize,
    /// Why the model stopped, if it said so.
    pub finish_reason: Option<ModelFinishReason>,
}

/// A tool call made while answering a user message.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRecord {
    /// Name of the called tool.
    pub name: String,
    /// Arguments as sent by the model.
    pub arguments: Value,
    /// Text reported back to the model.
    pub output: String,
    /// Whether the call failed. The failure is described in `output`.
    pub failed: bool,
}

/// An agent instance, which maintains a conversation, a model client, and
/// the tools of its [`AgentConfig`].
///
/// An agent handles one user message at a time.
pub struct Agent {
    config: AgentConfig,
    options: AgentOptions,
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    conversation: Conversation,
}

impl Agent {
    /// Creates an agent from `config`, resolving its model if needed.
    ///
    /// No request is sent until the first message.
    pub fn new<R>(config: AgentConfig, resolver: &R) -> Result<Self, Error>
    where
        R: ModelResolver + ?Sized,
    {
        let model_client = match config.model() {
            ModelRef::Id(id) => resolver.resolve(id)?,
            ModelRef::Client(client) => client.clone(),
        };
        debug!(agent = config.name(), model = %config.model(), "agent created");
        Ok(Self {
            tool_executor: ToolExecutor::with_tools(config.tools()),
            config,
            options: AgentOptions::default(),
            model_client,
            conversation: Conversation::default(),
        })
    }

    /// Replaces the runtime options.
    #[inline]
    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the agent name.
    #[inline]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Returns the configuration this agent was created from.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the runtime options.
    #[inline]
    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Forgets the conversation so far.
    #[inline]
    pub fn clear_conversation(&mut self) {
        self.conversation = Conversation::default();
    }

    /// Sends a user message and drives the model until it answers.
    ///
    /// If the turn fails, or the returned future is dropped before it
    /// completes, the conversation is left as it was before the call.
    pub async fn send_message<S: Into<String>>(
        &mut self,
        input: S,
    ) -> Result<Reply, Error> {
        let span = info_span!("turn", agent = %self.config.name());
        let mut turn = Turn::begin(self);
        let result = turn.agent.run_turn(input.into()).instrument(span).await;
        match &result {
            Ok(_) => turn.commit(),
            Err(err) => warn!("turn failed, rolling back: {err}"),
        }
        result
    }

    async fn run_turn(&mut self, input: String) -> Result<Reply, Error> {
        let msg = ModelMessage::User(input.clone());
        self.record(msg, input, TranscriptSource::User);

        let mut records = vec![];
        for step in 1..=self.options.max_steps {
            let req = self.build_model_request();
            let on_transcript = self.assistant_transcript_fn();
            let resp = self
                .model_client
                .send_with_retry(&req, &self.options.retry, on_transcript)
                .await?;
            let ModelClientResponse {
                transcript,
                opaque_msg,
                tool_calls,
                finish_reason,
            } = resp;
            debug!(step, tool_calls = tool_calls.len(), "model step finished");

            let msg = match opaque_msg {
                Some(opaque) => ModelMessage::Opaque(opaque),
                None => ModelMessage::Assistant(transcript.clone()),
            };
            self.record(msg, transcript.clone(), TranscriptSource::Assistant);

            if tool_calls.is_empty() {
                return Ok(Reply {
                    text: transcript,
                    tool_calls: records,
                    steps: step,
                    finish_reason,
                });
            }

            let outcomes = self.tool_executor.run(&tool_calls).await;
            for outcome in outcomes {
                let output = outcome.output();
                if let Some(on_transcript) = &self.options.on_transcript {
                    on_transcript(&output, TranscriptSource::Tool);
                }
                let msg = ModelMessage::Tool(ToolCallResult {
                    id: outcome.id,
                    content: output.clone(),
                });
                self.record(msg, output.clone(), TranscriptSource::Tool);
                records.push(ToolCallRecord {
                    name: outcome.name,
                    arguments: outcome.arguments,
                    output,
                    failed: outcome.result.is_err(),
                });
            }
        }

        Err(Error::StepLimitExceeded(self.options.max_steps))
    }

    #[inline]
    fn record(
        &mut self,
        msg: ModelMessage,
        transcript: String,
        source: TranscriptSource,
    ) {
        self.conversation.push(msg, transcript, source);
    }

    fn assistant_transcript_fn(&self) -> Option<TranscriptFn> {
        let on_transcript = self.options.on_transcript.clone()?;
        Some(Arc::new(move |delta: &str| {
            on_transcript(delta, TranscriptSource::Assistant)
        }))
    }

    fn build_model_request(&self) -> ModelRequest {
        let instruction = self.config.instruction();
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        if !instruction.trim().is_empty() {
            messages.push(ModelMessage::System(instruction.to_owned()));
        }
        messages.extend(self.conversation.messages().cloned());
        ModelRequest {
            messages,
            tools: self.tool_executor.definitions(),
        }
    }
}

/// Truncates the conversation back to where a turn started, unless the
/// turn was committed.
struct Turn<'a> {
    agent: &'a mut Agent,
    checkpoint: usize,
    committed: bool,
}

impl<'a> Turn<'a> {
    fn begin(agent: &'a mut Agent) -> Self {
        let checkpoint = agent.conversation.len();
        Self {
            agent,
            checkpoint,
            committed: false,
        }
    }

    #[inline]
    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("discarding an unfinished turn");
            self.agent.conversation.truncate(self.checkpoint);
        }
    }
}

impl Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("conversation", &self.conversation.len())
            .finish_non_exhaustive()
    }
}
