//! Agent runtime - model-backed tool orchestration for purchase requests
//!
//! This crate is the "brain" of procura:
//! - **Turn loop** (`runtime`) - threads the session transcript through the
//!   hosted model, executing the tools it elects until a narrative lands
//! - **Tools** (`tools`) - the five model-backed procurement tools
//! - **Model seam** (`llm`) - `LlmClient` trait plus the OpenAI-compatible
//!   HTTP implementation
//! - **Telemetry recording** (`recorder`) - the prompt runner that records
//!   the nested invocation entries the step reducer later collapses
//! - **Prompts** (`prompts`) - the embedded prompt library, built once at
//!   bootstrap and injected
//!
//! The model never decides catalog contents or policy outcomes on its own
//! authority; tools return structured JSON and the surrounding system owns
//! what is done with it.

pub mod llm;
pub mod prompts;
pub mod recorder;
pub mod runtime;
pub mod tools;

pub use llm::{LlmClient, LlmError, ModelTurn, OpenAiChatClient};
pub use prompts::PromptLibrary;
pub use recorder::PromptRunner;
pub use runtime::{AgentError, AgentRuntime, TurnOutcome};
pub use tools::{Tool, ToolDescriptor, ToolRegistry};
