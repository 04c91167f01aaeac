//! LLM boundary for Cambrian.
//!
//! Providers turn an agent's situation into free-form "talk" and parse talk
//! back into an [`intent::ActionIntent`]. Both operations degrade to a
//! silent/no-op result rather than aborting a round.

pub mod http;
pub mod intent;
pub mod mock;
pub mod provider;

pub use http::{HttpProvider, HttpProviderConfig};
pub use intent::ActionIntent;
pub use mock::MockProvider;
pub use provider::{LlmError, TalkContext, TalkProvider};
