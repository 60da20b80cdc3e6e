//! The Stepwise agent loop.
//!
//! The agent follows a **Plan → Action → Observe → Finish** cycle over a
//! plain-text protocol: the model answers every round with one JSON step
//! envelope, and the loop interprets it.
//!
//! 1. **Receive** a user query
//! 2. **Send** the system instruction and conversation to the model
//! 3. **Decode** the reply; correct the model if it is not a valid envelope
//! 4. **On action**: run the tool, feed the result back, go to step 2
//! 5. **On finish**: return the answer
//!
//! The loop stops after a fixed number of rounds even if the model never
//! finishes.

pub mod events;
pub mod loop_runner;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use events::{EventSink, StepEvent};
pub use loop_runner::{
    AgentLoop, FAILURE_ANSWER, INCOMPLETE_ANSWER, LoopOutcome, LoopReport, MALFORMED_CORRECTION,
};
pub use prompt::SYSTEM_PROMPT;
pub use session::{Answer, ChatSession, EXAMPLE_QUERIES, TranscriptEntry};
