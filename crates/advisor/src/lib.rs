//! The advisory pipeline.
//!
//! [`ContextAggregator`] turns a farmer's stored snapshots into four
//! sentences; [`Advisor`] wraps them in the behavioral policy, adds recent
//! history, asks the model, and reads the reply back as
//! `{language, response}` (falling back to language detection when the
//! model ignores the JSON contract).

pub mod advisor;
pub mod context;
pub mod language;
pub mod prompt;

pub use advisor::{
    Advisor, AdvisorSettings, AdvisoryOutcome, AdvisoryReply, AdvisoryRequest, interpret_reply,
};
pub use context::{AdvisoryContext, ContextAggregator};
pub use language::{detect_language_tag, tag_for_iso639_3};
