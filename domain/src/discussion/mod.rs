//! Discussion of controversial clusters: per-cluster state, transcripts and
//! response parsing.

pub mod parsing;
pub mod record;

pub use parsing::{DiscussionReply, parse_discussion_response};
pub use record::{
    ControversyRecord, DiscussionRound, DiscussionState, OracleStatement, transcript_lines,
};
