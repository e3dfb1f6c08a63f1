pub mod comments;
pub mod ledger;
pub mod models;

pub use comments::{add_comment, add_reply, validate_body};
pub use ledger::{
    apply_reaction, Reaction, ReactionChange, ReactionKind, ReactionLedger, ReactionSummary,
    TOP_REACTIONS_SHOWN,
};
pub use models::{Comment, Message, Post, PostType, Privacy, ReactionTarget, Reply};
