//! Find a meeting time with permission: collects the details of a
//! meeting over one or more turns, then emails invitees a link to
//! share their availability.

pub mod attendees;
pub mod dialog;
pub mod error;
pub mod finalize;
pub mod models;
pub mod ports;
pub mod recurrence;
pub mod request;
pub mod required_fields;
pub mod validate;

pub use dialog::{DialogMode, TurnContext, handle_turn};
pub use error::SkillError;
pub use models::{ConversationState, DialogQuery};
pub use ports::Collaborators;
