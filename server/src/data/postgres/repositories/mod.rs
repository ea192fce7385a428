//! PostgreSQL repositories
//!
//! Types (UserRow, MessageRow, etc.) should be imported from `crate::data::types`.

pub mod channel;
pub mod channel_member;
pub mod message;
pub mod metrics;
pub mod session_token;
pub mod user;

pub use channel::{create_channel, get_channel};
pub use channel_member::{
    add_channel_member, get_channel_member, list_channel_members, remove_channel_member,
};
pub use message::{edit_message, get_message, insert_message, list_messages_for_channel, soft_delete_message};
pub use metrics::{insert_channel_metrics, insert_message_metrics, insert_user_metrics};
pub use session_token::get_session_token;
pub use user::{create_user, get_user};
