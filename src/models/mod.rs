//! Data models exchanged with the Chapar backend
//!
//! Everything here is a plain DTO. The backend is authoritative for every
//! field; the client never derives state it does not receive.

mod channel;
mod chat;
mod media;
mod page;
mod post;
mod user;

pub use channel::{Channel, ChannelDraft, ChannelId, Platform};
pub use chat::{ChatMessage, ChatReply, ChatSession, Envelope, MessageRole, SavedPrompt};
pub use media::{MediaAsset, MediaId, MediaKind, StorageInfo};
pub use page::{ListOrPage, Page, page_count};
pub use post::{Attachment, Post, PostId, PostStatus, PostType};
pub use user::{ProfileUpdate, ServerMessage, User};
