//! Mailbox synchronization: on-demand and push-driven import of messages
//! into the message store.

pub mod extract;
pub mod html;
pub mod ports;
pub mod synchronizer;

pub use synchronizer::MailboxSynchronizer;
