//! Domain types and models

pub mod availability;
pub mod credential;
pub mod mailbox;

pub use availability::{
    validate_duration, AvailabilitySlot, AvailabilitySuggestion, BusyInterval, WorkingHours,
    WorkingHoursPolicy,
};
pub use credential::{
    ConnectionStatus, Credential, Provider, StoredCredential, TokenGrant, ValidAccessToken,
};
pub use mailbox::{
    HistoryDelta, MailMessage, MailSyncReport, MailboxProfile, MessageHeader, MimePart, NewMessage,
    NotificationSyncReport, PushNotification, StoredMessage, SyncCursor, UpsertOutcome,
    WatchRegistration,
};
