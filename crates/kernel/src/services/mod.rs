//! Outbound service collaborators.

pub mod email;

pub use email::Mailer;
