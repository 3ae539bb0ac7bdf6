// Stores layer - Data access over the IAM schema

pub mod credential_store;

pub use credential_store::CredentialStore;
