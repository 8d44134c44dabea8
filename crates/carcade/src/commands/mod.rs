//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod extract_messages;
pub(crate) mod init;
pub(crate) mod runserver;

pub(crate) use build::BuildArgs;
pub(crate) use extract_messages::ExtractMessagesArgs;
pub(crate) use init::InitArgs;
pub(crate) use runserver::RunserverArgs;
