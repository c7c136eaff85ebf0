pub mod command;
pub mod config;
pub mod error;
pub mod failures;
pub mod index_page;
pub mod inject;
pub mod job;
pub mod layout;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod preflight;
pub mod release;
pub mod sign;
pub mod template;

#[cfg(test)]
mod testutil;

pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use config::{Config, ConfigError};
pub use error::RepoError;
pub use failures::Failures;
pub use index_page::{IndexPageBuilder, StaticIndexPages};
pub use job::{DebRepoJob, JobReport};
pub use output::OutputStore;
pub use pipeline::JobContext;
pub use sign::Signer;
