pub mod config;
pub mod drain;
pub mod error;
pub mod signal;
pub mod telemetry;
pub mod types;

pub use error::{ErrorKind, JobFailure};
pub use types::{
	ChatMessage, Chunk, CompanyJob, JobResult, Priority, Profile, ProviderDescriptor, ProviderLimits,
	ProviderTier, ScrapeOutcome,
};
