pub mod cli;
pub mod config;
pub mod utils;
pub mod vault;
pub mod workflow;

// Re-export specific items to avoid conflicts
pub use cli::{args, commands};
pub use config::ProvisionConfig;
pub use utils::errors;
pub use vault::client::VaultClient;
pub use workflow::{
    Artifact, CertificateBundle, Context, Coordinator, ProvisionSpec, Step, WorkflowResult,
};
