pub mod context;
pub mod coordinator;
pub mod step;
pub mod steps;

pub use context::{Artifact, CertificateBundle, Context};
pub use coordinator::{Coordinator, UndoFailure, WorkflowResult};
pub use step::Step;
pub use steps::{ProvisionSpec, LEAF_CERTIFICATE, ROOT_CA};
