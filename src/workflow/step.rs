use crate::utils::errors::Result;
use crate::workflow::context::Context;
use async_trait::async_trait;

/// One named unit of provisioning work with an explicit reverse action.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable identifier, used in results and logs
    fn name(&self) -> &str;

    /// Perform the forward operation, storing any produced artifact in `ctx`
    async fn apply(&self, ctx: &mut Context) -> Result<()>;

    /// Reverse the forward operation using artifacts already in `ctx`. Must
    /// tolerate the forward effect never having completed, and repeated
    /// invocation (a second undo is a no-op, not an error).
    async fn undo(&self, ctx: &mut Context) -> Result<()>;
}
