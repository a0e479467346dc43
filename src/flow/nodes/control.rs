//! Op 200: terminate (§4.3).

use crate::flow::context::CallContext;

/// Sets the termination flag. The driver checks this after every handler
/// invocation and stops selecting further edges once it is set.
pub fn terminate(ctx: &mut CallContext) {
    ctx.terminated = true;
}
