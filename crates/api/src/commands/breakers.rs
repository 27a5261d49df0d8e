//! Circuit breaker commands

use jobwarden_common::resilience::CircuitBreakerReport;
use jobwarden_domain::Result;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_logged;

/// State, configuration and counters of every registered breaker.
pub async fn breaker_stats(ctx: &AppContext) -> Result<Vec<CircuitBreakerReport>> {
    execute_logged("breakers::breaker_stats", || async { Ok(ctx.breakers.reports()) }).await
}
