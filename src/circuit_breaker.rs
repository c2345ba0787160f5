use crate::errors::{SourceError, SourceId};
use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{CircuitBreaker, Config, StateMachine};
use std::future::Future;
use std::time::Duration;

/// Circuit breaker guarding one upstream source.
pub type SourceCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for an upstream source.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// While OPEN, calls fail fast with a [`SourceError`] instead of waiting on
/// a source that is known to be down.
pub fn create_source_circuit_breaker() -> SourceCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// Runs `request` through `breaker`, recording its outcome.
pub async fn call_guarded<T, F>(
    breaker: &SourceCircuitBreaker,
    source: SourceId,
    request: F,
) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    if !breaker.is_call_permitted() {
        tracing::warn!("Circuit open for {}, rejecting call", source);
        return Err(SourceError::new(
            source,
            "circuit open after repeated failures",
        ));
    }

    let outcome = request.await;
    // Only success/failure matters to the policy.
    let _ = breaker.call(|| outcome.as_ref().map(|_| ()).map_err(|_| ()));
    outcome
}
