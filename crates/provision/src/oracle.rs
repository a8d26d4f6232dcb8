use crate::provider::CapabilityProvider;
use futures::FutureExt;
use log::{debug, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use superres_core::state::Readiness;
use superres_core::GateError;

/// Asks the provider whether the model is usable. Errors and panics become
/// [`Readiness::UnknownFailure`].
#[derive(Clone)]
pub struct ReadinessOracle {
    provider: Arc<dyn CapabilityProvider>,
}

impl ReadinessOracle {
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    pub async fn query_state(&self) -> Readiness {
        match AssertUnwindSafe(self.provider.ready_state())
            .catch_unwind()
            .await
        {
            Ok(Ok(state)) => {
                debug!("Provider reports {:?}", state);
                state.into()
            }
            Ok(Err(e)) => {
                warn!("{}", GateError::ProviderUnavailable(e.to_string()));
                Readiness::UnknownFailure
            }
            Err(_) => {
                warn!("{}", GateError::ProviderUnavailable("provider panicked".into()));
                Readiness::UnknownFailure
            }
        }
    }
}
