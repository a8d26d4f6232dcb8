use serde::{Deserialize, Serialize};

/// Canonical availability of the AI super-resolution feature.
///
/// Owned and mutated by the state machine only. Every UI flag is a projection
/// of this value (see [`crate::view`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureState {
    #[default]
    Unknown,
    NotSupported,
    ModelNotReady,
    ModelDownloading,
    Ready,
}

impl FeatureState {
    /// Whether `self -> next` is an edge of the transition table.
    pub fn can_transition_to(self, next: FeatureState) -> bool {
        use FeatureState::*;
        matches!(
            (self, next),
            (Unknown, NotSupported)
                | (Unknown, ModelNotReady)
                | (Unknown, Ready)
                | (ModelNotReady, ModelDownloading)
                | (ModelDownloading, Ready)
                | (ModelDownloading, ModelNotReady)
        )
    }

    pub fn is_resolved(self) -> bool {
        self != FeatureState::Unknown
    }
}

/// Result of the synchronous platform check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Supported,
    Unsupported,
}

/// What the capability provider says about the on-device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderState {
    Ready,
    NotReady,
    DisabledByUser,
}

/// Oracle answer: the provider's state, or `UnknownFailure` if asking failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
    DisabledByUser,
    UnknownFailure,
}

impl From<ProviderState> for Readiness {
    fn from(state: ProviderState) -> Self {
        match state {
            ProviderState::Ready => Readiness::Ready,
            ProviderState::NotReady => Readiness::NotReady,
            ProviderState::DisabledByUser => Readiness::DisabledByUser,
        }
    }
}

/// Terminal result of a provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Success,
    Failure(String),
}

/// Capability level of the engine installed after reaching `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineStatus {
    #[default]
    Absent,
    Initializing,
    Full,
    /// A no-op engine stands in. `reason` is set when an AI engine failed to
    /// start and is `None` when the build has no AI engine at all.
    Degraded { reason: Option<String> },
}

impl EngineStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, EngineStatus::Degraded { .. })
    }
}
