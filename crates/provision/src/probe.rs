use crate::config::{env_flag, PlatformRequirement, FORCE_UNSUPPORTED_ENV};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use superres_core::state::Eligibility;

/// Cheap, synchronous check of whether this machine can run the feature at
/// all. Implementations must not block or fail; when in doubt answer
/// [`Eligibility::Unsupported`].
pub trait CapabilityProbe: Send + Sync {
    fn check_eligibility(&self) -> Eligibility;
}

/// Matches the running OS and CPU architecture against an allow-list.
pub struct SystemProbe {
    requirement: PlatformRequirement,
    os: String,
    arch: String,
    forced_off: bool,
}

impl SystemProbe {
    pub fn new(requirement: PlatformRequirement) -> Self {
        Self {
            requirement,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            forced_off: env_flag(FORCE_UNSUPPORTED_ENV),
        }
    }

    /// Pretend to run on `os`/`arch` instead of the host.
    pub fn with_target(mut self, os: &str, arch: &str) -> Self {
        self.os = os.to_string();
        self.arch = arch.to_string();
        self
    }

    pub fn forced_off(mut self, forced_off: bool) -> Self {
        self.forced_off = forced_off;
        self
    }

    fn inspect(&self) -> Eligibility {
        if self.forced_off {
            return Eligibility::Unsupported;
        }
        let os_ok = self.requirement.operating_systems.iter().any(|os| *os == self.os);
        let arch_ok = self
            .requirement
            .architectures
            .iter()
            .any(|arch| *arch == self.arch);
        if os_ok && arch_ok {
            Eligibility::Supported
        } else {
            Eligibility::Unsupported
        }
    }
}

impl CapabilityProbe for SystemProbe {
    fn check_eligibility(&self) -> Eligibility {
        let eligibility =
            panic::catch_unwind(AssertUnwindSafe(|| self.inspect())).unwrap_or(Eligibility::Unsupported);
        debug!("{}/{} eligibility: {:?}", self.os, self.arch, eligibility);
        eligibility
    }
}

/// Always gives the same answer.
pub struct FixedProbe(pub Eligibility);

impl CapabilityProbe for FixedProbe {
    fn check_eligibility(&self) -> Eligibility {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_decides() {
        let probe = SystemProbe::new(PlatformRequirement::default()).forced_off(false);

        assert_eq!(
            probe.with_target("windows", "aarch64").check_eligibility(),
            Eligibility::Supported
        );

        let probe = SystemProbe::new(PlatformRequirement::default()).forced_off(false);
        assert_eq!(
            probe.with_target("windows", "x86").check_eligibility(),
            Eligibility::Unsupported
        );

        let probe = SystemProbe::new(PlatformRequirement::default()).forced_off(false);
        assert_eq!(
            probe.with_target("freebsd", "x86_64").check_eligibility(),
            Eligibility::Unsupported
        );
    }

    #[test]
    fn forced_off_wins() {
        let probe = SystemProbe::new(PlatformRequirement::default())
            .with_target("linux", "x86_64")
            .forced_off(true);
        assert_eq!(probe.check_eligibility(), Eligibility::Unsupported);
    }
}
