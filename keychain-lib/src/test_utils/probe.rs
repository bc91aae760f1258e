//! Authentication probe with fixed answers.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::catalog::ErrorCode;
use crate::errors::{PlatformError, PlatformResult};
use crate::platform::{AuthenticationProbe, AuthenticationType, BiometryType, PlatformFamily};

/// Probe that answers from fixed values and counts emulator checks.
#[derive(Debug)]
pub struct FixedProbe {
    family: PlatformFamily,
    can_imply: bool,
    biometry: Option<BiometryType>,
    emulator: bool,
    failure: Option<ErrorCode>,
    emulator_failure: bool,
    emulator_queries: AtomicU32,
}

impl FixedProbe {
    fn base(family: PlatformFamily) -> Self {
        Self {
            family,
            can_imply: false,
            biometry: None,
            emulator: false,
            failure: None,
            emulator_failure: false,
            emulator_queries: AtomicU32::new(0),
        }
    }

    /// Apple device where passcode-or-biometrics is (or is not) usable.
    pub fn apple(can_authenticate: bool) -> Self {
        Self {
            can_imply: can_authenticate,
            ..Self::base(PlatformFamily::Apple)
        }
    }

    /// Android device reporting `biometry`.
    pub fn android(biometry: Option<BiometryType>) -> Self {
        Self {
            biometry,
            ..Self::base(PlatformFamily::Android)
        }
    }

    /// Desktop without authentication hardware.
    pub fn desktop() -> Self {
        Self::base(PlatformFamily::Desktop)
    }

    /// Report running on an emulator.
    pub fn on_emulator(mut self) -> Self {
        self.emulator = true;
        self
    }

    /// Fail the capability queries with `code`.
    pub fn failing_with(mut self, code: ErrorCode) -> Self {
        self.failure = Some(code);
        self
    }

    /// Fail the emulator query.
    pub fn failing_emulator_check(mut self) -> Self {
        self.emulator_failure = true;
        self
    }

    /// How many times the emulator query ran.
    pub fn emulator_queries(&self) -> u32 {
        self.emulator_queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> PlatformResult<()> {
        match self.failure {
            Some(code) => Err(PlatformError::from_code(code)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthenticationProbe for FixedProbe {
    fn platform_family(&self) -> PlatformFamily {
        self.family
    }

    async fn can_imply_authentication(&self, _kind: AuthenticationType) -> PlatformResult<bool> {
        self.check()?;
        Ok(self.can_imply)
    }

    async fn supported_biometry_type(&self) -> PlatformResult<Option<BiometryType>> {
        self.check()?;
        Ok(self.biometry)
    }

    async fn is_emulator(&self) -> PlatformResult<bool> {
        self.emulator_queries.fetch_add(1, Ordering::SeqCst);
        if self.emulator_failure {
            return Err(PlatformError::unavailable("device info unavailable"));
        }
        Ok(self.emulator)
    }
}
