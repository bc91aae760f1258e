//! Access-control options attached to stored entries.

use serde::{Deserialize, Serialize};

use crate::errors::PlatformResult;
use crate::platform::{AuthenticationProbe, AuthenticationType, PlatformFamily};

/// When an entry may be decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessible {
    /// While the device is unlocked.
    WhenUnlocked,
    /// While the device is unlocked; never migrated to another device.
    WhenUnlockedThisDeviceOnly,
    /// After the first unlock following a restart.
    AfterFirstUnlock,
    /// After the first unlock; never migrated to another device.
    AfterFirstUnlockThisDeviceOnly,
    /// Only while a device passcode is set; never migrated.
    WhenPasscodeSetThisDeviceOnly,
}

/// Live authentication required to use an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessControl {
    /// Any form of user presence (biometrics or passcode).
    UserPresence,
    /// Any enrolled biometric.
    BiometryAny,
    /// Biometrics enrolled when the entry was written.
    BiometryCurrentSet,
    /// Device passcode.
    DevicePasscode,
    /// Any enrolled biometric, or the passcode.
    BiometryAnyOrDevicePasscode,
    /// Biometrics enrolled at write time, or the passcode.
    BiometryCurrentSetOrDevicePasscode,
}

/// Coarse access-control policy of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessControlPolicy {
    /// Decryptable whenever the device is unlocked.
    Public,
    /// Requires biometric or passcode presence at read/write time.
    Authenticated,
}

/// Options passed through to the platform store on writes and reads.
///
/// The default value is empty and leaves the platform's own defaults in place,
/// which amounts to public accessibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlOptions {
    /// Accessibility class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<Accessible>,
    /// Required live authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<AccessControl>,
}

impl AccessControlOptions {
    /// Options for entries readable whenever the device is unlocked.
    pub fn public() -> Self {
        Self::default().with_accessible(Accessible::WhenUnlockedThisDeviceOnly)
    }

    /// Options requiring live authentication, as used on `family`.
    pub fn authenticated(family: PlatformFamily) -> Self {
        let access_control = match family {
            PlatformFamily::Apple => AccessControl::UserPresence,
            PlatformFamily::Android | PlatformFamily::Desktop => {
                AccessControl::BiometryCurrentSetOrDevicePasscode
            }
        };
        Self::public().with_access_control(access_control)
    }

    /// Set the accessibility class.
    pub fn with_accessible(mut self, accessible: Accessible) -> Self {
        self.accessible = Some(accessible);
        self
    }

    /// Require live authentication.
    pub fn with_access_control(mut self, access_control: AccessControl) -> Self {
        self.access_control = Some(access_control);
        self
    }

    /// The coarse policy these options amount to.
    pub fn policy(&self) -> AccessControlPolicy {
        if self.access_control.is_some() {
            AccessControlPolicy::Authenticated
        } else {
            AccessControlPolicy::Public
        }
    }
}

/// Options for entries readable whenever the device is unlocked.
pub fn public_access_control_options() -> AccessControlOptions {
    AccessControlOptions::public()
}

/// Pick the strongest options the device can actually honour.
///
/// Returns authenticated options only when real passcode or biometric
/// authentication is confirmed. Emulators on development builds are treated
/// as unable to authenticate. Probe failures yield the empty options.
pub async fn probe_private_access_control_options<P>(
    probe: &P,
    development_build: bool,
) -> AccessControlOptions
where
    P: AuthenticationProbe + ?Sized,
{
    match can_really_authenticate(probe, development_build).await {
        Ok(true) => AccessControlOptions::authenticated(probe.platform_family()),
        Ok(false) => AccessControlOptions::default(),
        Err(err) => {
            tracing::debug!("Keychain: authentication probe failed: {}", err);
            AccessControlOptions::default()
        }
    }
}

async fn can_really_authenticate<P>(probe: &P, development_build: bool) -> PlatformResult<bool>
where
    P: AuthenticationProbe + ?Sized,
{
    let family = probe.platform_family();
    let can_authenticate = match family {
        PlatformFamily::Apple => {
            probe
                .can_imply_authentication(AuthenticationType::DevicePasscodeOrBiometrics)
                .await?
        }
        PlatformFamily::Android | PlatformFamily::Desktop => {
            probe.supported_biometry_type().await?.is_some()
        }
    };

    if !can_authenticate {
        return Ok(false);
    }

    // Simulated biometrics give false confidence
    if development_build && probe.is_emulator().await? {
        tracing::debug!("Keychain: emulator detected, authentication treated as unavailable");
        return Ok(false);
    }

    Ok(true)
}
