use crate::{PASSWORD_MAX, SSID_MAX};

/// Token the GPO edge context hands to the credential listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvEvent {
    /// Sustained GPO low: an RF session is updating the tag's message area.
    TagWritten,
    /// A GPO pulse that had cleared again before it could be classified as
    /// a write session (field entry/exit, reader probes, user pulses). The
    /// credential listener skips these without touching the tag.
    FieldActivity,
}

/// Validated network join parameters extracted from a credential record.
///
/// Constructible only through [`ProvisioningCredentials::from_parts`]; an
/// instance that exists satisfies the radio's length bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProvisioningCredentials {
    ssid: [u8; SSID_MAX],
    ssid_len: u8,
    password: [u8; PASSWORD_MAX],
    password_len: u8,
    auth_code: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialBoundsError {
    SsidTooLong,
    PasswordTooLong,
}

impl ProvisioningCredentials {
    pub fn from_parts(
        ssid: &[u8],
        password: &[u8],
        auth_code: u8,
    ) -> Result<Self, CredentialBoundsError> {
        if ssid.len() > SSID_MAX {
            return Err(CredentialBoundsError::SsidTooLong);
        }
        if password.len() > PASSWORD_MAX {
            return Err(CredentialBoundsError::PasswordTooLong);
        }

        let mut result = Self {
            ssid: [0u8; SSID_MAX],
            ssid_len: ssid.len() as u8,
            password: [0u8; PASSWORD_MAX],
            password_len: password.len() as u8,
            auth_code,
        };
        result.ssid[..ssid.len()].copy_from_slice(ssid);
        result.password[..password.len()].copy_from_slice(password);
        Ok(result)
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid[..self.ssid_len as usize]
    }

    pub fn password(&self) -> &[u8] {
        &self.password[..self.password_len as usize]
    }

    pub const fn auth_code(&self) -> u8 {
        self.auth_code
    }
}

/// Connection attempt progress; single writer is the connection task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Retrying,
    Connected,
    Failed,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Retrying => "Retrying",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

/// Terminal result of one provisioning attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Connected,
    Failed,
}

impl ProvisioningOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}
