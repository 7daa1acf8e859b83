//! Connected wallet identity, passed explicitly to whoever needs it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    HandCash,
    ElectrumSv,
}

/// Role a wallet registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Collector,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Collector => "collector",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Collector => "Collector",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "collector" => Ok(Self::Collector),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// The collector's wallet for one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymail: Option<String>,
    pub kind: WalletKind,
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
}

impl WalletSession {
    /// A HandCash session known only by handle.
    pub fn handcash(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            display_name: None,
            avatar_url: None,
            paymail: None,
            kind: WalletKind::HandCash,
            auth_token: None,
        }
    }

    /// An ElectrumSV wallet, identified by address.
    pub fn electrum_sv(address: impl Into<String>) -> Self {
        Self {
            kind: WalletKind::ElectrumSv,
            ..Self::handcash(address)
        }
    }

    /// Where this wallet receives payments.
    pub fn payout_destination(&self) -> &str {
        &self.handle
    }
}
