// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2024-2025 Oracle Verification Developers

//! Intel SGX platform TCB status

use enumset::{enum_set, EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

/// TCB status as reported by quote verification
#[derive(EnumSetType, Debug, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
#[non_exhaustive]
pub enum TcbStatus {
    /// TCB is up to date
    UpToDate,
    /// TCB is up to date, but the software hardening is not
    SwHardeningNeeded,
    /// TCB is up to date, but the configuration is not
    ConfigurationNeeded,
    /// TCB is up to date, but the configuration and software hardening is not
    ConfigurationAndSwHardeningNeeded,
    /// TCB is out of date
    OutOfDate,
    /// TCB is out of date and the configuration is also out of date
    OutOfDateConfigurationNeeded,
    /// Platform keys are revoked
    Revoked,
}

/// Invalid TCB levels that are still accepted
pub const TOLERATED_INVALID_STATUS: EnumSet<TcbStatus> = enum_set!(
    TcbStatus::ConfigurationNeeded | TcbStatus::ConfigurationAndSwHardeningNeeded
);

impl TcbStatus {
    /// `true` for a fully patched platform
    pub fn is_up_to_date(self) -> bool {
        self == TcbStatus::UpToDate
    }
}

impl FromStr for TcbStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" | "uptodate" => Ok(TcbStatus::UpToDate),
            "swhardeningneeded" => Ok(TcbStatus::SwHardeningNeeded),
            "configurationneeded" | "configneeded" => Ok(TcbStatus::ConfigurationNeeded),
            "configurationandswhardeningneeded" | "configandswhardeningneeded" => {
                Ok(TcbStatus::ConfigurationAndSwHardeningNeeded)
            }
            "outofdate" => Ok(TcbStatus::OutOfDate),
            "outofdateconfigurationneeded" | "outofdateconfigneeded" => {
                Ok(TcbStatus::OutOfDateConfigurationNeeded)
            }
            "revoked" => Ok(TcbStatus::Revoked),
            _ => Err(format!("Invalid TCB status: {s}")),
        }
    }
}

impl Display for TcbStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TcbStatus::UpToDate => write!(f, "UpToDate"),
            TcbStatus::SwHardeningNeeded => write!(f, "SWHardeningNeeded"),
            TcbStatus::ConfigurationNeeded => write!(f, "ConfigurationNeeded"),
            TcbStatus::ConfigurationAndSwHardeningNeeded => {
                write!(f, "ConfigurationAndSWHardeningNeeded")
            }
            TcbStatus::OutOfDate => write!(f, "OutOfDate"),
            TcbStatus::OutOfDateConfigurationNeeded => write!(f, "OutOfDateConfigurationNeeded"),
            TcbStatus::Revoked => write!(f, "Revoked"),
        }
    }
}
