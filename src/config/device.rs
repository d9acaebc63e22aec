// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device configuration
//!
//! Selects the firmware generation of the board. The register layout is
//! derived from it unless an explicit `layout` block overrides all four
//! constants.

use serde::{Deserialize, Serialize};

use crate::device::{DeviceLayout, ProtocolVersion};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Firmware generation (`v1` or `v2`)
    #[serde(default)]
    pub protocol: ProtocolVersion,

    /// Layout override, for boards flashed with non-standard constants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<DeviceLayout>,
}

impl DeviceConfig {
    /// Layout in effect for this configuration
    pub fn layout(&self) -> DeviceLayout {
        self.layout.unwrap_or_else(|| self.protocol.layout())
    }
}
