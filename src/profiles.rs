//! Link profiles
//!
//! Named presets for the link settings of known firmware builds. A profile
//! supplies the base configuration that config files and flags override.

use crate::config::{FlowControlSetting, LinkConfig};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A named link preset
#[derive(Debug, Clone)]
pub struct LinkProfile {
    /// Short identifier (e.g., "mlp")
    pub id: String,
    pub name: String,
    pub description: String,
    pub config: LinkConfig,
}

/// Stock MLP firmware: no flow control, so inputs are paced by sleeps
pub static MLP_PROFILE: Lazy<LinkProfile> = Lazy::new(|| LinkProfile {
    id: "mlp".to_string(),
    name: "MLP firmware (paced)".to_string(),
    description: "Stock firmware over a plain UART; 10 ms between inputs, 100 ms settle"
        .to_string(),
    config: LinkConfig::default(),
});

/// MLP firmware on an adapter wired for RTS/CTS
pub static MLP_RTSCTS_PROFILE: Lazy<LinkProfile> = Lazy::new(|| LinkProfile {
    id: "mlp-rtscts".to_string(),
    name: "MLP firmware (hardware flow control)".to_string(),
    description: "RTS/CTS handshaking replaces the pacing delays; the post-open wait stays"
        .to_string(),
    config: LinkConfig {
        byte_delay_ms: 0,
        settle_ms: 0,
        flow_control: FlowControlSetting::Hardware,
        ..LinkConfig::default()
    },
});

/// Registry of built-in link profiles
pub static LINK_PROFILES: Lazy<HashMap<&'static str, &'static LinkProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("mlp", &*MLP_PROFILE);
    m.insert("default", &*MLP_PROFILE);
    m.insert("mlp-rtscts", &*MLP_RTSCTS_PROFILE);
    m.insert("hardware-flow", &*MLP_RTSCTS_PROFILE);
    m
});

/// Get a link profile by name
pub fn get_profile(name: &str) -> Option<&'static LinkProfile> {
    LINK_PROFILES.get(name.to_lowercase().as_str()).copied()
}

/// Profile names without aliases
pub fn profile_names() -> Vec<&'static str> {
    vec!["mlp", "mlp-rtscts"]
}
