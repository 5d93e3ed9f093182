// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

fn settings_from(vars: &[(&str, &str)]) -> BrokerSettings {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BrokerSettings::from_lookup(|name| map.get(name).cloned())
}

#[test]
fn defaults_without_environment() {
    let settings = settings_from(&[]);
    assert_eq!(settings.host, "localhost");
    assert_eq!(settings.port, 61612);
    assert_eq!(settings.user, "admin");
    assert!(!settings.use_ssl);
    assert_eq!(settings.ssl_ca_certs, None);
}

#[test]
fn environment_overrides() {
    let settings = settings_from(&[
        ("ACTIVEMQ_HOST", "broker.example.org"),
        ("ACTIVEMQ_PORT", "61613"),
        ("ACTIVEMQ_USER", "swf"),
        ("ACTIVEMQ_PASSWORD", "secret"),
        ("ACTIVEMQ_USE_SSL", "True"),
        ("ACTIVEMQ_SSL_CA_CERTS", "/etc/ssl/broker-ca.pem"),
    ]);
    assert_eq!(settings.host, "broker.example.org");
    assert_eq!(settings.port, 61613);
    assert_eq!(settings.user, "swf");
    assert!(settings.use_ssl);
    assert_eq!(
        settings.ssl_ca_certs,
        Some(PathBuf::from("/etc/ssl/broker-ca.pem"))
    );
}

#[yare::parameterized(
    garbage_port = { &[("ACTIVEMQ_PORT", "not-a-port")] },
    empty_ca = { &[("ACTIVEMQ_SSL_CA_CERTS", "")] },
)]
fn invalid_values_fall_back(vars: &[(&str, &str)]) {
    let settings = settings_from(vars);
    assert_eq!(settings.port, 61612);
    assert_eq!(settings.ssl_ca_certs, None);
}
