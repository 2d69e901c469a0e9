//! Registry of stove brands served by the Agua IOT platform
//!
//! Every brand white-labels the same cloud backend. A brand entry carries the
//! `customer_code` header value and the API base URL for that brand's tenant;
//! a few brands (MyPiazzetta) additionally route the login call through their
//! own bridge endpoint.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Connection parameters for one white-label brand
#[derive(Debug, Clone, Serialize)]
pub struct BrandConfig {
    /// Display name as shown in the vendor app
    pub name: &'static str,
    /// Tenant identifier sent as the `customer_code` header
    pub customer_code: &'static str,
    /// Base URL for all API calls
    pub api_url: &'static str,
    /// Alternate base URL for the login call, when the brand uses one
    pub login_api_url: Option<&'static str>,
}

macro_rules! brand {
    ($name:expr, $code:expr, $api:expr) => {
        BrandConfig {
            name: $name,
            customer_code: $code,
            api_url: $api,
            login_api_url: None,
        }
    };
    ($name:expr, $code:expr, $api:expr, $login:expr) => {
        BrandConfig {
            name: $name,
            customer_code: $code,
            api_url: $api,
            login_api_url: Some($login),
        }
    };
}

static BRANDS: Lazy<HashMap<&'static str, BrandConfig>> = Lazy::new(|| {
    HashMap::from([
        (
            "alfaplam",
            brand!("Alfaplam", "862148", "https://alfaplam.agua-iot.com"),
        ),
        (
            "boreal",
            brand!("Boreal Home", "173118", "https://boreal.agua-iot.com"),
        ),
        (
            "bronpi",
            brand!("Bronpi Home", "164873", "https://bronpi.agua-iot.com"),
        ),
        (
            "darwin",
            brand!("Darwin Evolution", "475219", "https://cola.agua-iot.com"),
        ),
        (
            "easyconnect",
            brand!("Easy Connect", "354924", "https://remote.mcz.it"),
        ),
        (
            "easyconnectplus",
            brand!("Easy Connect Plus", "746318", "https://remote.mcz.it"),
        ),
        (
            "easyconnectpoele",
            brand!("Easy Connect Po\u{ea}le", "354925", "https://remote.mcz.it"),
        ),
        (
            "elfire",
            brand!("Elfire Wifi", "402762", "https://elfire.agua-iot.com"),
        ),
        (
            "eoss",
            brand!("EOSS WIFI", "326495", "https://solartecnik.agua-iot.com"),
        ),
        (
            "evacalor",
            brand!(
                "EvaCal\u{f2}r - PuntoFuoco",
                "635987",
                "https://evastampaggi.agua-iot.com"
            ),
        ),
        (
            "fontanaforni",
            brand!("Fontana Forni", "505912", "https://fontanaforni.agua-iot.com"),
        ),
        (
            "fonteflame",
            brand!(
                "Fonte Flamme contr\u{f4}le 1",
                "848324",
                "https://fonteflame.agua-iot.com"
            ),
        ),
        (
            "globefire",
            brand!("Globe-fire", "634876", "https://globefire.agua-iot.com"),
        ),
        (
            "goheat",
            brand!("GO HEAT", "859435", "https://amg.agua-iot.com"),
        ),
        (
            "jollymec",
            brand!("Jolly Mec Wi Fi", "732584", "https://jollymec.agua-iot.com"),
        ),
        (
            "karmek",
            brand!("Karmek Wifi", "403873", "https://karmekone.agua-iot.com"),
        ),
        (
            "klover",
            brand!("Klover Home", "143789", "https://klover.agua-iot.com"),
        ),
        (
            "laminox",
            brand!(
                "LAMINOX Remote Control 2.0",
                "352678",
                "https://laminox.agua-iot.com"
            ),
        ),
        (
            "lorflam",
            brand!("Lorflam Home", "121567", "https://lorflam.agua-iot.com"),
        ),
        (
            "moretti",
            brand!("Moretti design", "624813", "https://moretti.agua-iot.com"),
        ),
        (
            "mycorisit",
            brand!("My Corisit", "101427", "https://mycorisit.agua-iot.com"),
        ),
        (
            "piazzetta",
            brand!(
                "MyPiazzetta",
                "458632",
                "https://piazzetta.agua-iot.com",
                "https://piazzetta-iot.app2cloud.it/api/bridge/endpoint/"
            ),
        ),
        (
            "nina",
            brand!("Nina", "999999", "https://micronova.agua-iot.com"),
        ),
        (
            "nobis",
            brand!("Nobis-Fi", "700700", "https://nobis.agua-iot.com"),
        ),
        (
            "nordicfire",
            brand!("Nordic Fire 2.0", "132678", "https://nordicfire.agua-iot.com"),
        ),
        (
            "ravelli",
            brand!("Ravelli Wi-Fi", "953712", "https://aico.agua-iot.com"),
        ),
        (
            "stufepelletitalia",
            brand!(
                "Stufe a pellet Italia",
                "015142",
                "https://stufepelletitalia.agua-iot.com"
            ),
        ),
        (
            "thermoflux",
            brand!("Thermoflux", "391278", "https://thermoflux.agua-iot.com"),
        ),
        (
            "tssmart",
            brand!("TS Smart", "046629", "https://timsistem.agua-iot.com"),
        ),
        (
            "wiphire",
            brand!("Wi-Phire", "521228", "https://lineavz.agua-iot.com"),
        ),
    ])
});

/// Look up a brand by its registry key (e.g. `"evacalor"`)
pub fn get(key: &str) -> Option<&'static BrandConfig> {
    BRANDS.get(key)
}

/// Iterate over all `(key, config)` pairs, sorted by key
pub fn all() -> Vec<(&'static str, &'static BrandConfig)> {
    let mut entries: Vec<_> = BRANDS.iter().map(|(k, v)| (*k, v)).collect();
    entries.sort_by_key(|(k, _)| *k);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_brand_lookup() {
        let brand = get("evacalor").unwrap();
        assert_eq!(brand.customer_code, "635987");
        assert_eq!(brand.api_url, "https://evastampaggi.agua-iot.com");
        assert!(brand.login_api_url.is_none());
    }

    #[test]
    fn test_unknown_brand_lookup() {
        assert!(get("notabrand").is_none());
        // keys are exact, not case-folded
        assert!(get("EvaCalor").is_none());
    }

    #[test]
    fn test_piazzetta_has_alternate_login_url() {
        let brand = get("piazzetta").unwrap();
        assert_eq!(
            brand.login_api_url,
            Some("https://piazzetta-iot.app2cloud.it/api/bridge/endpoint/")
        );
    }

    #[test]
    fn test_registry_is_complete() {
        let entries = all();
        assert_eq!(entries.len(), 30);
        // sorted for stable CLI output
        let keys: Vec<_> = entries.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_all_entries_have_https_urls() {
        for (key, brand) in all() {
            assert!(
                brand.api_url.starts_with("https://"),
                "{key} has non-https api_url"
            );
            assert!(!brand.customer_code.is_empty(), "{key} has no customer code");
        }
    }
}
