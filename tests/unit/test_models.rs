use occ::models::{
    cloud_config::{CloudConfig, ConfigMap, Verify},
    manifest::{ManifestError, RequirementsManifest},
    requirement::{Comparator, Requirement},
};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;

fn shipped_manifest_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("requirements.txt")
}

#[cfg(test)]
mod shipped_manifest_tests {
    use super::*;

    #[test]
    fn test_has_exactly_four_specifiers() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        assert_eq!(manifest.len(), 4);
    }

    #[test]
    fn test_specifiers_are_well_formed() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        for requirement in &manifest {
            assert!(requirement.validate().is_ok(), "invalid: {}", requirement);
            assert_eq!(requirement.comparator, Comparator::GreaterEqual);
            assert!(requirement.annotation.is_some(), "missing license: {}", requirement);
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        assert_eq!(
            manifest.names(),
            vec!["PyYAML", "appdirs", "keystoneauth1", "requestsexceptions"]
        );
        assert!(manifest
            .check_order(&["PyYAML", "appdirs", "keystoneauth1", "requestsexceptions"])
            .is_ok());
    }

    #[test]
    fn test_no_duplicates() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        let unique: HashSet<String> = manifest.iter().map(Requirement::normalized_name).collect();
        assert_eq!(unique.len(), manifest.len());
    }

    #[test]
    fn test_header_documents_order_significance() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        assert!(manifest.header.iter().any(|line| line.contains("order")));
    }

    #[test]
    fn test_minimum_versions() {
        let manifest = RequirementsManifest::load(shipped_manifest_path()).unwrap();
        let keystoneauth = manifest.get("keystoneauth1").unwrap();
        assert!(keystoneauth.is_satisfied_by("2.1.0").unwrap());
        assert!(keystoneauth.is_satisfied_by("3.4").unwrap());
        assert!(!keystoneauth.is_satisfied_by("2.0.9").unwrap());
    }
}

#[cfg(test)]
mod manifest_tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let err = RequirementsManifest::load("/nonexistent/requirements.txt").unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }

    #[test]
    fn test_reordered_manifest_fails_order_check() {
        let manifest =
            RequirementsManifest::parse("appdirs>=1.3.0\nPyYAML>=3.1.0\n").unwrap();
        let err = manifest.check_order(&["PyYAML", "appdirs"]).unwrap_err();
        assert!(err.to_string().contains("Expected 'PyYAML' at position 1"));
    }

    #[test]
    fn test_mixed_comparators() {
        let manifest =
            RequirementsManifest::parse("a>=1.0\nb==2.0 # pinned\nc~=1.4\nd!=0.9\n").unwrap();
        let comparators: Vec<Comparator> = manifest.iter().map(|r| r.comparator).collect();
        assert_eq!(
            comparators,
            vec![
                Comparator::GreaterEqual,
                Comparator::Equal,
                Comparator::Compatible,
                Comparator::NotEqual
            ]
        );
    }

    #[test]
    fn test_manifest_with_pre_and_post_releases() {
        let manifest = RequirementsManifest::parse(
            "pbr>=1.0rc1\nsix>=2.0.post1 # MIT\nmock>=1.0.dev0\nepoch>=1!2.0\n",
        )
        .unwrap();
        assert_eq!(manifest.len(), 4);
        assert_eq!(manifest.render().lines().next(), Some("pbr>=1.0rc1"));

        let pbr = manifest.get("pbr").unwrap();
        assert!(pbr.is_satisfied_by("1.0").unwrap());
        assert!(!pbr.is_satisfied_by("1.0b1").unwrap());
    }
}

#[cfg(test)]
mod cloud_config_tests {
    use super::*;

    fn config(value: serde_json::Value) -> ConfigMap {
        value.as_object().unwrap().clone().into_iter().collect()
    }

    #[test]
    fn test_verify_args_with_cert_and_key() {
        let cc = CloudConfig::new(
            "test1",
            "region-al",
            config(json!({"verify": true, "cacert": "/etc/ssl/ca.pem", "cert": "c.pem", "key": "k.pem"})),
        );
        let (verify, cert) = cc.get_requests_verify_args();
        assert_eq!(verify, Verify::CaBundle(PathBuf::from("/etc/ssl/ca.pem")));
        let cert = cert.unwrap();
        assert_eq!(cert.cert, PathBuf::from("c.pem"));
        assert_eq!(cert.key, Some(PathBuf::from("k.pem")));
    }

    #[test]
    fn test_services_are_deduplicated() {
        let cc = CloudConfig::new(
            "test1",
            "region-al",
            config(json!({
                "compute_api_version": "2",
                "compute_service_name": "nova",
                "compute_service_type": "compute",
                "block_storage_api_version": "3",
            })),
        );
        assert_eq!(cc.get_services(), vec!["block_storage", "compute"]);
    }

    #[test]
    fn test_auth_args() {
        let cc = CloudConfig::new(
            "test1",
            "region-al",
            config(json!({"auth": {"username": "demo"}})),
        );
        assert_eq!(cc.get_auth_args().unwrap()["username"], "demo");
        assert!(CloudConfig::new("x", "", ConfigMap::new()).get_auth_args().is_none());
    }
}
