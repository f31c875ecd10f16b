// ABOUTME: Integration tests for configuration parsing, discovery and validation.
// ABOUTME: Tests YAML parsing, defaults, relative path resolution and env-backed secrets.

use shipyard::config::*;
use shipyard::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
work_dir: /srv/shipyard/work
scripts_dir: /srv/shipyard/scripts
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.work_dir, Path::new("/srv/shipyard/work"));
        assert_eq!(config.cluster_cli, "oc");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(config.namespace.is_none());
        assert!(config.login.is_none());
        assert_eq!(
            config.chart_path(),
            Path::new("/srv/shipyard/scripts/managed-chart.tgz")
        );
        assert_eq!(
            config.state_file_path(),
            Path::new("/srv/shipyard/work/state.json")
        );
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
work_dir: /srv/work
scripts_dir: /srv/scripts
chart: /opt/charts/base.tgz
namespace: team-a
cluster_cli: /usr/local/bin/oc
poll_interval: 1m 30s
state_file: /var/lib/shipyard/state.json
login:
  server: https://api.cluster.example.com:6443
  token:
    env: CLUSTER_TOKEN
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("team-a"));
        assert_eq!(config.cluster_cli, "/usr/local/bin/oc");
        assert_eq!(config.poll_interval, Duration::from_secs(90));
        assert_eq!(config.chart_path(), Path::new("/opt/charts/base.tgz"));
        assert_eq!(
            config.state_file_path(),
            Path::new("/var/lib/shipyard/state.json")
        );
        let login = config.login.unwrap();
        assert_eq!(login.server, "https://api.cluster.example.com:6443");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
work_dir: /w
scripts_dir: /s
image: nginx
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(Error::Yaml(_))));
    }
}

mod validation {
    use super::*;

    #[test]
    fn zero_poll_interval_is_invalid() {
        let yaml = "work_dir: /w\nscripts_dir: /s\npoll_interval: 0s\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn empty_cluster_cli_is_invalid() {
        let yaml = "work_dir: /w\nscripts_dir: /s\ncluster_cli: \"  \"\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_login_server_is_invalid() {
        let yaml = "work_dir: /w\nscripts_dir: /s\nlogin:\n  server: \"\"\n  token: t\n";
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(Error::InvalidConfig(_))
        ));
    }
}

mod env_values {
    use super::*;

    #[test]
    fn token_resolves_from_environment() {
        let yaml = r#"
work_dir: /w
scripts_dir: /s
login:
  server: https://api.example.com:6443
  token:
    env: SHIPYARD_TEST_TOKEN
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let token = config.login.unwrap().token;

        temp_env::with_var("SHIPYARD_TEST_TOKEN", Some("sha256~abc"), || {
            assert_eq!(token.resolve().unwrap(), "sha256~abc");
        });
        temp_env::with_var_unset("SHIPYARD_TEST_TOKEN", || {
            assert!(matches!(token.resolve(), Err(Error::MissingEnvVar(_))));
        });
    }

    #[test]
    fn default_used_when_variable_unset() {
        let value = EnvValue::FromEnv {
            var: "SHIPYARD_TEST_UNSET".to_string(),
            default: Some("fallback".to_string()),
        };
        temp_env::with_var_unset("SHIPYARD_TEST_UNSET", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }
}

mod discovery {
    use super::*;

    const BODY: &str = "work_dir: ./work\nscripts_dir: ./scripts\n";

    #[test]
    fn discovers_primary_and_alternate_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_ALT), BODY).unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.work_dir, dir.path().join("./work"));

        let nested = tempfile::tempdir().unwrap();
        fs::create_dir_all(nested.path().join(".shipyard")).unwrap();
        fs::write(nested.path().join(CONFIG_FILENAME_DIR), BODY).unwrap();
        let config = Config::discover(nested.path()).unwrap();
        assert_eq!(config.scripts_dir, nested.path().join(".shipyard/./scripts"));
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var_unset(CONFIG_ENV, || {
            let err = Config::locate(None, dir.path()).unwrap_err();
            assert!(matches!(err, Error::ConfigNotFound(_)));
        });
    }

    #[test]
    fn environment_variable_overrides_discovery() {
        let here = tempfile::tempdir().unwrap();
        fs::write(here.path().join(CONFIG_FILENAME), BODY).unwrap();

        let elsewhere = tempfile::tempdir().unwrap();
        let named = elsewhere.path().join("custom.yml");
        fs::write(&named, "work_dir: /abs/work\nscripts_dir: ./s\n").unwrap();

        temp_env::with_var(CONFIG_ENV, Some(named.as_os_str()), || {
            let config = Config::locate(None, here.path()).unwrap();
            assert_eq!(config.work_dir, Path::new("/abs/work"));
            assert_eq!(config.scripts_dir, elsewhere.path().join("./s"));
        });
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.yml");
        fs::write(&explicit, "work_dir: /explicit\nscripts_dir: /s\n").unwrap();

        temp_env::with_var(CONFIG_ENV, Some("/does/not/exist.yml"), || {
            let config = Config::locate(Some(&explicit), dir.path()).unwrap();
            assert_eq!(config.work_dir, Path::new("/explicit"));
        });
    }
}

mod init {
    use super::*;

    #[test]
    fn template_parses() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("team-a"), false).unwrap();

        let config = Config::load(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("team-a"));
        assert_eq!(config.work_dir, dir.path().join("./work"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "keep: me").unwrap();

        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), None, true).unwrap();
        let content = fs::read_to_string(dir.path().join(CONFIG_FILENAME)).unwrap();
        assert!(content.contains("work_dir:"));
    }
}
