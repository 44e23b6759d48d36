//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`CEPTRA_SERVER_URL`, `CEPTRA_TOKEN`,
//!    `CEPTRA_WORKSPACE`, `CEPTRA_API_TIMEOUT_SECS`)
//! 2. TOML file specified via --config CLI flag
//! 3. ./ceptra.toml in the current directory
//! 4. $XDG_CONFIG_HOME/ceptra/ceptra.toml (or ~/.config/ceptra/ceptra.toml)
//! 5. Built-in defaults

mod defaults;
mod env;
mod home;
mod loader;
mod sources;
mod types;

pub use home::ConfigHome;
pub use loader::{load_config, load_config_with_source};
pub use sources::ConfigSource;
pub use types::{
    Config, DisplayConfig, ExecutionConfig, GatewayConfig, InitOutcome, HistoryConfig,
    WorkspaceConfig,
};

#[cfg(test)]
mod tests {
    use super::defaults::*;
    use super::loader::load_config_from_sources;
    use super::*;
    use crate::error::ConfigError;
    use crate::testsupport::TestTempDir;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn files(entries: &[(&str, &str)]) -> HashMap<PathBuf, String> {
        entries
            .iter()
            .map(|(path, text)| (PathBuf::from(path), text.to_string()))
            .collect()
    }

    fn load_with(
        path_override: Option<&str>,
        files: &HashMap<PathBuf, String>,
        env: &[(&str, &str)],
    ) -> Result<(Config, ConfigSource), ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_config_from_sources(
            path_override,
            |path: &Path| {
                files.get(path).cloned().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing")
                })
            },
            |name: &str| env.get(name).cloned(),
            || Some(PathBuf::from("/cfg")),
        )
    }

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.gateway.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.gateway.timeout_secs, 120);
        assert!(config.gateway.token.is_none());
        assert_eq!(config.execution.command_timeout_secs, 120);
        assert_eq!(config.execution.max_buffer_bytes, 5 * 1024 * 1024);
        assert_eq!(config.execution.output_char_limit, 5000);
        assert_eq!(config.execution.read_char_limit, 3000);
        assert_eq!(config.history.retention, 50);
        assert_eq!(config.history.planning_window, 10);
        assert_eq!(config.history.analysis_window, 8);
        assert!(config.history.persist);
        assert!(config.workspace.root.is_none());
        assert!(config.display.color);
    }

    // Verifies the shipped template parses to exactly the built-in defaults.
    #[test]
    fn template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn parse_partial_toml() {
        let parsed: Config = toml::from_str(
            r#"
            [gateway]
            server_url = "http://localhost:3000"

            [history]
            retention = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.gateway.server_url, "http://localhost:3000");
        assert_eq!(parsed.gateway.timeout_secs, 120);
        assert_eq!(parsed.history.retention, 5);
        assert_eq!(parsed.history.planning_window, 10);
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = toml::from_str::<Config>("[gatway]\nserver_url = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("gatway"), "{err}");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let (config, source) = load_with(None, &files(&[]), &[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(source, ConfigSource::BuiltInDefaults);
    }

    // Verifies the local file shadows the global file entirely.
    #[test]
    fn local_file_beats_global_file() {
        let files = files(&[
            ("ceptra.toml", "[history]\nretention = 7\n"),
            ("/cfg/ceptra/ceptra.toml", "[history]\nretention = 9\n"),
        ]);
        let (config, source) = load_with(None, &files, &[]).unwrap();
        assert_eq!(config.history.retention, 7);
        assert_eq!(source, ConfigSource::Local);
    }

    #[test]
    fn global_file_is_used_when_no_local_file() {
        let files = files(&[("/cfg/ceptra/ceptra.toml", "[history]\nretention = 9\n")]);
        let (config, source) = load_with(None, &files, &[]).unwrap();
        assert_eq!(config.history.retention, 9);
        assert_eq!(
            source,
            ConfigSource::Global(PathBuf::from("/cfg/ceptra/ceptra.toml"))
        );
    }

    #[test]
    fn explicit_path_wins_and_must_exist() {
        let files = files(&[
            ("ceptra.toml", "[history]\nretention = 7\n"),
            ("/tmp/custom.toml", "[history]\nretention = 3\n"),
        ]);
        let (config, source) = load_with(Some("/tmp/custom.toml"), &files, &[]).unwrap();
        assert_eq!(config.history.retention, 3);
        assert_eq!(
            source,
            ConfigSource::Explicit(PathBuf::from("/tmp/custom.toml"))
        );

        let err = load_with(Some("/tmp/absent.toml"), &files, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let files = files(&[(
            "ceptra.toml",
            "[gateway]\nserver_url = \"http://file\"\ntimeout_secs = 30\n",
        )]);
        let (config, _) = load_with(
            None,
            &files,
            &[
                ("CEPTRA_SERVER_URL", "http://env"),
                ("CEPTRA_TOKEN", "tok"),
                ("CEPTRA_WORKSPACE", "/work"),
                ("CEPTRA_API_TIMEOUT_SECS", "0"),
            ],
        )
        .unwrap();
        assert_eq!(config.gateway.server_url, "http://env");
        assert_eq!(config.gateway.token.as_deref(), Some("tok"));
        assert_eq!(config.workspace.root, Some(PathBuf::from("/work")));
        assert_eq!(config.gateway.timeout_secs, 1);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let (config, _) =
            load_with(None, &files(&[]), &[("CEPTRA_SERVER_URL", "  ")]).unwrap();
        assert_eq!(config.gateway.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn invalid_timeout_env_is_rejected() {
        let err = load_with(None, &files(&[]), &[("CEPTRA_API_TIMEOUT_SECS", "soon")])
            .unwrap_err();
        assert!(err.to_string().contains("CEPTRA_API_TIMEOUT_SECS"), "{err}");
    }

    #[test]
    fn zero_retention_is_rejected() {
        let files = files(&[("ceptra.toml", "[history]\nretention = 0\n")]);
        let err = load_with(None, &files, &[]).unwrap_err();
        assert!(err.to_string().contains("history.retention"), "{err}");
    }

    #[test]
    fn non_http_server_url_is_rejected() {
        let files = files(&[("ceptra.toml", "[gateway]\nserver_url = \"ftp://x\"\n")]);
        let err = load_with(None, &files, &[]).unwrap_err();
        assert!(err.to_string().contains("http(s)"), "{err}");
    }

    #[test]
    fn init_writes_template_when_missing() {
        let tmp = TestTempDir::new("config-init");
        let home = ConfigHome::at(tmp.child("ceptra"));

        let outcome = home.init(false).unwrap();
        assert_eq!(
            outcome,
            InitOutcome::Created {
                path: home.config_file()
            }
        );
        assert_eq!(
            std::fs::read_to_string(home.config_file()).unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );
        assert!(!home.dir().join("ceptra.toml.tmp").exists());
    }

    #[test]
    fn init_without_force_keeps_existing_file() {
        let tmp = TestTempDir::new("config-init-keep");
        let path = tmp.write_text("ceptra/ceptra.toml", "old-config");
        let home = ConfigHome::at(tmp.child("ceptra"));

        let outcome = home.init(false).unwrap();
        assert!(matches!(
            outcome,
            InitOutcome::AlreadyInitialized { path: ref p } if p == &path
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old-config");
    }

    // Verifies repeated forced inits keep every earlier file under its own backup name.
    #[test]
    fn init_force_moves_old_file_to_numbered_backups() {
        let tmp = TestTempDir::new("config-init-force");
        let path = tmp.write_text("ceptra/ceptra.toml", "first");
        let home = ConfigHome::at(tmp.child("ceptra"));

        let backup = match home.init(true).unwrap() {
            InitOutcome::Overwritten { path: p, backup_path } => {
                assert_eq!(p, path);
                backup_path
            }
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(backup, tmp.child("ceptra/ceptra.toml.bak"));
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "first");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );

        std::fs::write(&path, "second").unwrap();
        match home.init(true).unwrap() {
            InitOutcome::Overwritten { backup_path, .. } => {
                assert_eq!(backup_path, tmp.child("ceptra/ceptra.toml.bak.1"));
                assert_eq!(std::fs::read_to_string(backup_path).unwrap(), "second");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "first");
    }

    // Verifies the file `init` writes is the one global discovery reads.
    #[test]
    fn initialized_file_is_found_as_global_config() {
        let tmp = TestTempDir::new("config-init-load");
        let home = ConfigHome::at(tmp.child(APP_DIR_NAME));
        home.init(false).unwrap();

        let base = tmp.path().to_path_buf();
        let (config, source) = load_config_from_sources(
            None,
            |path: &Path| {
                if path.is_absolute() {
                    std::fs::read_to_string(path)
                } else {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no local"))
                }
            },
            |_: &str| None,
            move || Some(base.clone()),
        )
        .unwrap();
        assert_eq!(source, ConfigSource::Global(home.config_file()));
        assert_eq!(config, Config::default());
    }
}
