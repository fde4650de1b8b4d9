use config::FileFormat;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides).expect("valid overrides");
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_cover_cache_and_backend_sections() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.cache.listing_key, "memos");
    assert_eq!(settings.cache.refresh_mode, RefreshMode::Refresh);
    assert_eq!(settings.cache.consume_batch_limit.get(), 100);
    assert_eq!(
        settings.backend.timeout,
        Some(Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS))
    );
    assert!(settings.database.url.is_none());
    assert!(settings.cache.url.is_none());
}

#[test]
fn zero_backend_timeout_disables_deadline() {
    let mut raw = RawSettings::default();
    raw.backend.timeout_ms = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.backend.timeout.is_none());
}

#[test]
fn unknown_refresh_mode_override_is_rejected() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_refresh_mode: Some("sometimes".to_string()),
        ..Default::default()
    };

    let err = raw
        .apply_serve_overrides(&overrides)
        .expect_err("invalid refresh mode");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.refresh_mode",
            ..
        }
    ));
}

#[test]
fn refresh_mode_override_replaces_file_value() {
    let mut raw = RawSettings::default();
    raw.cache.refresh_mode = Some(RefreshMode::Refresh);
    let overrides = ServeOverrides {
        cache_refresh_mode: Some("evict".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides).expect("valid overrides");
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.refresh_mode, RefreshMode::Evict);
}

#[test]
fn refresh_mode_deserializes_from_config_source() {
    let raw: RawSettings = Config::builder()
        .add_source(File::from_str(
            "[cache]\nrefresh_mode = \"evict\"\n",
            FileFormat::Toml,
        ))
        .build()
        .expect("config builds")
        .try_deserialize()
        .expect("raw settings");
    assert_eq!(raw.cache.refresh_mode, Some(RefreshMode::Evict));

    let invalid = Config::builder()
        .add_source(File::from_str(
            "[cache]\nrefresh_mode = \"sometimes\"\n",
            FileFormat::Toml,
        ))
        .build()
        .expect("config builds")
        .try_deserialize::<RawSettings>();
    assert!(invalid.is_err());
}

#[test]
fn zero_batch_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.consume_batch_limit = Some(0);

    let err = Settings::from_raw(raw).expect_err("invalid batch limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.consume_batch_limit",
            ..
        }
    ));
}

#[test]
fn blank_urls_are_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    raw.cache.url = Some(" redis://cache:6379 ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
    assert_eq!(settings.cache.url.as_deref(), Some("redis://cache:6379"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides).expect("valid overrides");
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["memoapp"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "memoapp",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--cache-refresh-mode",
        "evict",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.backends.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.cache_refresh_mode.as_deref(), Some("evict"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_probe_arguments() {
    let args = CliArgs::parse_from([
        "memoapp",
        "probe",
        "--cache-url",
        "redis://example:6379",
        "--cache-listing-key",
        "memos:v2",
    ]);

    match args.command.expect("probe command") {
        Command::Probe(probe) => {
            assert_eq!(
                probe.backends.cache_url.as_deref(),
                Some("redis://example:6379")
            );
            assert_eq!(
                probe.backends.cache_listing_key.as_deref(),
                Some("memos:v2")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn warm_applies_backend_overrides_only() {
    let mut raw = RawSettings::default();
    let args = BackendArgs {
        backends: BackendOverrides {
            database_url: Some("postgres://warm".to_string()),
            ..Default::default()
        },
    };

    raw.apply_backend_overrides(&args.backends);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://warm"));
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
}
