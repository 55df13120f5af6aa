use std::sync::atomic::{AtomicU64, Ordering};

use clap::CommandFactory;

use super::*;

static NEXT_DIR: AtomicU64 = AtomicU64::new(0);

fn temp_storage() -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!(
            "member-cli-test-{}-{}-{n}",
            std::process::id(),
            member_session::util::now_ms()
        ))
        .join("storage.json")
}

// =============================================================================
// argument parsing
// =============================================================================

#[test]
fn parses_login_with_flags() {
    let cli = Cli::try_parse_from([
        "member-cli",
        "--base-url",
        "http://127.0.0.1:9000",
        "login",
        "--username",
        "alice",
        "--password",
        "p",
    ])
    .unwrap();
    assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:9000"));
    match cli.command {
        Command::Login { username, password } => {
            assert_eq!(username, "alice");
            assert_eq!(password, "p");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_profile_with_avatar() {
    let cli = Cli::try_parse_from([
        "member-cli",
        "profile",
        "--email",
        "x@y.com",
        "--password",
        "p",
        "--avatar",
        "me.png",
    ])
    .unwrap();
    assert!(matches!(cli.command, Command::Profile { avatar: Some(_), .. }));
}

#[test]
fn parses_join_with_avatar() {
    let cli = Cli::try_parse_from([
        "member-cli",
        "join",
        "--username",
        "carol",
        "--email",
        "c@d.com",
        "--password",
        "secret",
        "--avatar",
        "me.png",
    ])
    .unwrap();
    match cli.command {
        Command::Join { username, email, password, avatar } => {
            assert_eq!(username, "carol");
            assert_eq!(email, "c@d.com");
            assert_eq!(password, "secret");
            assert_eq!(avatar, Some(PathBuf::from("me.png")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn password_values_fall_back_to_hidden_env() {
    let cli = Cli::command();
    let password = cli.find_subcommand("password").unwrap();
    for (id, var) in [("old", "MEMBER_OLD_PASSWORD"), ("new", "MEMBER_NEW_PASSWORD")] {
        let arg = password.get_arguments().find(|a| a.get_id() == id).unwrap();
        assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(var)));
        assert!(arg.is_hide_env_values_set());
    }
}

#[test]
fn logout_and_check_username_tolerate_corrupt_storage() {
    assert!(Command::Logout.tolerates_corrupt_storage());
    assert!(Command::CheckUsername { username: "a".into() }.tolerates_corrupt_storage());
    assert!(
        Command::Join { username: "a".into(), email: "e".into(), password: "p".into(), avatar: None }
            .tolerates_corrupt_storage()
    );
    assert!(!Command::Whoami.tolerates_corrupt_storage());
}

// =============================================================================
// config + context
// =============================================================================

#[test]
fn flags_override_config() {
    let path = temp_storage();
    let config = resolve_config(Some("http://127.0.0.1:9000/"), Some(path.clone())).unwrap();
    assert_eq!(config.base_url, "http://127.0.0.1:9000");
    assert_eq!(config.storage_path, path);
}

#[test]
fn bad_base_url_flag_is_config_error() {
    assert!(matches!(resolve_config(Some("ftp://nope"), None), Err(CliError::Config(_))));
}

#[test]
fn corrupt_storage_blocks_reads_but_not_logout() {
    let path = temp_storage();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"auth":"{broken"}"#).unwrap();
    let config = SessionConfig::default().with_storage_path(&path);

    assert!(matches!(build_context(config.clone(), false), Err(CliError::CorruptSession(_))));

    let ctx = build_context(config, true).unwrap();
    ctx.store.logout().unwrap();
    assert!(!path.exists());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn unparseable_storage_file_blocks_reads_but_not_logout() {
    let path = temp_storage();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "not json at all").unwrap();
    let config = SessionConfig::default().with_storage_path(&path);

    assert!(matches!(build_context(config.clone(), false), Err(CliError::CorruptSession(_))));

    let ctx = build_context(config.clone(), true).unwrap();
    ctx.store.logout().unwrap();
    assert!(!path.exists());
    assert!(build_context(config, false).is_ok());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

// =============================================================================
// session_view
// =============================================================================

#[test]
fn session_view_anonymous_has_null_avatar() {
    let view = session_view(&Session::default(), "/api/member");
    assert_eq!(view["isLogin"], false);
    assert_eq!(view["username"], "");
    assert!(view["avatarUrl"].is_null());
}

#[test]
fn session_view_never_includes_token() {
    let session: Session = serde_json::from_value(json!({
        "token": "secret-token",
        "user": { "username": "alice", "email": "a@b.com", "roles": ["ROLE_MEMBER"] },
        "avatarTimeStamp": 7
    }))
    .unwrap();
    let view = session_view(&session, "/api/member");
    assert_eq!(view["isLogin"], true);
    assert_eq!(view["avatarUrl"], "/api/member/alice/avatar?t=7");
    assert_eq!(view["roles"], json!(["ROLE_MEMBER"]));
    assert!(!view.to_string().contains("secret-token"));
}
