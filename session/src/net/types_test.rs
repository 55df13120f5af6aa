use super::*;

// =============================================================
// Helpers
// =============================================================

fn make_session() -> Session {
    Session {
        token: "t1".to_owned(),
        user: SessionUser {
            username: "alice".to_owned(),
            email: "a@b.com".to_owned(),
            roles: vec!["ROLE_MEMBER".to_owned()],
            extra: Map::new(),
        },
        avatar_timestamp: 1_700_000_000_000,
        extra: Map::new(),
    }
}

// =============================================================
// Derived views
// =============================================================

#[test]
fn default_session_is_anonymous() {
    let session = Session::default();
    assert!(!session.is_login());
    assert_eq!(session.token, "");
    assert_eq!(session.username(), "");
    assert!(session.roles().is_empty());
    assert!(session.avatar_timestamp > 0);
}

#[test]
fn is_login_tracks_username_not_token() {
    let mut session = Session::default();
    session.token = "orphan-token".to_owned();
    assert!(!session.is_login());

    session.token.clear();
    session.user.username = "bob".to_owned();
    assert!(session.is_login());
}

#[test]
fn avatar_url_absent_when_anonymous() {
    assert_eq!(Session::default().avatar_url(DEFAULT_AVATAR_BASE), None);
}

#[test]
fn avatar_url_uses_username_and_timestamp() {
    let session = make_session();
    assert_eq!(
        session.avatar_url(DEFAULT_AVATAR_BASE).as_deref(),
        Some("/api/member/alice/avatar?t=1700000000000")
    );
}

#[test]
fn avatar_url_trims_trailing_slash_on_base() {
    let session = make_session();
    assert_eq!(
        session.avatar_url("http://localhost:8080/api/member/").as_deref(),
        Some("http://localhost:8080/api/member/alice/avatar?t=1700000000000")
    );
}

#[test]
fn has_role_matches_exact_label() {
    let session = make_session();
    assert!(session.has_role("ROLE_MEMBER"));
    assert!(!session.has_role("ROLE_ADMIN"));
    assert!(!session.has_role("member"));
}

// =============================================================
// Serde
// =============================================================

#[test]
fn serializes_with_original_timestamp_key() {
    let json = serde_json::to_value(make_session()).unwrap();
    assert_eq!(json["avatarTimeStamp"], 1_700_000_000_000_i64);
    assert_eq!(json["user"]["roles"], serde_json::json!(["ROLE_MEMBER"]));
    assert!(json.get("avatar_timestamp").is_none());
}

#[test]
fn login_payload_without_timestamp_gets_current_time() {
    let before = now_ms();
    let session: Session = serde_json::from_value(serde_json::json!({
        "token": "t1",
        "user": { "username": "alice", "email": "a@b.com", "roles": ["USER"] }
    }))
    .unwrap();
    assert_eq!(session.token, "t1");
    assert_eq!(session.username(), "alice");
    assert!(session.avatar_timestamp >= before);
}

#[test]
fn unknown_fields_survive_round_trip() {
    let raw = serde_json::json!({
        "token": "t1",
        "user": { "username": "alice", "email": "a@b.com", "roles": [], "regDate": "2025-01-01" },
        "avatarTimeStamp": 5,
        "expiresIn": 3600
    });
    let session: Session = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(session.extra["expiresIn"], 3600);
    assert_eq!(session.user.extra["regDate"], "2025-01-01");
    assert_eq!(serde_json::to_value(&session).unwrap(), raw);
}

#[test]
fn null_fields_fall_back_to_defaults() {
    let session: Session = serde_json::from_value(serde_json::json!({
        "token": null,
        "user": { "username": "alice", "email": null, "roles": null },
        "avatarTimeStamp": 1
    }))
    .unwrap();
    assert_eq!(session.token, "");
    assert_eq!(session.email(), "");
    assert!(session.roles().is_empty());
}

#[test]
fn missing_user_is_anonymous() {
    let session: Session = serde_json::from_str(r#"{"token":"t"}"#).unwrap();
    assert!(!session.is_login());
}

// =============================================================
// Requests
// =============================================================

#[test]
fn credentials_debug_redacts_password() {
    let creds = Credentials::new("alice", "hunter2");
    let debug = format!("{creds:?}");
    assert!(debug.contains("alice"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn credentials_serialize_as_plain_object() {
    let json = serde_json::to_value(Credentials::new("alice", "p")).unwrap();
    assert_eq!(json, serde_json::json!({ "username": "alice", "password": "p" }));
}

#[test]
fn password_change_uses_camel_case_keys() {
    let change = PasswordChange {
        username: "alice".to_owned(),
        old_password: "old".to_owned(),
        new_password: "new".to_owned(),
    };
    let json = serde_json::to_value(&change).unwrap();
    assert_eq!(json["oldPassword"], "old");
    assert_eq!(json["newPassword"], "new");
    assert!(!format!("{change:?}").contains("old"));
}

#[test]
fn member_profile_keeps_server_fields() {
    let profile: MemberProfile = serde_json::from_value(serde_json::json!({
        "username": "alice",
        "email": "x@y.com",
        "authList": [{ "username": "alice", "auth": "ROLE_MEMBER" }]
    }))
    .unwrap();
    assert_eq!(profile.email, "x@y.com");
    assert!(profile.extra.contains_key("authList"));
}
