use gryph::privacy::{PrivacyChecker, REDACTED};
use gryph::AppError;

fn checker() -> PrivacyChecker {
    PrivacyChecker::with_defaults().expect("default patterns compile")
}

#[test]
fn default_sensitive_paths() {
    let privacy = checker();
    for path in [
        "/home/u/.env",
        ".env",
        "/repo/.env.production",
        "/repo/config/.env.local",
        "/app/secrets/db.yml",
        "/certs/server.pem",
        "/certs/tls.key",
        "/home/u/.ssh/id_ed25519",
        "/home/u/.aws/credentials",
        "/repo/.git/config",
        "/repo/db_password.txt",
        "/home/u/.npmrc",
    ] {
        assert!(privacy.is_sensitive_path(path), "{path} should be sensitive");
    }
}

#[test]
fn relative_paths_inside_sensitive_directories() {
    let privacy = checker();
    for path in [
        "secrets/api.txt",
        ".ssh/id_rsa",
        ".aws/config",
        "app/secrets/nested/token.json",
        ".git/config",
        "server.pem",
    ] {
        assert!(privacy.is_sensitive_path(path), "{path} should be sensitive");
    }
    assert!(privacy.is_sensitive_command("cat secrets/api.txt"));
}

#[test]
fn single_star_stays_within_one_segment() {
    let privacy = PrivacyChecker::new(&["*.pem".to_owned()], &[]).expect("compile");
    assert!(privacy.is_sensitive_path("server.pem"));
    assert!(!privacy.is_sensitive_path("certs/server.pem"));
}

#[test]
fn ordinary_paths_are_not_sensitive() {
    let privacy = checker();
    for path in ["/repo/src/main.rs", "README.md", "/repo/.gitignore", "/tmp/a.go", ""] {
        assert!(!privacy.is_sensitive_path(path), "{path} should not be sensitive");
    }
}

#[test]
fn windows_separators_are_normalised() {
    assert!(checker().is_sensitive_path(r"C:\Users\u\.ssh\id_rsa"));
}

#[test]
fn commands_touching_sensitive_paths() {
    let privacy = checker();
    assert!(privacy.is_sensitive_command("cat .env"));
    assert!(privacy.is_sensitive_command("cp ~/.ssh/id_rsa /tmp/x"));
    assert!(privacy.is_sensitive_command("vim 'config/.env.local'"));
    assert!(!privacy.is_sensitive_command("npm install"));
    assert!(!privacy.is_sensitive_command("ls -la"));
}

#[test]
fn redaction_replaces_secrets() {
    let privacy = checker();
    assert_eq!(privacy.redact("export API_KEY=abc123"), format!("export {REDACTED}"));
    assert_eq!(
        privacy.redact("curl -H 'Authorization: Bearer tok.en'"),
        format!("curl -H 'Authorization: {REDACTED}")
    );
    assert_eq!(privacy.redact("mysql --password:hunter2 db"), format!("mysql --{REDACTED} db"));
    assert_eq!(privacy.redact("cargo build"), "cargo build");
}

#[test]
fn custom_patterns_replace_defaults() {
    let privacy = PrivacyChecker::new(&["**/*.sqlite".into()], &[r"ghp_\w+".into()])
        .expect("valid patterns");
    assert!(privacy.is_sensitive_path("/data/app.sqlite"));
    assert!(!privacy.is_sensitive_path("/repo/.env"));
    assert_eq!(privacy.redact("token ghp_abc123 here"), format!("token {REDACTED} here"));
}

#[test]
fn invalid_redact_regex_is_a_privacy_error() {
    let err = PrivacyChecker::new(&[], &["(".into()]).unwrap_err();
    assert!(matches!(err, AppError::Privacy(_)));
}
