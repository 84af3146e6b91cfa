//! Integration tests for role guards over persisted session flags.

use std::sync::Arc;

use peerprep_auth::{GuardDecision, LoginRecord, NavigationOutcome, RouteTable, Router, SessionStore};
use peerprep_core::config::NavigationConfig;
use peerprep_core::types::Role;

fn router(store: &Arc<SessionStore>) -> Router {
    let table = Arc::new(RouteTable::default_routes(&NavigationConfig::default()));
    Router::new(table, store.clone())
}

#[test]
fn test_logout_then_refresh_redirects() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SessionStore::open(dir.path().join("session.json")).unwrap());
    store
        .record_login(&LoginRecord::new(Role::Coordinator, "Lin", "lin@example.edu"))
        .unwrap();

    let mut router = router(&store);
    assert_eq!(
        router.navigate("/coordinator/pairing"),
        NavigationOutcome::Rendered {
            path: "/coordinator/pairing".to_string()
        }
    );

    store.logout().unwrap();
    assert_eq!(
        router.refresh(),
        NavigationOutcome::Redirected {
            from: "/coordinator/pairing".to_string(),
            to: "/login/coordinator".to_string(),
        }
    );
    assert_eq!(router.current(), "/login/coordinator");
}

#[test]
fn test_flags_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    {
        let store = SessionStore::open(&path).unwrap();
        store
            .record_login(&LoginRecord::new(Role::Admin, "Root", "root@example.edu"))
            .unwrap();
    }

    let store = Arc::new(SessionStore::open(&path).unwrap());
    let table = RouteTable::default_routes(&NavigationConfig::default());
    assert_eq!(
        table.guard_for(Role::Admin).evaluate(&*store),
        GuardDecision::Render
    );
    assert!(!table.guard_for(Role::Student).evaluate(&*store).is_render());
}

#[test]
fn test_tampered_marker_never_renders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"student_auth":"yes","name":"Mallory"}"#).unwrap();

    let store = Arc::new(SessionStore::open(&path).unwrap());
    let mut router = router(&store);

    assert!(matches!(
        router.navigate("/student/dashboard"),
        NavigationOutcome::Redirected { .. }
    ));
    assert_eq!(router.history().entries().last().map(String::as_str), Some("/login/student"));
}

#[test]
fn test_back_after_redirect_skips_blocked_route() {
    let store = Arc::new(SessionStore::in_memory());
    let mut router = router(&store);

    router.navigate("/about");
    router.navigate("/admin/settings");
    assert_eq!(router.current(), "/login/admin");

    let outcome = router.back().unwrap();
    assert_eq!(
        outcome,
        NavigationOutcome::Rendered {
            path: "/about".to_string()
        }
    );
}

#[test]
fn test_logout_by_another_process_redirects_running_router() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let app = Arc::new(SessionStore::open(&path).unwrap());
    app.record_login(&LoginRecord::new(Role::Student, "Ada", "ada@example.edu"))
        .unwrap();
    let mut router = router(&app);
    assert!(matches!(
        router.navigate("/student/dashboard"),
        NavigationOutcome::Rendered { .. }
    ));

    SessionStore::open(&path).unwrap().logout().unwrap();

    assert_eq!(
        router.refresh(),
        NavigationOutcome::Redirected {
            from: "/student/dashboard".to_string(),
            to: "/login/student".to_string(),
        }
    );
}
