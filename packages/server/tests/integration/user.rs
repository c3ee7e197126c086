use judge::UserStore;
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn change_unknown_user_fails() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("root", true).await;

    let res = app
        .patch(
            &routes::user("this_is_dummy_user_name"),
            &json!({"library_url": "https://example.com"}),
            Some(&admin),
        )
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");

    let res = app
        .patch(&routes::user("this_is_dummy_user_name"), &json!({}), None)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn user_can_change_own_library_url() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;

    let res = app
        .patch(
            &routes::user("alice"),
            &json!({"library_url": "https://github.com/alice/library"}),
            Some(&alice),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["library_url"], "https://github.com/alice/library");
    assert_eq!(res.body["is_admin"], false);

    let res = app
        .patch(&routes::user("alice"), &json!({"library_url": ""}), Some(&alice))
        .await;
    assert_eq!(res.status, 200);
    assert!(res.body["library_url"].is_null());
}

#[tokio::test]
async fn user_cannot_change_others_or_promote_self() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", false).await;
    app.create_user("bob", false).await;

    let res = app
        .patch(
            &routes::user("bob"),
            &json!({"library_url": "https://evil.example"}),
            Some(&alice),
        )
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");

    let res = app
        .patch(&routes::user("alice"), &json!({"is_admin": true}), Some(&alice))
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .patch(&routes::user("alice"), &json!({"library_url": "x"}), None)
        .await;
    assert_eq!(res.status, 403);

    let alice_row = app.store.get_user("alice").await.unwrap().unwrap();
    assert!(!alice_row.is_admin);
    assert!(alice_row.library_url.is_none());
}

#[tokio::test]
async fn admin_can_promote_user() {
    let app = TestApp::spawn().await;
    let admin = app.create_user("root", true).await;
    let alice = app.create_user("alice", false).await;

    let res = app
        .patch(&routes::user("alice"), &json!({"is_admin": true}), Some(&admin))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["is_admin"], true);

    // The new capability applies to alice's next request.
    app.seed_problem().await;
    let id = app.submit("a", None).await;
    let res = app.get(&routes::submission(id), Some(&alice)).await;
    assert_eq!(res.body["can_rejudge"], true);
}
