use crate::common::{TestApp, routes};

#[tokio::test]
async fn lang_list_is_not_empty() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::LANGS, None).await;

    assert_eq!(res.status, 200);
    let langs = res.body["langs"].as_array().unwrap();
    assert!(!langs.is_empty());
    let cpp = langs
        .iter()
        .find(|l| l["id"] == "cpp")
        .expect("cpp should be configured");
    assert!(cpp["name"].as_str().is_some_and(|n| !n.is_empty()));
    assert!(cpp.get("compile").is_none());
}
