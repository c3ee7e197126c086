use crate::common::{TestApp, dummy_problem, routes};

#[tokio::test]
async fn problem_info_returns_metadata() {
    let app = TestApp::spawn().await;
    let problem = app.seed_problem().await;

    let res = app.get(&routes::problem(&problem.name), None).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["name"], "aplusb");
    assert_eq!(res.body["title"], problem.title.as_str());
    assert_eq!(res.body["source_url"], problem.source_url.as_str());
    let time_limit = res.body["time_limit"].as_f64().unwrap();
    assert!((time_limit - 2.0).abs() < 0.01, "time_limit = {time_limit}");
    assert_eq!(res.body["testcases_version"], "dummy-testcase-version");
    assert_eq!(res.body["version"], "dummy-version");
}

#[tokio::test]
async fn unknown_problem_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .get(&routes::problem("This-problem-is-not-found"), None)
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn problem_list_is_sorted_by_name() {
    let app = TestApp::spawn().await;
    app.seed_problem().await;
    let mut other = dummy_problem();
    other.name = "associative_array".into();
    other.title = "Associative Array".into();
    judge::ProblemStore::save_problem(app.store.as_ref(), &other)
        .await
        .unwrap();

    let res = app.get(routes::PROBLEMS, None).await;

    assert_eq!(res.status, 200);
    let names: Vec<&str> = res.body["problems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["aplusb", "associative_array"]);
}
