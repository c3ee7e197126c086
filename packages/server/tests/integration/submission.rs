use ::common::{TestCaseResult, Verdict};
use judge::CommitOutcome;
use serde_json::json;

use crate::common::{TestApp, routes};

fn submit_body(problem: &str, source: &str, lang: &str) -> serde_json::Value {
    json!({
        "problem": problem,
        "source": source,
        "lang": lang,
    })
}

fn passing_results() -> Vec<TestCaseResult> {
    vec![
        TestCaseResult::new("example_00", Verdict::Accepted, 12, 3072),
        TestCaseResult::new("example_01", Verdict::Accepted, 30, 2048),
    ]
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn anonymous_submission_is_queued_and_retrievable() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;

        let source = "a".repeat(1000);
        let id = app.submit(&source, None).await;

        let res = app.get(&routes::submission(id), None).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["source"], source.as_str());
        assert_eq!(res.body["overview"]["status"], "WaitingJudge");
        assert_eq!(res.body["overview"]["problem"], "aplusb");
        assert_eq!(res.body["overview"]["judge_attempt"], 1);
        assert!(res.body["overview"]["user_name"].is_null());
        assert_eq!(res.body["can_rejudge"], false);
        assert_eq!(res.body["case_results"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn records_the_submitting_user() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let token = app.create_user("alice", false).await;

        let id = app.submit("int main() {}", Some(&token)).await;

        let res = app.get(&routes::submission(id), None).await;
        assert_eq!(res.body["overview"]["user_name"], "alice");
    }

    #[tokio::test]
    async fn rejects_big_source() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &submit_body("aplusb", &"a".repeat(3_000_000), "cpp"),
                None,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");

        let list = app.get(routes::SUBMISSIONS, None).await;
        assert_eq!(list.body["count"], 0);
    }

    #[tokio::test]
    async fn rejects_empty_source() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;

        let res = app
            .post(routes::SUBMISSIONS, &submit_body("aplusb", "", "cpp"), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn rejects_unknown_language() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;

        let res = app
            .post(routes::SUBMISSIONS, &submit_body("aplusb", "x", "cobol"), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn returns_404_for_unknown_problem() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &submit_body("This-problem-is-not-found", "x", "cpp"),
                None,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn rejects_malformed_body() {
        let app = TestApp::spawn().await;

        let res = app
            .post(routes::SUBMISSIONS, &json!({"problem": "aplusb"}), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;

        let res = app
            .post(
                routes::SUBMISSIONS,
                &submit_body("aplusb", "x", "cpp"),
                Some("forged"),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod info {
    use super::*;

    #[tokio::test]
    async fn returns_404_for_unknown_submission() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::submission(99999), None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn shows_verdict_and_case_results_after_judging() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let id = app.submit("int main() {}", None).await;

        let mut results = passing_results();
        results[1] = TestCaseResult::new("example_01", Verdict::WrongAnswer, 30, 2048);
        assert_eq!(
            app.judge_next(&results).await,
            CommitOutcome::Committed(::common::SubmissionStatus::WrongAnswer)
        );

        let res = app.get(&routes::submission(id), None).await;
        assert_eq!(res.body["overview"]["status"], "WrongAnswer");
        assert_eq!(res.body["overview"]["max_time"], 30);
        assert_eq!(res.body["overview"]["max_memory"], 3072);

        let cases = res.body["case_results"].as_array().unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0]["case"], "example_00");
        assert_eq!(cases[0]["verdict"], "Accepted");
        assert_eq!(cases[1]["verdict"], "WrongAnswer");
    }

    #[tokio::test]
    async fn admin_sees_can_rejudge() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let admin = app.create_user("root", true).await;
        let user = app.create_user("alice", false).await;
        let id = app.submit("x", Some(&user)).await;

        let res = app.get(&routes::submission(id), Some(&admin)).await;
        assert_eq!(res.body["can_rejudge"], true);

        let res = app.get(&routes::submission(id), Some(&user)).await;
        assert_eq!(res.body["can_rejudge"], false);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn accepts_known_orders_and_rejects_others() {
        let app = TestApp::spawn().await;

        for order in ["", "-id", "+id", "id", "+time", "time", "-time"] {
            let res = app
                .get(
                    &routes::submissions_query(&format!("skip=0&limit=100&order={order}")),
                    None,
                )
                .await;
            assert_eq!(res.status, 200, "order {order:?}: {}", res.text);
        }

        let res = app
            .get(&routes::submissions_query("skip=0&limit=100&order=dummy"), None)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn rejects_limit_above_maximum() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::submissions_query("limit=1001"), None).await;
        assert_eq!(res.status, 400);

        let res = app.get(&routes::submissions_query("limit=1000"), None).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn default_order_is_newest_first_with_total_count() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let first = app.submit("a", None).await;
        let second = app.submit("b", None).await;
        let third = app.submit("c", None).await;

        let res = app.get(routes::SUBMISSIONS, None).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 3);
        let ids: Vec<i64> = res.body["submissions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![third as i64, second as i64, first as i64]);

        let res = app
            .get(&routes::submissions_query("order=%2Bid&skip=1&limit=1"), None)
            .await;
        assert_eq!(res.body["count"], 3);
        assert_eq!(res.body["submissions"][0]["id"], second);
        assert!(res.body["submissions"][0].get("source").is_none());
    }

    #[tokio::test]
    async fn time_order_puts_unjudged_last() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let judged = app.submit("a", None).await;
        let waiting = app.submit("b", None).await;
        app.judge_next(&passing_results()).await;

        let res = app.get(&routes::submissions_query("order=-time"), None).await;
        assert_eq!(res.body["submissions"][0]["id"], judged);
        assert_eq!(res.body["submissions"][1]["id"], waiting);

        let res = app.get(&routes::submissions_query("order=%2Btime"), None).await;
        assert_eq!(res.body["submissions"][0]["id"], judged);
        assert_eq!(res.body["submissions"][1]["id"], waiting);
    }

    #[tokio::test]
    async fn filters_by_user_and_status() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let alice = app.create_user("alice", false).await;
        let judged = app.submit("a", Some(&alice)).await;
        app.submit("b", Some(&alice)).await;
        app.submit("c", None).await;
        app.judge_next(&passing_results()).await;

        let res = app.get(&routes::submissions_query("user=alice"), None).await;
        assert_eq!(res.body["count"], 2);

        let res = app
            .get(&routes::submissions_query("user=alice&status=Accepted"), None)
            .await;
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["submissions"][0]["id"], judged);

        let res = app
            .get(&routes::submissions_query("problem=other&lang=cpp"), None)
            .await;
        assert_eq!(res.body["count"], 0);
    }
}

mod rejudge {
    use super::*;

    #[tokio::test]
    async fn anonymous_rejudge_is_denied_and_verdict_kept() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let id = app.submit(&"a".repeat(1000), None).await;
        app.judge_next(&passing_results()).await;

        let res = app
            .post(&routes::submission_rejudge(id), &json!({}), None)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let info = app.get(&routes::submission(id), None).await;
        assert_eq!(info.body["overview"]["status"], "Accepted");
        assert_eq!(info.body["overview"]["judge_attempt"], 1);
    }

    #[tokio::test]
    async fn owner_cannot_rejudge_own_submission() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let alice = app.create_user("alice", false).await;
        let id = app.submit("a", Some(&alice)).await;

        let res = app
            .post(&routes::submission_rejudge(id), &json!({}), Some(&alice))
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn unauthorized_caller_cannot_probe_ids() {
        let app = TestApp::spawn().await;

        let res = app
            .post(&routes::submission_rejudge(424242), &json!({}), None)
            .await;
        assert_eq!(res.status, 403);

        let admin = app.create_user("root", true).await;
        let res = app
            .post(&routes::submission_rejudge(424242), &json!({}), Some(&admin))
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn admin_rejudge_advances_attempt_and_hides_old_results() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let admin = app.create_user("root", true).await;
        let id = app.submit("a", None).await;
        app.judge_next(&passing_results()).await;

        let res = app
            .post(&routes::submission_rejudge(id), &json!({}), Some(&admin))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let info = app.get(&routes::submission(id), None).await;
        assert_eq!(info.body["overview"]["status"], "WaitingJudge");
        assert_eq!(info.body["overview"]["judge_attempt"], 2);
        assert!(info.body["overview"]["max_time"].is_null());
        assert_eq!(info.body["case_results"].as_array().unwrap().len(), 0);

        // The new attempt can be judged to a different verdict.
        let results = vec![TestCaseResult::new(
            "example_00",
            Verdict::TimeLimitExceeded,
            2000,
            1024,
        )];
        app.judge_next(&results).await;
        let info = app.get(&routes::submission(id), None).await;
        assert_eq!(info.body["overview"]["status"], "TimeLimitExceeded");
        assert_eq!(info.body["case_results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejudge_while_waiting_is_a_no_op() {
        let app = TestApp::spawn().await;
        app.seed_problem().await;
        let admin = app.create_user("root", true).await;
        let id = app.submit("a", None).await;

        for _ in 0..2 {
            let res = app
                .post(&routes::submission_rejudge(id), &json!({}), Some(&admin))
                .await;
            assert_eq!(res.status, 200);
        }

        let info = app.get(&routes::submission(id), None).await;
        assert_eq!(info.body["overview"]["status"], "WaitingJudge");
        assert_eq!(info.body["overview"]["judge_attempt"], 1);
    }
}
