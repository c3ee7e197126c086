use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ::common::config::{DatabaseConfig, LeaseConfig};
use ::common::{LanguageRegistry, Problem, TestCaseResult, aggregate};
use judge::{CommitOutcome, LeaseManager, MemoryStore, ProblemStore, ReleaseOutcome, User, UserStore};
use reqwest::Client;
use serde_json::Value;

use server::auth::StaticAuthClient;
use server::config::{
    AppConfig, AuthConfig, CorsConfig, LangsConfig, ServerConfig, SubmissionConfig,
};
use server::state::AppState;

pub mod routes {
    pub const SUBMISSIONS: &str = "/api/v1/submissions";
    pub const PROBLEMS: &str = "/api/v1/problems";
    pub const LANGS: &str = "/api/v1/langs";

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn submission_rejudge(id: i32) -> String {
        format!("/api/v1/submissions/{id}/rejudge")
    }

    pub fn submissions_query(query: &str) -> String {
        format!("/api/v1/submissions?{query}")
    }

    pub fn problem(name: &str) -> String {
        format!("/api/v1/problems/{name}")
    }

    pub fn user(name: &str) -> String {
        format!("/api/v1/users/{name}")
    }
}

/// Problem seeded by [`TestApp::seed_problem`].
pub fn dummy_problem() -> Problem {
    Problem {
        name: "aplusb".into(),
        title: "A + B".into(),
        source_url: "https://github.com/yosupo06/library-checker-problems/tree/master/sample/aplusb"
            .into(),
        time_limit_ms: 2000,
        memory_limit_kb: 1 << 20,
        testcases: vec!["example_00".into(), "example_01".into()],
        testcases_version: "dummy-testcase-version".into(),
        version: "dummy-version".into(),
    }
}

/// A running test server backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<StaticAuthClient>,
}

/// Path to the language registry shipped with the workspace.
fn langs_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../langs/langs.toml")
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let langs_path = langs_path();
        let langs = LanguageRegistry::load(&langs_path).expect("Failed to load langs.toml");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig::default(),
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
            },
            submission: SubmissionConfig::default(),
            lease: LeaseConfig::default(),
            langs: LangsConfig {
                path: langs_path.to_string_lossy().into_owned(),
            },
        };

        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(StaticAuthClient::new());

        let state = AppState {
            store: store.clone(),
            langs: Arc::new(langs),
            auth: auth.clone(),
            config: app_config,
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            store,
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn with_token(
        &self,
        builder: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        let res = self
            .with_token(self.client.post(self.url(path)), token)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let res = self
            .with_token(self.client.get(self.url(path)), token)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value, token: Option<&str>) -> TestResponse {
        let res = self
            .with_token(self.client.patch(self.url(path)), token)
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn seed_problem(&self) -> Problem {
        let problem = dummy_problem();
        self.store
            .save_problem(&problem)
            .await
            .expect("Failed to save problem");
        problem
    }

    /// Create a user row and return a token that resolves to it.
    pub async fn create_user(&self, name: &str, is_admin: bool) -> String {
        self.store
            .save_user(&User {
                name: name.to_string(),
                is_admin,
                library_url: None,
            })
            .await
            .expect("Failed to save user");

        let token = format!("token-{name}");
        self.auth.register(token.clone(), name);
        token
    }

    /// Submit `source` in C++ against the seeded problem and return the submission id.
    pub async fn submit(&self, source: &str, token: Option<&str>) -> i32 {
        let res = self
            .post(
                routes::SUBMISSIONS,
                &serde_json::json!({
                    "problem": "aplusb",
                    "source": source,
                    "lang": "cpp",
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "submit failed: {}", res.text);
        res.id()
    }

    /// Play the role of a worker: claim the oldest waiting submission, record `results` and
    /// commit their aggregate.
    pub async fn judge_next(&self, results: &[TestCaseResult]) -> CommitOutcome {
        let leases = LeaseManager::new(self.store.clone(), &LeaseConfig::default());
        let lease = leases
            .claim("test-worker")
            .await
            .expect("claim failed")
            .expect("nothing to claim");
        for result in results {
            leases.record(&lease, result).await.expect("record failed");
        }
        leases
            .release(&lease, ReleaseOutcome::Judged(aggregate(results)))
            .await
            .expect("release failed")
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
