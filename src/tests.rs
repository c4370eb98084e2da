//! End-to-end tests for the polls backend.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{header, redirect, Client, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::{AuthEvent, AuthEvents, AuthObserver};
use crate::clock::FixedClock;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const ADMIN_KEY: &str = "test-admin-key";
const SESSION_TTL_DAYS: i64 = 14;

#[derive(Default)]
struct RecordingObserver(Mutex<Vec<AuthEvent>>);

impl AuthObserver for RecordingObserver {
    fn on_event(&self, event: &AuthEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

/// Test fixture for end-to-end tests.
struct TestFixture {
    client: Client,
    admin: Client,
    base_url: String,
    clock: Arc<FixedClock>,
    events: Arc<RecordingObserver>,
    _temp_dir: TempDir,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let config = Config {
            admin_psk: Some(ADMIN_KEY.to_string()),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_json: false,
            login_url: "/accounts/login/".to_string(),
            session_ttl: Duration::days(SESSION_TTL_DAYS),
        };

        let clock = Arc::new(FixedClock::new(start_time()));
        let events = Arc::new(RecordingObserver::default());
        let mut auth_events = AuthEvents::new();
        auth_events.register(events.clone());

        let state = AppState {
            repo,
            search,
            config: Arc::new(config),
            clock: clock.clone(),
            auth_events: Arc::new(auth_events),
        };

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap();

        let mut admin_headers = header::HeaderMap::new();
        admin_headers.insert("x-api-key", ADMIN_KEY.parse().unwrap());
        let admin = Client::builder()
            .default_headers(admin_headers)
            .build()
            .unwrap();

        TestFixture {
            client,
            admin,
            base_url,
            clock,
            events,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a question published `publish_in` from now, returning its JSON.
    async fn create_question(
        &self,
        text: &str,
        publish_in: Duration,
        end_in: Option<Duration>,
        choices: &[&str],
    ) -> Value {
        let now = start_time();
        let resp = self
            .admin
            .post(self.url("/admin/questions"))
            .json(&json!({
                "text": text,
                "publishAt": now + publish_in,
                "endAt": end_in.map(|d| now + d),
                "choices": choices,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    /// Register a user and log in, returning the session token.
    async fn login_as(&self, username: &str) -> String {
        let resp = self
            .admin
            .post(self.url("/admin/users"))
            .json(&json!({ "username": username, "password": "s3cret-pass" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let resp = self
            .client
            .post(self.url("/accounts/login/"))
            .json(&json!({ "username": username, "password": "s3cret-pass" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn vote(&self, token: &str, question_id: i64, choice: Option<i64>) -> Response {
        let request = self
            .client
            .post(self.url(&format!("/polls/{}/vote/", question_id)))
            .bearer_auth(token);
        let request = match choice {
            Some(id) => request.form(&[("choice", id.to_string())]),
            None => request
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(""),
        };
        request.send().await.unwrap()
    }

    async fn results(&self, question_id: i64) -> Value {
        let resp = self
            .client
            .get(self.url(&format!("/polls/{}/results/", question_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

fn location(resp: &Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn ids(question: &Value) -> (i64, Vec<i64>) {
    let id = question["id"].as_i64().unwrap();
    let choices = question["choices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    (id, choices)
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_root_redirects_to_listing() {
    let fixture = TestFixture::new().await;

    let resp = fixture.client.get(fixture.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/polls/");
}

#[tokio::test]
async fn test_listing_without_questions() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/polls/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["questions"], json!([]));
    assert_eq!(body["data"]["messages"], json!(["No polls are available."]));
}

#[tokio::test]
async fn test_listing_shows_published_newest_first() {
    let fixture = TestFixture::new().await;
    fixture
        .create_question("Older question.", Duration::days(-30), None, &[])
        .await;
    fixture
        .create_question("Past question.", Duration::days(-5), None, &[])
        .await;
    fixture
        .create_question("Future question.", Duration::days(5), None, &[])
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/polls/"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let texts: Vec<&str> = body["data"]["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Past question.", "Older question."]);
    assert_eq!(body["data"]["messages"], json!([]));
}

#[tokio::test]
async fn test_detail_of_future_question_redirects() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Future question.", Duration::days(5), None, &["A"])
        .await;
    let (id, _) = ids(&question);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/polls/{}/", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert!(location(&resp).starts_with("/polls/?error="));
}

#[tokio::test]
async fn test_detail_of_past_question() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Past question.", Duration::days(-5), None, &["A", "B"])
        .await;
    let (id, _) = ids(&question);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/polls/{}/", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["text"], "Past question.");
    assert_eq!(body["data"]["choices"].as_array().unwrap().len(), 2);
    assert!(body["data"]["choices"][0].get("votes").is_none());
    assert!(body["data"]["selectedChoiceId"].is_null());
}

#[tokio::test]
async fn test_missing_poll_redirect_carries_message() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/polls/9999/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    let target = location(&resp);

    let resp = fixture.client.get(fixture.url(&target)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let messages = body["data"]["messages"].as_array().unwrap();
    assert!(messages.contains(&json!("Poll does not exist.")));
}

#[tokio::test]
async fn test_results_hidden_until_published() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Soon.", Duration::hours(1), None, &["A"])
        .await;
    let (id, _) = ids(&question);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/polls/{}/results/", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    fixture.clock.advance(Duration::hours(1));
    let results = fixture.results(id).await;
    assert_eq!(results["totalVotes"], 0);
}

#[tokio::test]
async fn test_unauthenticated_vote_redirects_to_login() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Past question.", Duration::days(-5), None, &["A"])
        .await;
    let (id, choices) = ids(&question);

    let resp = fixture
        .client
        .post(fixture.url(&format!("/polls/{}/vote/", id)))
        .form(&[("choice", choices[0].to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(
        location(&resp),
        format!("/accounts/login/?next=%2Fpolls%2F{}%2Fvote%2F", id)
    );
}

#[tokio::test]
async fn test_vote_on_missing_question_redirects_to_listing() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;

    let resp = fixture.vote(&token, 9999, Some(1)).await;
    assert_eq!(resp.status(), 303);
    assert!(location(&resp).starts_with("/polls/?error="));
}

#[tokio::test]
async fn test_vote_without_choice_rerenders_detail() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;
    let question = fixture
        .create_question("Past question.", Duration::days(-5), None, &["A", "B"])
        .await;
    let (id, _) = ids(&question);

    let resp = fixture.vote(&token, id, None).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NO_CHOICE_SELECTED");
    assert_eq!(body["error"]["message"], "You didn't select a choice.");
    assert_eq!(body["error"]["details"]["text"], "Past question.");
    assert_eq!(
        body["error"]["details"]["choices"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    // A choice id belonging to nobody is treated the same way
    let resp = fixture.vote(&token, id, Some(424242)).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_revote_replaces_previous_choice() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;
    let question = fixture
        .create_question("Pick one.", Duration::days(-1), None, &["A", "B"])
        .await;
    let (id, choices) = ids(&question);

    let resp = fixture.vote(&token, id, Some(choices[0])).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), format!("/polls/{}/results/", id));

    let resp = fixture.vote(&token, id, Some(choices[1])).await;
    assert_eq!(resp.status(), 303);

    let results = fixture.results(id).await;
    assert_eq!(results["totalVotes"], 1);
    assert_eq!(results["choices"][0]["votes"], 0);
    assert_eq!(results["choices"][1]["votes"], 1);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/polls/{}/", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["selectedChoiceId"], choices[1]);
}

#[tokio::test]
async fn test_tally_counts_each_voter_once() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Pick one.", Duration::days(-1), None, &["A", "B", "C"])
        .await;
    let (id, choices) = ids(&question);

    for i in 0..4 {
        let token = fixture.login_as(&format!("voter{}", i)).await;
        let resp = fixture.vote(&token, id, Some(choices[1])).await;
        assert_eq!(resp.status(), 303);
    }

    let results = fixture.results(id).await;
    assert_eq!(results["choices"][0]["votes"], 0);
    assert_eq!(results["choices"][1]["votes"], 4);
    assert_eq!(results["choices"][2]["votes"], 0);
    assert_eq!(results["totalVotes"], 4);
}

#[tokio::test]
async fn test_voting_closes_at_end_date() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;
    let question = fixture
        .create_question(
            "Closing soon.",
            Duration::days(-1),
            Some(Duration::hours(1)),
            &["A"],
        )
        .await;
    let (id, choices) = ids(&question);

    fixture.clock.advance(Duration::hours(1));
    let resp = fixture.vote(&token, id, Some(choices[0])).await;
    assert_eq!(location(&resp), format!("/polls/{}/results/", id));

    fixture.clock.advance(Duration::seconds(1));
    let resp = fixture.vote(&token, id, Some(choices[0])).await;
    assert_eq!(resp.status(), 303);
    let target = location(&resp);
    assert!(target.starts_with("/polls/?error="));

    let resp = fixture.client.get(fixture.url(&target)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["messages"]
        .as_array()
        .unwrap()
        .contains(&json!(
            "You can't vote on this poll because this poll is already ended."
        )));

    // Closed polls still show their results
    let results = fixture.results(id).await;
    assert_eq!(results["totalVotes"], 1);
}

#[tokio::test]
async fn test_admin_requires_psk() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/admin/questions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .get(fixture.url("/admin/questions"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .get(fixture.url("/admin/questions"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_admin_question_lifecycle() {
    let fixture = TestFixture::new().await;
    let question = fixture
        .create_question("Lunch?", Duration::hours(-2), None, &["Pizza"])
        .await;
    let (id, _) = ids(&question);
    assert_eq!(question["state"], "open");
    assert_eq!(question["wasPublishedRecently"], true);

    // Invalid window
    let resp = fixture
        .admin
        .put(fixture.url(&format!("/admin/questions/{}", id)))
        .json(&json!({ "endAt": start_time() - Duration::days(1) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Close it
    let resp = fixture
        .admin
        .put(fixture.url(&format!("/admin/questions/{}", id)))
        .json(&json!({ "text": "Dinner?", "endAt": start_time() - Duration::hours(1) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["text"], "Dinner?");
    assert_eq!(body["data"]["state"], "closed");

    // Add a choice
    let resp = fixture
        .admin
        .post(fixture.url(&format!("/admin/questions/{}/choices", id)))
        .json(&json!({ "text": "Sushi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin
        .get(fixture.url(&format!("/admin/questions/{}", id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["choices"].as_array().unwrap().len(), 2);

    // Search sees the new text and choice
    let resp = fixture
        .admin
        .get(fixture.url("/admin/questions/search?q=sushi"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["question"]["id"], id);

    // Delete
    let resp = fixture
        .admin
        .delete(fixture.url(&format!("/admin/questions/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin
        .get(fixture.url(&format!("/admin/questions/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .admin
        .get(fixture.url("/admin/questions/search?q=dinner"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_admin_rejects_invalid_question() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .admin
        .post(fixture.url("/admin/questions"))
        .json(&json!({
            "text": "Backwards",
            "publishAt": start_time(),
            "endAt": start_time() - Duration::seconds(1),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin
        .post(fixture.url("/admin/questions"))
        .json(&json!({ "text": "  ", "publishAt": start_time() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_deleting_choice_drops_its_votes() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;
    let question = fixture
        .create_question("Pick.", Duration::days(-1), None, &["A", "B"])
        .await;
    let (id, choices) = ids(&question);
    fixture.vote(&token, id, Some(choices[0])).await;

    let resp = fixture
        .admin
        .delete(fixture.url(&format!("/admin/choices/{}", choices[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let results = fixture.results(id).await;
    assert_eq!(results["choices"].as_array().unwrap().len(), 1);
    assert_eq!(results["totalVotes"], 0);

    // The voter can vote again on the remaining choice
    let resp = fixture.vote(&token, id, Some(choices[1])).await;
    assert_eq!(location(&resp), format!("/polls/{}/results/", id));
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.login_as("john").await;

    let resp = fixture
        .admin
        .post(fixture.url("/admin/users"))
        .json(&json!({ "username": "john", "password": "another" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_login_logout_events() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;

    let resp = fixture
        .client
        .post(fixture.url("/accounts/login/"))
        .header("x-forwarded-for", "203.0.113.9")
        .json(&json!({ "username": "john", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/accounts/logout/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let events = fixture.events.0.lock().unwrap().clone();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], AuthEvent::LoggedIn { username, .. } if username == "john"));
    assert_eq!(
        events[1],
        AuthEvent::LoginFailed {
            username: "john".to_string(),
            ip: Some("203.0.113.9".to_string()),
        }
    );
    assert!(matches!(&events[2], AuthEvent::LoggedOut { username, .. } if username == "john"));

    // The old token is now anonymous
    let resp = fixture
        .client
        .post(fixture.url("/accounts/logout/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_expired_session_is_anonymous() {
    let fixture = TestFixture::new().await;
    let token = fixture.login_as("john").await;
    let question = fixture
        .create_question("Pick.", Duration::days(-1), None, &["A"])
        .await;
    let (id, choices) = ids(&question);

    fixture
        .clock
        .advance(Duration::days(SESSION_TTL_DAYS) - Duration::seconds(1));
    let resp = fixture.vote(&token, id, Some(choices[0])).await;
    assert_eq!(location(&resp), format!("/polls/{}/results/", id));

    fixture.clock.advance(Duration::seconds(1));
    let resp = fixture.vote(&token, id, Some(choices[0])).await;
    assert_eq!(resp.status(), 303);
    assert!(location(&resp).starts_with("/accounts/login/?next="));

    let resp = fixture
        .client
        .post(fixture.url("/accounts/logout/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Logging in again issues a working token
    let resp = fixture
        .client
        .post(fixture.url("/accounts/login/"))
        .json(&json!({ "username": "john", "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let fresh = body["data"]["token"].as_str().unwrap().to_string();
    let resp = fixture.vote(&fresh, id, Some(choices[0])).await;
    assert_eq!(location(&resp), format!("/polls/{}/results/", id));
}

#[tokio::test]
async fn test_out_of_range_dates_are_rejected() {
    let fixture = TestFixture::new().await;
    fixture
        .create_question("Today.", Duration::hours(-1), None, &[])
        .await;

    let resp = fixture
        .admin
        .post(fixture.url("/admin/questions"))
        .json(&json!({ "text": "Far future", "publishAt": "+10000-01-01T00:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let resp = fixture
        .client
        .get(fixture.url("/polls/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["questions"].as_array().unwrap().len(), 1);

    let resp = fixture
        .admin
        .get(fixture.url("/admin/questions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_created_question_reports_stored_window() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .admin
        .post(fixture.url("/admin/questions"))
        .json(&json!({ "text": "On the dot", "publishAt": "2024-06-15T12:00:00.0000009Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let created = body["data"].clone();
    assert_eq!(created["state"], "open");
    assert_eq!(created["publishAt"], json!(start_time()));

    let resp = fixture
        .admin
        .get(fixture.url(&format!("/admin/questions/{}", created["id"])))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], created);
}

#[tokio::test]
async fn test_search_total_counts_all_pages() {
    let fixture = TestFixture::new().await;
    for i in 0..3 {
        fixture
            .create_question(&format!("Lunch plan {}", i), Duration::hours(-1), None, &[])
            .await;
    }

    let resp = fixture
        .admin
        .get(fixture.url("/admin/questions/search?q=lunch&limit=1"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["total"], 3);
}
