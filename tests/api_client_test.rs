//! REST client integration tests
//!
//! Exercises `ApiClient` against a `wiremock` server: endpoint paths, the
//! bearer header from the request context, and status-to-error mapping.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studyflow::api::types::{
    Difficulty, MessageType, NewMessage, NewTask, Role, SubmissionReview, SubmissionStatus,
    SubmissionType, TaskUpdate,
};
use studyflow::api::ChatApi;
use studyflow::error::StudyflowError;

use common::{client_for, message_json, token_json, user_json};

fn error_of(err: &anyhow::Error) -> &StudyflowError {
    err.downcast_ref::<StudyflowError>()
        .expect("expected a StudyflowError")
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "a@x.io", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json(
            "tok-1",
            user_json("a1", "admin"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.login("a@x.io", "pw").await.unwrap();
    assert_eq!(response.access_token, "tok-1");
    assert_eq!(response.user.role, Role::Admin);
}

#[tokio::test]
async fn test_login_rejection_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).login("a@x.io", "bad").await.unwrap_err();
    match error_of(&err) {
        StudyflowError::Authentication(detail) => assert_eq!(detail, "Invalid credentials"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Email already registered"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .register("a@x.io", "Ann", "pw", Role::Student)
        .await
        .unwrap_err();
    assert!(matches!(error_of(&err), StudyflowError::Authentication(_)));
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_authenticated_call_carries_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("s1", "student")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok-1".into())).await;
    let me = client.me().await.unwrap();
    assert_eq!(me.id, "s1");
}

#[tokio::test]
async fn test_authenticated_call_without_token_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server).me().await.unwrap_err();
    assert!(matches!(error_of(&err), StudyflowError::NotAuthenticated));
}

#[tokio::test]
async fn test_clones_share_the_token() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let clone = client.clone();
    client.set_token(Some("tok".into())).await;
    assert!(clone.has_token().await);
    clone.set_token(None).await;
    assert!(!client.has_token().await);
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_expired_token_is_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("stale".into())).await;
    let err = client.tasks().await.unwrap_err();
    assert!(matches!(error_of(&err), StudyflowError::SessionExpired(_)));
    assert!(error_of(&err).requires_login());
}

#[tokio::test]
async fn test_forbidden_not_found_and_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/students"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Admin only"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/progress/student/nobody"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ai/doubt-solver"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;

    let err = client.students().await.unwrap_err();
    assert!(matches!(error_of(&err), StudyflowError::Forbidden(d) if d == "Admin only"));

    let err = client.student_progress("nobody").await.unwrap_err();
    assert!(matches!(error_of(&err), StudyflowError::NotFound(_)));

    let err = client.ask_doubt("why?", &[]).await.unwrap_err();
    match error_of(&err) {
        StudyflowError::Api { status, detail } => {
            assert_eq!(*status, 500);
            assert_eq!(detail, "upstream exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_or_create_session_passes_student_id_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .and(query_param("student_id", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "admin_id": "a1",
            "student_id": "s1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let session = ChatApi::get_or_create_session(&client, "s1").await.unwrap();
    assert_eq!(session.id, "c1");
}

#[tokio::test]
async fn test_fetch_messages_keeps_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/messages/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_json("m2", "c1", "s1", "second"),
            message_json("m1", "c1", "a1", "first"),
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let messages = client.fetch_messages("c1").await.unwrap();
    let ids: Vec<_> = messages.iter().filter_map(|m| m.id.as_deref()).collect();
    assert_eq!(ids, vec!["m2", "m1"]);
}

#[tokio::test]
async fn test_delete_message_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/messages/m1"))
        .and(query_param("delete_for_everyone", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    client.delete_message("m1", true).await.unwrap();
}

#[tokio::test]
async fn test_create_task_serializes_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t1",
            "title": "Essay",
            "description": "500 words",
            "difficulty": "Hard",
            "submission_type": "text",
            "deadline": "2026-02-01T23:59:59Z",
            "created_by": "a1",
            "assigned_to": ["s1", "s2"]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let task = client
        .create_task(&NewTask {
            title: "Essay".into(),
            description: "500 words".into(),
            difficulty: Difficulty::Hard,
            submission_type: SubmissionType::Text,
            deadline: "2026-02-01T23:59:59Z".parse().unwrap(),
            assigned_to: vec!["s1".into(), "s2".into()],
        })
        .await
        .unwrap();
    assert_eq!(task.assigned_to.len(), 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["difficulty"], "Hard");
    assert_eq!(body["submission_type"], "text");
}

#[tokio::test]
async fn test_update_task_sends_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/t1"))
        .and(body_json(json!({"title": "Essay v2", "difficulty": "Easy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t1",
            "title": "Essay v2",
            "description": "500 words",
            "difficulty": "Easy",
            "submission_type": "text",
            "deadline": "2026-02-01T23:59:59Z",
            "created_by": "a1",
            "assigned_to": ["s1"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let task = client
        .update_task(
            "t1",
            &TaskUpdate {
                title: Some("Essay v2".into()),
                difficulty: Some(Difficulty::Easy),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.title, "Essay v2");
    assert_eq!(task.difficulty, Difficulty::Easy);
}

fn submission_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "task_id": "t1",
        "content": "my answer",
        "submission_type": "text",
        "student_id": "s1",
        "status": status,
        "submitted_at": "2026-01-10T12:00:00Z",
        "is_late": true
    })
}

#[tokio::test]
async fn test_list_submissions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/submissions/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            submission_json("sub1", "pending"),
            submission_json("sub2", "approved"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let submissions = client.submissions().await.unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].status, SubmissionStatus::Pending);
    assert!(submissions[0].is_late);
    assert_eq!(submissions[1].likes, 0);
}

#[tokio::test]
async fn test_review_submission_puts_status_and_feedback() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/submissions/sub1"))
        .and(body_json(json!({"status": "rejected", "feedback": "Show your work"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(submission_json("sub1", "rejected")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let reviewed = client
        .review_submission(
            "sub1",
            &SubmissionReview {
                status: Some(SubmissionStatus::Rejected),
                feedback: Some("Show your work".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(reviewed.status, SubmissionStatus::Rejected);
}

#[tokio::test]
async fn test_like_submission_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submissions/sub1/like"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    client.like_submission("sub1").await.unwrap();
}

#[tokio::test]
async fn test_post_message_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .and(body_json(json!({
            "chat_id": "c1",
            "sender_id": "s1",
            "content": "hello",
            "message_type": "text"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(message_json("m1", "c1", "s1", "hello")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let sent = client
        .post_message(&NewMessage {
            chat_id: "c1".into(),
            sender_id: "s1".into(),
            content: "hello".into(),
            message_type: MessageType::Text,
        })
        .await
        .unwrap();
    assert_eq!(sent.id.as_deref(), Some("m1"));
}

#[tokio::test]
async fn test_ask_doubt_sends_history_and_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/doubt-solver"))
        .and(body_json(json!({
            "question": "And 3+3?",
            "chat_history": [
                {"role": "user", "content": "2+2?"},
                {"role": "assistant", "content": "4"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "6"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token(Some("tok".into())).await;
    let history = vec![
        studyflow::api::types::ChatTurn {
            role: "user".into(),
            content: "2+2?".into(),
        },
        studyflow::api::types::ChatTurn {
            role: "assistant".into(),
            content: "4".into(),
        },
    ];
    assert_eq!(client.ask_doubt("And 3+3?", &history).await.unwrap(), "6");
}
