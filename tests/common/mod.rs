use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

use studyflow::ApiClient;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// An `ApiClient` pointed at a wiremock server.
#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("valid client")
}

#[allow(dead_code)]
pub fn user_json(id: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "name": id.to_uppercase(),
        "role": role,
        "created_at": "2026-01-05T09:00:00Z"
    })
}

#[allow(dead_code)]
pub fn token_json(token: &str, user: Value) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "user": user
    })
}

#[allow(dead_code)]
pub fn message_json(id: &str, chat_id: &str, sender: &str, content: &str) -> Value {
    json!({
        "id": id,
        "chat_id": chat_id,
        "sender_id": sender,
        "content": content,
        "message_type": "text",
        "created_at": "2026-01-05T09:01:00Z",
        "is_deleted": false,
        "is_read": false
    })
}
