use assistant_cli::{
    assistants::runs::{CreateRunRequest, Status},
    Credentials, OpenAiClient,
};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

fn assistant(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "object": "assistant",
        "created_at": 1700000000,
        "name": "智能客服",
        "model": "gpt-4-turbo-preview",
        "instructions": null,
        "tools": [],
        "tool_resources": null,
        "metadata": {}
    })
}

async fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(Credentials::new("sk-test", format!("{}/v1", server.uri()))).unwrap()
}

#[tokio::test]
async fn list_follows_cursor_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assistants"))
        .and(query_param("order", "desc"))
        .and(query_param("limit", "100"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [assistant("asst_1"), assistant("asst_2")],
            "first_id": "asst_1",
            "last_id": "asst_2",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/assistants"))
        .and(query_param("after", "asst_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [assistant("asst_3")],
            "first_id": "asst_3",
            "last_id": "asst_3",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let assistants = client(&server).await.list_assistants().await.unwrap();
    let ids: Vec<&str> = assistants.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["asst_1", "asst_2", "asst_3"]);
}

#[tokio::test]
async fn requests_carry_bearer_and_beta_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_1/runs/run_1"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "object": "thread.run",
            "created_at": 1700000000,
            "assistant_id": "asst_1",
            "thread_id": "thread_1",
            "status": "in_progress",
            "required_action": null,
            "last_error": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let run = client(&server)
        .await
        .get_run("thread_1", "run_1")
        .await
        .unwrap();
    assert_eq!(run.status, Status::InProgress);
}

#[tokio::test]
async fn create_run_posts_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/threads/thread_1/runs"))
        .and(body_json(json!({ "assistant_id": "asst_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "object": "thread.run",
            "created_at": 1700000000,
            "assistant_id": "asst_1",
            "thread_id": "thread_1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let run = client(&server)
        .await
        .create_run("thread_1", CreateRunRequest::new("asst_1"))
        .await
        .unwrap();
    assert_eq!(run.id, "run_1");
}

#[tokio::test]
async fn api_errors_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assistants/asst_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "message": "No assistant found with id 'asst_missing'.",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let error = client(&server)
        .await
        .get_assistant("asst_missing")
        .await
        .unwrap_err();
    assert_eq!(error.error_type, "invalid_request_error");
    assert_eq!(error.message, "No assistant found with id 'asst_missing'.");
}

#[tokio::test]
async fn unparseable_errors_keep_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let error = client(&server).await.list_models().await.unwrap_err();
    assert_eq!(error.error_type, "unknown");
    assert!(error.message.contains("502"));
    assert!(error.message.contains("bad gateway"));
}

#[tokio::test]
async fn delete_returns_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/files/file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "object": "file",
            "deleted": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deleted = client(&server).await.delete_file("file-1").await.unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.id, "file-1");
}
