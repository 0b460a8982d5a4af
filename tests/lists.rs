mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use task_manager::auth::{ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, USER_ID_HEADER};
use task_manager::routes;
use uuid::Uuid;

use common::{signup_user, test_config, test_state};

#[actix_rt::test]
async fn test_list_crud() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "lists@x.com", "secret").await.unwrap();

    // Create
    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Groceries" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(created["title"], "Groceries");
    assert_eq!(created["_userId"], user.id);
    let list_id = created["_id"].as_str().unwrap().to_string();

    // Rename
    let req = test::TestRequest::patch()
        .uri(&format!("/lists/{}", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Weekly groceries" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "updated successfully");

    // Read back
    let req = test::TestRequest::get()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    let lists: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["title"], "Weekly groceries");

    // Delete returns the removed list
    let req = test::TestRequest::delete()
        .uri(&format!("/lists/{}", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    let removed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(removed["_id"], list_id);

    let req = test::TestRequest::get()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    let lists: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert!(lists.is_empty());
}

#[actix_rt::test]
async fn test_lists_require_a_valid_access_token() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/lists").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, "not.a.jwt"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_lists_are_scoped_to_their_owner() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let owner = signup_user(&app, "owner@x.com", "secret").await.unwrap();
    let other = signup_user(&app, "other@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, owner.access_token.clone()))
        .set_json(json!({ "title": "Private" }))
        .to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list_id = list["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .to_request();
    let lists: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert!(lists.is_empty());

    let req = test::TestRequest::patch()
        .uri(&format!("/lists/{}", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .set_json(json!({ "title": "Hijacked" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/lists/{}", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    // Nested task writes on a foreign list are refused as well.
    let req = test::TestRequest::post()
        .uri(&format!("/lists/{}/tasks", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .set_json(json!({ "title": "Sneaky" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");

    let list_uuid = Uuid::parse_str(&list_id).unwrap();
    assert!(state.store.tasks_for_list(list_uuid).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_task_crud_within_owned_list() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "tasks@x.com", "secret").await.unwrap();
    let other = signup_user(&app, "intruder@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Chores" }))
        .to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list_id = list["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/lists/{}/tasks", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Vacuum" }))
        .to_request();
    let task: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(task["title"], "Vacuum");
    assert_eq!(task["_listId"], list_id);
    assert_eq!(task["completed"], false);
    let task_id = task["_id"].as_str().unwrap().to_string();
    let task_uri = format!("/lists/{}/tasks/{}", list_id, task_id);

    let req = test::TestRequest::patch()
        .uri(&task_uri)
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "completed": true }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Updated successfully.");

    let req = test::TestRequest::patch()
        .uri(&task_uri)
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .set_json(json!({ "completed": false }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/lists/{}/tasks", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    let tasks: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["completed"], true);
    assert_eq!(tasks[0]["title"], "Vacuum");

    let req = test::TestRequest::delete()
        .uri(&task_uri)
        .insert_header((ACCESS_TOKEN_HEADER, other.access_token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&task_uri)
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    let removed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(removed["_id"], task_id);

    let req = test::TestRequest::delete()
        .uri(&task_uri)
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_deleting_a_list_removes_its_tasks() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "cascade@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Doomed" }))
        .to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list_id = list["_id"].as_str().unwrap().to_string();

    for title in ["one", "two", "three"] {
        let req = test::TestRequest::post()
            .uri(&format!("/lists/{}/tasks", list_id))
            .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
            .set_json(json!({ "title": title }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let list_uuid = Uuid::parse_str(&list_id).unwrap();
    assert_eq!(state.store.tasks_for_list(list_uuid).await.unwrap().len(), 3);

    let req = test::TestRequest::delete()
        .uri(&format!("/lists/{}", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The cascade runs in the background; give it a moment.
    let mut remaining = usize::MAX;
    for _ in 0..50 {
        remaining = state.store.tasks_for_list(list_uuid).await.unwrap().len();
        if remaining == 0 {
            break;
        }
        actix_rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remaining, 0);
}

#[actix_rt::test]
async fn test_task_listing_is_public_by_default() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "public@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Shared" }))
        .to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list_id = list["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/lists/{}/tasks", list_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Only the listing is exempt; writing still needs a token.
    let req = test::TestRequest::post()
        .uri(&format!("/lists/{}/tasks", list_id))
        .set_json(json!({ "title": "Anonymous" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_task_listing_can_be_protected() {
    let mut config = test_config();
    config.protect_task_listing = true;
    let state = test_state(&config);
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "guarded@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Guarded" }))
        .to_request();
    let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list_id = list["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/lists/{}/tasks", list_id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/lists/{}/tasks", list_id))
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_malformed_input_uses_error_envelope() {
    let state = test_state(&test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let user = signup_user(&app, "malformed@x.com", "secret").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .insert_header(("content-type", "application/json"))
        .set_payload("{title: broken")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");

    let req = test::TestRequest::post()
        .uri("/lists")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");

    let req = test::TestRequest::patch()
        .uri("/lists/not-a-uuid")
        .insert_header((ACCESS_TOKEN_HEADER, user.access_token.clone()))
        .set_json(json!({ "title": "Renamed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");

    let req = test::TestRequest::get()
        .uri("/lists/not-a-uuid/tasks")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");
}

#[actix_rt::test]
async fn test_rejections_carry_cors_headers() {
    let state = test_state(&test_config());
    let app = test::init_service(
        App::new()
            .wrap(routes::cors())
            .configure(|cfg| state.configure(cfg)),
    )
    .await;

    let requests = [
        test::TestRequest::get().uri("/lists"),
        test::TestRequest::get()
            .uri("/users/me/access-token")
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((REFRESH_TOKEN_HEADER, "unknown")),
    ];

    for req in requests {
        let req = req
            .insert_header((header::ORIGIN, "http://app.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://app.example")
        );
    }
}
