//! Blocking route calls against in-memory transports.

use emissary::prelude::*;
use emissary_core::JSON;
use emissary_test::{MockResponse, MockTransport};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BASE: &str = "https://api.example.com";

/// Creates a router whose blocking transport is `mock`.
fn router_with(mock: &Arc<MockTransport>) -> Router {
    let manager = Arc::new(TransportManager::new(true));
    manager.set(mock.clone()).unwrap();
    Router::builder(BASE).manager(manager).build().unwrap()
}

fn user_schema() -> Schema {
    Schema::record("User")
        .field("id", Schema::integer())
        .field("name", Schema::string())
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
}

#[test]
fn test_get_record_by_path() {
    let mock = Arc::new(MockTransport::fixed(
        BASE,
        MockResponse::json(&json!({"id": 1, "name": "Ann"})),
    ));
    let router = router_with(&mock);
    let get_user = router
        .get("/users/{id}")
        .param("id", Param::path(Schema::integer()))
        .returns(ResponseType::Record(user_schema()))
        .build()
        .unwrap();

    let value = get_user.call(&kwargs! { "id" => 1 }).unwrap();

    assert_eq!(value, ResponseValue::Record(json!({"id": 1, "name": "Ann"})));
    assert_eq!(
        value.into_model::<User>().unwrap(),
        User {
            id: 1,
            name: "Ann".to_string()
        }
    );
    let request = mock.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, "/users/1");
}

#[test]
fn test_embed_conflict_before_dispatch() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let create = router
        .post("/users")
        .param("profile", Param::body(Schema::any()).embed(false))
        .param("extra", Param::body(Schema::any()).alias("Extra-Data"))
        .build()
        .unwrap();

    let err = create
        .call(&kwargs! { "profile" => json!({"name": "Ann"}), "extra" => json!({"vip": true}) })
        .unwrap_err();

    assert!(matches!(err, EmissaryError::EmbedConflict { .. }));
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn test_router_query_case() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!([]))));
    let router = router_with(&mock);
    router.set_case(Channel::Query, Some(CaseConverter::camel()));
    let search = router
        .get("/users")
        .param("first_name", Schema::string())
        .returns(ResponseType::JsonList)
        .build()
        .unwrap();

    let value = search.call(&kwargs! { "first_name" => "Ann" }).unwrap();

    assert_eq!(value, ResponseValue::JsonList(vec![]));
    let request = mock.last_request().unwrap();
    assert_eq!(request.params["firstName"], "Ann");
    assert!(!request.params.contains_key("first_name"));
}

#[test]
fn test_self_list_on_static_route() {
    let router = Router::new(BASE);
    let err = router
        .get("/users")
        .returns(ResponseType::SelfList)
        .build()
        .unwrap_err();
    assert!(matches!(err, EmissaryError::InvalidReturnAnnotation { .. }));
}

#[test]
fn test_status_error_skips_finalizer() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::with_status(404)));
    let router = router_with(&mock);
    let finalized = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finalized);
    let get_user = router
        .get("/users/{id}")
        .param("id", Param::path(Schema::integer()))
        .finalize(ResponseFinalizer::new(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(ResponseValue::None)
        }))
        .build()
        .unwrap();

    let err = get_user.call(&kwargs! { "id" => 7 }).unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.is_client_error());
    assert!(!finalized.load(Ordering::SeqCst));
}

#[test]
fn test_missing_path_argument() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let get_user = router
        .get("/users/{id}")
        .param("id", Param::path(Schema::integer()))
        .build()
        .unwrap();

    let err = get_user.call(&Kwargs::new()).unwrap_err();

    assert!(err.field_errors().unwrap().contains("id"));
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn test_path_value_with_braces_is_dispatched() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::text("contents")));
    let router = router_with(&mock);
    let download = router
        .get("/files/{name}")
        .param("name", Param::path(Schema::string()))
        .returns(ResponseType::Text)
        .build()
        .unwrap();

    let value = download.call(&kwargs! { "name" => "report{v2}" }).unwrap();

    assert_eq!(value.as_text(), Some("contents"));
    assert_eq!(mock.request_count(), 1);
    assert_eq!(mock.last_request().unwrap().url, "/files/report%7Bv2%7D");
}

#[test]
fn test_bad_pattern_fails_declaration() {
    let router = Router::new(BASE);
    let err = router
        .get("/search")
        .param("q", Param::query(Schema::string().pattern("([")))
        .build()
        .unwrap_err();

    assert!(matches!(err, EmissaryError::InvalidParameter { ref name, .. } if name == "q"));
}

#[test]
fn test_unknown_argument_rejected() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let ping = router.get("/ping").build().unwrap();

    let err = ping.call(&kwargs! { "verbose" => true }).unwrap_err();
    assert!(err.field_errors().unwrap().contains("verbose"));
}

#[test]
fn test_marker_channels() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!({}))));
    let router = router_with(&mock);
    router.set_case(Channel::Header, Some(CaseConverter::header()));
    let route = router
        .post("/orgs/{org}/members")
        .param("org", Param::path(Schema::string()))
        .param("dry_run", Param::query(Schema::boolean()).default(false))
        .param("request_id", Param::header(Schema::string()))
        .param("session", Param::cookie(Schema::string()))
        .param("role", Param::body(Schema::string()))
        .build()
        .unwrap();

    route
        .call(&kwargs! {
            "org" => "acme",
            "request_id" => "r-1",
            "session" => "s-1",
            "role" => "admin",
        })
        .unwrap();

    let request = mock.last_request().unwrap();
    assert_eq!(request.url, "/orgs/acme/members");
    assert_eq!(request.params["dry_run"], false);
    assert_eq!(request.headers["Request-Id"], "r-1");
    assert_eq!(request.cookies["session"], "s-1");
    assert_eq!(request.json, Some(json!({"role": "admin"})));
}

#[test]
fn test_optional_nulls_dropped() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!({}))));
    let router = router_with(&mock);
    let route = router
        .patch("/users/{id}")
        .param("id", Param::path(Schema::integer()))
        .param("name", Param::body(Schema::string()).optional())
        .param("email", Param::body(Schema::string()).optional())
        .build()
        .unwrap();

    route
        .call(&kwargs! { "id" => 3, "name" => "Ann" })
        .unwrap();

    let request = mock.last_request().unwrap();
    assert_eq!(request.json, Some(json!({"name": "Ann"})));
}

#[test]
fn test_form_and_file_bodies_coexist() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let upload = router
        .post("/uploads")
        .param("title", Param::form(Schema::string()))
        .param("attachment", Param::file(Schema::string()))
        .returns(ResponseType::None)
        .build()
        .unwrap();

    let value = upload
        .call(&kwargs! { "title" => "report", "attachment" => "report.pdf" })
        .unwrap();

    assert!(value.is_none());
    let request = mock.last_request().unwrap();
    assert_eq!(request.data, Some(json!({"title": "report"})));
    assert_eq!(request.files, Some(json!({"attachment": "report.pdf"})));
    assert_eq!(request.json, None);
}

#[test]
fn test_json_family_mismatch() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let route = router
        .post("/documents")
        .param("data", Param::body(Schema::any()).media_type("application/vnd.api+json"))
        .param("meta", Param::body(Schema::any()).media_type(JSON))
        .build()
        .unwrap();

    let err = route
        .call(&kwargs! { "data" => json!({}), "meta" => json!({}) })
        .unwrap_err();

    match err {
        EmissaryError::IncompatibleMediaTypes { first, second } => {
            assert_eq!(first, "application/vnd.api+json");
            assert_eq!(second, JSON);
        }
        other => panic!("expected incompatible media types, got {other}"),
    }
}

#[test]
fn test_custom_media_type_sets_content_type() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let route = router
        .put("/notes/{id}")
        .param("id", Param::path(Schema::integer()))
        .param("content", Param::body(Schema::string()).embed(false).media_type("text/markdown"))
        .returns(ResponseType::None)
        .build()
        .unwrap();

    route
        .call(&kwargs! { "id" => 1, "content" => "# Title" })
        .unwrap();

    let request = mock.last_request().unwrap();
    assert_eq!(request.data, Some(json!("# Title")));
    assert_eq!(request.headers["Content-Type"], "text/markdown");
}

#[test]
fn test_preparers_run_router_then_route() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!({}))));
    let router = router_with(&mock);
    router.set_preparer(Preparer::new(|mut args| {
        args.headers.insert("X-Order".to_string(), json!("router"));
        Ok(args)
    }));
    let append_route = || {
        Preparer::new(|mut args| {
            let seen = args
                .headers
                .get("X-Order")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            args.headers
                .insert("X-Order".to_string(), json!(format!("{seen},route")));
            Ok(args)
        })
    };

    let both = router.get("/a").prepare(append_route()).build().unwrap();
    both.call(&Kwargs::new()).unwrap();
    assert_eq!(mock.last_request().unwrap().headers["X-Order"], "router,route");

    let skipped = router
        .get("/b")
        .skip_preparer()
        .prepare(append_route())
        .build()
        .unwrap();
    skipped.call(&Kwargs::new()).unwrap();
    assert_eq!(mock.last_request().unwrap().headers["X-Order"], ",route");
}

#[test]
fn test_json_finalizer_and_skip() {
    let mock = Arc::new(MockTransport::fixed(
        BASE,
        MockResponse::json(&json!({"data": {"id": 1}})),
    ));
    let router = router_with(&mock);
    router.set_json_finalizer(JsonFinalizer::new(|mut body| Ok(body["data"].take())));

    let unwrapped = router.get("/me").build().unwrap();
    assert_eq!(
        unwrapped.call(&Kwargs::new()).unwrap(),
        ResponseValue::Json(json!({"id": 1}))
    );

    let raw = router.get("/me").skip_finalizer().build().unwrap();
    assert_eq!(
        raw.call(&Kwargs::new()).unwrap(),
        ResponseValue::Json(json!({"data": {"id": 1}}))
    );
}

#[test]
fn test_response_case_converts_keys() {
    let mock = Arc::new(MockTransport::fixed(
        BASE,
        MockResponse::json(&json!({"firstName": "Ann", "lastName": "Lee"})),
    ));
    let router = router_with(&mock);
    router.set_case(Channel::Response, Some(CaseConverter::snake()));
    let profile = router
        .get("/profile")
        .returns(ResponseType::Record(
            Schema::record("Profile")
                .field("first_name", Schema::string())
                .field("last_name", Schema::string()),
        ))
        .build()
        .unwrap();

    assert_eq!(
        profile.call(&Kwargs::new()).unwrap(),
        ResponseValue::Record(json!({"first_name": "Ann", "last_name": "Lee"}))
    );
}

#[test]
fn test_async_hook_on_blocking_call() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    let route = router
        .get("/slow")
        .prepare(Preparer::new_async(|args| async move { Ok(args) }))
        .build()
        .unwrap();

    let err = route.call(&Kwargs::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "If prepare_args is async, the route must be called asynchronously"
    );
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn test_custom_response_requires_finalizer() {
    let router = Router::new(BASE);
    let err = router
        .get("/report")
        .returns(ResponseType::Custom("Report".to_string()))
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Response finalizer must be set if response is Report"
    );
}

#[test]
fn test_response_type_mismatch() {
    let mock = Arc::new(MockTransport::fixed(
        BASE,
        MockResponse::json(&json!([{"id": "x", "name": "Ann"}])),
    ));
    let router = router_with(&mock);
    let list = router
        .get("/users")
        .returns(ResponseType::Records(user_schema()))
        .build()
        .unwrap();

    let err = list.call(&Kwargs::new()).unwrap_err();
    assert!(matches!(err, EmissaryError::ResponseValidation { .. }));
    assert!(err.field_errors().unwrap().contains("result[0].id"));
}

#[test]
fn test_head_returns_headers() {
    let mock = Arc::new(MockTransport::fixed(
        BASE,
        MockResponse::ok().header("x-total-count", "42"),
    ));
    let router = router_with(&mock);
    let count = router.head("/users").build().unwrap();

    match count.call(&Kwargs::new()).unwrap() {
        ResponseValue::Headers(headers) => assert_eq!(headers["x-total-count"], "42"),
        other => panic!("expected headers, got {other:?}"),
    }
}

#[test]
fn test_text_and_bytes_responses() {
    let mock = Arc::new(MockTransport::queue(
        BASE,
        [MockResponse::text("pong"), MockResponse::bytes(vec![1_u8, 2, 3])],
    ));
    let router = router_with(&mock);
    let ping = router.get("/ping").returns(ResponseType::Text).build().unwrap();
    let blob = router.get("/blob").returns(ResponseType::Bytes).build().unwrap();

    assert_eq!(ping.call(&Kwargs::new()).unwrap().as_text(), Some("pong"));
    assert_eq!(
        blob.call(&Kwargs::new()).unwrap().as_bytes().map(|b| b.to_vec()),
        Some(vec![1, 2, 3])
    );
}

#[test]
fn test_rate_limit_spaces_calls() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::ok()));
    let router = router_with(&mock);
    router.set_rate_limit(Some(RateLimit::new(1, Duration::from_millis(60)).unwrap()));
    let ping = router.get("/ping").returns(ResponseType::None).build().unwrap();

    let start = Instant::now();
    ping.call(&Kwargs::new()).unwrap();
    ping.call(&Kwargs::new()).unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn test_base_url_mismatch() {
    let mock = Arc::new(MockTransport::fixed("https://other.example.com", MockResponse::ok()));
    let router = router_with(&mock);
    let ping = router.get("/ping").build().unwrap();

    let err = ping.call(&Kwargs::new()).unwrap_err();
    assert!(matches!(err, EmissaryError::BaseUrlMismatch { .. }));
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn test_kwargs_by_alias() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!({}))));
    let router = router_with(&mock);
    let route = router
        .get("/search")
        .param("page_size", Param::query(Schema::integer()).alias("per_page"))
        .build()
        .unwrap();

    route.call(&kwargs! { "per_page" => "25" }).unwrap();
    assert_eq!(mock.last_request().unwrap().params["per_page"], 25);
}

#[test]
fn test_plain_body_field_with_default() {
    let mock = Arc::new(MockTransport::fixed(BASE, MockResponse::json(&json!({}))));
    let router = router_with(&mock);
    router.set_case(Channel::Body, Some(CaseConverter::camel()));
    let route = router
        .post("/users")
        .param("display_name", Schema::string())
        .param("is_admin", FieldDecl::plain_with_default(Schema::boolean(), false))
        .build()
        .unwrap();

    route.call(&kwargs! { "display_name" => "Ann" }).unwrap();
    assert_eq!(
        mock.last_request().unwrap().json,
        Some(json!({"displayName": "Ann", "isAdmin": false}))
    );
}
