mod common;

use actix_web::{
    http::{header, StatusCode},
    test,
    web::Data,
    App,
};
use commission_common::time::get_current_time_in_seconds;
use commission_daemon::{
    core::{storage::SledStorage, Engine},
    rpc::{rpc::configure, AdminAuth},
};
use common::*;
use serde_json::{json, Value};
use tempdir::TempDir;

const TOKEN: &str = "admin-secret";

macro_rules! service {
    ($temp_dir:expr, $token:expr) => {{
        let engine: Engine<SledStorage> = build_engine($temp_dir);
        let token: Option<&str> = $token;
        test::init_service(
            App::new()
                .app_data(Data::new(engine))
                .app_data(Data::new(AdminAuth::new(token.map(str::to_owned))))
                .configure(configure::<SledStorage>),
        )
        .await
    }};
}

fn bearer() -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", TOKEN))
}

#[actix_web::test]
async fn test_register_pay_and_release() {
    let temp_dir = TempDir::new("http_flow").expect("temp dir");
    let app = service!(&temp_dir, Some(TOKEN));

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "id": 1, "kyc_status": "approved" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Paid long enough ago for every installment to be due
    let paid_at = get_current_time_in_seconds() - 10 * WEEK;
    let req = test::TestRequest::post()
        .uri("/payments/verified")
        .insert_header(bearer())
        .set_json(json!({ "order_id": 100, "user_id": 1, "amount": PACKAGE, "paid_at": paid_at }))
        .to_request();
    let receipt: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(receipt["duplicate"], false);
    assert_eq!(receipt["payouts_scheduled"], 4);
    assert_eq!(receipt["order"]["split"]["company_share"], 6_000);

    let req = test::TestRequest::get().uri("/users/1").to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    let code = user["referral_code"].as_str().expect("referral code").to_owned();
    assert!(code.starts_with("REF"));

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "id": 2, "sponsor": { "code": code.to_lowercase() } }))
        .to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user["sponsor"], 1);

    let req = test::TestRequest::post()
        .uri("/payouts/release")
        .insert_header(bearer())
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["paid"], 4);
    assert_eq!(summary["total_amount"], 2_800);

    let req = test::TestRequest::get().uri("/users/1/balance").to_request();
    let balance: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(balance["cached_balance"], 2_800);
    assert_eq!(balance["consistent"], true);

    let req = test::TestRequest::get()
        .uri("/users/1/ledger?limit=2")
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["entries"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["has_more"], true);

    let req = test::TestRequest::get().uri("/users/1/referrals").to_request();
    let referrals: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(referrals["direct_referrals"], json!([2]));
}

#[actix_web::test]
async fn test_admin_endpoints_require_token() {
    let temp_dir = TempDir::new("http_auth").expect("temp dir");
    let app = service!(&temp_dir, Some(TOKEN));

    let req = test::TestRequest::post().uri("/payouts/release").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");

    let req = test::TestRequest::get()
        .uri("/withdrawals")
        .insert_header((header::AUTHORIZATION, "Bearer wrong"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/withdrawals?status=requested")
        .insert_header(bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Read endpoints stay open
    let req = test::TestRequest::get().uri("/pool").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_error_responses() {
    let temp_dir = TempDir::new("http_errors").expect("temp dir");
    let app = service!(&temp_dir, None);

    let req = test::TestRequest::get().uri("/users/77").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_found");
    assert!(body["message"].as_str().is_some());

    let req = test::TestRequest::get().uri("/users/abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "sponsor": 3 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation");

    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "id": 1 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "id": 1 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    // Invalid run key
    let req = test::TestRequest::post()
        .uri("/pool/distribute")
        .set_json(json!({ "key": "no spaces allowed" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::post()
        .uri("/withdrawals/5/reject")
        .set_json(json!({ "notes": "unknown" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
