use super::{AdminAuth, ApiError};
use crate::{
    config::{DEFAULT_PAGE_SIZE, DEFAULT_UPLINE_LEVELS},
    core::{storage::Storage, Engine, Registration, SponsorRef},
};
use actix_web::{
    web::{self, Data, Json, Path, Query},
    HttpResponse,
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use commission_common::{
    account::{KycStatus, UserId},
    order::{OrderId, PaymentEvent},
    time::get_current_time_in_seconds,
    withdrawal::{BankDetails, WithdrawalId, WithdrawalStatus},
};
use serde::Deserialize;

type HttpResult = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReferralQuery {
    pub levels: Option<u8>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalQuery {
    pub status: Option<WithdrawalStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SponsorBody {
    pub sponsor: SponsorRef,
}

#[derive(Debug, Deserialize)]
pub struct KycBody {
    pub status: KycStatus,
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct DistributeBody {
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalBody {
    pub user_id: UserId,
    pub amount: u64,
    #[serde(default)]
    pub bank_details: BankDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotesBody {
    pub notes: Option<String>,
}

/// Register every HTTP route of the engine
pub fn configure<S: Storage>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    // Payment gateway and KYC integrations
    .route("/payments/verified", web::post().to(payment_verified::<S>))
    .route("/orders/{id}", web::get().to(get_order::<S>))
    // Users and referral tree
    .route("/users", web::post().to(register_user::<S>))
    .route("/users/{id}", web::get().to(get_user::<S>))
    .route("/users/{id}/sponsor", web::post().to(bind_sponsor::<S>))
    .route("/users/{id}/kyc", web::put().to(update_kyc::<S>))
    .route("/users/{id}/active", web::put().to(set_active::<S>))
    .route("/users/{id}/ledger", web::get().to(get_ledger::<S>))
    .route("/users/{id}/balance", web::get().to(reconcile_balance::<S>))
    .route("/users/{id}/eligibility", web::get().to(get_eligibility::<S>))
    .route("/users/{id}/referrals", web::get().to(get_referrals::<S>))
    .route("/users/{id}/orders", web::get().to(get_user_orders::<S>))
    .route("/users/{id}/payouts", web::get().to(get_user_payouts::<S>))
    // Scheduler
    .route("/payouts/release", web::post().to(release_payouts::<S>))
    .route("/payouts/overview", web::get().to(payout_overview::<S>))
    .route("/pool", web::get().to(get_pool::<S>))
    .route("/pool/distribute", web::post().to(distribute_pool::<S>))
    .route("/pool/runs", web::get().to(get_distribution_runs::<S>))
    .route("/pool/runs/{key}", web::get().to(get_distribution_run::<S>))
    // Withdrawals
    .route("/withdrawals", web::post().to(request_withdrawal::<S>))
    .route("/withdrawals", web::get().to(list_withdrawals::<S>))
    .route("/withdrawals/{id}", web::get().to(get_withdrawal::<S>))
    .route("/withdrawals/{id}/approve", web::post().to(approve_withdrawal::<S>))
    .route("/withdrawals/{id}/reject", web::post().to(reject_withdrawal::<S>))
    .route("/withdrawals/{id}/complete", web::post().to(complete_withdrawal::<S>));
}

async fn payment_verified<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    event: Json<PaymentEvent>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let receipt = engine
        .process_payment(event.into_inner(), get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

async fn get_order<S: Storage>(engine: Data<Engine<S>>, id: Path<OrderId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_order(id.into_inner()).await?))
}

async fn register_user<S: Storage>(
    engine: Data<Engine<S>>,
    registration: Json<Registration>,
) -> HttpResult {
    let user = engine
        .register_user(registration.into_inner(), get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Created().json(user))
}

async fn get_user<S: Storage>(engine: Data<Engine<S>>, id: Path<UserId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_user(id.into_inner()).await?))
}

async fn bind_sponsor<S: Storage>(
    engine: Data<Engine<S>>,
    id: Path<UserId>,
    body: Json<SponsorBody>,
) -> HttpResult {
    let user = engine
        .bind_sponsor(id.into_inner(), body.into_inner().sponsor)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

async fn update_kyc<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    id: Path<UserId>,
    body: Json<KycBody>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let user = engine
        .update_kyc(id.into_inner(), body.into_inner().status)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

async fn set_active<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    id: Path<UserId>,
    body: Json<ActiveBody>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let user = engine.set_user_active(id.into_inner(), body.active).await?;
    Ok(HttpResponse::Ok().json(user))
}

async fn get_ledger<S: Storage>(
    engine: Data<Engine<S>>,
    id: Path<UserId>,
    query: Query<PageQuery>,
) -> HttpResult {
    let page = engine
        .ledger_history(
            id.into_inner(),
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn reconcile_balance<S: Storage>(engine: Data<Engine<S>>, id: Path<UserId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.reconcile_balance(id.into_inner()).await?))
}

async fn get_eligibility<S: Storage>(engine: Data<Engine<S>>, id: Path<UserId>) -> HttpResult {
    let report = engine
        .evaluate_eligibility(id.into_inner(), get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn get_referrals<S: Storage>(
    engine: Data<Engine<S>>,
    id: Path<UserId>,
    query: Query<ReferralQuery>,
) -> HttpResult {
    let summary = engine
        .referral_summary(
            id.into_inner(),
            query.levels.unwrap_or(DEFAULT_UPLINE_LEVELS),
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn get_user_orders<S: Storage>(engine: Data<Engine<S>>, id: Path<UserId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_orders_for_user(id.into_inner()).await?))
}

async fn get_user_payouts<S: Storage>(engine: Data<Engine<S>>, id: Path<UserId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_user_payouts(id.into_inner()).await?))
}

async fn release_payouts<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let summary = engine
        .release_due_payouts(get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn payout_overview<S: Storage>(engine: Data<Engine<S>>) -> HttpResult {
    let overview = engine.payout_overview(get_current_time_in_seconds()).await?;
    Ok(HttpResponse::Ok().json(overview))
}

async fn get_pool<S: Storage>(engine: Data<Engine<S>>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_pool().await?))
}

async fn distribute_pool<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    body: Option<Json<DistributeBody>>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let key = body.and_then(|body| body.into_inner().key);
    let summary = engine
        .distribute_pool(key, get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn get_distribution_runs<S: Storage>(engine: Data<Engine<S>>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_distribution_runs().await?))
}

async fn get_distribution_run<S: Storage>(engine: Data<Engine<S>>, key: Path<String>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_distribution_run(&key).await?))
}

async fn request_withdrawal<S: Storage>(
    engine: Data<Engine<S>>,
    body: Json<WithdrawalBody>,
) -> HttpResult {
    let body = body.into_inner();
    let request = engine
        .request_withdrawal(
            body.user_id,
            body.amount,
            body.bank_details,
            get_current_time_in_seconds(),
        )
        .await?;
    Ok(HttpResponse::Created().json(request))
}

async fn list_withdrawals<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    query: Query<WithdrawalQuery>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    Ok(HttpResponse::Ok().json(engine.list_withdrawals(query.status).await?))
}

async fn get_withdrawal<S: Storage>(engine: Data<Engine<S>>, id: Path<WithdrawalId>) -> HttpResult {
    Ok(HttpResponse::Ok().json(engine.get_withdrawal(id.into_inner()).await?))
}

async fn approve_withdrawal<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    id: Path<WithdrawalId>,
    body: Option<Json<NotesBody>>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let notes = body.and_then(|body| body.into_inner().notes);
    let request = engine
        .approve_withdrawal(id.into_inner(), notes, get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

async fn reject_withdrawal<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    id: Path<WithdrawalId>,
    body: Json<NotesBody>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let notes = body.into_inner().notes.unwrap_or_default();
    let request = engine
        .reject_withdrawal(id.into_inner(), notes, get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

async fn complete_withdrawal<S: Storage>(
    engine: Data<Engine<S>>,
    auth: Data<AdminAuth>,
    credentials: Option<BearerAuth>,
    id: Path<WithdrawalId>,
    body: Option<Json<NotesBody>>,
) -> HttpResult {
    auth.authorize(credentials.as_ref())?;
    let notes = body.and_then(|body| body.into_inner().notes);
    let request = engine
        .complete_withdrawal(id.into_inner(), notes, get_current_time_in_seconds())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}
