//! # API REST
//!
//! REST API for building and registering health DID profiles.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Form sessions held in memory between requests
//!
//! Wallet signing happens on the client: submit and register take an auth signature in the
//! request body.

#![warn(rust_2018_idioms)]

pub mod schema;

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use healthdid_core::{
    resolve, Collaborators, CoreConfig, Draft, ErrorKind, ProfileError, ProfileForm,
    ProfileService, Registered, ResourceKind, Submitted,
};
use healthdid_crypto::{AccessControlCondition, WalletAddress};
use schema::{
    CreateFormReq, DidRes, FieldRes, FieldsRes, FormRes, HealthRes, RegisterReq, RegisterRes,
    SetDidReq, SetFieldReq, SetFieldRes, SubmitReq, SubmitRes,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// One form being filled in through the API.
#[derive(Debug)]
enum FormSession {
    Draft(ProfileService<Draft>),
    Submitted(ProfileService<Submitted>),
    Registered(ProfileService<Registered>),
}

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    collaborators: Collaborators,
    sessions: Arc<Mutex<HashMap<Uuid, FormSession>>>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, collaborators: Collaborators) -> Self {
        Self {
            cfg,
            collaborators,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, FormSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_fields,
        create_form,
        get_form,
        set_field,
        set_did,
        submit_form,
        register_form,
        get_did,
    ),
    components(schemas(
        HealthRes,
        schema::SelectOptionRes,
        FieldRes,
        FieldsRes,
        CreateFormReq,
        FormRes,
        SetFieldReq,
        SetFieldRes,
        SetDidReq,
        SubmitReq,
        SubmitRes,
        RegisterReq,
        RegisterRes,
        DidRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router, including Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/forms", post(create_form))
        .route("/forms/:id", get(get_form))
        // axum requires one capture name per path segment; `:id` is the form kind for GET
        .route("/forms/:id/fields", get(list_fields).put(set_field))
        .route("/forms/:id/did", put(set_did))
        .route("/forms/:id/submit", post(submit_form))
        .route("/forms/:id/register", post(register_form))
        .route("/dids/:registry_id", get(get_did))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the API.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- healthdid REST API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn profile_error(e: ProfileError) -> ApiError {
    if e.is_not_found() {
        return (StatusCode::NOT_FOUND, e.to_string());
    }
    match e.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, e.to_string()),
        kind => {
            tracing::error!("{} error: {}", kind, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{kind} failed"))
        }
    }
}

fn parse_session_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid form id".to_string()))
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Form not found".to_string())
}

fn form_res(state: &AppState, id: Uuid, session: &FormSession) -> FormRes {
    let (form, status, uri): (&ProfileForm, &str, Option<String>) = match session {
        FormSession::Draft(s) => (s.form(), "draft", None),
        FormSession::Submitted(s) => (
            &s.submission().form,
            "submitted",
            Some(s.uri().to_string()),
        ),
        FormSession::Registered(s) => (
            &s.submission().form,
            "registered",
            Some(s.submission().uri.to_string()),
        ),
    };
    FormRes {
        id: id.to_string(),
        kind: form.kind().to_string(),
        status: status.into(),
        did_suffix: form.did_suffix().map(str::to_owned),
        did: form.did(state.cfg.chain_id()).map(|d| d.did()),
        record: form.record().to_value(),
        uri,
    }
}

/// Runs `edit` on a draft session; submitted forms are read-only.
fn edit_draft<T>(
    state: &AppState,
    id: &str,
    edit: impl FnOnce(&mut ProfileForm) -> Result<T, ProfileError>,
) -> Result<(T, FormRes), ApiError> {
    let id = parse_session_id(id)?;
    let mut sessions = state.sessions();
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;
    let FormSession::Draft(service) = session else {
        return Err((
            StatusCode::CONFLICT,
            "Form has been submitted and can no longer change".to_string(),
        ));
    };
    let out = edit(service.form_mut()).map_err(profile_error)?;
    Ok((out, form_res(state, id, session)))
}

/// Runs a workflow stage on the blocking pool; stages touch the filesystem and encrypt.
async fn run_blocking<T, F>(stage: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ProfileError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(stage)
        .await
        .map_err(|e| {
            tracing::error!("workflow task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Workflow task failed".to_string(),
            )
        })?
        .map_err(profile_error)
}

/// Stores `next` for `id` if the session is still in the state the stage started from.
fn replace_session(
    state: &AppState,
    id: Uuid,
    unchanged: impl FnOnce(&FormSession) -> bool,
    next: FormSession,
) -> Result<(), ApiError> {
    let mut sessions = state.sessions();
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;
    if !unchanged(session) {
        return Err((
            StatusCode::CONFLICT,
            "Form changed while the request was running".to_string(),
        ));
    }
    *session = next;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "healthdid REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/forms/{kind}/fields",
    params(("kind" = String, Path, description = "Patient or Organization")),
    responses(
        (status = 200, description = "Form fields of the resource kind", body = FieldsRes),
        (status = 400, description = "Unsupported resource kind")
    )
)]
/// List the editable fields of a resource form
///
/// Each field's `name` is the dotted path to send to `PUT /forms/{id}/fields`.
async fn list_fields(AxumPath(kind): AxumPath<String>) -> ApiResult<FieldsRes> {
    let kind = kind
        .parse::<ResourceKind>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(FieldsRes {
        kind: kind.to_string(),
        fields: kind.fields().iter().map(FieldRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/forms",
    request_body = CreateFormReq,
    responses(
        (status = 201, description = "Form created", body = FormRes),
        (status = 400, description = "Unsupported resource kind")
    )
)]
/// Start a new profile form from the resource skeleton
async fn create_form(
    State(state): State<AppState>,
    Json(req): Json<CreateFormReq>,
) -> Result<(StatusCode, Json<FormRes>), ApiError> {
    let kind = req
        .kind
        .parse::<ResourceKind>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let id = Uuid::new_v4();
    let session = FormSession::Draft(healthdid_core::draft(
        state.cfg.clone(),
        state.collaborators.clone(),
        kind,
    ));
    let res = form_res(&state, id, &session);
    state.sessions().insert(id, session);

    tracing::info!("created {} form {}", kind, id);
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    get,
    path = "/forms/{id}",
    params(("id" = String, Path, description = "Form id")),
    responses(
        (status = 200, description = "Current form state", body = FormRes),
        (status = 404, description = "Form not found")
    )
)]
/// Read a form's current record and status
async fn get_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<FormRes> {
    let id = parse_session_id(&id)?;
    let sessions = state.sessions();
    let session = sessions.get(&id).ok_or_else(not_found)?;
    Ok(Json(form_res(&state, id, session)))
}

#[utoipa::path(
    put,
    path = "/forms/{id}/fields",
    params(("id" = String, Path, description = "Form id")),
    request_body = SetFieldReq,
    responses(
        (status = 200, description = "Field written", body = SetFieldRes),
        (status = 400, description = "Invalid path or value"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form already submitted")
    )
)]
/// Write one field of a draft form
async fn set_field(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SetFieldReq>,
) -> ApiResult<SetFieldRes> {
    let (outcome, form) = edit_draft(&state, &id, |form| form.set_field(&req.name, &req.value))?;
    Ok(Json(SetFieldRes {
        applied: outcome.is_applied(),
        form,
    }))
}

#[utoipa::path(
    put,
    path = "/forms/{id}/did",
    params(("id" = String, Path, description = "Form id")),
    request_body = SetDidReq,
    responses(
        (status = 200, description = "DID suffix set", body = FormRes),
        (status = 400, description = "Invalid suffix"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form already submitted")
    )
)]
/// Choose the DID suffix of a draft form
async fn set_did(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SetDidReq>,
) -> ApiResult<FormRes> {
    let ((), form) = edit_draft(&state, &id, |form| form.set_did_suffix(&req.suffix))?;
    Ok(Json(form))
}

#[utoipa::path(
    post,
    path = "/forms/{id}/submit",
    params(("id" = String, Path, description = "Form id")),
    request_body = SubmitReq,
    responses(
        (status = 200, description = "Profile encrypted and uploaded", body = SubmitRes),
        (status = 400, description = "Form incomplete or invalid"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form already submitted"),
        (status = 500, description = "Export, encryption or upload failed")
    )
)]
/// Validate, export, encrypt and upload a draft form
///
/// The signer of `authSig` can always decrypt the profile; each address in `allow` is granted
/// access as well.
async fn submit_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SubmitReq>,
) -> ApiResult<SubmitRes> {
    let id = parse_session_id(&id)?;
    let grants = req
        .allow
        .iter()
        .map(|a| WalletAddress::parse(a).map(|addr| AccessControlCondition::wallet_owner(&addr)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let draft = {
        let sessions = state.sessions();
        match sessions.get(&id).ok_or_else(not_found)? {
            FormSession::Draft(service) => service.clone(),
            _ => return Err((StatusCode::CONFLICT, "Form already submitted".to_string())),
        }
    };

    let submitted = run_blocking(move || draft.submit(&req.auth_sig, &grants)).await?;
    let submission = submitted.submission();
    let res = SubmitRes {
        did: submission.did.did(),
        registry_id: submission.did.registry_id(),
        resource_id: submission.resource_id.to_string(),
        content_id: submission.content_id.to_string(),
        uri: submission.uri.to_string(),
        export_path: submission.export_path.display().to_string(),
    };

    let form = submission.form.clone();
    replace_session(
        &state,
        id,
        |session| matches!(session, FormSession::Draft(s) if *s.form() == form),
        FormSession::Submitted(submitted),
    )?;
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/forms/{id}/register",
    params(("id" = String, Path, description = "Form id")),
    request_body = RegisterReq,
    responses(
        (status = 200, description = "DID registered", body = RegisterRes),
        (status = 400, description = "Invalid auth signature"),
        (status = 404, description = "Form not found"),
        (status = 409, description = "Form not submitted or already registered"),
        (status = 500, description = "Registry write failed")
    )
)]
/// Register the DID of a submitted form
async fn register_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<RegisterRes> {
    let id = parse_session_id(&id)?;
    let submitted = {
        let sessions = state.sessions();
        match sessions.get(&id).ok_or_else(not_found)? {
            FormSession::Submitted(service) => service.clone(),
            FormSession::Draft(_) => {
                return Err((StatusCode::CONFLICT, "Form has not been submitted".to_string()))
            }
            FormSession::Registered(_) => {
                return Err((StatusCode::CONFLICT, "Form already registered".to_string()))
            }
        }
    };

    let registered = run_blocking(move || submitted.register(&req.auth_sig)).await?;
    let res = RegisterRes::new(registered.submission().did.did(), registered.receipt());
    replace_session(
        &state,
        id,
        |session| matches!(session, FormSession::Submitted(_)),
        FormSession::Registered(registered),
    )?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/dids/{registry_id}",
    params(("registry_id" = String, Path, description = "Registry id or DID")),
    responses(
        (status = 200, description = "Registry entry", body = DidRes),
        (status = 400, description = "Malformed registry id"),
        (status = 404, description = "DID not registered")
    )
)]
/// Resolve a DID to its registry entry
async fn get_did(
    State(state): State<AppState>,
    AxumPath(registry_id): AxumPath<String>,
) -> ApiResult<DidRes> {
    let entry = resolve(&state.cfg, &state.collaborators, &registry_id).map_err(profile_error)?;
    Ok(Json(DidRes::from(entry)))
}
