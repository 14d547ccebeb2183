use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::core::types::ServiceCategory;
use crate::ingest::{ingest_sheet, IngestError, IngestOptions};
use crate::parsing::rows::RowError;
use crate::parsing::ValidationError;
use crate::query::{CatalogQuery, SearchParams, MAX_PAGE_SIZE};
use crate::store::versions::VersionManager;
use crate::store::StoreError;

/// Limits preventing resource exhaustion from hostile uploads.
pub const MAX_MULTIPART_FIELDS: usize = 10;
pub const MAX_FILE_FIELD_SIZE: usize = 16 * 1024 * 1024; // 16MB
pub const MAX_TEXT_FIELD_SIZE: usize = 64 * 1024; // 64KB

/// Shared application state.
pub struct AppState {
    pub manager: VersionManager,
}

/// Uniform error envelope. Internal details are logged server-side, never
/// echoed back to the client.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RowError>,
}

fn error_response(
    status: StatusCode,
    error_type: &str,
    message: impl Into<String>,
    errors: Vec<RowError>,
) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            error_type: error_type.to_string(),
            errors,
        }),
    )
        .into_response()
}

fn store_error_response(err: &StoreError) -> Response {
    match err {
        StoreError::NotFound { what } => {
            error_response(StatusCode::NOT_FOUND, "not_found", what.clone(), vec![])
        }
        StoreError::VersionConflict { category } => error_response(
            StatusCode::CONFLICT,
            "conflict",
            format!("Rate list '{category}' was modified concurrently; retry the upload"),
            vec![],
        ),
        StoreError::Conflict { what } => {
            error_response(StatusCode::CONFLICT, "conflict", what.clone(), vec![])
        }
        StoreError::Io(_) | StoreError::Serde(_) => {
            tracing::error!("storage error: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Storage backend unavailable",
                vec![],
            )
        }
    }
}

/// Run the web server.
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server
/// fails to start.
pub fn run(args: ServeArgs, data_dir: PathBuf) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, data_dir).await })
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the stores cannot be opened.
#[allow(clippy::missing_panics_doc)] // Panics only on invalid governor config (constants are valid)
pub fn create_router(data_dir: &std::path::Path) -> anyhow::Result<Router> {
    let manager = VersionManager::open(data_dir)?;
    let state = Arc::new(AppState { manager });

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(50)
        .finish()
        .unwrap();

    let app = Router::new()
        .route("/api/rates/upload", post(upload_handler))
        .route("/api/rates/{category}/versions", get(versions_handler))
        .route(
            "/api/rates/{category}/versions/{version}/activate",
            put(activate_handler),
        )
        .route("/api/rates/{category}", delete(delete_handler))
        .route("/api/catalog/groups", get(groups_handler))
        .route("/api/catalog/parameters", get(parameters_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(GovernorLayer {
                    config: Arc::new(governor_conf),
                })
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(ConcurrencyLimitLayer::new(100))
                // Largest file plus multipart overhead.
                .layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        );

    Ok(app)
}

async fn run_server(args: ServeArgs, data_dir: PathBuf) -> anyhow::Result<()> {
    let app = create_router(&data_dir)?;

    let addr = format!("{}:{}", args.address, args.port);
    tracing::info!("Starting ratebook web server at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Upload form fields extracted from the multipart body.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    filename: Option<String>,
    service: Option<String>,
    category: Option<String>,
    notes: Option<String>,
    created_by: Option<String>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, Response> {
    let mut form = UploadForm::default();
    let mut fields_received = 0usize;

    loop {
        if fields_received >= MAX_MULTIPART_FIELDS {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "field_limit_exceeded",
                "Too many form fields",
                vec![],
            ));
        }
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("multipart parse error: {e}");
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "malformed_upload",
                    "Failed to parse the multipart upload",
                    vec![],
                ));
            }
        };
        fields_received += 1;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(std::string::ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => {
                        if bytes.len() > MAX_FILE_FIELD_SIZE {
                            return Err(error_response(
                                StatusCode::PAYLOAD_TOO_LARGE,
                                "file_too_large",
                                "File size exceeds limit",
                                vec![],
                            ));
                        }
                        form.file = Some(bytes.to_vec());
                    }
                    Err(e) => {
                        tracing::debug!("upload body error: {e}");
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            "malformed_upload",
                            "Failed to read the uploaded file",
                            vec![],
                        ));
                    }
                }
            }
            "service" | "category" | "notes" | "created_by" => match field.text().await {
                Ok(text) if text.len() <= MAX_TEXT_FIELD_SIZE => {
                    let value = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                    match name.as_str() {
                        "service" => form.service = value,
                        "category" => form.category = value,
                        "notes" => form.notes = value,
                        _ => form.created_by = value,
                    }
                }
                Ok(_) => {
                    return Err(error_response(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "text_too_large",
                        "Text field size exceeds limit",
                        vec![],
                    ));
                }
                Err(e) => {
                    tracing::debug!("text field error: {e}");
                }
            },
            _ => {} // Ignore unknown fields
        }
    }

    Ok(form)
}

/// Resolve the target service: explicit field first, then the category
/// field, then the filename.
fn resolve_service(form: &UploadForm) -> Result<ServiceCategory, Response> {
    form.service
        .as_deref()
        .and_then(ServiceCategory::parse)
        .or_else(|| form.category.as_deref().and_then(ServiceCategory::parse))
        .or_else(|| form.filename.as_deref().and_then(ServiceCategory::from_filename))
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "unknown_service",
                format!(
                    "Could not determine the service; allowed services: {}",
                    ServiceCategory::allowed_list()
                ),
                vec![],
            )
        })
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let Some(bytes) = form.file.as_deref() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_file",
            "No file received; upload a spreadsheet in the 'file' field",
            vec![],
        );
    };
    let service = match resolve_service(&form) {
        Ok(service) => service,
        Err(response) => return response,
    };

    let mut options = IngestOptions::new(service);
    options.category = form.category.clone();
    options.notes = form.notes.clone();
    options.created_by = form.created_by.clone();

    match ingest_sheet(&state.manager, bytes, form.filename.as_deref(), &options) {
        Ok(outcome) => Json(serde_json::json!({
            "category": outcome.category,
            "version": outcome.version,
            "updated": outcome.summary.updated,
            "inserted": outcome.summary.inserted,
            "errors": [],
        }))
        .into_response(),
        Err(IngestError::Validation(err)) => {
            let message = err.to_string();
            error_response(StatusCode::BAD_REQUEST, "validation", message, err.row_errors())
        }
        Err(IngestError::Parse(err)) => {
            error_response(StatusCode::BAD_REQUEST, "unreadable_file", err.to_string(), vec![])
        }
        Err(IngestError::Store(err)) => store_error_response(&err),
    }
}

async fn versions_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Response {
    match state.manager.list_versions(&category) {
        Ok(versions) => {
            let current = versions
                .iter()
                .find(|v| v.is_active)
                .map(|v| v.version_number);
            Json(serde_json::json!({
                "category": category,
                "current_version": current,
                "versions": versions,
            }))
            .into_response()
        }
        Err(err) => store_error_response(&err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActivateBody {
    activated_by: Option<String>,
    notes: Option<String>,
}

async fn activate_handler(
    State(state): State<Arc<AppState>>,
    Path((category, version)): Path<(String, u32)>,
    body: Option<Json<ActivateBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    match state
        .manager
        .activate_version(&category, version, body.activated_by, body.notes)
    {
        Ok(()) => Json(serde_json::json!({
            "category": category,
            "current_version": version,
        }))
        .into_response(),
        Err(err) => store_error_response(&err),
    }
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Response {
    match state.manager.delete_rate_list(&category) {
        Ok(()) => Json(serde_json::json!({ "deleted": category })).into_response(),
        Err(err) => store_error_response(&err),
    }
}

fn parse_service_param(service: Option<&str>) -> Result<ServiceCategory, Response> {
    service
        .and_then(ServiceCategory::parse)
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "unknown_service",
                format!(
                    "Query parameter 'service' must be one of: {}",
                    ServiceCategory::allowed_list()
                ),
                vec![],
            )
        })
}

#[derive(Debug, Deserialize)]
struct GroupsParams {
    service: Option<String>,
}

async fn groups_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupsParams>,
) -> Response {
    let service = match parse_service_param(params.service.as_deref()) {
        Ok(service) => service,
        Err(response) => return response,
    };
    match CatalogQuery::new(&state.manager).groups(service) {
        Ok(groups) => Json(serde_json::json!({ "groups": groups })).into_response(),
        Err(err) => store_error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
struct ParametersParams {
    service: Option<String>,
    q: Option<String>,
    group: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

async fn parameters_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ParametersParams>,
) -> Response {
    let service = match parse_service_param(params.service.as_deref()) {
        Ok(service) => service,
        Err(response) => return response,
    };
    let search = SearchParams {
        service,
        query: params.q,
        group: params.group,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(50).min(MAX_PAGE_SIZE),
    };
    match CatalogQuery::new(&state.manager).search(&search) {
        Ok(page) => Json(serde_json::json!({
            "items": page.items,
            "total": page.total,
            "page": page.page,
            "pages": page.pages,
        }))
        .into_response(),
        Err(err) => store_error_response(&err),
    }
}
