use std::path::Path;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use menuscan_core::{CellEdit, Extractor, Product, ProductSheet};
use menuscan_export::{writer_for, ExportFormat};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;

/// Multipart field carrying the scan.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub text: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsBody {
    pub products: Vec<Product>,
}

/// Products to export, plus corrections made in the grid since extraction.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub products: ProductSheet,
    #[serde(default)]
    pub edits: Vec<CellEdit>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

struct UploadedFile {
    ext: String,
    data: axum::body::Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let ext = field
            .file_name()
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string();
        let data = field.bytes().await?;
        if data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile { ext, data }));
    }
    Ok(None)
}

/// `POST /api/upload` — OCR an uploaded scan and extract its products.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let file = match read_upload(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return (StatusCode::BAD_REQUEST, "No file uploaded.").into_response(),
        Err(e) => return (e.status(), e.body_text()).into_response(),
    };
    tracing::info!(bytes = file.data.len(), ext = %file.ext, "upload received");

    match state.pipeline.process_bytes(&file.data, &file.ext).await {
        Ok(scan) => Json(UploadResponse {
            message: "File processed successfully".to_string(),
            text: scan.ocr_text,
            products: scan.products,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "upload processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing file").into_response()
        }
    }
}

/// `POST /api/extract` — run extraction on text the client already has.
pub async fn extract(Json(body): Json<ExtractRequest>) -> Json<ProductsBody> {
    Json(ProductsBody { products: Extractor::extract(&body.text) })
}

/// `POST /api/export` — turn (possibly hand-edited) products into a sheet download.
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    Json(body): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::BadRequest)?,
        None => state.export_format,
    };
    let mut sheet = body.products;
    sheet.apply(&body.edits)?;

    let writer = writer_for(format)?;
    let bytes = writer.write(sheet.products())?;
    tracing::info!(%format, rows = sheet.len(), edits = body.edits.len(), "export written");

    let disposition = format!("attachment; filename=\"{}\"", writer.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, writer.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn health() -> &'static str {
    "OK"
}
