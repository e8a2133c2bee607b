//! Large-PDF processing
//!
//! Files too big to ship inline are uploaded to the staging area first and
//! referenced by storage path. Extraction happens natively; the uploaded
//! object is deleted once its text has been captured.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{auth::AuthContext, errors::Result, metrics, pdf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPdfRequest {
    pub storage_path: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPdfResponse {
    pub extracted_text: String,
    pub page_count: usize,
    pub file_name: String,
    pub character_count: usize,
}

pub async fn process_large_pdf(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ProcessPdfRequest>,
) -> Result<Json<ProcessPdfResponse>> {
    let bytes = state.uploads.read(&request.storage_path)?;
    let extracted = pdf::extract_text(&bytes)?;

    metrics::record_pdf_extraction(extracted.page_count);

    // The staging object has served its purpose
    state.uploads.delete(&request.storage_path)?;

    tracing::info!(
        file = %request.file_name,
        pages = extracted.page_count,
        chars = extracted.text.len(),
        mode = auth.persistence.mode(),
        "Large PDF processed and staging object removed"
    );

    Ok(Json(ProcessPdfResponse {
        character_count: extracted.text.len(),
        extracted_text: extracted.text,
        page_count: extracted.page_count,
        file_name: request.file_name,
    }))
}
