use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::responder;

#[derive(Debug, Deserialize)]
pub struct TextParams {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub response: String,
}

pub async fn process_text(
    AppQuery(params): AppQuery<TextParams>,
) -> Result<Json<JSend<TextResponse>>, ApiError> {
    let text = params
        .text
        .ok_or_else(|| ApiError::bad_request("text query parameter is required"))?;

    let response = responder::respond(&text, chrono::Local::now().time());
    Ok(JSend::success(TextResponse { response }))
}
