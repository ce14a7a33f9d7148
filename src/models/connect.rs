use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters of the relay upgrade endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ConnectParams {
    /// Document to attach to. Taken from the path instead when the path form is used.
    pub document_id: Option<String>,
    pub user_id: Option<String>,
}
