use axum::extract::State;
use axum::response::Redirect;
use axum::Form;
use serde::Deserialize;
use std::sync::Arc;

use super::AppError;
use crate::state::AppState;
use lemonade_manager_core::{FieldUpdate, LoadParams};

/// Option fields arrive as raw strings so that "posted blank" and "not
/// posted" stay distinguishable; parsing happens in [`FieldUpdate`] and
/// [`LoadParams`].
#[derive(Debug, Deserialize)]
pub struct LoadForm {
    pub model_name: String,

    #[serde(default)]
    pub ctx_size: Option<String>,

    #[serde(default)]
    pub llamacpp_args: Option<String>,

    #[serde(default)]
    pub llamacpp_backend: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoadDefaultsForm {
    pub model_name: String,

    #[serde(default)]
    pub llamacpp_backend: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelForm {
    pub model_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DisableForm {
    pub model_name: String,

    /// "1" to hide the model, "0" to show it again
    pub disabled: String,
}

/// Action: "Load Custom". Sends whatever is in the inputs, verbatim.
pub async fn load_custom(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoadForm>,
) -> Result<Redirect, AppError> {
    let ctx_size = form
        .ctx_size
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok());
    let params = LoadParams::custom(
        ctx_size,
        form.llamacpp_args.as_deref(),
        form.llamacpp_backend.as_deref(),
    );

    state.client.load(&form.model_name, &params).await?;
    Ok(Redirect::to("/"))
}

/// Action: "Load (Default)". ctx/args come from the stored options; a
/// backend the user typed takes priority over the stored default.
pub async fn load_defaults(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoadDefaultsForm>,
) -> Result<Redirect, AppError> {
    let stored = state.options.get(&form.model_name);
    let params = LoadParams::with_defaults(&stored, form.llamacpp_backend.as_deref());

    state.client.load(&form.model_name, &params).await?;
    Ok(Redirect::to("/"))
}

/// Action: "Save". Updates the server-native options document.
pub async fn save_defaults(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoadForm>,
) -> Result<Redirect, AppError> {
    state.options.set(
        &form.model_name,
        FieldUpdate::<u64>::from_form(form.ctx_size.as_deref()),
        FieldUpdate::<String>::from_form(form.llamacpp_args.as_deref()),
        FieldUpdate::<String>::from_form(form.llamacpp_backend.as_deref()),
    )?;
    Ok(Redirect::to("/"))
}

pub async fn unload_all(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    state.client.unload(None).await?;
    Ok(Redirect::to("/"))
}

pub async fn unload_one(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ModelForm>,
) -> Result<Redirect, AppError> {
    state.client.unload(Some(&form.model_name)).await?;
    Ok(Redirect::to("/"))
}

pub async fn delete_model(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ModelForm>,
) -> Result<Redirect, AppError> {
    state.client.delete(&form.model_name).await?;
    Ok(Redirect::to("/"))
}

pub async fn disable(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DisableForm>,
) -> Result<Redirect, AppError> {
    state
        .prefs
        .set_disabled(&form.model_name, form.disabled == "1")?;
    Ok(Redirect::to("/"))
}
