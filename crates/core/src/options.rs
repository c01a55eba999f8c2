use serde::{Deserialize, Serialize};

/// Per-model options, mirrored from the server's recipe_options.json.
///
/// A field is serialized only when set, so the document on disk stays
/// compatible with the file lemonade-server maintains itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llamacpp_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llamacpp_backend: Option<String>,
}

impl ModelOptions {
    /// Entries with no fields left are removed from the document.
    pub fn is_empty(&self) -> bool {
        self.ctx_size.is_none() && self.llamacpp_args.is_none() && self.llamacpp_backend.is_none()
    }
}

/// One field of an options update.
///
/// Distinguishes "not provided" (keep the stored value) from "provided
/// blank" (clear the stored value). HTML forms post every input, so a
/// blank string is an explicit request to drop the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => *slot = None,
            FieldUpdate::Set(value) => *slot = Some(value),
        }
    }
}

impl FieldUpdate<String> {
    /// Interpret an optional form value: absent keeps, blank clears.
    pub fn from_form(value: Option<&str>) -> Self {
        match value {
            None => FieldUpdate::Keep,
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    FieldUpdate::Clear
                } else {
                    FieldUpdate::Set(trimmed.to_string())
                }
            }
        }
    }
}

impl FieldUpdate<u64> {
    /// Numeric inputs post an empty string when left blank; anything
    /// that is not a number is ignored.
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => FieldUpdate::Keep,
            Some("") => FieldUpdate::Clear,
            Some(trimmed) => match trimmed.parse() {
                Ok(number) => FieldUpdate::Set(number),
                Err(_) => FieldUpdate::Keep,
            },
        }
    }
}

/// The resolved parameters actually sent with a load request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llamacpp_args: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llamacpp_backend: Option<String>,
}

impl LoadParams {
    /// Caller-supplied values taken verbatim ("Load Custom"). Blank
    /// strings count as absent.
    pub fn custom(ctx_size: Option<u64>, args: Option<&str>, backend: Option<&str>) -> Self {
        Self {
            ctx_size,
            llamacpp_args: non_empty(args),
            llamacpp_backend: non_empty(backend),
        }
    }

    /// Merge stored defaults with the one request-time override the UI
    /// allows ("Load (Default)").
    ///
    /// ctx_size and llamacpp_args always come from the stored options; a
    /// non-blank user-typed backend beats the stored backend. Only the
    /// backend works this way - do not extend it to the other fields.
    pub fn with_defaults(stored: &ModelOptions, backend_override: Option<&str>) -> Self {
        Self {
            ctx_size: stored.ctx_size,
            llamacpp_args: stored.llamacpp_args.clone(),
            llamacpp_backend: non_empty(backend_override)
                .or_else(|| stored.llamacpp_backend.clone()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> ModelOptions {
        ModelOptions {
            ctx_size: Some(4096),
            llamacpp_args: Some("-np 4".to_string()),
            llamacpp_backend: Some("vulkan".to_string()),
        }
    }

    #[test]
    fn defaults_keep_stored_ctx_and_args() {
        let params = LoadParams::with_defaults(&stored(), Some("cpu"));
        assert_eq!(params.ctx_size, Some(4096));
        assert_eq!(params.llamacpp_args.as_deref(), Some("-np 4"));
        assert_eq!(params.llamacpp_backend.as_deref(), Some("cpu"));
    }

    #[test]
    fn defaults_fall_back_to_stored_backend() {
        let params = LoadParams::with_defaults(&stored(), None);
        assert_eq!(params.llamacpp_backend.as_deref(), Some("vulkan"));

        let params = LoadParams::with_defaults(&stored(), Some("   "));
        assert_eq!(params.llamacpp_backend.as_deref(), Some("vulkan"));
    }

    #[test]
    fn defaults_with_nothing_stored() {
        let params = LoadParams::with_defaults(&ModelOptions::default(), None);
        assert_eq!(params, LoadParams::default());
    }

    #[test]
    fn custom_drops_blank_fields() {
        let params = LoadParams::custom(Some(2048), Some("  "), Some(" cpu "));
        assert_eq!(params.ctx_size, Some(2048));
        assert_eq!(params.llamacpp_args, None);
        assert_eq!(params.llamacpp_backend.as_deref(), Some("cpu"));
    }

    #[test]
    fn load_params_serialize_only_set_fields() {
        let json = serde_json::to_value(LoadParams::custom(None, None, Some("cpu"))).unwrap();
        assert_eq!(json, serde_json::json!({"llamacpp_backend": "cpu"}));
    }

    #[test]
    fn field_update_from_form_strings() {
        assert_eq!(FieldUpdate::<String>::from_form(None), FieldUpdate::Keep);
        assert_eq!(FieldUpdate::<String>::from_form(Some("  ")), FieldUpdate::Clear);
        assert_eq!(
            FieldUpdate::<String>::from_form(Some(" -np 4 ")),
            FieldUpdate::Set("-np 4".to_string())
        );
    }

    #[test]
    fn field_update_from_form_numbers() {
        assert_eq!(FieldUpdate::<u64>::from_form(None), FieldUpdate::Keep);
        assert_eq!(FieldUpdate::<u64>::from_form(Some("")), FieldUpdate::Clear);
        assert_eq!(FieldUpdate::<u64>::from_form(Some("4096")), FieldUpdate::Set(4096));
        assert_eq!(FieldUpdate::<u64>::from_form(Some("abc")), FieldUpdate::Keep);
    }
}
