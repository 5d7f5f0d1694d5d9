/// Application-level constants
pub const APP_NAME: &str = "docstage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter override, read before `RUST_LOG`.
pub const LOG_ENV: &str = "DOCSTAGE_LOG";

/// Path to a JSON `PipelineConfig`.
pub const CONFIG_ENV: &str = "DOCSTAGE_CONFIG";

/// Filter used when neither `DOCSTAGE_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> String {
    if cfg!(debug_assertions) {
        format!("{}=debug,warn", APP_NAME)
    } else {
        format!("{}=info,warn", APP_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_docstage() {
        assert_eq!(APP_NAME, "docstage");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_filter_scopes_crate() {
        assert!(default_log_filter().starts_with("docstage="));
    }
}
