//! Model provisioner
//!
//! Ensures a named model artifact exists in the service's store before a
//! case exercises it. Repeated calls for the same name converge to "present":
//! an extra pull is harmless, but a second absent-to-present transition is not
//! observable.

use tracing::{debug, info};

use sonda_api::ModelService;

use crate::error::{Error, Result};

/// How [`ensure_model`] satisfied the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The model was already in the store; no work done
    AlreadyPresent,
    /// The model was pulled during this call
    Pulled,
}

/// Ensure `name` is present in the service's store, pulling it if absent
///
/// Transport failures and unknown model names surface as
/// [`Error::Provision`]; retry policy, if any, belongs to the transport
/// layer, not here.
///
/// # Errors
///
/// Returns [`Error::Provision`] when the listing or the pull fails.
pub async fn ensure_model(service: &dyn ModelService, name: &str) -> Result<Provisioned> {
    let provision_err = |source| Error::Provision {
        model: name.to_string(),
        source,
    };

    let list = service.list_models().await.map_err(provision_err)?;
    if list.find(name).is_some() {
        debug!(model = name, "already present, skipping pull");
        return Ok(Provisioned::AlreadyPresent);
    }

    info!(model = name, "not present, pulling");
    service.pull_model(name).await.map_err(provision_err)?;
    Ok(Provisioned::Pulled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonda_api::MockModelService;

    #[tokio::test]
    async fn test_absent_model_is_pulled() {
        let mock = MockModelService::new();
        let outcome = ensure_model(&mock, "llama3.2").await.expect("provisioned");
        assert_eq!(outcome, Provisioned::Pulled);
        assert_eq!(mock.pull_count("llama3.2"), 1);
    }

    #[tokio::test]
    async fn test_present_model_is_not_pulled() {
        let mock = MockModelService::new().with_model("gemma3", 3 << 30);
        let outcome = ensure_model(&mock, "gemma3").await.expect("provisioned");
        assert_eq!(outcome, Provisioned::AlreadyPresent);
        assert_eq!(mock.pull_count("gemma3"), 0);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_idempotent() {
        let mock = MockModelService::new();
        let first = ensure_model(&mock, "qwen2.5:0.5b").await.expect("first call");
        let second = ensure_model(&mock, "qwen2.5:0.5b").await.expect("second call");

        assert_eq!(first, Provisioned::Pulled);
        assert_eq!(second, Provisioned::AlreadyPresent);
        // No duplicate work observable across the two calls
        assert_eq!(mock.pull_count("qwen2.5:0.5b"), 1);
    }

    #[tokio::test]
    async fn test_latest_tag_counts_as_present() {
        let mock = MockModelService::new().with_model("all-minilm:latest", 46_000_000);
        let outcome = ensure_model(&mock, "all-minilm").await.expect("provisioned");
        assert_eq!(outcome, Provisioned::AlreadyPresent);
        assert_eq!(mock.pull_count("all-minilm"), 0);
    }

    #[tokio::test]
    async fn test_pull_failure_surfaces_as_provision_error() {
        let mock = MockModelService::new().with_pull_error("manifest unknown");
        let err = ensure_model(&mock, "nosuch-model").await.expect_err("pull fails");
        assert!(matches!(err, Error::Provision { ref model, .. } if model == "nosuch-model"));
        assert!(err.to_string().contains("manifest unknown"));
    }

    #[tokio::test]
    async fn test_list_failure_surfaces_as_provision_error() {
        let mock = MockModelService::new().with_list_error("store locked");
        let err = ensure_model(&mock, "gemma3").await.expect_err("list fails");
        assert!(matches!(err, Error::Provision { .. }));
    }
}
