//! Expected-size lookups against the registry.

use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::types::{ExpectedManifest, ModelInfoResponse, RegistryError, RepoFile};
use crate::config::format_size;
use crate::repo::{NamePattern, RepoId};

/// Source of the expected file list for a transfer.
///
/// Implementations never fail: when the lookup is impossible they return
/// [`ExpectedManifest::unknown`] so that progress estimation degrades to a
/// heuristic instead of aborting the transfer.
pub trait SizeProbe: Send + Sync {
    /// Query expected files and sizes, filtered by `pattern`.
    fn fetch_expected_manifest(&self, repo: &RepoId, pattern: &NamePattern) -> ExpectedManifest;
}

/// [`SizeProbe`] backed by the registry's model-info endpoint.
pub struct RegistrySizeProbe<C: HttpClient> {
    client: C,
    endpoint: String,
}

impl<C: HttpClient> RegistrySizeProbe<C> {
    /// Create a probe for the registry at `endpoint` (e.g. `https://huggingface.co`).
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Metadata URL for a repository, including per-file sizes.
    pub fn info_url(&self, repo: &RepoId) -> String {
        format!("{}/api/models/{}?blobs=true", self.endpoint, repo)
    }

    /// Fallible variant of [`SizeProbe::fetch_expected_manifest`].
    pub fn try_fetch(
        &self,
        repo: &RepoId,
        pattern: &NamePattern,
    ) -> Result<ExpectedManifest, RegistryError> {
        let body = self.client.get(&self.info_url(repo))?;
        let info: ModelInfoResponse =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Parse(e.to_string()))?;

        debug!(repo = %repo, files = info.siblings.len(), "Repository listing received");

        let files = info
            .siblings
            .into_iter()
            .filter(|sibling| pattern.matches(&sibling.rfilename))
            .filter_map(|sibling| match sibling.size {
                Some(size) if size > 0 => Some(RepoFile {
                    name: sibling.rfilename,
                    size_bytes: size,
                }),
                // Entries without a size contribute nothing to the estimate.
                _ => None,
            })
            .collect();

        Ok(ExpectedManifest::new(files))
    }
}

impl<C: HttpClient> SizeProbe for RegistrySizeProbe<C> {
    fn fetch_expected_manifest(&self, repo: &RepoId, pattern: &NamePattern) -> ExpectedManifest {
        match self.try_fetch(repo, pattern) {
            Ok(manifest) => {
                info!(
                    repo = %repo,
                    files = manifest.expected_file_count(),
                    total = %format_size(manifest.total_expected_bytes()),
                    "Expected download size"
                );
                manifest
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "Could not determine download size, progress will be estimated");
                ExpectedManifest::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::http::tests::MockHttpClient;

    const LISTING: &str = r#"{
        "id": "org/model",
        "siblings": [
            {"rfilename": ".gitattributes", "size": 1519},
            {"rfilename": "README.md", "size": 4000},
            {"rfilename": "model.Q4_K_M.gguf", "size": 4000000},
            {"rfilename": "model.Q8_0.gguf", "size": 7000000},
            {"rfilename": "model.Q4_K_M-notes.txt"}
        ]
    }"#;

    fn repo() -> RepoId {
        RepoId::parse("org/model").unwrap()
    }

    #[test]
    fn test_info_url() {
        let probe = RegistrySizeProbe::new(MockHttpClient::ok("{}"), "https://hub.example/");
        assert_eq!(
            probe.info_url(&repo()),
            "https://hub.example/api/models/org/model?blobs=true"
        );
    }

    #[test]
    fn test_fetch_all_files() {
        let probe = RegistrySizeProbe::new(MockHttpClient::ok(LISTING), "https://hub.example");
        let manifest = probe.fetch_expected_manifest(&repo(), &NamePattern::new(""));

        assert_eq!(manifest.expected_file_count(), 4);
        assert_eq!(manifest.total_expected_bytes(), 1519 + 4000 + 4_000_000 + 7_000_000);
    }

    #[test]
    fn test_fetch_filtered_skips_unsized() {
        let probe = RegistrySizeProbe::new(MockHttpClient::ok(LISTING), "https://hub.example");
        let manifest = probe.fetch_expected_manifest(&repo(), &NamePattern::new("Q4_K_M"));

        assert_eq!(manifest.expected_file_count(), 1);
        assert_eq!(manifest.files()[0].name, "model.Q4_K_M.gguf");
        assert_eq!(manifest.total_expected_bytes(), 4_000_000);
    }

    #[test]
    fn test_registry_failure_degrades_to_unknown() {
        let probe = RegistrySizeProbe::new(
            MockHttpClient::err(RegistryError::Unauthorized("gated".to_string())),
            "https://hub.example",
        );

        let manifest = probe.fetch_expected_manifest(&repo(), &NamePattern::new(""));
        assert!(!manifest.is_known());

        let err = probe.try_fetch(&repo(), &NamePattern::new("")).unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized(_)));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let probe = RegistrySizeProbe::new(MockHttpClient::ok("not json"), "https://hub.example");
        let err = probe.try_fetch(&repo(), &NamePattern::new("")).unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
        assert!(!probe
            .fetch_expected_manifest(&repo(), &NamePattern::new(""))
            .is_known());
    }
}
