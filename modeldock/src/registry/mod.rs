//! Registry metadata access.
//!
//! The registry is consulted once per transfer for the expected file list and
//! sizes. The HTTP layer sits behind the [`HttpClient`] trait so probes can be
//! exercised without network access.
//!
//! # Example
//!
//! ```ignore
//! use modeldock::registry::{RegistrySizeProbe, ReqwestClient, SizeProbe};
//! use modeldock::repo::{NamePattern, RepoId};
//!
//! let probe = RegistrySizeProbe::new(ReqwestClient::new(None)?, "https://huggingface.co");
//! let repo = RepoId::parse("TheBloke/Llama-2-7B-GGUF")?;
//! let manifest = probe.fetch_expected_manifest(&repo, &NamePattern::new("Q4_K_M"));
//! println!("{} bytes expected", manifest.total_expected_bytes());
//! ```

mod http;
mod probe;
mod types;

pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use probe::{RegistrySizeProbe, SizeProbe};
pub use types::{ExpectedManifest, RegistryError, RepoFile};

#[cfg(test)]
pub use http::tests::MockHttpClient;
