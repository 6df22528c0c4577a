//! Credential and endpoint resolution
//!
//! Pure functions: given a stored installation, pick the token to present and
//! build the ordered list of candidate base URLs. No network I/O happens here.

use crate::{Result, SyncError};
use mirror_common::{Installation, TokenKind};

/// Current remote API version
pub const PRIMARY_API_VERSION: &str = "v2";

/// Legacy API version still served for older shops
pub const LEGACY_API_VERSION: &str = "v1";

/// Host suffix for shop-scoped subdomains (`{shop}.platformapi.io`)
const SHOP_API_HOST_SUFFIX: &str = "platformapi.io";

/// Global host accepting the shop as a query parameter
const GLOBAL_API_HOST: &str = "https://api.platformapi.io";

/// One candidate API endpoint
///
/// `query` carries parameters the candidate itself requires (the global host
/// needs `shop=`); the client appends pagination parameters on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub base_url: String,
    pub query: Vec<(String, String)>,
}

/// Output of credential/endpoint resolution
#[derive(Debug, Clone)]
pub struct ResolvedAccess {
    pub token: String,
    pub token_kind: TokenKind,
    /// Most- to least-preferred; the client tries them in order
    pub endpoints: Vec<EndpointCandidate>,
}

/// Select the best-available token and build candidate base URLs
///
/// Token selection honors `priority` (a configuration policy); the endpoint
/// list is fixed. Fails only on missing installation fields.
pub fn resolve(installation: &Installation, priority: &[TokenKind]) -> Result<ResolvedAccess> {
    let shop = installation
        .shop_domain
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SyncError::MissingShopDomain {
            installation_id: installation.remote_installation_id.clone(),
        })?;

    let (token_kind, token) = priority
        .iter()
        .find_map(|kind| installation.token(*kind).map(|t| (*kind, t.to_string())))
        .ok_or_else(|| SyncError::NoUsableCredential {
            installation_id: installation.remote_installation_id.clone(),
        })?;

    Ok(ResolvedAccess {
        token,
        token_kind,
        endpoints: candidate_endpoints(shop),
    })
}

/// The fixed, ordered candidate list for a shop
pub fn candidate_endpoints(shop: &str) -> Vec<EndpointCandidate> {
    vec![
        EndpointCandidate {
            base_url: format!(
                "https://{}.{}/api/{}",
                shop, SHOP_API_HOST_SUFFIX, PRIMARY_API_VERSION
            ),
            query: vec![],
        },
        EndpointCandidate {
            base_url: format!(
                "https://{}.{}/api/{}",
                shop, SHOP_API_HOST_SUFFIX, LEGACY_API_VERSION
            ),
            query: vec![],
        },
        EndpointCandidate {
            base_url: format!("{}/api/{}", GLOBAL_API_HOST, PRIMARY_API_VERSION),
            query: vec![("shop".to_string(), shop.to_string())],
        },
    ]
}
