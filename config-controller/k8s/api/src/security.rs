//! `security.istio.io` resources.

pub mod authorization_policy;
pub mod peer_authentication;
pub mod request_authentication;

pub use self::{
    authorization_policy::{AuthorizationPolicy, AuthorizationPolicySpec},
    peer_authentication::{MtlsMode, PeerAuthentication, PeerAuthenticationSpec},
    request_authentication::{RequestAuthentication, RequestAuthenticationSpec},
};

pub const GROUP: &str = "security.istio.io";
