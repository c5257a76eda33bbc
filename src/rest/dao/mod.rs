pub mod request;
pub mod response;
pub mod session;

pub use request::{
    AuthenticationRequest, AuthenticationRequestBuilder, CertificateRequest,
    CertificateRequestBuilder, HashRequest, RelyingParty, RelyingPartyRequest,
    SessionStatusRequest, SignRequest, SignRequestBuilder,
};
pub use response::{AuthenticationResponse, CertificateResponse, SessionResponse, SignResponse};
pub use session::{SessionSignature, SessionStatus};
