pub mod audit;
pub mod device_fingerprint;
pub mod login_attempt;
pub mod login_request;
pub mod organization;
pub mod refresh_token;
pub mod role;
pub mod user;
