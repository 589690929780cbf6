//! HTTP middleware for edge protection.
//!
//! - **Backend key authentication**: constant-time shared-key gate with
//!   rotation support, production-only rejection
//! - **Allow-list enforcement**: rejects requests from addresses outside
//!   the active allow-list
//! - **Client address extraction**: `X-Forwarded-For` / `X-Real-IP`
//!   parsing shared by both layers
//!
//! # Architecture
//!
//! ```text
//! Request → Trace → Backend Key Auth → Allow-list Enforce → Handler
//!                        ↓                    ↓
//!                   401 (production)     403 Forbidden
//! ```

pub mod allowlist;
pub mod backend_auth;
pub mod ip;

pub use allowlist::AllowlistEnforce;
pub use backend_auth::{
    BACKEND_AUTH_RESULT_HEADER, BACKEND_KEY_HEADER, BACKEND_KEY_OLD_HEADER, BackendKeyAuth,
};
pub use ip::{UNKNOWN_IP, extract_client_ip};
