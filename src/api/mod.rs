//! Control-plane access.
//!
//! The session only talks to the server through [`ControlPlane`]; the HTTP
//! implementation lives in [`http`], response validation in [`decode`].

mod decode;
mod http;

pub use decode::{decode_control_reply, decode_status};
pub use http::HttpControlPlane;

use crate::error::ClientError;
use crate::model::{ControlReply, JobSnapshot};
use async_trait::async_trait;

/// The three endpoints the client drives.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// `POST /start_voting` with form-encoded parameters.
    async fn start(&self, form: Vec<(String, String)>) -> Result<ControlReply, ClientError>;

    /// `POST /stop_voting`.
    async fn stop(&self) -> Result<ControlReply, ClientError>;

    /// `GET /check_status`.
    ///
    /// Returns `NoActiveSession` when the server answers `status: "error"`.
    async fn status(&self) -> Result<JobSnapshot, ClientError>;
}
