//! Push messaging.
//!
//! [`PushMessenger`] is the seam the notification service sends through.
//! [`FcmClient`] implements it against the Firebase Cloud Messaging HTTP v1
//! API; tests substitute their own implementation.

mod client;
mod error;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

pub use client::FcmClient;
pub use error::{ApiErrorDetail, ApiErrorResponse, FcmError};

/// What the device displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNotification {
    pub title: String,
    pub body: String,
    /// Icon path relative to the site root.
    pub icon: String,
    /// Page opened when the notification is clicked.
    pub link: Option<String>,
}

/// One message addressed to one device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub notification: DisplayNotification,
    /// Click data delivered to the client alongside the notification.
    pub data: BTreeMap<String, String>,
}

/// Sends push messages to devices.
#[async_trait]
pub trait PushMessenger: Send + Sync {
    /// Send one message. Returns the provider's message id.
    async fn send(&self, message: &PushMessage) -> Result<String, FcmError>;
}
