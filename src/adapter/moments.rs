//! Moments (social feed) browsing, `wxautox` only.

use serde::Serialize;
use serde_json::Value;

use super::result::AdapterError;
use super::{Session, WeChatAdapter};
use crate::backend::{BackendError, BackendKind, CallArgs};

/// One Moments post in the shape the API returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentPost {
    pub author: String,
    pub content: String,
    pub time: String,
    pub images: Vec<Value>,
    pub likes: Vec<Value>,
    pub comments: Vec<Value>,
}

impl MomentPost {
    /// Build from a raw post, defaulting missing fields
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let list = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        Self {
            author: text("author"),
            content: text("content"),
            time: text("time"),
            images: list("images"),
            likes: list("likes"),
            comments: list("comments"),
        }
    }
}

impl WeChatAdapter {
    async fn moments_session(&self) -> Result<&Session, AdapterError> {
        self.ensure_initialized().await?;
        let session = self.require_session()?;
        if session.kind != BackendKind::Extended {
            return Err(AdapterError::Unsupported(format!(
                "Moments requires wxautox, current library is {}",
                session.kind
            )));
        }
        Ok(session)
    }

    /// Open the Moments window; fails when the window cannot be obtained
    async fn moments_window(&self, session: &Session) -> Result<Value, AdapterError> {
        let window = session
            .backend
            .call("Moments", CallArgs::new())
            .await
            .map_err(|e| {
                tracing::error!("Failed to open Moments: {}", e);
                AdapterError::Backend(e)
            })?;

        if window.is_null() || window == Value::Bool(false) {
            return Err(AdapterError::Backend(BackendError::call(
                "Moments",
                "could not get the Moments window",
            )));
        }
        Ok(window)
    }

    /// Open the Moments window and describe it
    pub async fn open_moments(&self) -> Result<Value, AdapterError> {
        let session = self.moments_session().await?;
        self.moments_window(session).await
    }

    /// Latest `n` posts, waiting up to `timeout` seconds for them to load
    pub async fn get_moments(&self, n: u32, timeout: u32) -> Result<Vec<MomentPost>, AdapterError> {
        let session = self.moments_session().await?;
        self.moments_window(session).await?;

        let args = CallArgs::new().kwarg("n", n).kwarg("timeout", timeout);
        let posts = session
            .backend
            .call("Moments.GetMoments", args)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get Moments posts: {}", e);
                AdapterError::Backend(e)
            })?;

        let posts: Vec<MomentPost> = posts
            .as_array()
            .map(|all| all.iter().map(MomentPost::from_value).collect())
            .unwrap_or_default();
        tracing::debug!("Fetched {} Moments posts", posts.len());
        Ok(posts)
    }

    pub async fn save_moment_images(
        &self,
        moment_index: i64,
        save_path: &str,
    ) -> Result<Value, AdapterError> {
        let session = self.moments_session().await?;
        self.moments_window(session).await?;

        let args = CallArgs::new().arg(moment_index).arg(save_path);
        session
            .backend
            .call("Moments.SaveImages", args)
            .await
            .map_err(|e| {
                tracing::error!("Failed to save Moments images: {}", e);
                AdapterError::Backend(e)
            })
    }

    pub async fn like_moment(&self, moment_index: i64) -> Result<Value, AdapterError> {
        let session = self.moments_session().await?;
        self.moments_window(session).await?;

        session
            .backend
            .call("Moments.Like", CallArgs::new().arg(moment_index))
            .await
            .map_err(|e| {
                tracing::error!("Failed to like Moments post: {}", e);
                AdapterError::Backend(e)
            })
    }
}
