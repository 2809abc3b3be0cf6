//! Listen message fetching with recovery.
//!
//! A listened chat window can lose its handle (closed by the user, WeChat
//! redraw, DPI change). When a fetch fails with a transient UI signature the
//! affected targets are removed, their chat windows reopened and the targets
//! registered again before the fetch is retried once.

use serde_json::Value;

use super::registry::ListenOptions;
use super::result::{AdapterError, Neutral, OperationResult};
use super::signatures;
use super::{json_type, Session, WeChatAdapter};
use crate::backend::{BackendError, CallArgs};

/// Coerce a successful `GetListenMessage` result into the caller's shape:
/// a list for one target, a mapping keyed by target otherwise.
pub fn normalize_listen_result(value: Value, target: Option<&str>) -> Value {
    match (target, value) {
        (Some(_), list @ Value::Array(_)) => list,
        (Some(target), Value::Object(mut by_target)) => {
            tracing::warn!("Got a mapping for a single target, extracting {}", target);
            match by_target.remove(target) {
                Some(list @ Value::Array(_)) => list,
                _ => Value::Array(Vec::new()),
            }
        }
        (None, map @ Value::Object(_)) => map,
        (target, Value::Null) => Neutral::for_target(target).value(),
        (target, other) => {
            tracing::warn!("Unexpected listen result type: {}", json_type(&other));
            Neutral::for_target(target).value()
        }
    }
}

impl WeChatAdapter {
    async fn raw_fetch(&self, session: &Session, target: Option<&str>) -> Result<Value, BackendError> {
        let args = match target {
            Some(target) => CallArgs::new().arg(target),
            None => CallArgs::new(),
        };
        session.backend.call("GetListenMessage", args).await
    }

    pub(super) async fn handle_fetch_listen_messages(
        &self,
        session: &Session,
        args: CallArgs,
    ) -> OperationResult {
        // Only the target filter is forwarded; the library accepts nothing else
        let target = args.first_str_or("who");
        let target = target.as_deref();
        let neutral = Neutral::for_target(target);

        self.apply_save_path(session).await;
        tracing::debug!("Fetching listen messages for {}", target.unwrap_or("all targets"));

        let error = match self.raw_fetch(session, target).await {
            Ok(value) => return OperationResult::Success(normalize_listen_result(value, target)),
            Err(e) => e.to_string(),
        };
        tracing::error!("Fetching listen messages failed: {}", error);

        if !signatures::is_transient_ui(&error) {
            return OperationResult::empty(neutral, error);
        }

        tracing::warn!(
            "Chat window problem detected, re-registering {}",
            target.unwrap_or("all listen targets")
        );
        match self.recover_and_refetch(session, target).await {
            Ok(value) => {
                tracing::info!("Listen messages fetched after recovery");
                OperationResult::Success(normalize_listen_result(value, target))
            }
            Err(e) => {
                tracing::error!("Fetching listen messages still failed after recovery: {}", e);
                OperationResult::empty(neutral, e.to_string())
            }
        }
    }

    async fn recover_and_refetch(
        &self,
        session: &Session,
        target: Option<&str>,
    ) -> Result<Value, AdapterError> {
        match target {
            Some(target) => self.recover_target(session, target).await?,
            None => {
                let snapshot = self.listen.snapshot();
                if snapshot.is_empty() {
                    return Err(AdapterError::InvalidArgument(
                        "no listen targets to recover".to_string(),
                    ));
                }
                for registration in snapshot {
                    if let Err(e) = self.recover_target(session, &registration.target_id).await {
                        tracing::error!("Re-registering {} failed: {}", registration.target_id, e);
                    }
                }
            }
        }

        Ok(self.raw_fetch(session, target).await?)
    }

    /// Remove, reopen and re-register one listen target
    async fn recover_target(&self, session: &Session, target: &str) -> Result<(), AdapterError> {
        let previous = self.listen.get(target);
        let options = previous
            .as_ref()
            .map(|r| r.options.clone())
            .unwrap_or_else(|| self.settings.listen_defaults.clone());

        self.remove_for_recovery(session, target).await;
        self.reopen_chat(session, target).await;

        match self
            .handle_register_listen(session, listen_args(target, &options))
            .await
        {
            OperationResult::Fatal(e) => {
                // Keep the last known options for the next recovery attempt
                if let Some(previous) = previous {
                    self.listen.insert(previous);
                }
                Err(e)
            }
            _ => {
                tracing::info!("Re-registered listen target {}", target);
                Ok(())
            }
        }
    }

    async fn remove_for_recovery(&self, session: &Session, target: &str) {
        let args = CallArgs::new().kwarg("who", target);
        match self.handle_deregister_listen(session, args).await {
            OperationResult::Success(Value::Bool(false)) => {
                tracing::warn!("Removing stale listen target {} failed", target)
            }
            _ => tracing::debug!("Removed stale listen target {}", target),
        }
        // The registration is recreated from scratch either way
        self.listen.remove(target);
    }

    async fn reopen_chat(&self, session: &Session, target: &str) {
        match session
            .backend
            .call("ChatWith", CallArgs::new().arg(target))
            .await
        {
            Ok(_) => {
                tracing::debug!("Reopened chat window {}", target);
                tokio::time::sleep(self.settings.recovery_settle).await;
            }
            Err(e) => tracing::warn!("Failed to reopen chat window {}: {}", target, e),
        }
    }
}

fn listen_args(target: &str, options: &ListenOptions) -> CallArgs {
    let mut args = options.to_args(target);
    if !options.exact_match {
        args.remove("exact");
    }
    args
}
