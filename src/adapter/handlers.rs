//! Per-operation shims over the library differences.
//!
//! | Operation | wxauto | wxautox |
//! |---|---|---|
//! | `open-chat-with-target` | no `exact` | `exact` supported |
//! | `send-message` | `clear` is a bool | `clear` is `"0"` / `"1"` |
//! | `send-typed-text` | missing, uses `SendMsg` | native when present |
//! | `send-files` | `SendFiles` or `SendFile` | `SendFiles` or `SendFile` |
//! | `poll-next-new-message` | no `savevideo` / `parseurl` | all parameters |
//! | `register-listen-target` | no `savevideo` / `parseurl` / `exact` | all parameters |

use serde_json::{json, Value};
use std::collections::HashMap;

use super::registry::{ListenOptions, ListenRegistration};
use super::result::{AdapterError, Neutral, OperationResult};
use super::signatures;
use super::{Session, WeChatAdapter};
use crate::backend::{BackendError, BackendKind, CallArgs};

pub const OPEN_CHAT: &str = "open-chat-with-target";
pub const SEND_MESSAGE: &str = "send-message";
pub const SEND_TYPED_TEXT: &str = "send-typed-text";
pub const SEND_FILES: &str = "send-files";
pub const POLL_NEXT_NEW_MESSAGE: &str = "poll-next-new-message";
pub const REGISTER_LISTEN: &str = "register-listen-target";
pub const FETCH_LISTEN_MESSAGES: &str = "fetch-listen-messages";
pub const DEREGISTER_LISTEN: &str = "deregister-listen-target";

/// Keyword arguments `wxauto` rejects on message polling and listen registration
const EXTENDED_ONLY_KWARGS: &[&str] = &["savevideo", "parseurl"];

/// Parameters every library version accepts for `GetNextNewMessage`
const POLL_BASIC_KWARGS: &[&str] = &["savepic", "savefile", "savevoice"];

/// Registration field names accepted in place of the library keywords
const LISTEN_KWARG_ALIASES: &[(&str, &str)] = &[
    ("target_id", "who"),
    ("save_images", "savepic"),
    ("save_video", "savevideo"),
    ("save_files", "savefile"),
    ("save_voice", "savevoice"),
    ("parse_urls", "parseurl"),
    ("exact_match", "exact"),
];

/// Operations with a shim; everything else goes straight to the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    OpenChat,
    SendMessage,
    SendTypedText,
    SendFiles,
    PollNextNewMessage,
    RegisterListen,
    FetchListenMessages,
    DeregisterListen,
}

/// Operation name -> shim. Library method names are aliases of the
/// operation names so raw calls get the same treatment.
pub fn table() -> HashMap<&'static str, Handler> {
    HashMap::from([
        (OPEN_CHAT, Handler::OpenChat),
        ("ChatWith", Handler::OpenChat),
        (SEND_MESSAGE, Handler::SendMessage),
        ("SendMsg", Handler::SendMessage),
        (SEND_TYPED_TEXT, Handler::SendTypedText),
        ("SendTypingText", Handler::SendTypedText),
        (SEND_FILES, Handler::SendFiles),
        ("SendFiles", Handler::SendFiles),
        (POLL_NEXT_NEW_MESSAGE, Handler::PollNextNewMessage),
        ("GetNextNewMessage", Handler::PollNextNewMessage),
        (REGISTER_LISTEN, Handler::RegisterListen),
        ("AddListenChat", Handler::RegisterListen),
        (FETCH_LISTEN_MESSAGES, Handler::FetchListenMessages),
        ("GetListenMessage", Handler::FetchListenMessages),
        (DEREGISTER_LISTEN, Handler::DeregisterListen),
        ("RemoveListenChat", Handler::DeregisterListen),
    ])
}

/// Rename registration field names to library keywords; explicit keywords win
pub fn canonical_kwargs(args: &mut CallArgs) {
    for (alias, keyword) in LISTEN_KWARG_ALIASES {
        if let Some(value) = args.remove(alias) {
            args.keyword.entry(*keyword).or_insert(value);
        }
    }
}

/// `wxauto` has no `exact` parameter on `ChatWith`
pub fn strip_exact(kind: BackendKind, args: &mut CallArgs) {
    if kind == BackendKind::Standard && args.remove("exact").is_some() {
        tracing::debug!("Dropped exact, not supported by wxauto");
    }
}

/// Turn a boolean `clear` flag into `"1"` / `"0"`
pub fn stringify_clear(args: &mut CallArgs) {
    if let Some(Value::Bool(clear)) = args.get("clear") {
        let flag = if *clear { "1" } else { "0" };
        args.keyword.insert("clear".to_string(), json!(flag));
    }
}

/// `wxautox` takes `clear` as a string, `wxauto` as a bool
pub fn coerce_clear(kind: BackendKind, args: &mut CallArgs) {
    if kind == BackendKind::Extended {
        stringify_clear(args);
    }
}

pub fn strip_extended_only(kind: BackendKind, args: &mut CallArgs) {
    if kind != BackendKind::Standard {
        return;
    }
    for key in EXTENDED_ONLY_KWARGS {
        if args.remove(key).is_some() {
            tracing::debug!("Dropped {}, not supported by wxauto", key);
        }
    }
}

/// Smallest `AddListenChat` argument set known to work on each library
pub fn minimal_listen_args(kind: BackendKind, args: &CallArgs) -> CallArgs {
    match kind {
        BackendKind::Standard => args.retain_keys(&["who", "savepic", "savefile", "savevoice"]),
        BackendKind::Extended => args.retain_keys(&[
            "who",
            "savepic",
            "savevideo",
            "savefile",
            "savevoice",
            "parseurl",
            "exact",
        ]),
    }
}

impl WeChatAdapter {
    pub(super) async fn run_handler(
        &self,
        handler: Handler,
        session: &Session,
        mut args: CallArgs,
    ) -> OperationResult {
        canonical_kwargs(&mut args);
        match handler {
            Handler::OpenChat => self.handle_open_chat(session, args).await,
            Handler::SendMessage => self.handle_send_message(session, args).await,
            Handler::SendTypedText => self.handle_send_typed_text(session, args).await,
            Handler::SendFiles => self.handle_send_files(session, args).await,
            Handler::PollNextNewMessage => self.handle_poll_next_new_message(session, args).await,
            Handler::RegisterListen => self.handle_register_listen(session, args).await,
            Handler::FetchListenMessages => {
                self.handle_fetch_listen_messages(session, args).await
            }
            Handler::DeregisterListen => self.handle_deregister_listen(session, args).await,
        }
    }

    async fn handle_open_chat(&self, session: &Session, mut args: CallArgs) -> OperationResult {
        strip_exact(session.kind, &mut args);
        session.backend.call("ChatWith", args).await.map_err(AdapterError::Backend).into()
    }

    async fn handle_send_message(&self, session: &Session, mut args: CallArgs) -> OperationResult {
        coerce_clear(session.kind, &mut args);
        session
            .backend
            .call("SendMsg", args)
            .await
            .map_err(|e| {
                tracing::error!("Failed to send message: {}", e);
                AdapterError::WriteFailure(e)
            })
            .into()
    }

    async fn handle_send_typed_text(
        &self,
        session: &Session,
        mut args: CallArgs,
    ) -> OperationResult {
        let method = match session.kind {
            BackendKind::Extended if session.backend.supports("SendTypingText").await => {
                "SendTypingText"
            }
            BackendKind::Extended => {
                tracing::warn!("wxautox instance has no SendTypingText, using SendMsg");
                "SendMsg"
            }
            BackendKind::Standard => {
                tracing::debug!("wxauto has no SendTypingText, using SendMsg");
                "SendMsg"
            }
        };
        stringify_clear(&mut args);

        session
            .backend
            .call(method, args)
            .await
            .map_err(|e| {
                tracing::error!("Failed to send typed text via {}: {}", method, e);
                AdapterError::WriteFailure(e)
            })
            .into()
    }

    async fn handle_send_files(&self, session: &Session, args: CallArgs) -> OperationResult {
        let has_primary = session.backend.supports("SendFiles").await;
        let has_alternate = session.backend.supports("SendFile").await;

        let (method, fallback) = match (has_primary, has_alternate) {
            (true, alt) => ("SendFiles", alt),
            (false, true) => {
                tracing::debug!("{} has no SendFiles, using SendFile", session.kind);
                ("SendFile", false)
            }
            (false, false) => {
                tracing::error!("{} has neither SendFiles nor SendFile", session.kind);
                return OperationResult::Fatal(AdapterError::Unsupported(format!(
                    "{} cannot send files",
                    session.kind
                )));
            }
        };

        match session.backend.call(method, args.clone()).await {
            Ok(v) => OperationResult::Success(v),
            Err(BackendError::MissingMethod(_)) if fallback => {
                tracing::warn!("SendFiles disappeared, retrying with SendFile");
                session
                    .backend
                    .call("SendFile", args)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to send files: {}", e);
                        AdapterError::WriteFailure(e)
                    })
                    .into()
            }
            Err(e) => {
                tracing::error!("Failed to send files: {}", e);
                OperationResult::Fatal(AdapterError::WriteFailure(e))
            }
        }
    }

    /// Point the library's media downloads at the configured temp directory
    pub(super) async fn apply_save_path(&self, session: &Session) {
        let Some(dir) = &self.settings.temp_dir else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::error!("Failed to create temp directory {:?}: {}", dir, e);
            return;
        }
        match session.backend.set_save_path(dir).await {
            Ok(()) => tracing::debug!("Save path set to {:?}", dir),
            Err(e) => tracing::error!("Failed to set save path: {}", e),
        }
    }

    /// Open the self chat when no session is visible, so the message list exists
    async fn ensure_chat_open(&self, session: &Session) {
        match session
            .backend
            .call("GetSessionList", CallArgs::new().kwarg("reset", true))
            .await
        {
            Ok(sessions) if is_empty_value(&sessions) => {
                tracing::debug!("No sessions, opening {}", self.settings.self_chat);
                let args = CallArgs::new().arg(self.settings.self_chat.as_str());
                match session.backend.call("ChatWith", args).await {
                    Ok(_) => tokio::time::sleep(self.settings.recovery_settle).await,
                    Err(e) => tracing::warn!("Failed to open {}: {}", self.settings.self_chat, e),
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to check chat window state: {}", e),
        }
    }

    async fn handle_poll_next_new_message(
        &self,
        session: &Session,
        mut args: CallArgs,
    ) -> OperationResult {
        self.apply_save_path(session).await;
        strip_extended_only(session.kind, &mut args);
        self.ensure_chat_open(session).await;

        tracing::debug!("Calling GetNextNewMessage with {:?}", args.keyword);
        let error = match session.backend.call("GetNextNewMessage", args.clone()).await {
            Ok(v) => return OperationResult::Success(v),
            Err(e) => e.to_string(),
        };
        tracing::error!("GetNextNewMessage failed: {}", error);

        if signatures::is_missing_message_list(&error) {
            tracing::info!("Message list not found, reporting no new messages");
            return OperationResult::empty(Neutral::List, error);
        }

        if signatures::is_param_mismatch(&error) {
            let basic = args.retain_keys(POLL_BASIC_KWARGS);
            tracing::warn!("Parameter rejected, retrying with {:?}", basic.keyword);
            return match session.backend.call("GetNextNewMessage", basic).await {
                Ok(v) => OperationResult::Success(v),
                Err(e) => {
                    tracing::error!("Retry with basic parameters failed: {}", e);
                    OperationResult::empty(Neutral::List, e.to_string())
                }
            };
        }

        tracing::warn!("Unhandled polling error, reporting no new messages");
        OperationResult::empty(Neutral::List, error)
    }

    pub(super) async fn handle_register_listen(&self, session: &Session, args: CallArgs) -> OperationResult {
        let Some(target) = args.first_str_or("who") else {
            return OperationResult::Fatal(AdapterError::InvalidArgument(
                "listen target (who) is required".to_string(),
            ));
        };
        let options = ListenOptions::from_args(&args);

        let mut sent = args.clone();
        strip_extended_only(session.kind, &mut sent);
        strip_exact(session.kind, &mut sent);

        tracing::debug!("Calling AddListenChat with {:?}", sent.keyword);
        let result = match session.backend.call("AddListenChat", sent.clone()).await {
            Ok(v) => Ok(v),
            Err(e) if signatures::is_param_mismatch(&e.to_string()) => {
                let minimal = minimal_listen_args(session.kind, &sent);
                tracing::warn!(
                    "AddListenChat rejected parameters ({}), retrying with {:?}",
                    e, minimal.keyword
                );
                session.backend.call("AddListenChat", minimal).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(v) => {
                self.listen.insert(ListenRegistration {
                    target_id: target.clone(),
                    options,
                });
                tracing::info!("Listening to {}", target);
                OperationResult::Success(v)
            }
            Err(e) => {
                tracing::error!("Failed to add listen target {}: {}", target, e);
                OperationResult::Fatal(AdapterError::Backend(e))
            }
        }
    }

    pub(super) async fn handle_deregister_listen(
        &self,
        session: &Session,
        args: CallArgs,
    ) -> OperationResult {
        let target = args.first_str_or("who");

        match session.backend.call("RemoveListenChat", args).await {
            // `false` means the library had nothing to remove; keep our entry
            Ok(Value::Bool(false)) => {
                tracing::warn!("Library refused to remove listen target {:?}", target);
                OperationResult::Success(Value::Bool(false))
            }
            Ok(v) => {
                if let Some(target) = &target {
                    self.listen.remove(target);
                    tracing::debug!("Removed listen target {}", target);
                }
                OperationResult::Success(v)
            }
            Err(e) => {
                tracing::error!("Failed to remove listen target: {}", e);
                OperationResult::Success(Value::Bool(false))
            }
        }
    }

    pub async fn open_chat(&self, who: &str, exact: bool) -> Result<Value, AdapterError> {
        let args = CallArgs::new().arg(who).kwarg("exact", exact);
        self.dispatch(OPEN_CHAT, args).await.into_value()
    }

    pub async fn send_message(
        &self,
        who: &str,
        msg: &str,
        clear: bool,
        at: Option<Vec<String>>,
    ) -> Result<Value, AdapterError> {
        let mut args = CallArgs::new()
            .kwarg("msg", msg)
            .kwarg("who", who)
            .kwarg("clear", clear);
        if let Some(at) = at.filter(|a| !a.is_empty()) {
            args = args.kwarg("at", at);
        }
        self.dispatch(SEND_MESSAGE, args).await.into_value()
    }

    pub async fn send_typed_text(
        &self,
        who: &str,
        msg: &str,
        clear: bool,
        at: Option<Vec<String>>,
    ) -> Result<Value, AdapterError> {
        let mut args = CallArgs::new()
            .kwarg("msg", msg)
            .kwarg("who", who)
            .kwarg("clear", clear);
        if let Some(at) = at.filter(|a| !a.is_empty()) {
            args = args.kwarg("at", at);
        }
        self.dispatch(SEND_TYPED_TEXT, args).await.into_value()
    }

    pub async fn send_files(&self, who: &str, files: Vec<String>) -> Result<Value, AdapterError> {
        let args = CallArgs::new().kwarg("filepath", files).kwarg("who", who);
        self.dispatch(SEND_FILES, args).await.into_value()
    }

    /// Next unread message batch; failures read as "nothing new"
    pub async fn poll_next_new_message(&self, options: &ListenOptions) -> Value {
        let args = CallArgs::new()
            .kwarg("savepic", options.save_images)
            .kwarg("savevideo", options.save_video)
            .kwarg("savefile", options.save_files)
            .kwarg("savevoice", options.save_voice)
            .kwarg("parseurl", options.parse_urls);
        self.dispatch(POLL_NEXT_NEW_MESSAGE, args)
            .await
            .into_value()
            .unwrap_or_else(|e| {
                tracing::error!("Polling new messages failed: {}", e);
                Neutral::List.value()
            })
    }

    pub async fn register_listen(
        &self,
        who: &str,
        options: &ListenOptions,
    ) -> Result<Value, AdapterError> {
        self.dispatch(REGISTER_LISTEN, options.to_args(who))
            .await
            .into_value()
    }

    /// Messages from listened chats; a list for one target, a mapping for all
    pub async fn fetch_listen_messages(&self, who: Option<&str>) -> Value {
        let args = match who {
            Some(who) => CallArgs::new().kwarg("who", who),
            None => CallArgs::new(),
        };
        self.dispatch(FETCH_LISTEN_MESSAGES, args)
            .await
            .into_value()
            .unwrap_or_else(|e| {
                tracing::error!("Fetching listen messages failed: {}", e);
                Neutral::for_target(who).value()
            })
    }

    /// Stop listening to a chat; `false` when the library refused
    pub async fn deregister_listen(&self, who: &str) -> bool {
        match self
            .dispatch(DEREGISTER_LISTEN, CallArgs::new().kwarg("who", who))
            .await
            .into_value()
        {
            Ok(Value::Bool(b)) => b,
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Removing listen target {} failed: {}", who, e);
                false
            }
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
