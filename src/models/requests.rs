use serde::Deserialize;
use serde_json::{Map, Value};

use crate::adapter::ListenOptions;
use crate::backend::CallArgs;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct OpenChatRequest {
    pub who: String,
    #[serde(default)]
    pub exact: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver: String,
    pub message: String,
    #[serde(default)]
    pub at_list: Vec<String>,
    #[serde(default = "default_true")]
    pub clear: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendFileRequest {
    pub receiver: String,
    pub file_paths: Vec<String>,
}

/// Media flags shared by message polling and listen registration
#[derive(Debug, Default, Deserialize)]
pub struct MediaFlags {
    #[serde(default)]
    pub savepic: bool,
    #[serde(default)]
    pub savevideo: bool,
    #[serde(default)]
    pub savefile: bool,
    #[serde(default)]
    pub savevoice: bool,
    #[serde(default)]
    pub parseurl: bool,
}

impl MediaFlags {
    pub fn to_options(&self, exact: bool) -> ListenOptions {
        ListenOptions {
            save_images: self.savepic,
            save_video: self.savevideo,
            save_files: self.savefile,
            save_voice: self.savevoice,
            parse_urls: self.parseurl,
            exact_match: exact,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddListenRequest {
    pub who: String,
    #[serde(flatten)]
    pub flags: MediaFlags,
    #[serde(default)]
    pub exact: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListenMessagesQuery {
    pub who: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveListenRequest {
    pub who: String,
}

#[derive(Debug, Deserialize)]
pub struct GetMomentsQuery {
    #[serde(default = "default_moments_count")]
    pub n: u32,
    #[serde(default = "default_moments_timeout")]
    pub timeout: u32,
}

fn default_moments_count() -> u32 {
    10
}
fn default_moments_timeout() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct SaveMomentImagesRequest {
    pub moment_index: Option<i64>,
    pub save_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeMomentRequest {
    pub moment_index: Option<i64>,
}

/// Raw operation call: positional `args` and keyword `kwargs`
#[derive(Debug, Default, Deserialize)]
pub struct DispatchRequest {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl From<DispatchRequest> for CallArgs {
    fn from(request: DispatchRequest) -> Self {
        CallArgs {
            positional: request.args,
            keyword: request.kwargs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_defaults() {
        let request: SendMessageRequest =
            serde_json::from_str(r#"{"receiver":"Alice","message":"hi"}"#).unwrap();
        assert!(request.clear);
        assert!(request.at_list.is_empty());
    }

    #[test]
    fn test_add_listen_flattened_flags() {
        let request: AddListenRequest =
            serde_json::from_str(r#"{"who":"Alice","savepic":true,"parseurl":true}"#).unwrap();
        let options = request.flags.to_options(request.exact);
        assert!(options.save_images);
        assert!(options.parse_urls);
        assert!(!options.exact_match);
    }

    #[test]
    fn test_dispatch_request_into_args() {
        let request: DispatchRequest =
            serde_json::from_str(r#"{"args":["Alice"],"kwargs":{"reset":true}}"#).unwrap();
        let args = CallArgs::from(request);
        assert_eq!(args.first_str_or("who").as_deref(), Some("Alice"));
        assert_eq!(args.get("reset"), Some(&Value::Bool(true)));
    }
}
