//! Classification of backend error messages.
//!
//! The automation libraries only report failures as free text, so the
//! adapter recognises known failure classes by substring. The table is
//! ordered: the first matching signature wins.

/// Failure class derived from a backend error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Window/control state problem that a listen re-registration can fix
    TransientUi(TransientKind),
    /// The backend rejected a keyword argument
    ParamMismatch,
    /// Control tree access failed while probing the main window
    ControlAccess,
    /// Anything else
    Unknown,
}

/// Sub-class of [`ErrorCategory::TransientUi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    ControlActivation,
    InvalidWindowHandle,
    ControlTreeTraversal,
    FindTimeout,
}

pub struct Signature {
    pub pattern: &'static str,
    pub case_insensitive: bool,
    pub category: ErrorCategory,
}

const fn sig(pattern: &'static str, category: ErrorCategory) -> Signature {
    Signature {
        pattern,
        case_insensitive: false,
        category,
    }
}

const fn sig_ci(pattern: &'static str, category: ErrorCategory) -> Signature {
    Signature {
        pattern,
        case_insensitive: true,
        category,
    }
}

use ErrorCategory::*;
use TransientKind::*;

/// Known signatures, most specific first. Case-insensitive patterns are lower case.
pub const SIGNATURES: &[Signature] = &[
    sig("激活聊天窗口失败", TransientUi(ControlActivation)),
    sig("SetWindowPos", TransientUi(ControlActivation)),
    sig_ci("failed to activate chat window", TransientUi(ControlActivation)),
    sig("无效的窗口句柄", TransientUi(InvalidWindowHandle)),
    sig_ci("invalid window handle", TransientUi(InvalidWindowHandle)),
    sig("GetNextSiblingControl", TransientUi(ControlTreeTraversal)),
    sig("Find Control Timeout", TransientUi(FindTimeout)),
    sig("参数", ParamMismatch),
    sig_ci("unexpected keyword", ParamMismatch),
    sig_ci("parameter", ParamMismatch),
    sig_ci("argument", ParamMismatch),
    sig("NoneType", ControlAccess),
    sig("uiautomation", ControlAccess),
    sig("Control", ControlAccess),
];

/// Classify an error message against [`SIGNATURES`]
pub fn classify(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    SIGNATURES
        .iter()
        .find(|s| {
            if s.case_insensitive {
                lowered.contains(s.pattern)
            } else {
                message.contains(s.pattern)
            }
        })
        .map(|s| s.category)
        .unwrap_or(Unknown)
}

pub fn is_transient_ui(message: &str) -> bool {
    matches!(classify(message), TransientUi(_))
}

pub fn is_param_mismatch(message: &str) -> bool {
    classify(message) == ParamMismatch
}

/// Errors that mean the main window's control tree is not reachable right now.
/// Control-tree traversal failures count here too.
pub fn is_control_access(message: &str) -> bool {
    matches!(
        classify(message),
        ControlAccess | TransientUi(ControlTreeTraversal)
    )
}

/// A find-timeout on the message list control, raised when no chat window is open
pub fn is_missing_message_list(message: &str) -> bool {
    classify(message) == TransientUi(FindTimeout) && message.contains("消息")
}
