pub mod chat;
pub mod contacts;
pub mod dispatch;
pub mod health;
pub mod listen;
pub mod message;
pub mod moments;
pub mod wechat;
