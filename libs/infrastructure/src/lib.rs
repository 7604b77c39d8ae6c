//! # Infrastructure — I/O実装層
//!
//! `core` で定義されたトレイトの具体実装を提供する。
//! SQLite（台帳・コンテンツ・キュー・監査ログ）と配送エンドポイントとの
//! 通信を担当。

pub mod audit_log;
pub mod content_store;
pub mod favorite_ledger;
pub mod mailer;
pub mod notification_queue;

#[cfg(test)]
mod content_store_tests;
#[cfg(test)]
mod favorite_ledger_tests;
