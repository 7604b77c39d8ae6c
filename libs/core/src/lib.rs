//! # Core — ドメインロジック層
//!
//! Chipper のお気に入り・フォロー通知ドメインを定義する。
//! 具体的なI/O実装は `infrastructure` クレートに委譲する（依存性逆転の原則）。

pub mod error;
pub mod traits;
pub mod contracts;
