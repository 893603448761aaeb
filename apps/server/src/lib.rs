//! # Kanri 管理バックエンド
//!
//! ユーザー・ロール・権限・操作ログを扱う管理画面向け API サーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: ルート定義とミドルウェアの積み上げ
//! - `config`: 環境変数からの設定読み込み
//! - `error` / `filter`: アプリケーションエラーと全例外フィルタ
//! - `guard`: 認証・認可・流量制限などハンドラ手前の判定
//! - `interceptor`: レスポンス変換・操作ログ・データ権限
//! - `handler`: HTTP ハンドラ
//! - `policy`: ルートごとのポリシー（公開・ロール・権限など）
//! - `validation`: 入力検証付きエクストラクタ

pub mod app_builder;
pub mod client_ip;
pub mod config;
pub mod error;
pub mod filter;
pub mod guard;
pub mod handler;
pub mod interceptor;
pub mod jwt;
pub mod policy;
pub mod state;
pub mod validation;

#[cfg(test)]
mod test_support;
