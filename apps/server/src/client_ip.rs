//! クライアント IP の解決

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, Request, request::Parts},
};

use crate::state::AppState;

/// クライアント IP を解決する
///
/// `trust_proxy` のときだけ `X-Forwarded-For` の先頭、`X-Real-IP` を採用する。
/// それ以外は接続元アドレスのみ使う（ヘッダーはクライアントが自由に書き換えられる）。
pub fn client_ip<B>(request: &Request<B>, trust_proxy: bool) -> String {
    resolve(request.headers(), request.extensions(), trust_proxy)
}

fn resolve(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    if trust_proxy && let Some(ip) = forwarded_ip(headers) {
        return ip;
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// ハンドラ引数としてクライアント IP を受け取る
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(
            &parts.headers,
            &parts.extensions,
            state.config.trust_proxy,
        )))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn with_peer<B>(mut request: Request<B>) -> Request<B> {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 0, 10], 50000))));
        request
    }

    #[test]
    fn test_プロキシを信頼するときはx_forwarded_forの先頭を採用する() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .body(())
            .unwrap();

        assert_eq!(client_ip(&with_peer(request), true), "203.0.113.7");
    }

    #[test]
    fn test_プロキシを信頼するときはx_real_ipを次に採用する() {
        let request = Request::builder()
            .header("x-real-ip", "10.0.0.2")
            .body(())
            .unwrap();

        assert_eq!(client_ip(&with_peer(request), true), "10.0.0.2");
    }

    #[test]
    fn test_プロキシを信頼しないときは転送ヘッダーを無視する() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-real-ip", "10.0.0.2")
            .body(())
            .unwrap();

        assert_eq!(client_ip(&with_peer(request), false), "192.168.0.10");
    }

    #[test]
    fn test_転送ヘッダーがなければ接続元アドレスにフォールバックする() {
        assert_eq!(client_ip(&with_peer(Request::new(())), true), "192.168.0.10");
    }

    #[test]
    fn test_情報がなければunknown() {
        assert_eq!(client_ip(&Request::new(()), false), "unknown");
    }
}
