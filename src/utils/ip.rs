//! 客户端 IP 提取
//!
//! 转发头可以被客户端伪造，只有连接来自可信代理时才采用：
//! - 配置了 `trusted_proxies`：对端地址命中列表才信任
//! - 未配置：对端是私有地址或本机时视为反向代理
//!
//! 信任时取 `X-Forwarded-For` 的第一个地址，其次 `X-Real-IP`，否则用对端地址。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use tracing::debug;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// 解析 `ip` 或 `ip:port`
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| raw.parse::<IpAddr>())
        .ok()
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix_len.parse::<u8>() else {
        return false;
    };
    let Ok(network) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

fn is_trusted_proxy(peer: &IpAddr, trusted_proxies: &[String]) -> bool {
    if trusted_proxies.is_empty() {
        return is_private_or_local(peer);
    }
    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(peer, proxy)
        } else {
            parse_ip(proxy).is_some_and(|addr| addr == *peer)
        }
    })
}

/// 根据对端地址和转发头决定客户端 IP
pub fn resolve_client_ip(
    peer: Option<&str>,
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    trusted_proxies: &[String],
) -> Option<String> {
    let peer_ip = peer.and_then(parse_ip);

    let trust_forwarded = peer_ip.is_some_and(|ip| is_trusted_proxy(&ip, trusted_proxies));
    if trust_forwarded {
        let forwarded = forwarded_for
            .and_then(|v| v.split(',').next())
            .and_then(parse_ip)
            .or_else(|| real_ip.and_then(parse_ip));
        if let Some(ip) = forwarded {
            debug!("Client IP {} taken from forwarding headers", ip);
            return Some(ip.to_string());
        }
    }

    peer_ip.map(|ip| ip.to_string())
}

/// 从 actix 请求提取客户端 IP
pub fn client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> Option<String> {
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());

    resolve_client_ip(
        peer.as_deref(),
        header("x-forwarded-for"),
        header("x-real-ip"),
        trusted_proxies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_header_from_private_peer() {
        let ip = resolve_client_ip(
            Some("10.0.0.5"),
            Some("203.0.113.9, 10.0.0.5"),
            None,
            &[],
        );
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_forwarded_header_ignored_from_public_peer() {
        let ip = resolve_client_ip(Some("198.51.100.7"), Some("203.0.113.9"), None, &[]);
        assert_eq!(ip.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn test_real_ip_fallback_and_trusted_list() {
        let trusted = vec!["198.51.100.0/24".to_string()];
        let ip = resolve_client_ip(Some("198.51.100.7"), None, Some("203.0.113.9"), &trusted);
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));

        // 配置了列表后私有地址不再自动信任
        let ip = resolve_client_ip(Some("10.0.0.5"), Some("203.0.113.9"), None, &trusted);
        assert_eq!(ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_garbage_forwarded_value_falls_back_to_peer() {
        let ip = resolve_client_ip(Some("127.0.0.1"), Some("unknown"), None, &[]);
        assert_eq!(ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(resolve_client_ip(None, Some("203.0.113.9"), None, &[]), None);
    }

    #[test]
    fn test_ip_in_cidr() {
        let ip: IpAddr = "192.168.1.42".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.1.0/40"));
        let v6: IpAddr = "fd00::1".parse().unwrap();
        assert!(is_private_or_local(&v6));
        assert!(!ip_in_cidr(&v6, "192.168.1.0/24"));
    }
}
