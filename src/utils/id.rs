//! 链接 ID 生成与校验
//!
//! ID 由线程本地 CSPRNG 生成的 16 字节随机数，经 base64url（无填充）编码为 22 个字符，
//! 提供 128 bit 熵，防止枚举。

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// 随机字节数（128 bit）
pub const LINK_ID_BYTES: usize = 16;

/// 编码后 ID 的最大长度，兼容旧版本较短的 ID
const MAX_LINK_ID_LEN: usize = 64;

/// 生成新的链接 ID
pub fn generate_link_id() -> String {
    let bytes: [u8; LINK_ID_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 检查 ID 是否只包含 base64url 字符且长度合理
///
/// 非法 ID 直接视为不存在，不触达存储层
#[inline]
pub fn is_valid_link_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_LINK_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_link_id();
        assert_eq!(id.len(), 22);
        assert!(is_valid_link_id(&id));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_link_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!is_valid_link_id(""));
        assert!(!is_valid_link_id("../etc"));
        assert!(!is_valid_link_id("abc def"));
        assert!(!is_valid_link_id("<script>"));
        assert!(!is_valid_link_id(&"a".repeat(65)));
        assert!(is_valid_link_id("abc123"));
        assert!(is_valid_link_id("a-b_C9"));
    }
}
