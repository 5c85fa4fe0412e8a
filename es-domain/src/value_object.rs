//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象。当前仅包含聚合版本号 `Version`。
//!
use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

/// 聚合版本号（用于乐观锁和并发控制）
///
/// 版本号等于聚合上应用过的事件数量，从 0 开始；持久化流中的第一个事件版本为 1。
///
/// # 示例
///
/// ```
/// use es_domain::value_object::Version;
///
/// let v0 = Version::new();
/// assert!(v0.is_new());
///
/// let v1 = v0.next();
/// assert_eq!(v1.value(), 1);
/// assert!(v1 > v0);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// 创建初始版本（版本号为 0）
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// 获取下一个版本号
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 向前推进 `count` 个版本
    pub fn advance(&self, count: u64) -> Self {
        Self(self.0 + count)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// 检查是否为初始版本
    pub fn is_new(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self::from_value(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_new() {
        let v = Version::new();
        assert_eq!(v.value(), 0);
        assert!(v.is_new());
        assert_eq!(v, Version::default());
    }

    #[test]
    fn test_version_next_and_advance() {
        let v = Version::from_value(10);
        assert_eq!(v.next().value(), 11);
        assert_eq!(v.advance(3).value(), 13);
        assert_eq!(v.value(), 10);
        assert_eq!(Version::new().next().next().next().value(), 3);
    }

    #[test]
    fn test_version_ordering() {
        let v1 = Version::from_value(1);
        let v2 = Version::from_value(2);
        assert!(v2 > v1);
        assert!(Version::new() < v1);
    }

    // 元数据中以十进制字符串保存版本号
    #[test]
    fn test_version_display_and_parse() {
        let v = Version::from_value(42);
        assert_eq!(v.to_string(), "42");
        assert_eq!("42".parse::<Version>().unwrap(), v);
        assert_eq!(" 7 ".parse::<Version>().unwrap(), Version::from_value(7));
        assert!("v1".parse::<Version>().is_err());
        assert!("-1".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_serde() {
        let v = Version::from_value(42);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "42");
        let de: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(de, v);
    }

    #[test]
    fn test_version_conversions() {
        let v: Version = 5u64.into();
        let raw: u64 = v.into();
        assert_eq!(raw, 5);
    }
}
