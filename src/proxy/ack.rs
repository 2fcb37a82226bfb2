use std::fmt;

use crate::error::{ProxyError, Result};

/// What a consume call should acknowledge.
///
/// Group and topic are not part of an ack: the values passed to
/// [`Proxy::consume`](super::Proxy::consume) or [`Proxy::ack`](super::Proxy::ack)
/// along with it are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ack {
    /// Acknowledge nothing
    None,
    /// Acknowledge the message being consumed as soon as it is fetched
    Auto,
    /// Acknowledge the message at `offset` of `partition`
    Explicit { partition: i32, offset: i64 },
}

impl Ack {
    /// Create an explicit acknowledgement from a partition and an offset.
    pub fn new(partition: i32, offset: i64) -> Result<Self> {
        if partition < 0 {
            return Err(ProxyError::InvalidArgument(format!(
                "bad partition: {partition}"
            )));
        }
        if offset < 0 {
            return Err(ProxyError::InvalidArgument(format!("bad offset: {offset}")));
        }
        Ok(Ack::Explicit { partition, offset })
    }

    pub fn none() -> Self {
        Ack::None
    }

    pub fn auto() -> Self {
        Ack::Auto
    }

    /// Build an ack from request parameters.
    ///
    /// `no_ack` wins over everything else. Without partition and offset the
    /// consumed message is auto-acknowledged; with both an explicit ack is
    /// built; with only one of them the request is rejected.
    pub fn from_params(no_ack: bool, partition: Option<i32>, offset: Option<i64>) -> Result<Self> {
        if no_ack {
            return Ok(Ack::None);
        }
        match (partition, offset) {
            (None, None) => Ok(Ack::Auto),
            (Some(partition), Some(offset)) => Ack::new(partition, offset),
            (Some(_), None) => Err(ProxyError::InvalidArgument(
                "ack partition given without ack offset".to_string(),
            )),
            (None, Some(_)) => Err(ProxyError::InvalidArgument(
                "ack offset given without ack partition".to_string(),
            )),
        }
    }

    pub fn partition(&self) -> Option<i32> {
        match self {
            Ack::Explicit { partition, .. } => Some(*partition),
            _ => None,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        match self {
            Ack::Explicit { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::None => write!(f, "no-ack"),
            Ack::Auto => write!(f, "auto-ack"),
            Ack::Explicit { partition, offset } => write!(f, "ack({partition}:{offset})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_partition_and_offset() {
        for (partition, offset) in [(0, 0), (2, 100), (i32::MAX, i64::MAX)] {
            let ack = Ack::new(partition, offset).unwrap();
            assert_eq!(ack.partition(), Some(partition));
            assert_eq!(ack.offset(), Some(offset));
        }
    }

    #[test]
    fn test_new_rejects_negative_values() {
        for (partition, offset) in [(-1, 0), (-2, 0), (i32::MIN, 5), (0, -1), (3, i64::MIN)] {
            assert!(matches!(
                Ack::new(partition, offset),
                Err(ProxyError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_sentinels_never_alias_partitions() {
        assert_ne!(Ack::none(), Ack::auto());
        assert_eq!(Ack::none().partition(), None);
        assert_eq!(Ack::auto().offset(), None);
        assert_ne!(Ack::new(0, 0).unwrap(), Ack::none());
    }

    #[test]
    fn test_from_params() {
        assert_eq!(Ack::from_params(true, Some(1), Some(2)).unwrap(), Ack::None);
        assert_eq!(Ack::from_params(false, None, None).unwrap(), Ack::Auto);
        assert_eq!(
            Ack::from_params(false, Some(1), Some(2)).unwrap(),
            Ack::Explicit {
                partition: 1,
                offset: 2
            }
        );
        assert!(Ack::from_params(false, Some(1), None).is_err());
        assert!(Ack::from_params(false, None, Some(2)).is_err());
        assert!(Ack::from_params(false, Some(-1), Some(2)).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Ack::none().to_string(), "no-ack");
        assert_eq!(Ack::auto().to_string(), "auto-ack");
        assert_eq!(Ack::new(2, 100).unwrap().to_string(), "ack(2:100)");
    }
}
