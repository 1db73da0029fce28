//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! fiber の識別子は ULID (Universally Unique Lexicographically Sortable Identifier) です。
//! Phantom type パターンで `Id<T>` を共通化し、マーカー型で種類を区別します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 生成順で並ぶので、supervision set を BTreeSet で持つと spawn 順に近くなる
//! - **分散生成可能**: 調整なしで複数ワーカーから生成できる
//! - **UUID互換**: 128-bit

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"fiber-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData なので実行時のサイズは `Ulid` と同じです。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Fiber のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fiber {}

impl IdMarker for Fiber {
    fn prefix() -> &'static str {
        "fiber-"
    }
}

/// Identifier of a fiber (one cooperatively scheduled unit of work).
///
/// This is the identity-stable handle stored in supervision sets; it is
/// resolved through a [`FiberRegistry`](crate::ports::FiberRegistry).
pub type FiberId = Id<Fiber>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fiber_id_displays_with_prefix() {
        let ulid = Ulid::new();
        let id = FiberId::from_ulid(ulid);

        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("fiber-{ulid}"));
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = FiberId::from_ulid(Ulid::from_parts(1_000, 7));
        let id2 = FiberId::from_ulid(Ulid::from_parts(2_000, 3));
        let id3 = FiberId::from_ulid(Ulid::from_parts(3_000, 1));

        assert!(id1 < id2);
        assert!(id2 < id3);
    }

    #[test]
    fn fiber_ids_can_be_serialized() {
        let id = FiberId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: FiberId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<FiberId>(), size_of::<Ulid>());
    }
}
