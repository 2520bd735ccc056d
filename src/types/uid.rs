// Copyright (c) 2024 Mike Tsao

//! Unique identifiers for the records and live nodes of a session, and
//! factories that help ensure they are in fact unique.

use core::sync::atomic::Ordering;
use core::{hash::Hash, marker::PhantomData, sync::atomic::AtomicUsize};
use serde::{Deserialize, Serialize};

/// Something that behaves like a uid.
pub trait IsUid: Eq + Hash + Clone + Copy + From<usize> {
    /// Returns the raw uid.
    fn as_usize(&self) -> usize;
}

/// Generates unique uids.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UidFactory<U: IsUid> {
    pub(crate) next_uid_value: AtomicUsize,
    #[serde(skip)]
    pub(crate) _phantom: PhantomData<U>,
}
impl<U: IsUid> UidFactory<U> {
    /// Creates a new [UidFactory] starting with the given value.
    pub fn new(first_uid: usize) -> Self {
        Self {
            next_uid_value: AtomicUsize::new(first_uid),
            _phantom: Default::default(),
        }
    }

    /// Generates the next unique uid.
    pub fn mint_next(&self) -> U {
        let uid_value = self.next_uid_value.fetch_add(1, Ordering::Relaxed);
        U::from(uid_value)
    }

    /// Whether this factory has yet to hand out `uid`, either by minting it or
    /// by being told about it.
    pub fn is_unminted(&self, uid: U) -> bool {
        uid.as_usize() >= self.next_uid_value.load(Ordering::Relaxed)
    }

    /// Notifies the factory that a uid exists that might have been created
    /// elsewhere (for example, while restoring a composition record). This
    /// gives the factory an opportunity to adjust `next_uid_value` to stay
    /// consistent with all known uids.
    pub fn notify_externally_minted_uid(&self, uid: U) {
        if uid.as_usize() >= self.next_uid_value.load(Ordering::Relaxed) {
            self.next_uid_value
                .store(uid.as_usize() + 1, Ordering::Relaxed);
        }
    }
}
impl<U: IsUid> Default for UidFactory<U> {
    fn default() -> Self {
        Self::new(1)
    }
}
impl<U: IsUid> PartialEq for UidFactory<U> {
    fn eq(&self, other: &Self) -> bool {
        self.next_uid_value.load(Ordering::Relaxed) == other.next_uid_value.load(Ordering::Relaxed)
    }
}

/// Declares a `usize` uid newtype together with its [IsUid] impl.
macro_rules! declare_uid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(synonym::Synonym, derivative::Derivative, serde::Serialize, serde::Deserialize)]
        #[derivative(Default)]
        #[synonym(skip(Default))]
        #[serde(rename_all = "kebab-case")]
        pub struct $name(#[derivative(Default(value = "1"))] pub usize);
        impl $crate::types::IsUid for $name {
            fn as_usize(&self) -> usize {
                self.0
            }
        }
    };
}
pub(crate) use declare_uid;

#[cfg(test)]
mod tests {
    use super::*;

    declare_uid!(
        /// A uid used only by these tests.
        TestUid
    );

    #[test]
    fn uid_factory() {
        let f = UidFactory::<TestUid>::default();

        let uid_1 = f.mint_next();
        let uid_2 = f.mint_next();
        assert_ne!(uid_1, uid_2, "Minted Uids should not repeat");

        let uid_3 = TestUid(uid_2.0 + 1);
        let uid_3_expected_duplicate = f.mint_next();
        assert_eq!(
            uid_3, uid_3_expected_duplicate,
            "Minted Uids will repeat if factory doesn't know about them all"
        );

        let mut ids: std::collections::HashSet<TestUid> = Default::default();
        for _ in 0..64 {
            let uid = f.mint_next();
            assert!(
                !ids.contains(&uid),
                "minted uids should be unique within a factory"
            );
            ids.insert(uid);
        }
    }

    #[test]
    fn uid_factory_with_notify_works() {
        let f = UidFactory::<TestUid>::default();

        let uid_1 = f.mint_next();
        let uid_2 = f.mint_next();
        assert_ne!(uid_1, uid_2, "Minted Uids should not repeat");

        let uid_3 = TestUid(uid_2.0 + 1);
        f.notify_externally_minted_uid(uid_3);
        let uid_4 = f.mint_next();
        assert_ne!(
            uid_3, uid_4,
            "Notifying factory should cause it to skip past."
        );

        f.notify_externally_minted_uid(uid_3);
        let uid_5 = f.mint_next();
        assert_eq!(
            uid_5.0,
            uid_4.0 + 1,
            "Notifying factory about value below next should be no-op."
        );
    }

    #[test]
    fn unminted_uids_are_the_ones_ahead_of_the_factory() {
        let f = UidFactory::<TestUid>::default();
        assert!(f.is_unminted(TestUid(1)));
        let uid_1 = f.mint_next();
        assert!(!f.is_unminted(uid_1));
        assert!(f.is_unminted(TestUid(2)));

        f.notify_externally_minted_uid(TestUid(10));
        assert!(!f.is_unminted(TestUid(5)), "skipped uids count as handed out");
        assert!(f.is_unminted(TestUid(11)));
    }
}
