use plugin_backend::{
    Error, TrampolineId,
    bounded::BoundedVec,
    config::{AllocatorRedirects, BackendConfig, PATCH_REGION_ADDRESS},
    plugin::{MAXIMUM_DESCRIPTION_LENGTH, MAXIMUM_META_FIELD_LENGTH, MetaInformation},
    registry::{Registry, TRAMPOLINE_LIST_LENGTH, TrampolinePool, TrampolineStatus},
};
use rstest::rstest;

#[rstest]
fn bounded_vec_refuses_overflow() {
    let mut list: BoundedVec<u32, 3> = BoundedVec::new();
    for value in 0..3 {
        list.try_push(value).unwrap();
    }
    assert!(list.is_full());
    assert_eq!(list.remaining(), 0);

    let err = list.try_push(3).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
    assert_eq!(list.as_slice(), [0, 1, 2]);
    assert_eq!(list[1], 1);
}

#[rstest]
#[case(vec![1, 2], true)]
#[case(vec![1, 2, 3, 4], false)]
fn bounded_vec_from_vec(#[case] values: Vec<u8>, #[case] fits: bool) {
    let list = BoundedVec::<u8, 3>::try_from(values);
    assert_eq!(list.is_ok(), fits);
}

#[rstest]
fn meta_fields_are_truncated() {
    let long = "x".repeat(300);
    let meta = MetaInformation::new(&long)
        .with_author(&long)
        .with_description(&long);

    assert_eq!(meta.name().len(), MAXIMUM_META_FIELD_LENGTH);
    assert_eq!(meta.author().len(), MAXIMUM_META_FIELD_LENGTH);
    assert_eq!(meta.description().len(), MAXIMUM_DESCRIPTION_LENGTH);
}

#[rstest]
fn meta_truncation_respects_char_boundaries() {
    // 49 ASCII bytes followed by a two byte character straddling the limit.
    let name = format!("{}é", "a".repeat(MAXIMUM_META_FIELD_LENGTH - 1));
    let meta = MetaInformation::new(&name);
    assert_eq!(meta.name(), "a".repeat(MAXIMUM_META_FIELD_LENGTH - 1));
}

#[rstest]
fn slot_zero_owner_is_not_free() {
    let mut pool = TrampolinePool::with_len(4);
    let owner = TrampolineId::new(0);

    pool.claim(owner).unwrap();

    let slot = pool.get(0).unwrap();
    assert_eq!(slot.id(), 0);
    assert_eq!(slot.status(), TrampolineStatus::Used);
    assert!(slot.is_owned_by(owner));
    assert!(!pool.get(1).unwrap().is_owned_by(owner));
    assert_eq!(pool.owned_by(owner), 1);
}

#[rstest]
fn release_only_touches_owner() {
    let mut pool = TrampolinePool::with_len(4);
    let a = TrampolineId::new(1);
    let b = TrampolineId::new(2);
    pool.claim(a).unwrap().code_mut()[0] = 0xdead;
    pool.claim(b).unwrap();
    pool.claim(a).unwrap();

    assert_eq!(pool.find_owned(a, &[0xdead, 0, 0, 0]).map(|slot| slot.id()), Some(1));
    assert!(pool.find_owned(b, &[0xdead, 0, 0, 0]).is_none());
    assert_eq!(pool.release_owned_by(a), 2);
    assert_eq!(pool.owned_by(b), 1);
    assert!(pool.get(0).unwrap().is_free());
    assert_eq!(pool.get(0).unwrap().code(), &[0; 4]);
}

#[rstest]
fn exhausted_pool_claims_nothing() {
    let mut pool = TrampolinePool::with_len(1);
    assert!(pool.claim(TrampolineId::new(0)).is_some());
    assert!(pool.claim(TrampolineId::new(1)).is_none());
}

#[rstest]
fn fresh_registry() {
    let registry = Registry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.trampolines().len(), TRAMPOLINE_LIST_LENGTH);
    assert_eq!(registry.next_trampoline_id(), TrampolineId::new(0));
    assert!(registry.modules().is_empty());
}

#[rstest]
fn default_config() {
    let config = BackendConfig::default();
    assert_eq!(config.patch_region().address, PATCH_REGION_ADDRESS);
    assert_eq!(
        config.redirects().lookup("MEMFreeToDefaultHeap"),
        Some("MEMFreeToMappedMemory")
    );
    assert_eq!(config.redirects().lookup("OSReport"), None);
    assert!(AllocatorRedirects::none().redirects().is_empty());
}
