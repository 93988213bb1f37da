//! Unit tests for the Identifiers module

use core_kernel::{ClaimId, RuleId, UserId, CompanyId, EventId};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(ClaimId::new(), ClaimId::new());
}

#[test]
fn test_new_v7_generates_time_ordered_ids() {
    let id1 = ClaimId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let id2 = ClaimId::new_v7();
    let uuid1: Uuid = id1.into();
    let uuid2: Uuid = id2.into();
    assert!(uuid1 < uuid2);
}

#[test]
fn test_prefixes() {
    assert_eq!(ClaimId::prefix(), "EXP");
    assert_eq!(RuleId::prefix(), "RULE");
    assert_eq!(UserId::prefix(), "USR");
    assert_eq!(CompanyId::prefix(), "CMP");
    assert_eq!(EventId::prefix(), "EVT");
}

#[test]
fn test_from_str_with_prefix() {
    let original = RuleId::new();
    let parsed: RuleId = original.to_string().parse().unwrap();
    assert_eq!(original, parsed);
}

#[test]
fn test_from_str_rejects_garbage() {
    assert!("USR-not-a-uuid".parse::<UserId>().is_err());
}

#[test]
fn test_json_is_bare_uuid() {
    let uuid = Uuid::new_v4();
    let id = UserId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", uuid));
    let back: UserId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
