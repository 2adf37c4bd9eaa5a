//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gatehouse_core::{
  audit::{AuditEntity, AuditEvent, AuditOperation, AuditSink},
  filter::{DateRange, VisitFilter},
  store::{UserDirectory, VisitorStore},
  visitor::{StaffUser, Visitor, VisitorType},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, day, hour, min, 0).unwrap()
}

fn visitor(cin: &str, entered: DateTime<Utc>) -> Visitor {
  Visitor {
    id:           Uuid::new_v4(),
    cin:          cin.into(),
    last_name:    Some("Gharbi".into()),
    first_name:   Some("Sami".into()),
    fiscal_id:    "1234567A".into(),
    visitor_type: VisitorType::PatientVisitor,
    entered_at:   entered,
    exited_at:    None,
    observation:  Some("routine visit".into()),
    details:      None,
    entered_by:   "clerk".into(),
    exited_by:    None,
  }
}

fn closed(cin: &str, entered: DateTime<Utc>, exited: DateTime<Utc>) -> Visitor {
  let mut v = visitor(cin, entered);
  v.exited_at = Some(exited);
  v.exited_by = Some("clerk".into());
  v
}

fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, d).unwrap() }

// ─── Visitors ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_roundtrip() {
  let s = store().await;
  let v = visitor("12345678", at(6, 9, 0));

  s.insert_visitor(&v).await.unwrap();

  let fetched = s.get_visitor(v.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, v.id);
  assert_eq!(fetched.cin, "12345678");
  assert_eq!(fetched.last_name.as_deref(), Some("Gharbi"));
  assert_eq!(fetched.fiscal_id, "1234567A");
  assert_eq!(fetched.visitor_type, VisitorType::PatientVisitor);
  assert_eq!(fetched.entered_at, v.entered_at);
  assert!(fetched.exited_at.is_none());
  assert_eq!(fetched.observation.as_deref(), Some("routine visit"));
  assert_eq!(fetched.entered_by, "clerk");
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get_visitor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_persists_exit_fields() {
  let s = store().await;
  let mut v = visitor("12345678", at(6, 9, 0));
  s.insert_visitor(&v).await.unwrap();

  v.exited_at = Some(at(6, 11, 30));
  v.exited_by = Some("supervisor".into());
  s.update_visitor(&v).await.unwrap();

  let fetched = s.get_visitor(v.id).await.unwrap().unwrap();
  assert_eq!(fetched.exited_at, Some(at(6, 11, 30)));
  assert_eq!(fetched.exited_by.as_deref(), Some("supervisor"));
}

#[tokio::test]
async fn delete_reports_whether_a_row_existed() {
  let s = store().await;
  let v = visitor("12345678", at(6, 9, 0));
  s.insert_visitor(&v).await.unwrap();

  assert!(s.delete_visitor(v.id).await.unwrap());
  assert!(!s.delete_visitor(v.id).await.unwrap());
  assert!(s.get_visitor(v.id).await.unwrap().is_none());
}

// ─── Active-CIN lookup and constraint ────────────────────────────────────────

#[tokio::test]
async fn find_active_by_cin_sees_only_open_visits() {
  let s = store().await;
  let open = visitor("12345678", at(6, 9, 0));
  let old = closed("87654321", at(5, 9, 0), at(5, 10, 0));
  s.insert_visitor(&open).await.unwrap();
  s.insert_visitor(&old).await.unwrap();

  let found = s.find_active_by_cin("12345678").await.unwrap().unwrap();
  assert_eq!(found.id, open.id);

  assert!(s.find_active_by_cin("87654321").await.unwrap().is_none());
  assert!(s.find_active_by_cin("00000000").await.unwrap().is_none());
}

#[tokio::test]
async fn partial_index_rejects_a_second_open_visit_per_cin() {
  let s = store().await;
  s.insert_visitor(&visitor("12345678", at(6, 9, 0))).await.unwrap();

  // A raced-in duplicate bypassing the service check is still rejected.
  let err = s
    .insert_visitor(&visitor("12345678", at(6, 9, 1)))
    .await
    .unwrap_err();
  assert!(
    matches!(err, crate::Error::ActiveCinConstraint(ref cin) if cin == "12345678")
  );

  // A closed visit with the same CIN is fine, and so is a new open one
  // afterwards.
  s.insert_visitor(&closed("12345678", at(4, 9, 0), at(4, 10, 0)))
    .await
    .unwrap();
  let mut reopened = visitor("12345678", at(7, 8, 0));
  reopened.id = Uuid::new_v4();
  let err = s.insert_visitor(&reopened).await.unwrap_err();
  assert!(matches!(err, crate::Error::ActiveCinConstraint(_)));
}

#[tokio::test]
async fn cin_is_insertable_again_after_the_open_visit_closes() {
  let s = store().await;
  let mut first = visitor("12345678", at(6, 9, 0));
  s.insert_visitor(&first).await.unwrap();

  first.exited_at = Some(at(6, 10, 0));
  s.update_visitor(&first).await.unwrap();

  s.insert_visitor(&visitor("12345678", at(6, 11, 0))).await.unwrap();
}

// ─── Filtered listing ────────────────────────────────────────────────────────

#[tokio::test]
async fn filters_match_the_reference_semantics() {
  let s = store().await;
  // A enters at 09:00 and stays; B enters 09:30 and leaves 10:00.
  let a = visitor("11111111", at(1, 9, 0));
  let b = closed("22222222", at(1, 9, 30), at(1, 10, 0));
  s.insert_visitor(&a).await.unwrap();
  s.insert_visitor(&b).await.unwrap();

  let window = DateRange { from: day(1), to: day(1) };

  let open = s.list_filtered(VisitFilter::EnteredOpen, &window).await.unwrap();
  assert_eq!(open.iter().map(|v| v.id).collect::<Vec<_>>(), vec![a.id]);

  let exited = s
    .list_filtered(VisitFilter::ExitedInRange, &window)
    .await
    .unwrap();
  assert_eq!(exited.iter().map(|v| v.id).collect::<Vec<_>>(), vec![b.id]);

  let any = s.list_filtered(VisitFilter::Any, &window).await.unwrap();
  assert_eq!(any.len(), 2);
}

#[tokio::test]
async fn exited_in_range_excludes_visits_that_entered_before_the_window() {
  let s = store().await;
  let straddling = closed("33333333", at(1, 22, 0), at(2, 8, 0));
  s.insert_visitor(&straddling).await.unwrap();

  let window = DateRange { from: day(2), to: day(2) };

  let exited = s
    .list_filtered(VisitFilter::ExitedInRange, &window)
    .await
    .unwrap();
  assert!(exited.is_empty());

  // The OR filter still finds it through the exit bound.
  let any = s.list_filtered(VisitFilter::Any, &window).await.unwrap();
  assert_eq!(any.len(), 1);
}

#[tokio::test]
async fn list_entered_between_ignores_exit_state_but_honours_bounds() {
  let s = store().await;
  s.insert_visitor(&visitor("11111111", at(1, 9, 0))).await.unwrap();
  s.insert_visitor(&closed("22222222", at(2, 9, 0), at(2, 10, 0)))
    .await
    .unwrap();
  s.insert_visitor(&visitor("33333333", at(5, 9, 0))).await.unwrap();

  let window = DateRange { from: day(1), to: day(2) };
  let entered = s.list_entered_between(&window).await.unwrap();
  let mut cins: Vec<_> = entered.iter().map(|v| v.cin.as_str()).collect();
  cins.sort();
  assert_eq!(cins, vec!["11111111", "22222222"]);
}

// ─── Staff users ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_roundtrip_and_duplicate_rejection() {
  let s = store().await;
  let user = StaffUser {
    username:      "clerk".into(),
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
    created_at:    at(1, 8, 0),
  };

  s.add_user(&user).await.unwrap();
  assert!(s.user_exists("clerk").await.unwrap());
  assert!(!s.user_exists("ghost").await.unwrap());

  let fetched = s.find_user("clerk").await.unwrap().unwrap();
  assert_eq!(fetched.username, "clerk");
  assert_eq!(fetched.password_hash, user.password_hash);
  assert_eq!(fetched.created_at, user.created_at);

  let err = s.add_user(&user).await.unwrap_err();
  assert!(matches!(err, crate::Error::UserExists(ref name) if name == "clerk"));
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn audit_events_are_listed_newest_first_with_entity_filter() {
  let s = store().await;
  let v = visitor("12345678", at(6, 9, 0));

  s.record(AuditEvent::visitor(AuditOperation::Create, &v, Some("clerk")).unwrap())
    .await
    .unwrap();
  s.record(AuditEvent::visitor(AuditOperation::Update, &v, Some("clerk")).unwrap())
    .await
    .unwrap();
  let user = StaffUser {
    username:      "clerk".into(),
    password_hash: "hash".into(),
    created_at:    at(1, 8, 0),
  };
  s.record(AuditEvent::user(AuditOperation::Create, &user, None).unwrap())
    .await
    .unwrap();

  let all = s.recent(None, 10).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].entity, AuditEntity::User);
  assert_eq!(all[1].operation, AuditOperation::Update);
  assert_eq!(all[2].operation, AuditOperation::Create);

  let visitors_only = s.recent(Some(AuditEntity::Visitor), 10).await.unwrap();
  assert_eq!(visitors_only.len(), 2);
  assert!(visitors_only.iter().all(|r| r.entity == AuditEntity::Visitor));
  assert_eq!(visitors_only[0].entity_id, v.id.to_string());

  // Snapshot carries the full record.
  assert_eq!(
    visitors_only[0].snapshot.get("cin").and_then(|c| c.as_str()),
    Some("12345678")
  );

  let limited = s.recent(None, 2).await.unwrap();
  assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn user_audit_snapshots_never_contain_the_password_hash() {
  let s = store().await;
  let user = StaffUser {
    username:      "clerk".into(),
    password_hash: "$argon2id$secret".into(),
    created_at:    at(1, 8, 0),
  };

  s.record(AuditEvent::user(AuditOperation::Create, &user, None).unwrap())
    .await
    .unwrap();

  let trail = s.recent(Some(AuditEntity::User), 1).await.unwrap();
  assert!(trail[0].snapshot.get("password_hash").is_none());
}
