/*!
 * Source and observation workflows through both deployments
 */

use chrono::{TimeZone, Utc};

use hera_db::database::{
    rows, Database, Filter, IdPolicy, ObservationRecord, Repository, SourceRecord, Table, Value,
};
use hera_db::errors::DatabaseError;

use crate::common;

fn mc_repo() -> (tempfile::TempDir, Repository) {
    let dir = common::create_temp_dir().unwrap();
    let repo = common::open_repo(&dir, Database::MonitorControl).unwrap();
    (dir, repo)
}

#[test]
fn test_sourceWorkflow_insertThenFindByAuthenticator_shouldMatch() {
    let (_dir, repo) = mc_repo();
    let created = Utc.with_ymd_and_hms(2016, 11, 30, 23, 59, 59).unwrap();
    let source = SourceRecord::new("correlator", "b0a6f1").with_create_time(created);

    let id = repo.insert_source(&source).unwrap();
    let found = repo
        .find_source_by_authenticator("b0a6f1")
        .unwrap()
        .expect("source should be found");

    assert_eq!(found.id, id);
    assert_eq!(found.name, "correlator");
    assert_eq!(found.authenticator, "b0a6f1");
    assert_eq!(found.create_time, created);
}

#[test]
fn test_sourceWorkflow_twoInserts_shouldYieldIncreasingIds() {
    let (_dir, repo) = mc_repo();

    let first = repo.insert_source(&SourceRecord::new("one", "t1")).unwrap();
    let second = repo.insert_source(&SourceRecord::new("two", "t2")).unwrap();

    assert!(second > first);
}

#[test]
fn test_observationWorkflow_mc_shouldFilterBySource() {
    let (_dir, repo) = mc_repo();
    let rtp = repo.insert_source(&SourceRecord::new("rtp", "a")).unwrap();
    let other = repo.insert_source(&SourceRecord::new("other", "b")).unwrap();
    let id = repo
        .insert_observation_mc(&ObservationRecord::new(rtp, 2457458.16, "xx", 0.00696))
        .unwrap();
    repo.insert_observation_mc(&ObservationRecord::new(other, 2457458.17, "yy", 0.00696))
        .unwrap();

    let filter = Filter::eq("source_id", rtp).unwrap();
    let observations = repo.list_observations(Some(&filter)).unwrap();

    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].id, id);
    assert_eq!(observations[0].source_id, rtp);
}

#[test]
fn test_observationWorkflow_librarian_shouldStoreCallerIds() {
    let dir = common::create_temp_dir().unwrap();
    let repo = common::open_repo(&dir, Database::Librarian).unwrap();
    let source = repo.insert_source(&SourceRecord::new("mc-upload", "tok")).unwrap();

    for obsid in [1_172_794_666_i64, 1_172_795_266] {
        let record = ObservationRecord::new(source, 2457813.9, "xx", 0.0069).with_id(obsid);
        assert_eq!(repo.insert_observation_hl(&record).unwrap(), obsid);
    }

    let ids: Vec<i64> = repo
        .list_observations(None)
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&1_172_794_666));
    assert!(ids.contains(&1_172_795_266));
}

#[test]
fn test_observationWorkflow_librarianFromFileName_shouldStoreObsid() {
    let dir = common::create_temp_dir().unwrap();
    let repo = common::open_repo(&dir, Database::Librarian).unwrap();
    let source = repo.insert_source(&SourceRecord::new("rtp", "tok")).unwrap();
    let record =
        ObservationRecord::from_file_name(source, "zen.2457754.50000.xx.HH.uv", 0.0069).unwrap();

    let id = repo.insert_observation_hl(&record).unwrap();
    let stored = repo.get_observation(id).unwrap().expect("observation stored");

    assert_eq!(id, 1_167_264_018);
    assert_eq!(stored, record);
    assert_eq!(stored.obsid_calendar_date().unwrap(), "2017-01-01");
}

#[test]
fn test_observationWorkflow_deploymentPolicy_shouldDriveInsert() {
    let (_dir, repo) = mc_repo();
    let source = repo.insert_source(&SourceRecord::new("s", "t")).unwrap();
    let policy = repo.database().observation_id_policy();

    let id = repo
        .insert_observation(&ObservationRecord::new(source, 1.5, "xx", 0.5), policy)
        .unwrap();

    assert_eq!(policy, IdPolicy::Generated);
    assert_eq!(repo.last_insert_id(), id);
}

#[test]
fn test_lookup_withNonexistentIds_shouldReturnNoneNotError() {
    let (_dir, repo) = mc_repo();

    assert!(repo.get_source(404).unwrap().is_none());
    assert!(repo.get_observation(404).unwrap().is_none());
    assert!(rows::lookup_by_id(repo.connection(), Table::Source, 404).unwrap().is_none());
    assert!(repo.last_error().is_empty());
}

#[test]
fn test_enumerate_withoutFilter_shouldReturnEveryRow() {
    let (_dir, repo) = mc_repo();
    for i in 0..5 {
        repo.insert_source(&SourceRecord::new(format!("s{}", i), format!("t{}", i)))
            .unwrap();
    }

    let rows = rows::enumerate(repo.connection(), Table::Source, None).unwrap();

    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.table() == Table::Source));
    assert!(rows.iter().all(|r| matches!(r.get("id"), Some(Value::Integer(_)))));
}

#[test]
fn test_enumerate_withMalformedFilter_shouldSurfaceLastError() {
    let (_dir, repo) = mc_repo();
    let filter = Filter::new("no_such_column = ?", vec![Value::from(1)]);

    let result = repo.list_sources(Some(&filter));

    assert!(matches!(result, Err(DatabaseError::Query(_))));
    assert!(repo.last_error().contains("no_such_column"));
}

#[test]
fn test_filterValues_shouldNeverBeExecutedAsSql() {
    let (_dir, repo) = mc_repo();
    repo.insert_source(&SourceRecord::new("victim", "tok")).unwrap();

    let filter = Filter::eq("name", "x'; DROP TABLE source; --").unwrap();
    assert!(repo.list_sources(Some(&filter)).unwrap().is_empty());

    assert_eq!(repo.list_sources(None).unwrap().len(), 1);
}
