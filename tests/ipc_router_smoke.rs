mod common;

use common::Sidecar;
use serde_json::json;

#[test]
fn health_reports_version_and_no_workspace() {
    let mut sc = Sidecar::spawn_bare();
    let res = sc.ok("health", json!({}));
    assert_eq!(res["version"], env!("CARGO_PKG_VERSION"));
    assert!(res["workspacePath"].is_null());
}

#[test]
fn data_methods_require_a_workspace() {
    let mut sc = Sidecar::spawn_bare();
    for method in ["persons.list", "groups.list", "subjects.list", "sessions.recent"] {
        let e = sc.fail(method, json!({ "subjectId": "x" }));
        assert_eq!(e["code"], "no_workspace", "{}", method);
    }
}

#[test]
fn unknown_methods_and_bad_lines_are_reported() {
    let mut sc = Sidecar::spawn();
    let e = sc.fail("persons.delete", json!({}));
    assert_eq!(e["code"], "not_implemented");

    let resp = sc.send_raw("{not json");
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "bad_json");

    // The loop keeps serving after a bad line.
    sc.ok("health", json!({}));
}

#[test]
fn router_dispatch_covers_every_handler_family() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let sid = sc.create_subject("Mathe");
    let pid = sc.create_person("Anna", "Berg", &gid);

    let calls = vec![
        ("groups.list", json!({})),
        ("persons.list", json!({})),
        ("persons.get", json!({ "personId": pid })),
        ("persons.search", json!({ "q": "an" })),
        ("subjects.list", json!({})),
        ("schedule.currentPeriod", json!({ "time": "10:45" })),
        ("sessions.prepare", json!({ "subjectId": sid })),
        ("sessions.recent", json!({ "subjectId": sid })),
        ("topics.suggest", json!({ "personId": pid, "subjectId": sid })),
        ("courses.roster", json!({ "groupId": gid })),
        ("performance.list", json!({ "personId": pid })),
    ];
    for (method, params) in calls {
        sc.ok(method, params);
    }
}

#[test]
fn current_period_follows_the_start_table() {
    let mut sc = Sidecar::spawn_bare();
    let res = sc.ok("schedule.currentPeriod", json!({ "time": "07:00" }));
    assert_eq!(res["period"], "0.AP");
    let res = sc.ok("schedule.currentPeriod", json!({ "time": "10:30" }));
    assert_eq!(res["period"], "2.AP");
    assert_eq!(res["index"], 2);
    let res = sc.ok("schedule.currentPeriod", json!({ "time": "23:59" }));
    assert_eq!(res["period"], "6.AP");
    assert_eq!(res["periods"].as_array().map(Vec::len), Some(7));

    let e = sc.fail("schedule.currentPeriod", json!({ "time": "halb zehn" }));
    assert_eq!(e["code"], "bad_params");
}
