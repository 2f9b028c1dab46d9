mod common;

use common::Sidecar;
use serde_json::{json, Value};

fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("array")
        .iter()
        .map(|r| r["personName"].as_str().expect("name").to_string())
        .collect()
}

#[test]
fn documenting_a_course_records_present_and_absent_members() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let other = sc.create_group("Bienen");
    let sid = sc.create_subject("Experimente");
    let anna = sc.create_person("Anna", "Berg", &gid);
    let ben = sc.create_person("Ben", "Vogel", &gid);
    let cem = sc.create_person("Cem", "Yilmaz", &gid);
    let outsider = sc.create_person("Dora", "Kern", &other);

    let roster = sc.ok("courses.roster", json!({ "groupId": gid }));
    assert_eq!(roster["persons"].as_array().expect("persons").len(), 3);

    let res = sc.ok(
        "courses.document",
        json!({
            "subjectId": sid,
            "groupId": gid,
            "date": "2026-10-13",
            "period": "3.AP",
            "topic": "Wasser",
            "absentIds": [ben, outsider],
            "notInCourseIds": [cem],
            "notes": { anna.as_str(): "hat geholfen", ben.as_str(): "krank" }
        }),
    );
    assert_eq!(res["present"], 1);
    assert_eq!(res["absent"], 1);
    assert_eq!(sc.count_rows("attendance_records"), 2);

    let fid = res["feedbackId"].as_str().expect("feedbackId").to_string();
    let detail = sc.ok("courses.get", json!({ "feedbackId": fid }));
    assert_eq!(detail["feedback"]["topic"], "Wasser");
    assert_eq!(detail["feedback"]["groupName"], "Ameisen");
    assert_eq!(names(&detail["attendance"]["present"]), vec!["Anna Berg"]);
    assert_eq!(names(&detail["attendance"]["absent"]), vec!["Ben Vogel"]);
    assert_eq!(detail["attendance"]["present"][0]["note"], "hat geholfen");
    // The typed note is replaced by the fixed absence note.
    assert_eq!(detail["attendance"]["absent"][0]["note"], "nicht da");

    let ben_view = sc.ok("persons.get", json!({ "personId": ben }));
    let absent = &ben_view["attendance"]["absent"][0];
    assert_eq!(absent["subjectName"], "Experimente");
    assert_eq!(absent["date"], "2026-10-13");

    let cem_view = sc.ok("persons.get", json!({ "personId": cem }));
    assert_eq!(cem_view["attendance"]["present"], json!([]));
    assert_eq!(cem_view["attendance"]["absent"], json!([]));

    let dora_view = sc.ok("persons.get", json!({ "personId": outsider }));
    assert_eq!(dora_view["attendance"]["absent"], json!([]));
}

#[test]
fn absent_and_not_in_course_counts_as_absent() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let sid = sc.create_subject("Experimente");
    let anna = sc.create_person("Anna", "Berg", &gid);
    let res = sc.ok(
        "courses.document",
        json!({
            "subjectId": sid,
            "groupId": gid,
            "date": "2026-10-13",
            "period": "1.AP",
            "topic": "Luft",
            "absentIds": [anna],
            "notInCourseIds": [anna]
        }),
    );
    assert_eq!(res["absent"], 1);
    assert_eq!(res["present"], 0);
}

#[test]
fn invalid_course_submission_writes_nothing() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let e = sc.fail(
        "courses.document",
        json!({ "groupId": gid, "date": "gestern", "period": "1.AP" }),
    );
    assert_eq!(e["code"], "validation_failed");
    let fields = &e["details"]["fields"];
    assert_eq!(fields["subjectId"], "this field is required");
    assert_eq!(fields["topic"], "this field is required");
    assert!(fields["date"].is_string());
    assert_eq!(e["details"]["form"]["date"], "gestern");

    let e = sc.fail(
        "courses.document",
        json!({
            "subjectId": "nope",
            "groupId": gid,
            "date": "2026-10-13",
            "period": "1.AP",
            "topic": "Luft"
        }),
    );
    assert_eq!(e["code"], "validation_failed");
    assert!(e["details"]["fields"]["subjectId"].is_string());
    assert_eq!(sc.count_rows("course_feedback"), 0);
}

#[test]
fn roster_without_group_is_empty_and_unknown_feedback_is_not_found() {
    let mut sc = Sidecar::spawn();
    let roster = sc.ok("courses.roster", json!({}));
    assert_eq!(roster["persons"], json!([]));
    let e = sc.fail("courses.get", json!({ "feedbackId": "nope" }));
    assert_eq!(e["code"], "not_found");
}
