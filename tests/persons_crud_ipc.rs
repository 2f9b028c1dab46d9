mod common;

use common::Sidecar;
use serde_json::json;

#[test]
fn create_get_and_update_a_person() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let other = sc.create_group("Bienen");

    let created = sc.ok(
        "persons.create",
        json!({
            "firstName": "Maximilian",
            "lastName": "Krause",
            "nickname": "Maxi",
            "groupId": gid,
            "grade": "6",
            "goals": "Bruchrechnung sicher"
        }),
    );
    let pid = created["personId"].as_str().expect("id").to_string();

    let detail = sc.ok("persons.get", json!({ "personId": pid }));
    assert_eq!(detail["person"]["firstName"], "Maximilian");
    assert_eq!(detail["person"]["grade"], 6);
    assert_eq!(detail["person"]["groupName"], "Ameisen");
    assert_eq!(detail["display"], "Maximilian (Maxi) Krause");
    assert_eq!(detail["weekGrids"], json!([]));

    sc.ok(
        "persons.update",
        json!({
            "personId": pid,
            "firstName": "Maximilian",
            "lastName": "Krause",
            "groupId": other,
            "grade": 7
        }),
    );
    let detail = sc.ok("persons.get", json!({ "personId": pid }));
    assert_eq!(detail["person"]["groupName"], "Bienen");
    assert_eq!(detail["person"]["grade"], 7);
    assert!(detail["person"]["nickname"].is_null());
}

#[test]
fn list_is_grouped_by_group_name() {
    let mut sc = Sidecar::spawn();
    let bienen = sc.create_group("Bienen");
    let ameisen = sc.create_group("Ameisen");
    sc.create_person("Ben", "Zoll", &bienen);
    sc.create_person("Cleo", "Arndt", &ameisen);
    sc.create_person("Anna", "Berg", &ameisen);

    let res = sc.ok("persons.list", json!({}));
    let groups = res["groups"].as_array().expect("groups");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["groupName"], "Ameisen");
    let names: Vec<&str> = groups[0]["persons"]
        .as_array()
        .expect("persons")
        .iter()
        .map(|p| p["firstName"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Anna", "Cleo"]);
    assert_eq!(groups[1]["groupName"], "Bienen");
}

#[test]
fn invalid_form_reports_fields_and_echoes_input() {
    let mut sc = Sidecar::spawn();
    let e = sc.fail(
        "persons.create",
        json!({ "firstName": "Anna", "grade": "viel" }),
    );
    assert_eq!(e["code"], "validation_failed");
    assert_eq!(e["details"]["fields"]["lastName"], "this field is required");
    assert_eq!(e["details"]["fields"]["grade"], "must be a whole number");
    assert_eq!(e["details"]["form"]["firstName"], "Anna");
    assert_eq!(sc.count_rows("persons"), 0);
}

#[test]
fn unknown_group_is_a_field_error() {
    let mut sc = Sidecar::spawn();
    let e = sc.fail(
        "persons.create",
        json!({ "firstName": "Anna", "lastName": "Berg", "groupId": "nope", "grade": 5 }),
    );
    assert_eq!(e["code"], "validation_failed");
    assert_eq!(e["details"]["fields"]["groupId"], "unknown group");
}

#[test]
fn missing_person_is_not_found() {
    let mut sc = Sidecar::spawn();
    let e = sc.fail("persons.get", json!({ "personId": "missing" }));
    assert_eq!(e["code"], "not_found");
    assert_eq!(e["details"]["entity"], "person");

    let gid = sc.create_group("Ameisen");
    let e = sc.fail(
        "persons.update",
        json!({
            "personId": "missing",
            "firstName": "A",
            "lastName": "B",
            "groupId": gid,
            "grade": 1
        }),
    );
    assert_eq!(e["code"], "not_found");
}

#[test]
fn duplicate_group_names_are_rejected() {
    let mut sc = Sidecar::spawn();
    sc.create_group("Ameisen");
    let e = sc.fail("groups.create", json!({ "name": "Ameisen" }));
    assert_eq!(e["code"], "validation_failed");
    assert!(e["details"]["fields"]["name"].is_string());

    let res = sc.ok("groups.list", json!({}));
    assert_eq!(res["groups"].as_array().map(Vec::len), Some(1));
    assert_eq!(res["groups"][0]["personCount"], 0);
}
