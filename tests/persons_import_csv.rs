mod common;

use common::Sidecar;
use serde_json::json;

#[test]
fn windows_1252_semicolon_export_is_imported() {
    let mut sc = Sidecar::spawn();
    let upload = sc.path("export.csv");
    // "Jürgen" and "Förder" in cp1252; the second data row lacks a family name.
    let mut bytes: Vec<u8> = Vec::new();
    bytes.extend_from_slice(b"Vorname;Nachname;Spitzname;Lerngruppe;Stufe;Foerderbedarf\r\n");
    bytes.extend_from_slice(b"J\xFCrgen;M\xFCller;J\xFCrgi;Ameisen;5;F\xF6rder LRS\r\n");
    bytes.extend_from_slice(b"Ben;;;Ameisen;6;\r\n");
    bytes.extend_from_slice(b"Cleo;Arndt;;Ameisen;;\r\n");
    bytes.extend_from_slice(b"Dana;Roth;;Bienen;x;\r\n");
    std::fs::write(&upload, &bytes).expect("write upload");

    let report = sc.ok("persons.import", json!({ "path": upload }));
    assert_eq!(report["imported"], 3);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["groupsCreated"], 2);
    assert_eq!(report["delimiter"], ";");
    assert_eq!(report["encoding"], "windows-1252");

    let res = sc.ok("persons.search", json!({ "q": "jürgen" }));
    assert_eq!(res["results"][0]["display"], "Jürgen (Jürgi) Müller – Ameisen");

    let groups = sc.ok("groups.list", json!({}));
    let ameisen = groups["groups"]
        .as_array()
        .expect("groups")
        .iter()
        .find(|g| g["name"] == "Ameisen")
        .expect("Ameisen")
        .clone();
    assert_eq!(ameisen["personCount"], 2);
}

#[test]
fn existing_groups_are_reused_and_blank_grades_become_zero() {
    let mut sc = Sidecar::spawn();
    let gid = sc.create_group("Ameisen");
    let upload = sc.path("utf8.csv");
    std::fs::write(
        &upload,
        "\u{feff}vorname,nachname,lerngruppe,stufe\nAnna,Berg,Ameisen,\nOle,Hansen,,3\n",
    )
    .expect("write upload");

    let report = sc.ok("persons.import", json!({ "path": upload }));
    assert_eq!(report["imported"], 2);
    assert_eq!(report["groupsCreated"], 1);
    assert_eq!(report["encoding"], "utf-8");

    let list = sc.ok("persons.list", json!({}));
    let groups = list["groups"].as_array().expect("groups");
    let ameisen = groups.iter().find(|g| g["groupId"] == gid).expect("reused");
    assert_eq!(ameisen["persons"][0]["grade"], 0);
    assert!(groups.iter().any(|g| g["groupName"] == "Ohne Lerngruppe"));
}

#[test]
fn undecodable_upload_rejects_everything() {
    let mut sc = Sidecar::spawn();
    let upload = sc.path("broken.csv");
    std::fs::write(&upload, b"vorname;nachname\nAnna;Berg\nBen;Z\x81ll\n").expect("write upload");

    let e = sc.fail("persons.import", json!({ "path": upload }));
    assert_eq!(e["code"], "import_failed");
    assert_eq!(e["details"]["imported"], 0);
    assert_eq!(e["details"]["reason"], "decode");
    assert_eq!(sc.count_rows("persons"), 0);
    assert_eq!(sc.count_rows("learning_groups"), 0);
}

#[test]
fn missing_upload_is_not_found() {
    let mut sc = Sidecar::spawn();
    let e = sc.fail("persons.import", json!({ "path": sc.path("nope.csv") }));
    assert_eq!(e["code"], "not_found");
}
