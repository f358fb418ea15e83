use super::*;

fn artifact(id: u64, golden: bool) -> Artifact {
    Artifact {
        id,
        filename: Artifact::filename_for("Duck", id),
        attributes: vec![Attribute {
            layer: "Background".to_string(),
            trait_type: "Scene".to_string(),
            value: "Blue".to_string(),
        }],
        golden,
    }
}

#[test]
fn filename_and_output_name_are_derived() {
    let a = artifact(7, false);
    assert_eq!(a.filename, "Duck#7");
    assert_eq!(a.output_file_name("mp4"), "Duck#7.mp4");
    assert_eq!(a.attribute_for("Background").unwrap().value, "Blue");
    assert!(a.attribute_for("Hat").is_none());
}

#[test]
fn json_shape_uses_trait_list_field_names() {
    let m = Manifest {
        artifacts: vec![artifact(1, true)],
    };
    let v = serde_json::to_value(&m).unwrap();
    assert_eq!(
        v,
        serde_json::json!([{
            "id": 1,
            "filename": "Duck#1",
            "traits": [{ "layer": "Background", "trait_type": "Scene", "value": "Blue" }],
            "goldenEgg": true
        }])
    );
}

#[test]
fn write_then_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("traitList.json");
    let m = Manifest {
        artifacts: vec![artifact(1, false), artifact(2, true)],
    };
    m.write_to_path(&path).unwrap();
    let back = Manifest::from_path(&path).unwrap();
    assert_eq!(back, m);
    assert_eq!(back.golden_count(), 1);
}

#[test]
fn limited_clamps_to_len() {
    let m = Manifest {
        artifacts: vec![artifact(1, false), artifact(2, false), artifact(3, false)],
    };
    assert_eq!(m.limited(None).len(), 3);
    assert_eq!(m.limited(Some(2)).len(), 2);
    assert_eq!(m.limited(Some(10)).len(), 3);
    assert_eq!(m.limited(Some(0)).len(), 0);
}

#[test]
fn missing_manifest_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Manifest::from_path(dir.path().join("nope.json")).is_err());
}
