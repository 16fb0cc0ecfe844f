//! Differential application of update descriptors on top of a prior
//! layout: renames, deletes, forbidden mutations, ID stability, and
//! layout-ID sequencing.

use strata_layout::{
    CellSchema, ColumnDesc, ColumnName, Error, FamilyDesc, LocalityGroupDesc, RowKeyEncoding,
    SchemaStorage, TableLayout, TableLayoutDesc,
};

fn inline_string() -> CellSchema {
    CellSchema::inline("\"string\"")
}

/// Table `users`, one locality group `default`, one group family `info`
/// with columns `c1` and `c2`.
fn two_column_prior() -> TableLayout {
    let desc = TableLayoutDesc::new(
        "users",
        RowKeyEncoding::Hashed,
        vec![LocalityGroupDesc::new(
            "default",
            3600,
            1,
            vec![FamilyDesc::group(
                "info",
                vec![
                    ColumnDesc::new("c1", inline_string()),
                    ColumnDesc::new("c2", inline_string()),
                ],
            )],
        )],
    );
    TableLayout::new(desc, None).unwrap()
}

fn invalid_layout_message(result: strata_layout::Result<TableLayout>) -> String {
    match result {
        Err(Error::InvalidLayout(message)) => message,
        other => panic!("expected InvalidLayout, got {other:?}"),
    }
}

#[test]
fn test_rename_column_preserves_id() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.layout_id = None;
    {
        let column = &mut update.locality_groups[0].families[0].columns[0];
        column.name = "d1".to_string();
        column.renamed_from = Some("c1".to_string());
    }
    // The caller's descriptor must be left untouched by the build.
    let callers_copy = update.clone();

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    assert_eq!(updated.layout_id(), "2");

    let family = updated.family("info").unwrap();
    let renamed = family.column("d1").unwrap();
    assert_eq!(renamed.id().value(), 1);
    assert!(family.column("c1").is_none());

    // Normalized descriptor has the rename annotation cleared.
    assert_eq!(renamed.desc().renamed_from, None);
    assert_eq!(
        callers_copy.locality_groups[0].families[0].columns[0].renamed_from,
        Some("c1".to_string())
    );
}

#[test]
fn test_rename_family_preserves_ids() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.layout_id = None;
    {
        let family = &mut update.locality_groups[0].families[0];
        family.name = "profile".to_string();
        family.renamed_from = Some("info".to_string());
    }

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    let family = updated.family("profile").unwrap();
    assert_eq!(family.id().value(), 1);
    assert_eq!(family.column("c1").unwrap().id().value(), 1);
    assert!(updated.family("info").is_none());
    assert!(updated.exists(&ColumnName::qualified("profile", "c2")));
}

#[test]
fn test_rename_locality_group_preserves_ids() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.layout_id = None;
    {
        let group = &mut update.locality_groups[0];
        group.name = "hot".to_string();
        group.renamed_from = Some("default".to_string());
    }

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    let group = updated.locality_group("hot").unwrap();
    assert_eq!(group.id().value(), 1);
    assert!(updated.locality_group("default").is_none());
    assert_eq!(updated.family("info").unwrap().locality_group(), "hot");
}

#[test]
fn test_rename_without_prior_rejected() {
    let prior = two_column_prior();
    let mut desc = prior.desc().clone();
    desc.locality_groups[0].families[0].columns[0].renamed_from = Some("old".to_string());

    let message = invalid_layout_message(TableLayout::new(desc, None));
    assert!(message.contains("Invalid renaming"), "{message}");
}

#[test]
fn test_rename_from_unknown_prior_column_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    {
        let column = &mut update.locality_groups[0].families[0].columns[0];
        column.name = "d1".to_string();
        column.renamed_from = Some("never_existed".to_string());
    }

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("cannot find column 'info:never_existed'"),
        "{message}"
    );
}

#[test]
fn test_orphan_prior_column_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].columns.remove(1);

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("missing columns"), "{message}");
    assert!(message.contains("c2"), "{message}");
}

#[test]
fn test_orphan_prior_family_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families.clear();

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("missing families"), "{message}");
    assert!(message.contains("info"), "{message}");
}

#[test]
fn test_orphan_prior_locality_group_rejected() {
    let desc = TableLayoutDesc::new(
        "users",
        RowKeyEncoding::Raw,
        vec![
            LocalityGroupDesc::new("hot", 3600, 1, Vec::new()),
            LocalityGroupDesc::new("cold", 86400, 1, Vec::new()),
        ],
    );
    let prior = TableLayout::new(desc, None).unwrap();

    let mut update = prior.desc().clone();
    update.locality_groups.remove(1);

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("Missing descriptor(s) for locality group(s): cold"),
        "{message}"
    );
}

#[test]
fn test_delete_column() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.layout_id = None;
    update.locality_groups[0].families[0].columns[1].delete = true;

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    let family = updated.family("info").unwrap();
    assert_eq!(family.columns().len(), 1);
    assert!(family.column("c2").is_none());
    assert!(!updated.exists(&ColumnName::qualified("info", "c2")));

    // The deleted entry is dropped from the normalized descriptor.
    assert_eq!(updated.desc().locality_groups[0].families[0].columns.len(), 1);
}

#[test]
fn test_deleted_column_id_is_reusable_in_the_same_build() {
    let prior = two_column_prior();
    assert_eq!(
        prior.family("info").unwrap().column("c2").unwrap().id().value(),
        2
    );

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].columns[1].delete = true;
    update.locality_groups[0]
        .families[0]
        .columns
        .push(ColumnDesc::new("c3", inline_string()));

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    // The smallest-free allocator hands c2's freed ID to the new column.
    assert_eq!(
        updated.family("info").unwrap().column("c3").unwrap().id().value(),
        2
    );
}

#[test]
fn test_delete_unknown_entities_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].columns.push(ColumnDesc {
        delete: true,
        ..ColumnDesc::new("ghost", inline_string())
    });
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("Deleted column 'info:ghost' does not exist"),
        "{message}"
    );

    let mut update = prior.desc().clone();
    update.locality_groups[0].families.push(FamilyDesc {
        delete: true,
        ..FamilyDesc::group("ghost", Vec::new())
    });
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("Deleted family 'ghost' unknown"),
        "{message}"
    );

    let mut update = prior.desc().clone();
    update.locality_groups.push(LocalityGroupDesc {
        delete: true,
        ..LocalityGroupDesc::new("ghost", 60, 1, Vec::new())
    });
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("delete locality group 'ghost'"),
        "{message}"
    );
}

#[test]
fn test_family_kind_flip_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    {
        let family = &mut update.locality_groups[0].families[0];
        family.columns.clear();
        family.map_schema = Some(CellSchema::inline("\"long\""));
    }

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("from group-type to map-type"),
        "{message}"
    );
}

#[test]
fn test_keys_format_change_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.keys_format = RowKeyEncoding::Raw;

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("row key encoding"), "{message}");
}

#[test]
fn test_column_storage_change_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].columns[0].column_schema =
        inline_string().with_storage(SchemaStorage::Uid);

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("cell storage HASH to UID"), "{message}");
}

#[test]
fn test_map_family_storage_change_rejected() {
    let desc = TableLayoutDesc::new(
        "events",
        RowKeyEncoding::Raw,
        vec![LocalityGroupDesc::new(
            "default",
            3600,
            1,
            vec![FamilyDesc::map("metrics", CellSchema::inline("\"long\""))],
        )],
    );
    let prior = TableLayout::new(desc, None).unwrap();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].map_schema =
        Some(CellSchema::inline("\"long\"").with_storage(SchemaStorage::Final));

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("cell storage HASH to FINAL"), "{message}");
}

#[test]
fn test_id_disagreement_with_prior_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families[0].columns[0].id = 5;
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("has ID 5 but prior ID is 1"),
        "{message}"
    );

    let mut update = prior.desc().clone();
    update.locality_groups[0].id = 3;
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("has ID 3 but prior ID is 1"),
        "{message}"
    );
}

#[test]
fn test_table_name_change_rejected() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.name = "other".to_string();

    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(
        message.contains("does not match prior layout name"),
        "{message}"
    );
}

#[test]
fn test_layout_id_sequencing() {
    let prior = two_column_prior();
    assert_eq!(prior.layout_id(), "1");

    // No explicit ID: auto-increment of the numeric prior.
    let mut update = prior.desc().clone();
    update.layout_id = None;
    let second = TableLayout::new(update, Some(&prior)).unwrap();
    assert_eq!(second.layout_id(), "2");

    // Explicit IDs are kept verbatim, numeric or not.
    let mut update = second.desc().clone();
    update.layout_id = Some("experimental-v3".to_string());
    let third = TableLayout::new(update, Some(&second)).unwrap();
    assert_eq!(third.layout_id(), "experimental-v3");

    // Auto-increment over a non-numeric prior ID has nothing to add to.
    let mut update = third.desc().clone();
    update.layout_id = None;
    let message = invalid_layout_message(TableLayout::new(update, Some(&third)));
    assert!(message.contains("invalid layout ID"), "{message}");
}

#[test]
fn test_rebuilding_concrete_descriptor_against_itself_is_identity() {
    let prior = two_column_prior();

    let rebuilt = TableLayout::new(prior.desc().clone(), Some(&prior)).unwrap();
    assert_eq!(rebuilt, prior);
    assert_eq!(rebuilt.layout_id(), prior.layout_id());
    assert_eq!(
        rebuilt.family("info").unwrap().column("c2").unwrap().id(),
        prior.family("info").unwrap().column("c2").unwrap().id()
    );
}

#[test]
fn test_family_cannot_move_between_locality_groups() {
    let desc = TableLayoutDesc::new(
        "users",
        RowKeyEncoding::Raw,
        vec![
            LocalityGroupDesc::new(
                "hot",
                3600,
                1,
                vec![FamilyDesc::group(
                    "info",
                    vec![ColumnDesc::new("c1", inline_string())],
                )],
            ),
            LocalityGroupDesc::new("cold", 86400, 1, Vec::new()),
        ],
    );
    let prior = TableLayout::new(desc, None).unwrap();

    let mut update = prior.desc().clone();
    let family = update.locality_groups[0].families.remove(0);
    update.locality_groups[1].families.push(family);

    // The family goes unaccounted for in its old group; moving is not a
    // recognised transition.
    let message = invalid_layout_message(TableLayout::new(update, Some(&prior)));
    assert!(message.contains("missing families"), "{message}");
}

#[test]
fn test_in_place_modification_keeps_ids() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.layout_id = None;
    update.locality_groups[0].ttl_seconds = 7200;
    update.locality_groups[0].in_memory = true;
    update.locality_groups[0].families[0].aliases = vec!["profile".to_string()];

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    let group = updated.locality_group("default").unwrap();
    assert_eq!(group.ttl_seconds(), 7200);
    assert!(group.in_memory());
    assert_eq!(group.id().value(), 1);
    assert_eq!(updated.family("profile").unwrap().id().value(), 1);
    assert_eq!(
        updated.family("profile").unwrap().column("c1").unwrap().id().value(),
        1
    );
}

#[test]
fn test_added_entities_get_smallest_free_ids() {
    let prior = two_column_prior();

    let mut update = prior.desc().clone();
    update.locality_groups[0].families.push(FamilyDesc::group(
        "extra",
        vec![ColumnDesc::new("x", inline_string())],
    ));
    update.locality_groups.push(LocalityGroupDesc::new("cold", 86400, 1, Vec::new()));

    let updated = TableLayout::new(update, Some(&prior)).unwrap();
    assert_eq!(updated.family("extra").unwrap().id().value(), 2);
    assert_eq!(updated.locality_group("cold").unwrap().id().value(), 2);
}
