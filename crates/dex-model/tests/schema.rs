use dex_model::{ColumnMetadata, DatasetSpecification, MetadataSchema, ModelError};
use proptest::prelude::*;

fn hierarchy_schema(levels: &[(String, i32)]) -> Option<MetadataSchema> {
    let columns = levels
        .iter()
        .enumerate()
        .map(|(index, (hierarchy, level))| {
            ColumnMetadata::new(format!("col_{index}"))
                .with_group(if index % 2 == 0 { "even" } else { "odd" })
                .with_hierarchy(hierarchy.clone(), *level)
        })
        .collect();
    MetadataSchema::new("generated", columns).ok()
}

proptest! {
    #[test]
    fn hierarchy_columns_ascend_by_level(
        levels in prop::collection::vec((prop::sample::select(vec!["Geo", "Time"]), -5i32..20), 0..24)
    ) {
        let levels: Vec<(String, i32)> =
            levels.into_iter().map(|(h, l)| (h.to_string(), l)).collect();
        // Duplicate (hierarchy, level) pairs are rejected at load; skip them.
        let Some(schema) = hierarchy_schema(&levels) else {
            return Ok(());
        };
        for hierarchy in schema.hierarchies() {
            let members = schema.columns_in_hierarchy(hierarchy);
            let found: Vec<i32> = members
                .iter()
                .map(|c| c.level_in(hierarchy).expect("member has level"))
                .collect();
            prop_assert!(found.windows(2).all(|pair| pair[0] <= pair[1]));
            for column in members {
                prop_assert!(schema.lookup(&column.name).is_ok());
            }
        }
        for group in schema.groups() {
            for column in schema.columns_in_group(group) {
                prop_assert!(schema.lookup(&column.name).is_ok());
            }
        }
    }

    #[test]
    fn duplicate_levels_are_definition_errors(level in -5i32..20) {
        let columns = vec![
            ColumnMetadata::new("a").with_hierarchy("Geo", level),
            ColumnMetadata::new("b").with_hierarchy("Geo", level),
        ];
        let err = MetadataSchema::new("dup", columns).expect_err("duplicate level");
        prop_assert!(matches!(err, ModelError::SchemaParse { .. }), "unexpected error: {err}");
    }
}

#[test]
fn hierarchy_members_sort_by_level() {
    let schema = MetadataSchema::new(
        "geo",
        vec![
            ColumnMetadata::new("City").with_hierarchy("Geo", 3),
            ColumnMetadata::new("Country").with_hierarchy("Geo", 1),
            ColumnMetadata::new("State").with_hierarchy("Geo", 2),
            ColumnMetadata::new("Year").with_hierarchy("Time", 1),
            ColumnMetadata::new("Region").with_hierarchy("Sales Geo", 1),
            ColumnMetadata::new("Country (Sales)").with_hierarchy("Sales Geo", 2),
        ],
    )
    .expect("schema");
    let names: Vec<&str> = schema
        .columns_in_hierarchy("Geo")
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Country", "State", "City"]);
    assert_eq!(schema.hierarchies(), vec!["Geo", "Time", "Sales Geo"]);
}

#[test]
fn spec_file_round_trip() {
    let schema = MetadataSchema::load(
        r#"{"collection": {"name": "s", "items": [{"name": "Region"}, {"name": "Sales", "datatype": "double"}]}}"#,
    )
    .expect("schema");
    let spec = DatasetSpecification::builder("orders")
        .with_collection("Sales")
        .with_dimensions(["Region"])
        .with_measures(["Sales"])
        .build(&schema)
        .expect("spec");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("orders.json");
    spec.save(&path).expect("save");
    let reloaded = DatasetSpecification::load_file(&path, &schema).expect("reload");
    assert_eq!(reloaded, spec);
}
