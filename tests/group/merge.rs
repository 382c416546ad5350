use std::collections::HashSet;

use hkeydb::catalog::allocator::IdAllocator;
use hkeydb::catalog::catalog::Catalog;
use hkeydb::catalog::column::HIDDEN_PK_NAME;
use hkeydb::catalog::merge::SchemaMerge;
use hkeydb::catalog::name::TableName;
use hkeydb::catalog::osc::{ChangeType, PendingOsc, TableChange};
use hkeydb::catalog::r#type::DataType;
use hkeydb::catalog::schema::Schema;
use hkeydb::config::Config;
use hkeydb::error::{Error, Result};

use super::{join, merge_all, name, table};

#[test]
fn test_child_joins_parent_group() -> Result<()> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int)], true)?;
    table(&mut b, "o", &[("oid", DataType::Int), ("cid", DataType::Int)], true)?;
    table(&mut b, "i", &[("iid", DataType::Int), ("oid", DataType::Int)], true)?;
    join(&mut b, "c", "o", "cid", "cid")?;
    join(&mut b, "o", "i", "oid", "oid")?;

    let schema = merge_all(Schema::empty(), &b, &["c", "o", "i"])?;
    let c = schema.must_get_table(&name("c"))?;
    let o = schema.must_get_table(&name("o"))?;
    let i = schema.must_get_table(&name("i"))?;

    assert_eq!(Some(name("c")), c.group);
    assert_eq!(c.group, o.group);
    assert_eq!(o.group, i.group);
    assert_eq!(Some(0), c.depth);
    assert_eq!(o.depth.map(|it| it + 1), i.depth);
    assert_eq!(Some(name("o")), schema.parent_table(&name("i")).map(|it| it.name.clone()));
    assert_eq!(vec!["o/i"], o.child_joins);

    let group = schema.group(&name("c")).ok_or(Error::value("no group"))?;
    assert_eq!(vec![name("c"), name("o"), name("i")], group.tables);
    assert_eq!(1, schema.groups().count());
    Ok(())
}

#[test]
fn test_target_is_never_modified() -> Result<()> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int)], true)?;
    table(&mut b, "o", &[("oid", DataType::Int), ("cid", DataType::Int)], true)?;
    join(&mut b, "c", "o", "cid", "cid")?;

    let target = merge_all(Schema::empty(), &b, &["c"])?;
    let snapshot = target.clone();

    let merged = SchemaMerge::new(&target, &b, name("o")).merge()?;
    assert_eq!(snapshot, target);
    assert!(target.table(&name("o")).is_none());
    assert!(target.must_get_table(&name("c"))?.child_joins.is_empty());
    assert_eq!(vec!["c/o"], merged.must_get_table(&name("c"))?.child_joins);

    // a failing merge leaves it alone as well
    assert!(SchemaMerge::new(&merged, &b, name("o")).merge().is_err());
    assert_eq!(snapshot, target);
    Ok(())
}

#[test]
fn test_hidden_pk_follows_user_columns() -> Result<()> {
    setup!(b);
    table(&mut b, "t", &[("c1", DataType::Int), ("c2", DataType::Varchar(32))], false)?;

    let schema = merge_all(Schema::empty(), &b, &["t"])?;
    let t = schema.must_get_table(&name("t"))?;
    let names: Vec<&str> = t.columns_including_internal().iter().map(|it| it.name.as_str()).collect();
    assert_eq!(vec!["c1", "c2", HIDDEN_PK_NAME], names);

    let pk = t.column(HIDDEN_PK_NAME).ok_or(Error::value("no hidden pk"))?;
    assert_eq!(2, pk.position);
    assert_eq!(DataType::BigInt, pk.datatype);
    assert!(t.primary_key().is_none());
    assert_eq!(2, t.columns().count());
    Ok(())
}

#[test]
fn test_declared_pk_has_no_hidden_pk() -> Result<()> {
    setup!(b);
    table(&mut b, "t", &[("id", DataType::Int)], true)?;
    let schema = merge_all(Schema::empty(), &b, &["t"])?;
    let t = schema.must_get_table(&name("t"))?;
    assert!(!t.has_hidden_pk());
    let pk = t.primary_key().ok_or(Error::value("no pk"))?;
    assert_eq!(Some("index:test.t.PRIMARY"), pk.tree_name.as_deref());
    Ok(())
}

#[test]
fn test_ids_unique_across_reserved_schemas() -> Result<()> {
    setup!(b);
    for schema in ["test", "information_schema", "sys"] {
        for table in ["t1", "t2"] {
            b.table(schema, table)?;
            b.column(schema, table, "id", 0, DataType::Int, false)?;
        }
    }
    let mut schema = Schema::empty();
    for table in b.tables().map(|it| it.name.clone()).collect::<Vec<_>>() {
        schema = SchemaMerge::new(&schema, &b, table).merge()?;
    }

    let mut tables = HashSet::new();
    for table in schema.tables() {
        assert!(tables.insert(table.id), "duplicate table id {:?}", table.id);
    }
    let mut groups = HashSet::new();
    for group in schema.groups() {
        assert!(groups.insert(group.id), "duplicate group id {:?}", group.id);
    }
    assert_eq!(6, tables.len());
    assert_eq!(6, groups.len());
    schema.validate_ids()
}

#[test]
fn test_reserved_schemas_from_config() -> Result<()> {
    setup!(b);
    b.table("audit", "log")?;
    b.column("audit", "log", "id", 0, DataType::Int, false)?;
    b.table("test", "t")?;
    b.column("test", "t", "id", 0, DataType::Int, false)?;

    let cfg = Config { reserved_schemas: vec!["audit".to_string()], ..Config::new("")? };
    let target = Schema::empty();
    let schema = SchemaMerge::new(&target, &b, TableName::new("audit", "log"))
        .with_allocator(cfg.id_allocator(&target))
        .merge()?;
    let allocator = cfg.id_allocator(&schema);
    assert!(allocator.is_reserved(&TableName::new("audit", "log")));

    let schema = SchemaMerge::new(&schema, &b, name("t")).with_allocator(allocator).merge()?;
    // user space starts at 1, which the reserved table already took
    assert_eq!(Some(2), schema.must_get_table(&name("t"))?.id);
    Ok(())
}

#[test]
fn test_bad_parent_reference() -> Result<()> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int)], true)?;
    table(&mut b, "o", &[("oid", DataType::Int), ("cid", DataType::Int)], true)?;
    join(&mut b, "c", "o", "cid", "cid")?;
    // the parent is only declared, never merged
    let target = Schema::empty();
    assert_eq!(
        Err(Error::InvalidParentReference {
            join: "c/o".to_string(),
            child: name("o"),
            parent: name("c"),
        }),
        SchemaMerge::new(&target, &b, name("o")).merge()
    );
    assert!(target.is_empty());

    // a join to a table nowhere declared fails the same way
    table(&mut b, "x", &[("xid", DataType::Int), ("nid", DataType::Int)], true)?;
    join(&mut b, "nowhere", "x", "id", "nid")?;
    let target = merge_all(Schema::empty(), &b, &["c"])?;
    let result = SchemaMerge::new(&target, &b, name("x")).merge();
    assert!(matches!(result, Err(Error::InvalidParentReference { .. })));
    Ok(())
}

#[test]
fn test_join_column_types() -> Result<()> {
    setup!(b);
    table(&mut b, "p", &[("id", DataType::Int)], true)?;
    table(&mut b, "wide", &[("id", DataType::Int), ("pid", DataType::BigInt)], true)?;
    table(&mut b, "text", &[("id", DataType::Int), ("pid", DataType::Varchar(20))], true)?;
    join(&mut b, "p", "wide", "id", "pid")?;
    join(&mut b, "p", "text", "id", "pid")?;

    let target = merge_all(Schema::empty(), &b, &["p", "wide"])?;
    assert!(target.table(&name("wide")).is_some());

    assert_eq!(
        Err(Error::IncompatibleJoinColumnTypes {
            join: "p/text".to_string(),
            parent: name("p"),
            parent_column: "id".to_string(),
            parent_type: DataType::Int,
            child: name("text"),
            child_column: "pid".to_string(),
            child_type: DataType::Varchar(20),
        }),
        SchemaMerge::new(&target, &b, name("text")).merge()
    );
    Ok(())
}

#[test]
fn test_missing_join_column() -> Result<()> {
    setup!(b);
    table(&mut b, "p", &[("id", DataType::Int)], true)?;
    table(&mut b, "c", &[("id", DataType::Int), ("pid", DataType::Int)], true)?;
    join(&mut b, "p", "c", "nope", "pid")?;
    let target = merge_all(Schema::empty(), &b, &["p"])?;
    assert_eq!(
        Err(Error::NoSuchColumn { table: name("p"), column: "nope".to_string() }),
        SchemaMerge::new(&target, &b, name("c")).merge()
    );
    Ok(())
}

#[test]
fn test_identity_sequence_is_merged() -> Result<()> {
    setup!(b);
    table(&mut b, "t", &[("id", DataType::BigInt)], true)?;
    b.sequence("test", "t_seq", 1, 1, 1, i64::MAX, false)?;
    b.column_as_identity("test", "t", "id", "t_seq", true)?;

    let schema = merge_all(Schema::empty(), &b, &["t"])?;
    let sequence = schema.identity_generator(&name("t"), "id").ok_or(Error::value("no sequence"))?;
    assert_eq!(name("t_seq"), sequence.name);
    assert_eq!(Some("sequence:test.t_seq"), sequence.tree_name.as_deref());

    // a second table bound to the same sequence name collides
    table(&mut b, "u", &[("id", DataType::BigInt)], true)?;
    b.column_as_identity("test", "u", "id", "t_seq", false)?;
    assert_eq!(
        Err(Error::DuplicateName { kind: "sequence", name: "test.t_seq".to_string() }),
        SchemaMerge::new(&schema, &b, name("u")).merge()
    );
    Ok(())
}

#[test]
fn test_pending_osc_is_copied() -> Result<()> {
    setup!(b);
    table(&mut b, "_t_new", &[("id", DataType::Int)], true)?;
    let osc = PendingOsc::new(
        "t",
        vec![TableChange {
            change_type: ChangeType::Modify,
            old_name: Some("c1".to_string()),
            new_name: Some("c9".to_string()),
        }],
        vec![],
    );
    b.pending_osc("test", "_t_new", osc.clone())?;

    let schema = merge_all(Schema::empty(), &b, &["_t_new"])?;
    assert_eq!(Some(&osc), schema.must_get_table(&name("_t_new"))?.pending_osc.as_ref());
    Ok(())
}

#[test]
fn test_regraft_keeps_ids() -> Result<()> {
    setup!(b);
    table(&mut b, "t1", &[("id", DataType::Int)], true)?;
    table(&mut b, "t9", &[("id", DataType::Int)], true)?;

    // a previous generation that already assigned t9 its ids
    let mut allocator = IdAllocator::default();
    allocator.observe_table(&name("t9"), 6);
    allocator.observe_group(&name("t9"), 6);
    let previous = SchemaMerge::new(&Schema::empty(), &b, name("t9")).with_allocator(allocator).merge()?;

    let target = merge_all(Schema::empty(), &b, &["t1"])?;
    let schema = SchemaMerge::new(&target, &previous, name("t9")).merge()?;
    let t9 = schema.must_get_table(&name("t9"))?;
    assert_eq!(Some(7), t9.id);
    let group = schema.group(&name("t9")).ok_or(Error::value("no group"))?;
    assert_eq!(Some(7), group.id);
    assert_eq!(Some("group:test.t9"), group.tree_name.as_deref());

    // the same generation re-grafted next to a table with its id
    let previous = merge_all(Schema::empty(), &b, &["t9"])?;
    let result = SchemaMerge::new(&target, &previous, name("t9")).merge();
    assert!(matches!(result, Err(Error::DuplicateTableId { id: 1, .. })));
    Ok(())
}

#[test]
fn test_regraft_group_id_collision() -> Result<()> {
    setup!(b);
    table(&mut b, "t1", &[("id", DataType::Int)], true)?;
    table(&mut b, "t9", &[("id", DataType::Int)], true)?;

    // table ids are apart, group ids are not
    let mut allocator = IdAllocator::default();
    allocator.observe_table(&name("t0"), 4);
    let previous = SchemaMerge::new(&Schema::empty(), &b, name("t9")).with_allocator(allocator).merge()?;
    assert_eq!(Some(5), previous.must_get_table(&name("t9"))?.id);

    let target = merge_all(Schema::empty(), &b, &["t1"])?;
    assert_eq!(
        Err(Error::DuplicateGroupId { id: 1, existing: name("t1"), duplicate: name("t9") }),
        SchemaMerge::new(&target, &previous, name("t9")).merge()
    );
    Ok(())
}

#[test]
fn test_regraft_keeps_group_name() -> Result<()> {
    setup!(b);
    table(&mut b, "t", &[("id", DataType::Int)], true)?;
    let group = b.create_group("test", "grp")?;
    b.add_table_to_group(&group, "test", "t")?;
    b.grouping_is_complete()?;
    let previous = b.freeze()?;

    let schema = SchemaMerge::new(&Schema::empty(), &previous, name("t")).merge()?;
    assert!(schema.group(&name("t")).is_none());
    let grp = schema.group(&name("grp")).ok_or(Error::value("no group"))?;
    assert_eq!(name("t"), grp.root);
    assert_eq!(previous.group(&name("grp")).and_then(|it| it.id), grp.id);
    assert_eq!(Some("group:test.grp"), grp.tree_name.as_deref());
    assert_eq!(Some(name("grp")), schema.must_get_table(&name("t"))?.group);
    assert_eq!("GROUP test.grp\n  test.t\n", schema.to_string());
    Ok(())
}

#[test]
fn test_table_ids_exhausted() -> Result<()> {
    setup!(b);
    table(&mut b, "t1", &[("id", DataType::Int)], true)?;
    let mut allocator = IdAllocator::default();
    allocator.observe_table(&name("t0"), u32::MAX);

    let target = Schema::empty();
    assert_eq!(
        Err(Error::IdsExhausted { kind: "table", name: name("t1") }),
        SchemaMerge::new(&target, &b, name("t1")).with_allocator(allocator).merge()
    );
    assert!(target.is_empty());
    Ok(())
}

#[test]
fn test_sibling_order_follows_ordinals() -> Result<()> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int)], true)?;
    for (child, ordinal) in [("x", 3), ("y", 1), ("z", 2)] {
        table(&mut b, child, &[("id", DataType::Int), ("cid", DataType::Int)], true)?;
        join(&mut b, "c", child, "cid", "cid")?;
        b.table_ordinal("test", child, ordinal)?;
    }
    let schema = merge_all(Schema::empty(), &b, &["c", "x", "y", "z"])?;
    let children: Vec<&str> =
        schema.child_joins(&name("c")).iter().map(|it| it.child.table.as_str()).collect();
    assert_eq!(vec!["y", "z", "x"], children);
    Ok(())
}

#[test]
fn test_encode_decode() -> Result<()> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int)], true)?;
    table(&mut b, "o", &[("oid", DataType::Int), ("cid", DataType::Int)], false)?;
    join(&mut b, "c", "o", "cid", "cid")?;
    let schema = merge_all(Schema::empty(), &b, &["c", "o"])?;

    let decoded = Schema::decode(&schema.encode()?)?;
    assert_eq!(schema, decoded);
    assert_eq!(schema.to_string(), decoded.to_string());
    assert_eq!("GROUP test.c\n  test.c\n    test.o\n", schema.to_string());
    Ok(())
}
