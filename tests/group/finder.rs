use hkeydb::catalog::r#type::{DataType, Value};
use hkeydb::catalog::schema::Schema;
use hkeydb::config::Config;
use hkeydb::error::Result;
use hkeydb::sql::optimizer::group_join_finder::GroupJoinFinder;
use hkeydb::sql::plan::expr::{ConditionExpr, Expr, Operator, SourceId};
use hkeydb::sql::plan::join::{JoinType, Joinable, SubquerySource, TableSource};

use super::{join, merge_all, name, table};

// Group c: c -> x, y, z with pinned ordinals. Group p: p.
fn schema() -> Result<Schema> {
    setup!(b);
    table(&mut b, "c", &[("cid", DataType::Int), ("name", DataType::Varchar(32))], true)?;
    for (child, ordinal) in [("x", 3), ("y", 1), ("z", 2)] {
        table(&mut b, child, &[("id", DataType::Int), ("cid", DataType::Int)], true)?;
        join(&mut b, "c", child, "cid", "cid")?;
        b.table_ordinal("test", child, ordinal)?;
    }
    table(&mut b, "p", &[("pid", DataType::Int)], true)?;
    merge_all(Schema::empty(), &b, &["c", "x", "y", "z", "p"])
}

fn scan(schema: &Schema, id: SourceId, table: &str) -> Result<Joinable> {
    Ok(Joinable::Table(TableSource::try_new(schema, id, name(table), None)?))
}

fn col(id: SourceId, table: &str, column: &str) -> Expr {
    Expr::column(id, name(table), column)
}

fn join_on_cid(schema: &Schema, join_type: JoinType, left: (SourceId, &str), right: (SourceId, &str)) -> Result<Joinable> {
    Ok(Joinable::join(
        scan(schema, left.0, left.1)?,
        scan(schema, right.0, right.1)?,
        join_type,
        vec![Expr::eq(col(left.0, left.1, "cid"), col(right.0, right.1, "cid"))],
    ))
}

#[test]
fn test_parent_child_becomes_one_tree() -> Result<()> {
    let s = schema()?;
    let mut plan = join_on_cid(&s, JoinType::Inner, (0, "c"), (1, "x"))?;
    GroupJoinFinder::new(&s).apply(&mut plan);

    let Joinable::GroupJoinTree(tree) = &plan else {
        panic!("expect a group join tree, got {plan:?}");
    };
    assert_eq!(name("c"), tree.group);
    assert_eq!(name("c"), tree.root.table.name);
    assert_eq!(1, tree.root.children.len());
    let child = &tree.root.children[0];
    assert_eq!(name("x"), child.table.name);
    assert!(child.conditions.iter().all(|it| it.is_group_join()));
    assert_eq!(vec![0, 1], plan.sources());
    Ok(())
}

#[test]
fn test_left_join_conditions() -> Result<()> {
    let s = schema()?;
    let finder = GroupJoinFinder::new(&s);

    // a condition on the preserved side keeps the clustering
    let mut plan = join_on_cid(&s, JoinType::Left, (0, "c"), (1, "y"))?;
    if let Joinable::Join(join) = &mut plan {
        let extra = Expr::binary(col(0, "c", "name"), Operator::NotEq, Expr::Value(Value::String("a".into())));
        join.conditions.push(ConditionExpr::new(extra));
    }
    finder.apply(&mut plan);
    assert!(matches!(plan, Joinable::GroupJoinTree(_)));

    // one on the optional side does not
    let mut plan = join_on_cid(&s, JoinType::Left, (0, "c"), (1, "y"))?;
    if let Joinable::Join(join) = &mut plan {
        let extra = Expr::binary(col(1, "y", "id"), Operator::Gt, Expr::Value(Value::Integer(10)));
        join.conditions.push(ConditionExpr::new(extra));
    }
    finder.apply(&mut plan);
    let Joinable::Join(join) = &plan else {
        panic!("expect a join, got {plan:?}");
    };
    assert!(matches!(join.left.as_ref(), Joinable::GroupJoinTree(_)));
    assert!(matches!(join.right.as_ref(), Joinable::GroupJoinTree(_)));
    // the join is planned as written, so its conditions are evaluated again
    assert!(join.conditions.iter().all(|it| !it.is_group_join()));
    Ok(())
}

#[test]
fn test_right_join_conditions() -> Result<()> {
    let s = schema()?;
    let finder = GroupJoinFinder::new(&s);

    // x is preserved, a condition on it keeps the clustering
    let mut plan = join_on_cid(&s, JoinType::Right, (0, "c"), (1, "x"))?;
    if let Joinable::Join(join) = &mut plan {
        let extra = Expr::binary(col(1, "x", "id"), Operator::Gt, Expr::Value(Value::Integer(1)));
        join.conditions.push(ConditionExpr::new(extra));
    }
    finder.apply(&mut plan);
    let Joinable::GroupJoinTree(tree) = &plan else {
        panic!("expect a group join tree, got {plan:?}");
    };
    assert_eq!(Some(JoinType::Right), tree.root.children[0].join_type);

    // c is the optional side
    let mut plan = join_on_cid(&s, JoinType::Right, (0, "c"), (1, "x"))?;
    if let Joinable::Join(join) = &mut plan {
        let extra = Expr::binary(col(0, "c", "cid"), Operator::Gt, Expr::Value(Value::Integer(1)));
        join.conditions.push(ConditionExpr::new(extra));
    }
    finder.apply(&mut plan);
    let Joinable::Join(join) = &plan else {
        panic!("expect a join, got {plan:?}");
    };
    assert_eq!(JoinType::Right, join.join_type);
    assert!(matches!(join.left.as_ref(), Joinable::GroupJoinTree(_)));
    assert!(matches!(join.right.as_ref(), Joinable::GroupJoinTree(_)));
    assert!(join.conditions.iter().all(|it| !it.is_group_join()));
    Ok(())
}

#[test]
fn test_replace_input() -> Result<()> {
    let s = schema()?;
    let mut plan = join_on_cid(&s, JoinType::Inner, (0, "c"), (1, "x"))?;

    let old = plan.replace_input(1, scan(&s, 2, "y")?)?;
    assert!(matches!(&old, Joinable::Table(t) if t.name == name("x")));
    let old = plan.replace_input(0, scan(&s, 3, "z")?)?;
    assert!(matches!(&old, Joinable::Table(t) if t.name == name("c")));
    assert_eq!(vec![3, 2], plan.sources());
    assert!(plan.replace_input(2, scan(&s, 4, "p")?).is_err());

    let mut table = scan(&s, 0, "c")?;
    assert!(table.replace_input(0, scan(&s, 1, "x")?).is_err());

    let mut derived = Joinable::Subquery(SubquerySource { alias: "d".to_string(), input: Box::new(plan) });
    let old = derived.replace_input(0, scan(&s, 5, "p")?)?;
    assert!(matches!(old, Joinable::Join(_)));
    assert_eq!(vec![5], derived.sources());
    Ok(())
}

#[test]
fn test_siblings_follow_ordinals() -> Result<()> {
    let s = schema()?;
    let mut plan = join_on_cid(&s, JoinType::Inner, (0, "c"), (1, "x"))?;
    for (id, child) in [(2, "y"), (3, "z")] {
        plan = Joinable::join(
            plan,
            scan(&s, id, child)?,
            JoinType::Inner,
            vec![Expr::eq(col(0, "c", "cid"), col(id, child, "cid"))],
        );
    }
    GroupJoinFinder::new(&s).apply(&mut plan);

    let Joinable::GroupJoinTree(tree) = &plan else {
        panic!("expect a group join tree, got {plan:?}");
    };
    let children: Vec<&str> = tree.root.children.iter().map(|it| it.table.name.table.as_str()).collect();
    assert_eq!(vec!["y", "z", "x"], children);
    let ordinals: Vec<u32> = tree.root.children.iter().map(|it| it.table.ordinal).collect();
    assert_eq!(vec![1, 2, 3], ordinals);
    Ok(())
}

#[test]
fn test_groups_never_mix() -> Result<()> {
    let s = schema()?;
    for join_type in [JoinType::Inner, JoinType::Left, JoinType::Right, JoinType::Full] {
        let mut plan = Joinable::join(
            scan(&s, 0, "c")?,
            scan(&s, 1, "p")?,
            join_type,
            vec![Expr::eq(col(0, "c", "cid"), col(1, "p", "pid"))],
        );
        GroupJoinFinder::new(&s).apply(&mut plan);
        let Joinable::Join(join) = &plan else {
            panic!("{join_type} join across groups was coalesced: {plan:?}");
        };
        assert!(!join.conditions[0].is_group_join());
        for side in [join.left.as_ref(), join.right.as_ref()] {
            let Joinable::GroupJoinTree(tree) = side else {
                panic!("expect a group join tree, got {side:?}");
            };
            assert!(tree.root.children.is_empty());
        }
    }
    Ok(())
}

#[test]
fn test_siblings_are_not_parent_and_child() -> Result<()> {
    let s = schema()?;
    let mut plan = join_on_cid(&s, JoinType::Inner, (0, "x"), (1, "y"))?;
    GroupJoinFinder::new(&s).apply(&mut plan);
    assert!(matches!(plan, Joinable::Join(_)));
    Ok(())
}

#[test]
fn test_finder_from_config() -> Result<()> {
    let s = schema()?;
    let cfg = Config::new("")?;
    let mut plan = join_on_cid(&s, JoinType::Inner, (0, "c"), (1, "z"))?;
    if let Some(finder) = cfg.group_join_finder(&s) {
        finder.apply(&mut plan);
    }
    assert!(matches!(plan, Joinable::GroupJoinTree(_)));

    let cfg = Config { group_joins: false, ..cfg };
    assert!(cfg.group_join_finder(&s).is_none());
    Ok(())
}
