use tablesync::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct OrderLine {
    #[column(primary_key)]
    id: i64,
    #[column(name = "qty")]
    quantity: u16,
    price: f64,
    discount: Option<f32>,
    gift: bool,
    #[column(length = 20)]
    sku: String,
    #[column(sql_type = "TEXT", unbounded)]
    note: String,
    payload: Vec<u8>,
    #[column(ignore)]
    total_cache: Option<u64>,
}

#[derive(Debug, Clone, Default, Record)]
#[record(table = "membership")]
struct Membership {
    #[column(composite_key(name = "pk_membership", columns("user_id", "group_id")))]
    user_id: i64,
    group_id: i64,
    #[column(nullable)]
    role: String,
}

#[test]
fn test_table_name_defaults_to_snake_case() {
    assert_eq!(OrderLine::TABLE, "order_line");
    assert_eq!(Membership::TABLE, "membership");
}

#[test]
fn test_columns_skip_ignored_fields() {
    assert_eq!(
        OrderLine::column_names(),
        vec!["id", "qty", "price", "discount", "gift", "sku", "note", "payload"]
    );
    assert_eq!(OrderLine::PRIMARY_KEY, Some("id"));
    assert_eq!(Membership::PRIMARY_KEY, None);
}

#[test]
fn test_column_types() {
    let types: Vec<(&str, SqlType, bool)> = OrderLine::COLUMNS
        .iter()
        .map(|c| (c.name, c.sql_type, c.nullable))
        .collect();
    assert_eq!(
        types,
        vec![
            ("id", SqlType::BigInt, false),
            ("qty", SqlType::Integer, false),
            ("price", SqlType::Double, false),
            ("discount", SqlType::Real, true),
            ("gift", SqlType::Boolean, false),
            ("sku", SqlType::Varchar(20), false),
            ("note", SqlType::Custom("TEXT"), false),
            ("payload", SqlType::Blob, false),
        ]
    );
    assert!(OrderLine::COLUMNS[0].primary_key);
    assert!(Membership::COLUMNS[2].nullable);
}

#[test]
fn test_directives_registered_in_field_order() {
    assert_eq!(
        OrderLine::DIRECTIVES,
        &[FieldDirective::new(
            "note",
            ExtensionDirective::WidenColumnToUnbounded { column: "note" }
        )]
    );
    assert_eq!(
        Membership::DIRECTIVES,
        &[FieldDirective::new(
            "user_id",
            ExtensionDirective::AddCompositePrimaryKey {
                name: "pk_membership",
                columns: &["user_id", "group_id"],
            }
        )]
    );
}

#[test]
fn test_to_row_uses_column_names() {
    let line = OrderLine {
        id: 1,
        quantity: 3,
        price: 9.5,
        discount: None,
        gift: true,
        sku: "SKU-1".into(),
        note: "n".into(),
        payload: vec![0xAB],
        total_cache: Some(28),
    };
    let row = line.to_row();
    assert_eq!(row.len(), 8);
    assert_eq!(row.get("qty"), Some(&Value::Int(3)));
    assert_eq!(row.get("discount"), Some(&Value::Null));
    assert_eq!(row.get("gift"), Some(&Value::Bool(true)));
    assert!(row.get("total_cache").is_none());
}

#[test]
fn test_from_row_is_tolerant() {
    let row = Row::new()
        .with("id", 4_i64)
        .with("qty", "7")
        .with("gift", 1_i64)
        .with("discount", 0.5_f64)
        .with("legacy_column", "dropped")
        .with("price", Value::Null);

    let line = OrderLine::from_row(&row);

    assert_eq!(
        line,
        OrderLine {
            id: 4,
            quantity: 7,
            gift: true,
            discount: Some(0.5),
            ..OrderLine::default()
        }
    );
}
