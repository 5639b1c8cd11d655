//! Struct ↔ row marshaling contract tests for the derive macros.

use pgfluent::{FromRow, IntoRow, SqlValue};

#[derive(IntoRow)]
struct NewUser {
    name: String,
    points: i64,
    email: Option<String>,
}

#[derive(IntoRow)]
struct Tagged {
    #[pg(column = "email_address")]
    email: String,
    #[pg(column = "signup_day")]
    day: String,
}

// Compile check: the read side derives against the same column mapping.
#[derive(FromRow)]
#[allow(dead_code)]
struct User {
    name: String,
    points: i64,
    email: Option<String>,
}

#[test]
fn columns_follow_declaration_order() {
    let user = NewUser {
        name: "alice".into(),
        points: 10,
        email: Some("alice@example.com".into()),
    };
    assert_eq!(user.columns(), vec!["name", "points", "email"]);
}

#[test]
fn values_align_with_columns() {
    let user = NewUser {
        name: "alice".into(),
        points: 10,
        email: Some("alice@example.com".into()),
    };
    assert_eq!(
        user.values(),
        vec![
            SqlValue::Text("alice".into()),
            SqlValue::Int(10),
            SqlValue::Text("alice@example.com".into()),
        ]
    );
}

#[test]
fn none_field_contributes_null() {
    let user = NewUser {
        name: "bob".into(),
        points: 0,
        email: None,
    };
    assert_eq!(user.values()[2], SqlValue::Null);
}

#[test]
fn column_tag_overrides_field_name() {
    let row = Tagged {
        email: "a@b.c".into(),
        day: "2024-06-01".into(),
    };
    assert_eq!(row.columns(), vec!["email_address", "signup_day"]);
}
