//! Render a few statements without touching a database.
//!
//! Run with: cargo run --example sql_builder

use pgfluent::table;

fn main() {
    let select = table("users")
        .select(&["id", "name", "points"])
        .where_("points", ">=", 100i64)
        .or_where("name", "=", "alice")
        .order_by("points", "DESC")
        .limit(20);
    println!("{}", select.to_sql());

    let joined = table("users")
        .select(&["users.name", "orders.total"])
        .inner_join("orders", "users.id = orders.user_id")
        .where_in("orders.status", vec!["paid", "shipped"])
        .group_by("users.name, orders.total")
        .having("SUM(orders.total)", ">", 500i64);
    println!("{}", joined.to_sql());

    let unioned = table("users")
        .select(&["name"])
        .where_("points", ">", 10i64)
        .union()
        .table("archived_users")
        .select(&["name"]);
    println!("{}", unioned.to_sql());

    let exists = table("users").where_exists(
        table("orders")
            .select(&["1"])
            .where_raw("orders.user_id = users.id"),
    );
    println!("{}", exists.to_sql());
}
