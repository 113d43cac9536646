//! Compile predicate trees and query specifications into SQLite statements
//!
//! Every value travels as a bound `?` parameter; only identifiers taken from
//! the static field registries and enum variant names are written into the
//! SQL text. Dotted field paths become `IN (SELECT ...)` subqueries over the
//! related table, so no join ever widens the root row set.

use domain::query::{
    Comparison, Expr, FieldDescriptor, FieldKind, FieldPath, Literal, RelationDescriptor, SortKey,
    TextMatch,
};
use sqlx::{Sqlite, query::Query, sqlite::SqliteArguments};

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Literal>,
}

impl SqlStatement {
    /// Bind the parameters onto an executable query
    pub fn query(&self) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| match param {
                Literal::Null => query.bind(None::<i64>),
                Literal::Boolean(v) => query.bind(*v),
                Literal::Integer(v) => query.bind(*v),
                Literal::Real(v) => query.bind(*v),
                Literal::Text(v) => query.bind(v.clone()),
                Literal::Timestamp(v) => query.bind(*v),
                Literal::Uuid(v) => query.bind(v.to_string()),
            })
    }
}

/// Quote an identifier
pub fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column(table: &str, field: &FieldDescriptor) -> String {
    format!("{}.{}", ident(table), ident(field.column()))
}

/// Incremental statement writer
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    params: Vec<Literal>,
}

impl SqlWriter {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            sql: initial.into(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder bound to `value`
    pub fn bind(&mut self, value: Literal) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    /// Append ` WHERE <expr>` when there is a filter
    pub fn where_clause(&mut self, table: &'static str, expr: Option<&Expr>) -> &mut Self {
        if let Some(expr) = expr {
            self.push(" WHERE ");
            self.expr(table, expr);
        }
        self
    }

    /// Append the expression, parenthesizing every binary node
    pub fn expr(&mut self, table: &'static str, expr: &Expr) -> &mut Self {
        match expr {
            Expr::And(left, right) => self.binary(table, left, " AND ", right),
            Expr::Or(left, right) => self.binary(table, left, " OR ", right),
            Expr::Compare { field, op, value } => {
                self.through_relations(table, field, |w, t| {
                    w.compare(t, field.field(), *op, value);
                })
            },
            Expr::Text { field, op, value } => {
                self.through_relations(table, field, |w, t| {
                    w.text(t, field.field(), *op, value);
                })
            },
            Expr::In { field, values } => {
                self.through_relations(table, field, |w, t| {
                    w.in_list(t, field.field(), values);
                })
            },
        }
    }

    fn binary(&mut self, table: &'static str, left: &Expr, op: &str, right: &Expr) -> &mut Self {
        self.push("(");
        self.expr(table, left);
        self.push(op);
        self.expr(table, right);
        self.push(")")
    }

    /// Wrap a leaf in one `IN (SELECT ...)` per traversed relation
    fn through_relations(
        &mut self,
        table: &'static str,
        path: &FieldPath,
        leaf: impl FnOnce(&mut Self, &'static str),
    ) -> &mut Self {
        let mut current = table;
        for relation in path.relations() {
            let target = relation.target().table();
            self.push(&format!(
                "{}.{} IN (SELECT {}.{} FROM {} WHERE ",
                ident(current),
                ident(relation.local_column),
                ident(target),
                ident(relation.remote_column),
                ident(target),
            ));
            current = target;
        }
        leaf(self, current);
        for _ in path.relations() {
            self.push(")");
        }
        self
    }

    fn compare(
        &mut self,
        table: &str,
        field: &FieldDescriptor,
        op: Comparison,
        value: &Literal,
    ) -> &mut Self {
        let col = column(table, field);
        if value.is_null() {
            // Ordering against null is rejected while the predicate is built
            let test = if op == Comparison::NotEqual {
                "IS NOT NULL"
            } else {
                "IS NULL"
            };
            return self.push(&format!("{col} {test}"));
        }

        let symbol = match op {
            Comparison::Equal => "=",
            Comparison::NotEqual => "<>",
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
        };
        if op == Comparison::NotEqual && field.is_nullable() {
            self.push(&format!("({col} <> "));
            self.bind(value.clone());
            return self.push(&format!(" OR {col} IS NULL)"));
        }
        self.push(&format!("{col} {symbol} "));
        self.bind(value.clone())
    }

    fn text(&mut self, table: &str, field: &FieldDescriptor, op: TextMatch, value: &str) -> &mut Self {
        let escaped = escape_like(value);
        let pattern = match op {
            TextMatch::Contains => format!("%{escaped}%"),
            TextMatch::StartsWith => format!("{escaped}%"),
            TextMatch::EndsWith => format!("%{escaped}"),
        };
        self.push(&format!("{} LIKE ", text_form(table, field)));
        self.bind(Literal::Text(pattern));
        self.push(" ESCAPE '\\'")
    }

    fn in_list(&mut self, table: &str, field: &FieldDescriptor, values: &[Literal]) -> &mut Self {
        self.push(&format!("{} IN (", column(table, field)));
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.bind(value.clone());
        }
        self.push(")")
    }

    /// Append ` ORDER BY ...` when there are sort keys
    pub fn order_by(&mut self, table: &'static str, keys: &[SortKey]) -> &mut Self {
        for (i, key) in keys.iter().enumerate() {
            self.push(if i == 0 { " ORDER BY " } else { ", " });
            let value = value_expr(table, key.field.relations(), key.field.field());
            self.push(&format!("{value} {}", key.direction.as_sql()));
        }
        self
    }

    /// Append the `LIMIT`/`OFFSET` window
    pub fn window(&mut self, skip: u64, take: Option<u64>) -> &mut Self {
        let as_param = |n: u64| Literal::Integer(i64::try_from(n).unwrap_or(i64::MAX));
        match take {
            Some(take) => {
                self.push(" LIMIT ");
                self.bind(as_param(take));
                self.push(" OFFSET ");
                self.bind(as_param(skip))
            },
            None if skip > 0 => {
                self.push(" LIMIT -1 OFFSET ");
                self.bind(as_param(skip))
            },
            None => self,
        }
    }

    pub fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Column value, through correlated subqueries for related fields
fn value_expr(
    table: &'static str,
    relations: &[&'static RelationDescriptor],
    field: &FieldDescriptor,
) -> String {
    match relations.split_first() {
        None => column(table, field),
        Some((relation, rest)) => {
            let target = relation.target().table();
            format!(
                "(SELECT {} FROM {} WHERE {}.{} = {}.{})",
                value_expr(target, rest, field),
                ident(target),
                ident(target),
                ident(relation.remote_column),
                ident(table),
                ident(relation.local_column),
            )
        },
    }
}

/// The field as text: enums by variant name, other non-text kinds cast
fn text_form(table: &str, field: &FieldDescriptor) -> String {
    let col = column(table, field);
    match field.kind() {
        FieldKind::Text => col,
        FieldKind::Enum(variants) => {
            let arms: String = variants
                .iter()
                .enumerate()
                .map(|(ordinal, name)| format!(" WHEN {ordinal} THEN '{}'", name.replace('\'', "''")))
                .collect();
            format!("(CASE {col}{arms} END)")
        },
        _ => format!("CAST({col} AS TEXT)"),
    }
}

/// Escape `LIKE` wildcards with a backslash
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `SELECT * FROM table WHERE ... ORDER BY ... LIMIT ...`
pub fn select(
    table: &'static str,
    criteria: Option<&Expr>,
    order: &[SortKey],
    skip: u64,
    take: Option<u64>,
) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("SELECT * FROM {}", ident(table)));
    writer
        .where_clause(table, criteria)
        .order_by(table, order)
        .window(skip, take);
    writer.finish()
}

/// `SELECT key FROM table WHERE ... ORDER BY ... LIMIT 1`
pub fn select_first_key(
    table: &'static str,
    key: &FieldDescriptor,
    criteria: Option<&Expr>,
    order: &[SortKey],
) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("SELECT {} FROM {}", column(table, key), ident(table)));
    writer
        .where_clause(table, criteria)
        .order_by(table, order)
        .push(" LIMIT 1");
    writer.finish()
}

pub fn count(table: &'static str, criteria: Option<&Expr>) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("SELECT COUNT(*) FROM {}", ident(table)));
    writer.where_clause(table, criteria);
    writer.finish()
}

pub fn exists(table: &'static str, criteria: Option<&Expr>) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("SELECT EXISTS (SELECT 1 FROM {}", ident(table)));
    writer.where_clause(table, criteria).push(")");
    writer.finish()
}

/// Distinct values of one column, ascending
pub fn distinct(table: &'static str, field: &FieldDescriptor, criteria: Option<&Expr>) -> SqlStatement {
    let col = column(table, field);
    let mut writer = SqlWriter::new(format!("SELECT DISTINCT {col} FROM {}", ident(table)));
    writer.where_clause(table, criteria).push(&format!(" ORDER BY {col}"));
    writer.finish()
}

pub fn max(table: &'static str, field: &FieldDescriptor, criteria: Option<&Expr>) -> SqlStatement {
    let mut writer = SqlWriter::new(format!(
        "SELECT MAX({}) FROM {}",
        column(table, field),
        ident(table)
    ));
    writer.where_clause(table, criteria);
    writer.finish()
}

/// `INSERT ... RETURNING *`
pub fn insert(table: &'static str, values: Vec<(&'static str, Literal)>) -> SqlStatement {
    let names: Vec<String> = values.iter().map(|(name, _)| ident(name)).collect();
    let mut writer = SqlWriter::new(format!(
        "INSERT INTO {} ({}) VALUES (",
        ident(table),
        names.join(", ")
    ));
    for (i, (_, value)) in values.into_iter().enumerate() {
        if i > 0 {
            writer.push(", ");
        }
        writer.bind(value);
    }
    writer.push(") RETURNING *");
    writer.finish()
}

/// `UPDATE table SET ... WHERE ...`
pub fn update(
    table: &'static str,
    values: Vec<(&'static str, Literal)>,
    criteria: &Expr,
) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("UPDATE {} SET ", ident(table)));
    for (i, (name, value)) in values.into_iter().enumerate() {
        if i > 0 {
            writer.push(", ");
        }
        writer.push(&format!("{} = ", ident(name)));
        writer.bind(value);
    }
    writer.where_clause(table, Some(criteria));
    writer.finish()
}

pub fn delete(table: &'static str, criteria: &Expr) -> SqlStatement {
    let mut writer = SqlWriter::new(format!("DELETE FROM {}", ident(table)));
    writer.where_clause(table, Some(criteria));
    writer.finish()
}

#[cfg(test)]
mod tests {
    use domain::{
        Entity, SensitiveDatum, SensitiveDatumType, TenantId,
        query::{FilterPredicate, Predicate, QuerySpecification},
    };
    use serde_json::json;

    use super::*;

    type P = Predicate<SensitiveDatum>;

    fn table() -> &'static str {
        SensitiveDatum::fields().table()
    }

    fn where_sql(predicate: &P) -> SqlStatement {
        let mut writer = SqlWriter::default();
        writer.expr(table(), predicate.expr());
        writer.finish()
    }

    #[test]
    fn equality_binds_value() {
        let stmt = where_sql(&P::equal("Name", "Email du locataire 1").unwrap());
        assert_eq!(stmt.sql, r#""sensitive_data"."name" = ?"#);
        assert_eq!(stmt.params, vec![Literal::Text("Email du locataire 1".into())]);
    }

    #[test]
    fn binary_nodes_are_parenthesized_left_to_right() {
        let predicate = P::equal("TenantId", TenantId::new(1))
            .unwrap()
            .and(P::equal("Type", SensitiveDatumType::Email).unwrap())
            .or(P::equal("Name", "x").unwrap());
        let stmt = where_sql(&predicate);
        assert_eq!(
            stmt.sql,
            r#"(("sensitive_data"."tenant_id" = ? AND "sensitive_data"."type" = ?) OR "sensitive_data"."name" = ?)"#
        );
        assert_eq!(
            stmt.params,
            vec![Literal::Integer(1), Literal::Integer(1), Literal::Text("x".into())]
        );
    }

    #[test]
    fn contains_escapes_wildcards() {
        let stmt = where_sql(&P::compare("Name", FilterPredicate::Contains, &json!("50%_off")).unwrap());
        assert_eq!(stmt.sql, r#""sensitive_data"."name" LIKE ? ESCAPE '\'"#);
        assert_eq!(stmt.params, vec![Literal::Text("%50\\%\\_off%".into())]);
    }

    #[test]
    fn text_match_on_enum_uses_variant_names() {
        let stmt = where_sql(&P::compare("Type", FilterPredicate::StartsWith, &json!("Em")).unwrap());
        assert!(stmt.sql.starts_with(r#"(CASE "sensitive_data"."type" WHEN 0 THEN 'Name' WHEN 1 THEN 'Email'"#));
        assert!(stmt.sql.ends_with("END) LIKE ? ESCAPE '\\'"));
        assert_eq!(stmt.params, vec![Literal::Text("Em%".into())]);
    }

    #[test]
    fn text_match_on_integer_casts() {
        let stmt = where_sql(&P::compare("Identifier", FilterPredicate::EndsWith, &json!("2")).unwrap());
        assert_eq!(stmt.sql, r#"CAST("sensitive_data"."id" AS TEXT) LIKE ? ESCAPE '\'"#);
        assert_eq!(stmt.params, vec![Literal::Text("%2".into())]);
    }

    #[test]
    fn in_list_binds_each_value() {
        let stmt = where_sql(&P::compare("Type", FilterPredicate::In, &json!(["Email", "Name"])).unwrap());
        assert_eq!(stmt.sql, r#""sensitive_data"."type" IN (?, ?)"#);
        assert_eq!(stmt.params, vec![Literal::Integer(1), Literal::Integer(0)]);
    }

    #[test]
    fn null_comparisons_use_is_null() {
        let stmt = where_sql(&P::compare("Content", FilterPredicate::Equal, &json!(null)).unwrap());
        assert_eq!(stmt.sql, r#""sensitive_data"."content" IS NULL"#);
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn not_equal_on_nullable_keeps_nulls() {
        let stmt = where_sql(&P::compare("Content", FilterPredicate::DoesNotEqual, &json!("a")).unwrap());
        assert_eq!(
            stmt.sql,
            r#"("sensitive_data"."content" <> ? OR "sensitive_data"."content" IS NULL)"#
        );
    }

    #[test]
    fn nested_path_becomes_subquery() {
        let stmt = where_sql(&P::compare("Tenant.Name", FilterPredicate::Equal, &json!("Locataire 2")).unwrap());
        assert_eq!(
            stmt.sql,
            r#""sensitive_data"."tenant_id" IN (SELECT "tenants"."id" FROM "tenants" WHERE "tenants"."name" = ?)"#
        );
    }

    #[test]
    fn select_with_order_and_window() {
        let spec = QuerySpecification::<SensitiveDatum>::new()
            .apply_order_by("Name")
            .unwrap()
            .apply_paging(1, 2)
            .unwrap();
        let order = spec.effective_order();
        let stmt = select(table(), None, &order, spec.skip(), spec.take());
        assert_eq!(
            stmt.sql,
            r#"SELECT * FROM "sensitive_data" ORDER BY "sensitive_data"."name" ASC, "sensitive_data"."id" ASC LIMIT ? OFFSET ?"#
        );
        assert_eq!(stmt.params, vec![Literal::Integer(2), Literal::Integer(2)]);
    }

    #[test]
    fn window_without_take_skips_only() {
        let mut writer = SqlWriter::new("SELECT 1");
        writer.window(3, None);
        assert_eq!(writer.finish().sql, "SELECT 1 LIMIT -1 OFFSET ?");
    }

    #[test]
    fn insert_and_update_statements() {
        let stmt = insert(
            "tenants",
            vec![("id", Literal::Integer(4)), ("name", Literal::Text("Locataire 4".into()))],
        );
        assert_eq!(
            stmt.sql,
            r#"INSERT INTO "tenants" ("id", "name") VALUES (?, ?) RETURNING *"#
        );

        let key = P::equal("Identifier", 3).unwrap();
        let stmt = update(table(), vec![("name", Literal::Text("n".into()))], key.expr());
        assert_eq!(
            stmt.sql,
            r#"UPDATE "sensitive_data" SET "name" = ? WHERE "sensitive_data"."id" = ?"#
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn aggregate_statements() {
        assert_eq!(count(table(), None).sql, r#"SELECT COUNT(*) FROM "sensitive_data""#);
        assert_eq!(
            exists(table(), None).sql,
            r#"SELECT EXISTS (SELECT 1 FROM "sensitive_data")"#
        );
        let name = SensitiveDatum::fields().field("Name").unwrap();
        assert_eq!(
            distinct(table(), name, None).sql,
            r#"SELECT DISTINCT "sensitive_data"."name" FROM "sensitive_data" ORDER BY "sensitive_data"."name""#
        );
        assert_eq!(
            max(table(), name, None).sql,
            r#"SELECT MAX("sensitive_data"."name") FROM "sensitive_data""#
        );
    }

    #[test]
    fn escape_like_handles_backslash() {
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
