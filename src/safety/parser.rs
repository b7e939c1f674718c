//! SQL parsing and classification.
//!
//! Uses sqlparser with the PostgreSQL dialect. Statements are classified by
//! the most dangerous thing they do, including data-modifying CTEs nested in
//! otherwise read-only queries.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::{Classification, SafetyLevel, StatementKind};

/// Parses and classifies SQL text.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: PostgreSqlDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Classifies `sql`. Unparseable or empty input is destructive.
    pub fn classify(&self, sql: &str) -> Classification {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => {
                return Classification::rejected(
                    StatementKind::Unknown,
                    format!("could not parse SQL ({e})"),
                )
            }
        };

        match statements.as_slice() {
            [] => Classification::rejected(StatementKind::Unknown, "empty SQL statement"),
            [statement] => {
                let (level, kind) = classify_statement(statement);
                let mut result = Classification::new(level, kind, 1);
                if let Statement::Query(query) = statement {
                    result.writes = query_writes(query);
                }
                result
            }
            many => {
                let (level, kind) = many
                    .iter()
                    .map(classify_statement)
                    .max_by_key(|(level, _)| level.priority())
                    .unwrap_or((SafetyLevel::Destructive, StatementKind::Unknown));
                Classification::new(level, kind, many.len())
            }
        }
    }
}

/// Classifies SQL without keeping a classifier around.
pub fn classify_sql(sql: &str) -> Classification {
    SqlClassifier::new().classify(sql)
}

fn max_of(
    a: (SafetyLevel, StatementKind),
    b: (SafetyLevel, StatementKind),
) -> (SafetyLevel, StatementKind) {
    if b.0.priority() > a.0.priority() {
        b
    } else {
        a
    }
}

fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementKind) {
    match statement {
        Statement::Query(query) => classify_query(query),
        Statement::Explain { .. } => (SafetyLevel::Safe, StatementKind::Explain),
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. } => (SafetyLevel::Safe, StatementKind::Show),

        Statement::Insert(_) => (SafetyLevel::Mutating, StatementKind::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementKind::Update),
        Statement::Merge { .. } => (SafetyLevel::Mutating, StatementKind::Merge),
        Statement::Copy { .. } => (SafetyLevel::Mutating, StatementKind::Copy),

        Statement::Delete(_) => (SafetyLevel::Destructive, StatementKind::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementKind::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementKind::Truncate),
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => (SafetyLevel::Destructive, StatementKind::Alter),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. } => (SafetyLevel::Destructive, StatementKind::Create),
        Statement::Grant { .. } | Statement::Revoke { .. } => {
            (SafetyLevel::Destructive, StatementKind::Permission)
        }

        _ => (SafetyLevel::Destructive, StatementKind::Unknown),
    }
}

/// Most dangerous operation anywhere in a query, including CTEs and subqueries.
fn classify_query(query: &Query) -> (SafetyLevel, StatementKind) {
    let mut worst = (SafetyLevel::Safe, StatementKind::Select);

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            worst = max_of(worst, classify_query(&cte.query));
        }
    }

    max_of(worst, classify_set_expr(&query.body))
}

fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementKind) {
    match set_expr {
        SetExpr::Delete(stmt) => classify_statement(stmt),
        SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Insert(stmt) => classify_statement(stmt),
        SetExpr::Merge(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            max_of(classify_set_expr(left), classify_set_expr(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => (SafetyLevel::Safe, StatementKind::Select),
    }
}

fn classify_select(select: &Select) -> (SafetyLevel, StatementKind) {
    // SELECT ... INTO creates a table.
    if select.into.is_some() {
        return (SafetyLevel::Destructive, StatementKind::Create);
    }

    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .fold((SafetyLevel::Safe, StatementKind::Select), max_of)
}

fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementKind) {
    twj.joins
        .iter()
        .map(|join| classify_table_factor(&join.relation))
        .fold(classify_table_factor(&twj.relation), max_of)
}

fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementKind) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (SafetyLevel::Safe, StatementKind::Select),
    }
}

/// Returns true if a top-level query takes row locks.
fn query_writes(query: &Query) -> bool {
    !query.locks.is_empty()
}
