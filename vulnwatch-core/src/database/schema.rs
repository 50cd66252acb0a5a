//! Typed description of the three store tables.
//!
//! Every identifier that reaches SQL text comes from these static tables; row
//! values always travel as bind parameters.

use sqlx::{Postgres, QueryBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef { name, sql_type }
}

const PROJECT_COLUMNS: &[ColumnDef] = &[
    col("id", "BIGSERIAL"),
    col("is_active", "BOOLEAN"),
    col("gitlab_url", "TEXT"),
    col("gitlab_branch", "TEXT"),
    col("dd_project_id", "BIGINT"),
    col("last_scan_at", "DATE"),
    col("team", "TEXT"),
];

const IMAGE_COLUMNS: &[ColumnDef] = &[
    col("id", "BIGSERIAL"),
    col("is_active", "BOOLEAN"),
    col("project_id", "BIGINT"),
    col("image_url", "TEXT"),
    col("engagement_id", "BIGINT"),
    col("last_scan_at", "DATE"),
];

const DAST_COLUMNS: &[ColumnDef] = &[
    col("id", "BIGSERIAL"),
    col("project_id", "BIGINT"),
    col("params", "TEXT"),
    col("last_scan_at", "DATE"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Projects,
    Images,
    Dast,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Projects, Table::Images, Table::Dast];

    pub fn name(self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::Images => "images",
            Table::Dast => "dast",
        }
    }

    /// Column definitions in declaration order.
    pub fn columns(self) -> &'static [ColumnDef] {
        match self {
            Table::Projects => PROJECT_COLUMNS,
            Table::Images => IMAGE_COLUMNS,
            Table::Dast => DAST_COLUMNS,
        }
    }

    pub fn column_list(self) -> String {
        self.columns()
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_column(self, name: &str) -> bool {
        self.columns().iter().any(|c| c.name == name)
    }

    /// `SELECT <all columns> FROM <table>`; callers append filters with
    /// `push`/`push_bind`.
    pub fn select(self) -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            self.column_list(),
            self.name()
        ))
    }

    /// Page over the table ordered by primary key so OFFSET/LIMIT is stable.
    pub fn select_page(
        self,
        offset: i64,
        limit: i64,
    ) -> QueryBuilder<'static, Postgres> {
        let mut builder = self.select();
        builder.push(" ORDER BY id OFFSET ");
        builder.push_bind(offset);
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder
    }

    pub fn drop_statement(self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name())
    }
}
