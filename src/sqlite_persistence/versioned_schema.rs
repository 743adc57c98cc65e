use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when
            // optional field assignments are passed to the macro
            // (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub cascade_delete: bool,
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<S>,
    pub foreign_key: Option<&'a ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut column_defs = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
            if column.is_primary_key {
                def.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                def.push_str(" NOT NULL");
            }
            if column.is_unique {
                def.push_str(" UNIQUE");
            }
            if let Some(default_value) = column.default_value {
                def.push_str(&format!(" DEFAULT {}", default_value));
            }
            if let Some(fk) = column.foreign_key {
                def.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    fk.foreign_table,
                    fk.foreign_column,
                    if fk.cascade_delete {
                        "CASCADE"
                    } else {
                        "NO ACTION"
                    },
                ));
            }
            column_defs.push(def);
        }
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, column_defs.join(", ")),
            params![],
        )?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

pub const BASE_DB_VERSION: usize = 77000;

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    /// Check that an existing database matches this schema: same column
    /// names, types, nullability and primary keys per table, and every
    /// declared index present.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
            let actual: Vec<(String, String, bool, bool)> = stmt
                .query_map(params![], |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)? == 1,
                        row.get::<_, i32>(5)? == 1,
                    ))
                })?
                .collect::<std::result::Result<_, _>>()?;

            if actual.len() != table.columns.len() {
                bail!(
                    "Table {} has {} columns, expected {} ({})",
                    table.name,
                    actual.len(),
                    table.columns.len(),
                    table
                        .columns
                        .iter()
                        .map(|c| c.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }

            for ((name, sql_type, non_null, is_pk), expected) in
                actual.iter().zip(table.columns.iter())
            {
                if name != expected.name {
                    bail!(
                        "Table {} column name mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        name
                    );
                }
                if sql_type != expected.sql_type.as_sql() {
                    bail!(
                        "Table {} column {} type mismatch: expected {}, got {}",
                        table.name,
                        expected.name,
                        expected.sql_type.as_sql(),
                        sql_type
                    );
                }
                if *non_null != expected.non_null {
                    bail!(
                        "Table {} column {} non-null mismatch",
                        table.name,
                        expected.name
                    );
                }
                if *is_pk != expected.is_primary_key {
                    bail!(
                        "Table {} column {} primary key mismatch",
                        table.name,
                        expected.name
                    );
                }
            }

            for (index_name, _) in table.indices {
                let index_exists: bool = conn
                    .query_row(
                        "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                        params![index_name, table.name],
                        |_| Ok(true),
                    )
                    .unwrap_or(false);
                if !index_exists {
                    bail!("Table {} is missing index '{}'", table.name, index_name);
                }
            }
        }
        Ok(())
    }

    /// Stored schema version of an open database, if it was created by this
    /// machinery.
    pub fn stored_version(conn: &Connection) -> Result<Option<usize>> {
        let user_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if (user_version as usize) < BASE_DB_VERSION {
            return Ok(None);
        }
        Ok(Some(user_version as usize - BASE_DB_VERSION))
    }
}
