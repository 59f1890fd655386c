//! GeoPackage metadata tables and feature table DDL

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::domain::Crs;
use crate::infrastructure::gpkg::geometry::Envelope;
use crate::infrastructure::ContainerResult;

/// `GPKG` in ASCII.
pub const APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.2.0
pub const USER_VERSION: i32 = 10200;
pub const GEOMETRY_COLUMN: &str = "geom";
pub const FID_COLUMN: &str = "fid";

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;

const CORE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE IF NOT EXISTS gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE IF NOT EXISTS gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT uk_gc_table_name UNIQUE (table_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
"#;

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Current time in the format GeoPackage expects for `last_change`.
pub fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Create the mandatory GeoPackage tables and rows if they are missing.
pub fn init_container(conn: &Connection) -> ContainerResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA application_id = {APPLICATION_ID};\nPRAGMA user_version = {USER_VERSION};\n{CORE_TABLES}"
    ))?;
    let srs = "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
               (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
    conn.execute(
        srs,
        params![
            "Undefined cartesian SRS",
            -1,
            "NONE",
            -1,
            "undefined",
            "undefined cartesian coordinate reference system"
        ],
    )?;
    conn.execute(
        srs,
        params![
            "Undefined geographic SRS",
            0,
            "NONE",
            0,
            "undefined",
            "undefined geographic coordinate reference system"
        ],
    )?;
    conn.execute(
        srs,
        params![
            "WGS 84 geodetic",
            Crs::WGS84_CODE,
            "EPSG",
            Crs::WGS84_CODE,
            WGS84_WKT,
            "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"
        ],
    )?;
    Ok(())
}

/// Register `crs` unless its `srs_id` is already known.
///
/// Only WGS 84 ships with a definition; other systems are stored as
/// `undefined` and identified by authority and code.
pub fn ensure_srs(conn: &Connection, crs: &Crs) -> ContainerResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
         (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
         VALUES (?1, ?2, ?3, ?4, 'undefined', NULL)",
        params![crs.to_string(), crs.srs_id(), crs.authority, crs.code],
    )?;
    Ok(())
}

/// True if a table with this name exists (names compare case-insensitively).
pub fn table_exists(conn: &Connection, schema: &str, table: &str) -> ContainerResult<bool> {
    let sql = format!(
        "SELECT 1 FROM {}.sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        quote_ident(schema)
    );
    Ok(conn
        .query_row(&sql, [table], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Drop a layer table together with its metadata rows.
pub fn drop_layer(conn: &Connection, table: &str) -> ContainerResult<()> {
    conn.execute(
        "DELETE FROM gpkg_geometry_columns WHERE table_name = ?1 COLLATE NOCASE",
        [table],
    )?;
    conn.execute(
        "DELETE FROM gpkg_contents WHERE table_name = ?1 COLLATE NOCASE",
        [table],
    )?;
    conn.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
    Ok(())
}

/// Layer tables listed in `gpkg_contents`, oldest first.
pub fn layer_names(conn: &Connection, schema: &str) -> ContainerResult<Vec<String>> {
    let sql = format!(
        "SELECT table_name FROM {}.gpkg_contents ORDER BY rowid",
        quote_ident(schema)
    );
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// SQL storage class inferred for an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }

    /// Type of a single JSON value; None for null.
    pub fn of_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(n) if n.is_i64() => Some(ColumnType::Integer),
            Value::Number(_) => Some(ColumnType::Real),
            Value::String(_) | Value::Array(_) | Value::Object(_) => Some(ColumnType::Text),
        }
    }

    /// Widen two observed types into one that holds both.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Real) | (Real, Integer) => Real,
            _ => Text,
        }
    }

    /// Convert a JSON value for storage in a column of this type.
    pub fn to_sql(self, value: &Value) -> rusqlite::types::Value {
        use rusqlite::types::Value as Sql;
        match (self, value) {
            (_, Value::Null) => Sql::Null,
            (ColumnType::Integer, Value::Number(n)) => {
                n.as_i64().map(Sql::Integer).unwrap_or(Sql::Null)
            }
            (ColumnType::Real, Value::Number(n)) => {
                n.as_f64().map(Sql::Real).unwrap_or(Sql::Null)
            }
            (ColumnType::Boolean, Value::Bool(b)) => Sql::Integer(i64::from(*b)),
            (_, Value::String(s)) => Sql::Text(s.clone()),
            (_, other) => Sql::Text(other.to_string()),
        }
    }
}

/// Attribute column of a feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// Create a feature table with `fid`, `geom` and the given attribute columns.
pub fn create_feature_table(
    conn: &Connection,
    table: &str,
    geometry_type: &str,
    columns: &[Column],
) -> ContainerResult<()> {
    let mut ddl = format!(
        "CREATE TABLE {} ({} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, {} {}",
        quote_ident(table),
        quote_ident(FID_COLUMN),
        quote_ident(GEOMETRY_COLUMN),
        geometry_type
    );
    for column in columns {
        ddl.push_str(&format!(", {} {}", quote_ident(&column.name), column.kind.sql()));
    }
    ddl.push(')');
    conn.execute(&ddl, [])?;
    Ok(())
}

/// Metadata describing one features layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMeta {
    pub table: String,
    pub srs_id: i32,
    pub extent: Option<Envelope>,
    pub geometry_type: String,
    pub has_z: bool,
}

/// Insert the `gpkg_contents` and `gpkg_geometry_columns` rows for a layer.
pub fn register_layer(conn: &Connection, meta: &LayerMeta) -> ContainerResult<()> {
    let (min_x, min_y, max_x, max_y) = match meta.extent {
        Some(e) => (Some(e.min_x), Some(e.min_y), Some(e.max_x), Some(e.max_y)),
        None => (None, None, None, None),
    };
    conn.execute(
        "INSERT INTO gpkg_contents \
         (table_name, data_type, identifier, description, last_change, min_x, min_y, max_x, max_y, srs_id) \
         VALUES (?1, 'features', ?1, '', ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            meta.table,
            timestamp(),
            min_x,
            min_y,
            max_x,
            max_y,
            meta.srs_id
        ],
    )?;
    conn.execute(
        "INSERT INTO gpkg_geometry_columns \
         (table_name, column_name, geometry_type_name, srs_id, z, m) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            meta.table,
            GEOMETRY_COLUMN,
            meta.geometry_type,
            meta.srs_id,
            if meta.has_z { 2 } else { 0 }
        ],
    )?;
    Ok(())
}
