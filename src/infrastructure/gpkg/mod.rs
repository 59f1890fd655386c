//! GeoPackage container driver on top of SQLite

pub mod geometry;
pub mod schema;

use std::collections::HashSet;
use std::path::Path;

use itertools::Itertools;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::{debug, instrument, warn};

use crate::domain::{SourceFormat, VectorLayer};
use crate::infrastructure::geojson::{self, Feature};
use crate::infrastructure::traits::{AccessMode, ContainerDriver};
use crate::infrastructure::{ContainerError, ContainerResult};

use self::geometry::Envelope;
use self::schema::{quote_ident, Column, ColumnType, LayerMeta};

pub const GPKG_EXTENSION: &str = "gpkg";

/// Writes and merges GeoPackage containers.
#[derive(Debug, Default)]
pub struct GpkgDriver;

impl GpkgDriver {
    pub fn new() -> Self {
        Self
    }

    fn create(path: &Path) -> ContainerResult<Connection> {
        if path.exists() {
            return Err(ContainerError::AlreadyExists(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        schema::init_container(&conn)?;
        Ok(conn)
    }

    fn open_existing(path: &Path) -> ContainerResult<Connection> {
        if !path.is_file() {
            return Err(ContainerError::NotFound(path.to_path_buf()));
        }
        Ok(Connection::open(path)?)
    }

    fn write_geojson(
        &self,
        layer: &VectorLayer,
        path: &Path,
        layer_name: &str,
    ) -> ContainerResult<usize> {
        let content = std::fs::read_to_string(&layer.source).map_err(|e| {
            ContainerError::io(format!("read {}", layer.source.display()), e)
        })?;
        let features =
            geojson::parse_features(&content).map_err(|source| ContainerError::GeoJson {
                path: layer.source.clone(),
                source,
            })?;

        let mut conn = Self::create(path)?;
        let tx = conn.transaction()?;
        schema::ensure_srs(&tx, &layer.crs)?;

        let columns = infer_columns(&features);
        let meta = LayerMeta {
            table: layer_name.to_string(),
            srs_id: layer.crs.srs_id(),
            extent: layer_extent(&features),
            geometry_type: geometry_type_name(&features),
            has_z: features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .any(|g| g.has_z()),
        };
        schema::create_feature_table(&tx, layer_name, &meta.geometry_type, &columns)?;

        let mut names = vec![quote_ident(schema::GEOMETRY_COLUMN)];
        names.extend(columns.iter().map(|c| quote_ident(&c.name)));
        let placeholders = (1..=names.len())
            .map(|i| format!("?{i}"))
            .join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(layer_name),
            names.join(", "),
            placeholders
        );
        {
            let mut stmt = tx.prepare(&insert)?;
            for feature in &features {
                let geom = match &feature.geometry {
                    Some(g) => rusqlite::types::Value::Blob(geometry::encode(g, meta.srs_id)?),
                    None => rusqlite::types::Value::Null,
                };
                let mut row = Vec::with_capacity(names.len());
                row.push(geom);
                for column in &columns {
                    let value = feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get(&column.name))
                        .unwrap_or(&serde_json::Value::Null);
                    row.push(column.kind.to_sql(value));
                }
                stmt.execute(params_from_iter(row))?;
            }
        }
        schema::register_layer(&tx, &meta)?;
        tx.commit()?;

        debug!(
            "write_geojson: {} features into {}",
            features.len(),
            path.display()
        );
        Ok(features.len())
    }

    fn write_gpkg(
        &self,
        layer: &VectorLayer,
        source_layer: Option<&str>,
        path: &Path,
        layer_name: &str,
    ) -> ContainerResult<usize> {
        let source_layer = match source_layer {
            Some(name) => name.to_string(),
            None => {
                let conn = Self::open_existing(&layer.source)?;
                first_features_table(&conn)?.ok_or_else(|| ContainerError::LayerNotFound {
                    path: layer.source.clone(),
                    layer: "<first features table>".to_string(),
                })?
            }
        };
        if path.exists() {
            return Err(ContainerError::AlreadyExists(path.to_path_buf()));
        }
        copy_layer(
            &layer.source,
            &source_layer,
            path,
            layer_name,
            AccessMode::Overwrite,
        )
    }
}

impl ContainerDriver for GpkgDriver {
    fn extension(&self) -> &str {
        GPKG_EXTENSION
    }

    #[instrument(level = "debug", skip(self, layer), fields(source = %layer.source.display()))]
    fn write_layer(
        &self,
        layer: &VectorLayer,
        path: &Path,
        layer_name: &str,
    ) -> ContainerResult<usize> {
        if !layer.source.is_file() {
            return Err(ContainerError::NotFound(layer.source.clone()));
        }
        let existed = path.exists();
        let result = match &layer.format {
            SourceFormat::GeoJson => self.write_geojson(layer, path, layer_name),
            SourceFormat::GeoPackage { layer: source_layer } => {
                self.write_gpkg(layer, source_layer.as_deref(), path, layer_name)
            }
        };
        if result.is_err() && !existed && path.exists() {
            // a half-written container must not be picked up later
            if let Err(e) = std::fs::remove_file(path) {
                warn!("write_layer: cannot remove {}: {}", path.display(), e);
            }
        }
        result
    }

    #[instrument(level = "debug", skip(self))]
    fn merge_layer(
        &self,
        src: &Path,
        layer_name: &str,
        dst: &Path,
        mode: AccessMode,
    ) -> ContainerResult<()> {
        copy_layer(src, layer_name, dst, layer_name, mode).map(|_| ())
    }

    fn list_layers(&self, path: &Path) -> ContainerResult<Vec<String>> {
        let conn = Self::open_existing(path)?;
        schema::layer_names(&conn, "main")
    }
}

fn first_features_table(conn: &Connection) -> ContainerResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY rowid LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?)
}

/// Copy `src_table` of container `src` into container `dst` as `dst_table`.
///
/// Returns the number of copied rows.
fn copy_layer(
    src: &Path,
    src_table: &str,
    dst: &Path,
    dst_table: &str,
    mode: AccessMode,
) -> ContainerResult<usize> {
    if !src.is_file() {
        return Err(ContainerError::NotFound(src.to_path_buf()));
    }
    if mode == AccessMode::Append && !dst.is_file() {
        return Err(ContainerError::NotFound(dst.to_path_buf()));
    }

    let conn = Connection::open(dst)?;
    schema::init_container(&conn)?;
    conn.execute(
        "ATTACH DATABASE ?1 AS src",
        [src.to_string_lossy().into_owned()],
    )?;
    let copied = copy_attached(&conn, src, src_table, dst, dst_table, mode);
    let detached = conn.execute("DETACH DATABASE src", []);
    let copied = copied?;
    detached?;
    Ok(copied)
}

fn copy_attached(
    conn: &Connection,
    src: &Path,
    src_table: &str,
    dst: &Path,
    dst_table: &str,
    mode: AccessMode,
) -> ContainerResult<usize> {
    if !schema::table_exists(conn, "src", src_table)? {
        return Err(ContainerError::LayerNotFound {
            path: src.to_path_buf(),
            layer: src_table.to_string(),
        });
    }

    let tx = conn.unchecked_transaction()?;
    if schema::table_exists(&tx, "main", dst_table)? {
        match mode {
            AccessMode::Overwrite => {
                debug!("copy_layer: replacing existing layer '{}'", dst_table);
                schema::drop_layer(&tx, dst_table)?;
            }
            AccessMode::Append => {
                return Err(ContainerError::LayerExists {
                    path: dst.to_path_buf(),
                    layer: dst_table.to_string(),
                });
            }
        }
    }

    tx.execute(
        "INSERT OR IGNORE INTO main.gpkg_spatial_ref_sys \
         (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
         SELECT srs_name, srs_id, organization, organization_coordsys_id, definition, description \
         FROM src.gpkg_spatial_ref_sys \
         WHERE srs_id IN (SELECT srs_id FROM src.gpkg_contents WHERE table_name = ?1 COLLATE NOCASE \
                          UNION SELECT srs_id FROM src.gpkg_geometry_columns WHERE table_name = ?1 COLLATE NOCASE)",
        [src_table],
    )?;

    let columns = table_columns(&tx, src_table)?;
    tx.execute(&create_table_like(dst_table, &columns), [])?;
    let column_list = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .join(", ");
    let copied = tx.execute(
        &format!(
            "INSERT INTO main.{} ({cols}) SELECT {cols} FROM src.{}",
            quote_ident(dst_table),
            quote_ident(src_table),
            cols = column_list
        ),
        [],
    )?;

    tx.execute(
        "INSERT INTO main.gpkg_contents \
         (table_name, data_type, identifier, description, last_change, min_x, min_y, max_x, max_y, srs_id) \
         SELECT ?1, data_type, ?1, description, ?2, min_x, min_y, max_x, max_y, srs_id \
         FROM src.gpkg_contents WHERE table_name = ?3 COLLATE NOCASE",
        rusqlite::params![dst_table, schema::timestamp(), src_table],
    )?;
    tx.execute(
        "INSERT INTO main.gpkg_geometry_columns \
         (table_name, column_name, geometry_type_name, srs_id, z, m) \
         SELECT ?1, column_name, geometry_type_name, srs_id, z, m \
         FROM src.gpkg_geometry_columns WHERE table_name = ?2 COLLATE NOCASE",
        rusqlite::params![dst_table, src_table],
    )?;
    tx.commit()?;

    debug!(
        "copy_layer: {} rows {}:{} -> {}:{}",
        copied,
        src.display(),
        src_table,
        dst.display(),
        dst_table
    );
    Ok(copied)
}

/// Column as reported by `PRAGMA table_info`.
#[derive(Debug)]
struct TableColumn {
    name: String,
    decl_type: String,
    not_null: bool,
    default: Option<String>,
    primary_key: bool,
}

fn table_columns(conn: &Connection, table: &str) -> ContainerResult<Vec<TableColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA src.table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(TableColumn {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn create_table_like(table: &str, columns: &[TableColumn]) -> String {
    let defs = columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), c.decl_type);
            if c.primary_key && c.decl_type.eq_ignore_ascii_case("INTEGER") {
                def.push_str(" PRIMARY KEY AUTOINCREMENT");
            }
            if c.not_null {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default {
                def.push_str(&format!(" DEFAULT {default}"));
            }
            def
        })
        .join(", ");
    format!("CREATE TABLE main.{} ({defs})", quote_ident(table))
}

/// Attribute columns in first-seen order with widened types.
///
/// Property names clashing with `fid`/`geom` or with an earlier property
/// (case-insensitively) are dropped. Columns holding only nulls are TEXT.
fn infer_columns(features: &[Feature]) -> Vec<Column> {
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = [schema::FID_COLUMN, schema::GEOMETRY_COLUMN]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
        for name in properties.keys() {
            if names.contains(name) {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                names.push(name.clone());
            } else {
                warn!("infer_columns: dropping clashing property '{}'", name);
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let kind = features
                .iter()
                .filter_map(|f| f.properties.as_ref()?.get(&name))
                .filter_map(ColumnType::of_value)
                .reduce(ColumnType::widen)
                .unwrap_or(ColumnType::Text);
            Column { name, kind }
        })
        .collect()
}

fn layer_extent(features: &[Feature]) -> Option<Envelope> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(Envelope::of)
        .reduce(Envelope::union)
}

/// Shared geometry type of all features, `GEOMETRY` if they differ.
fn geometry_type_name(features: &[Feature]) -> String {
    let mut types = features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| g.type_name());
    let first = match types.next() {
        Some(first) => first,
        None => return "GEOMETRY".to_string(),
    };
    if types.all(|t| t == first) {
        first.to_string()
    } else {
        "GEOMETRY".to_string()
    }
}
