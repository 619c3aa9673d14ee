//! SQLite-backed store holding segments, restaurants, the road graph and
//! the path catalogue in a single database.

use std::{
    fmt,
    path::{Path as FsPath, PathBuf},
};

use geo::{Coord, LineString, Rect};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;

use super::{PathQuery, PathStore, PointIndex, RestaurantStore, SegmentStore, StoreError};
use crate::geometry::{bounding_box, normalise_coord};
use crate::graph::{Edge, GraphStore, Node, NodeId};
use crate::tolerance::MatchTolerance;
use crate::{NewPath, Path, PathRestaurant, Restaurant, RouteSegment};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS route_segments (
    id INTEGER PRIMARY KEY,
    geometry TEXT NOT NULL,
    length REAL NOT NULL,
    linked_restaurants TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS restaurants (
    id INTEGER PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    type TEXT NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    UNIQUE (lon, lat)
);
CREATE TABLE IF NOT EXISTS edges (
    source INTEGER NOT NULL REFERENCES nodes (id),
    target INTEGER NOT NULL REFERENCES nodes (id),
    distance REAL NOT NULL,
    segment_id INTEGER NOT NULL,
    PRIMARY KEY (source, target)
);
CREATE TABLE IF NOT EXISTS paths (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_lon REAL NOT NULL,
    start_lat REAL NOT NULL,
    end_lon REAL NOT NULL,
    end_lat REAL NOT NULL,
    target_length REAL NOT NULL,
    resolved_length REAL NOT NULL,
    routes TEXT,
    restaurants TEXT
);
CREATE TABLE IF NOT EXISTS catalog_settings (
    name TEXT PRIMARY KEY,
    value REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS paths_by_start ON paths (start_lon, start_lat);
CREATE INDEX IF NOT EXISTS paths_by_length ON paths (resolved_length);
CREATE INDEX IF NOT EXISTS paths_without_routes ON paths (id) WHERE routes IS NULL;
CREATE INDEX IF NOT EXISTS paths_without_restaurants ON paths (id)
    WHERE routes IS NOT NULL AND restaurants IS NULL;
CREATE INDEX IF NOT EXISTS paths_matchable ON paths (resolved_length)
    WHERE routes IS NOT NULL AND restaurants IS NOT NULL;
";

const PATH_COLUMNS: &str = "id, start_lon, start_lat, end_lon, end_lat, target_length, \
                            resolved_length, routes, restaurants";

/// Error raised when opening or writing the SQLite store.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating tables or indices failed.
    #[error("failed to initialise the store schema: {source}")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A JSON column could not be encoded or decoded.
    #[error("invalid {column} payload for row {id}: {source}")]
    InvalidJson {
        /// Column holding the payload.
        column: &'static str,
        /// Row identifier.
        id: u64,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// SQLite produced a row id outside the identifier range.
    #[error("row id {0} is negative")]
    NegativeRowId(i64),
    /// Generic SQLite error.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Store persisting every entity in SQLite.
///
/// Restaurant locations and segment start vertices are also held in
/// R\*-tree indices, loaded when the store opens and rebuilt whenever the
/// underlying rows are replaced.
pub struct SqliteStore {
    connection: Connection,
    restaurant_index: PointIndex,
    segment_start_index: PointIndex,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("restaurants", &self.restaurant_index.len())
            .field("segments", &self.segment_start_index.len())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at `path`.
    pub fn open<P>(path: P) -> Result<Self, SqliteStoreError>
    where
        P: AsRef<FsPath>,
    {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Create a transient store held in memory.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, SqliteStoreError> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| SqliteStoreError::CreateSchema { source })?;
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| SqliteStoreError::CreateSchema { source })?;
        let mut store = Self {
            connection,
            restaurant_index: PointIndex::default(),
            segment_start_index: PointIndex::default(),
        };
        store.reload_indices()?;
        Ok(store)
    }

    fn reload_indices(&mut self) -> Result<(), SqliteStoreError> {
        let restaurants = load_restaurants(&self.connection)?;
        self.restaurant_index = PointIndex::new(
            restaurants
                .iter()
                .map(|restaurant| (restaurant.id, restaurant.location)),
        );
        let segments = load_segments(&self.connection)?;
        self.segment_start_index = PointIndex::new(
            segments
                .iter()
                .filter_map(|segment| segment.start().map(|start| (segment.id, start))),
        );
        Ok(())
    }

    /// Tolerance the path catalogue was built with, if one was recorded.
    pub fn catalog_tolerance(&self) -> Result<Option<MatchTolerance>, SqliteStoreError> {
        let ratio: Option<f64> = self
            .connection
            .query_row(
                "SELECT value FROM catalog_settings WHERE name = 'tolerance'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ratio.map(MatchTolerance::new))
    }

    /// Record the tolerance used to build the path catalogue.
    pub fn set_catalog_tolerance(
        &mut self,
        tolerance: MatchTolerance,
    ) -> Result<(), SqliteStoreError> {
        self.connection.execute(
            "INSERT INTO catalog_settings (name, value) VALUES ('tolerance', ?1) \
             ON CONFLICT (name) DO UPDATE SET value = excluded.value",
            params![tolerance.ratio],
        )?;
        Ok(())
    }

    /// Replace every route segment.
    ///
    /// The road graph and the path catalogue are derived from segments, so
    /// both are cleared as well.
    pub fn replace_segments(&mut self, segments: &[RouteSegment]) -> Result<(), SqliteStoreError> {
        let tx = self.connection.transaction()?;
        tx.execute_batch(
            "DELETE FROM paths; DELETE FROM catalog_settings; DELETE FROM edges; \
             DELETE FROM nodes; DELETE FROM route_segments;",
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO route_segments (id, geometry, length, linked_restaurants) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for segment in segments {
                let geometry = encode_json("geometry", segment.id, &line_to_pairs(&segment.geometry))?;
                let linked =
                    encode_json("linked_restaurants", segment.id, &segment.linked_restaurants)?;
                insert.execute(params![segment.id, geometry, segment.length, linked])?;
            }
        }
        tx.commit()?;
        self.reload_indices()
    }

    /// Replace every restaurant.
    pub fn replace_restaurants(
        &mut self,
        restaurants: &[Restaurant],
    ) -> Result<(), SqliteStoreError> {
        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM restaurants", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO restaurants (id, lon, lat, type, name) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for restaurant in restaurants {
                insert.execute(params![
                    restaurant.id,
                    restaurant.location.x,
                    restaurant.location.y,
                    restaurant.kind,
                    restaurant.name,
                ])?;
            }
        }
        tx.commit()?;
        self.reload_indices()
    }

    /// Replace the persisted road graph with the contents of `graph`.
    ///
    /// Node identifiers are preserved. The whole graph is written in one
    /// transaction.
    pub fn save_graph<G>(&mut self, graph: &G) -> Result<(), StoreError>
    where
        G: GraphStore + ?Sized,
    {
        let nodes = graph.nodes()?;
        let edges = graph.edges()?;
        let tx = self
            .connection
            .transaction()
            .map_err(|source| StoreError::backend("begin graph transaction", source))?;
        write_graph(&tx, &nodes, &edges)
            .map_err(|source| StoreError::backend("write road graph", source))?;
        tx.commit()
            .map_err(|source| StoreError::backend("commit road graph", source))
    }

    fn read<T, F>(&self, operation: &'static str, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    {
        query(&self.connection).map_err(|source| StoreError::backend(operation, source))
    }

    fn write<T, F>(&mut self, operation: &'static str, statement: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    {
        statement(&mut self.connection).map_err(|source| StoreError::backend(operation, source))
    }
}

fn write_graph(tx: &Transaction<'_>, nodes: &[Node], edges: &[Edge]) -> rusqlite::Result<()> {
    tx.execute_batch("DELETE FROM edges; DELETE FROM nodes;")?;
    let mut insert_node = tx.prepare("INSERT INTO nodes (id, lon, lat) VALUES (?1, ?2, ?3)")?;
    for node in nodes {
        let location = normalise_coord(node.location);
        insert_node.execute(params![node.id.0, location.x, location.y])?;
    }
    let mut insert_edge = tx.prepare(
        "INSERT INTO edges (source, target, distance, segment_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for edge in edges {
        insert_edge.execute(params![
            edge.source.0,
            edge.target.0,
            edge.distance,
            edge.segment_id
        ])?;
    }
    Ok(())
}

fn line_to_pairs(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn encode_json<T>(column: &'static str, id: u64, value: &T) -> Result<String, SqliteStoreError>
where
    T: serde::Serialize + ?Sized,
{
    serde_json::to_string(value).map_err(|source| SqliteStoreError::InvalidJson {
        column,
        id,
        source,
    })
}

fn decode_json<T>(column: &'static str, id: u64, raw: &str) -> Result<T, SqliteStoreError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(raw).map_err(|source| SqliteStoreError::InvalidJson {
        column,
        id,
        source,
    })
}

fn row_id(raw: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(raw).map_err(|_| SqliteStoreError::NegativeRowId(raw))
}

fn load_segments(connection: &Connection) -> Result<Vec<RouteSegment>, SqliteStoreError> {
    let mut statement = connection.prepare(
        "SELECT id, geometry, length, linked_restaurants FROM route_segments ORDER BY id",
    )?;
    let rows = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(id, geometry, length, linked)| segment_from_row(id, &geometry, length, &linked))
        .collect()
}

fn segment_from_row(
    id: u64,
    geometry: &str,
    length: f64,
    linked: &str,
) -> Result<RouteSegment, SqliteStoreError> {
    let pairs: Vec<[f64; 2]> = decode_json("geometry", id, geometry)?;
    let line: LineString<f64> = pairs.into_iter().map(|[x, y]| Coord { x, y }).collect();
    let mut segment = RouteSegment::new(id, line, length);
    segment.linked_restaurants = decode_json("linked_restaurants", id, linked)?;
    Ok(segment)
}

fn load_restaurants(connection: &Connection) -> Result<Vec<Restaurant>, SqliteStoreError> {
    let mut statement =
        connection.prepare("SELECT id, lon, lat, type, name FROM restaurants ORDER BY id")?;
    let restaurants = statement
        .query_map([], restaurant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(restaurants)
}

fn restaurant_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant::new(
        row.get(0)?,
        Coord {
            x: row.get(1)?,
            y: row.get(2)?,
        },
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
    ))
}

/// Raw `paths` row before JSON columns are decoded.
struct PathRow {
    id: u64,
    start: Coord<f64>,
    end: Coord<f64>,
    target_length: f64,
    resolved_length: f64,
    routes: Option<String>,
    restaurants: Option<String>,
}

impl PathRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start: Coord {
                x: row.get(1)?,
                y: row.get(2)?,
            },
            end: Coord {
                x: row.get(3)?,
                y: row.get(4)?,
            },
            target_length: row.get(5)?,
            resolved_length: row.get(6)?,
            routes: row.get(7)?,
            restaurants: row.get(8)?,
        })
    }

    fn decode(self) -> Result<Path, SqliteStoreError> {
        let routes = self
            .routes
            .as_deref()
            .map(|raw| decode_json::<Vec<u64>>("routes", self.id, raw))
            .transpose()?;
        let restaurants = self
            .restaurants
            .as_deref()
            .map(|raw| decode_json::<Vec<PathRestaurant>>("restaurants", self.id, raw))
            .transpose()?;
        Ok(Path {
            id: self.id,
            start: self.start,
            end: self.end,
            target_length: self.target_length,
            resolved_length: self.resolved_length,
            routes,
            restaurants,
        })
    }
}

fn load_paths<P>(connection: &Connection, sql: &str, params: P) -> Result<Vec<Path>, SqliteStoreError>
where
    P: rusqlite::Params,
{
    let mut statement = connection.prepare(sql)?;
    let rows = statement
        .query_map(params, PathRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(PathRow::decode).collect()
}

impl GraphStore for SqliteStore {
    fn find_node(&self, location: Coord<f64>) -> Result<Option<NodeId>, StoreError> {
        let location = normalise_coord(location);
        self.read("find node", |connection| {
            let id = connection
                .query_row(
                    "SELECT id FROM nodes WHERE lon = ?1 AND lat = ?2",
                    params![location.x, location.y],
                    |row| row.get::<_, u64>(0),
                )
                .optional()?;
            Ok(id.map(NodeId))
        })
    }

    fn insert_node(&mut self, location: Coord<f64>) -> Result<NodeId, StoreError> {
        let location = normalise_coord(location);
        self.write("insert node", |connection| {
            connection.execute(
                "INSERT INTO nodes (lon, lat) VALUES (?1, ?2)",
                params![location.x, location.y],
            )?;
            Ok(NodeId(row_id(connection.last_insert_rowid())?))
        })
    }

    fn node_location(&self, id: NodeId) -> Result<Option<Coord<f64>>, StoreError> {
        self.read("read node", |connection| {
            Ok(connection
                .query_row(
                    "SELECT lon, lat FROM nodes WHERE id = ?1",
                    params![id.0],
                    |row| {
                        Ok(Coord {
                            x: row.get(0)?,
                            y: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    fn has_edge(&self, source: NodeId, target: NodeId) -> Result<bool, StoreError> {
        self.read("look up edge", |connection| {
            Ok(connection
                .query_row(
                    "SELECT 1 FROM edges WHERE source = ?1 AND target = ?2",
                    params![source.0, target.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        if self.has_edge(edge.source, edge.target)? {
            return Err(StoreError::DuplicateEdge {
                from: edge.source,
                to: edge.target,
            });
        }
        self.write("insert edge", |connection| {
            connection.execute(
                "INSERT INTO edges (source, target, distance, segment_id) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![edge.source.0, edge.target.0, edge.distance, edge.segment_id],
            )?;
            Ok(())
        })
    }

    fn outgoing(&self, source: NodeId) -> Result<Vec<Edge>, StoreError> {
        self.read("read outgoing edges", |connection| {
            let mut statement = connection.prepare_cached(
                "SELECT source, target, distance, segment_id FROM edges \
                 WHERE source = ?1 ORDER BY target",
            )?;
            let edges = statement
                .query_map(params![source.0], edge_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    fn nodes(&self) -> Result<Vec<Node>, StoreError> {
        self.read("read nodes", |connection| {
            let mut statement = connection.prepare("SELECT id, lon, lat FROM nodes ORDER BY id")?;
            let nodes = statement
                .query_map([], |row| {
                    Ok(Node {
                        id: NodeId(row.get(0)?),
                        location: Coord {
                            x: row.get(1)?,
                            y: row.get(2)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(nodes)
        })
    }

    fn edges(&self) -> Result<Vec<Edge>, StoreError> {
        self.read("read edges", |connection| {
            let mut statement = connection.prepare(
                "SELECT source, target, distance, segment_id FROM edges ORDER BY source, target",
            )?;
            let edges = statement
                .query_map([], edge_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    fn node_count(&self) -> Result<usize, StoreError> {
        self.read("count nodes", |connection| {
            Ok(connection.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?)
        })
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        self.read("count edges", |connection| {
            Ok(connection.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?)
        })
    }
}

fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Edge> {
    Ok(Edge {
        source: NodeId(row.get(0)?),
        target: NodeId(row.get(1)?),
        distance: row.get(2)?,
        segment_id: row.get(3)?,
    })
}

impl SegmentStore for SqliteStore {
    fn segments(&self) -> Result<Vec<RouteSegment>, StoreError> {
        self.read("read segments", load_segments)
    }

    fn segments_by_id(&self, ids: &[u64]) -> Result<Vec<RouteSegment>, StoreError> {
        let found = self.read("read segments by id", |connection| {
            let mut statement = connection.prepare_cached(
                "SELECT id, geometry, length, linked_restaurants FROM route_segments WHERE id = ?1",
            )?;
            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                let row = statement
                    .query_row(params![id], |row| {
                        Ok((
                            row.get::<_, String>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })
                    .optional()?;
                found.push(match row {
                    Some((geometry, length, linked)) => {
                        Some(segment_from_row(*id, &geometry, length, &linked)?)
                    }
                    None => None,
                });
            }
            Ok(found)
        })?;
        ids.iter()
            .zip(found)
            .map(|(id, segment)| {
                segment.ok_or(StoreError::NotFound {
                    entity: "segment",
                    id: *id,
                })
            })
            .collect()
    }

    fn set_linked_restaurants(
        &mut self,
        id: u64,
        restaurants: Vec<u64>,
    ) -> Result<(), StoreError> {
        let updated = self.write("link restaurants", |connection| {
            let linked = encode_json("linked_restaurants", id, &restaurants)?;
            Ok(connection.execute(
                "UPDATE route_segments SET linked_restaurants = ?1 WHERE id = ?2",
                params![linked, id],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "segment",
                id,
            });
        }
        Ok(())
    }

    fn nearest_segment_start(&self, point: Coord<f64>) -> Result<Option<Coord<f64>>, StoreError> {
        Ok(self
            .segment_start_index
            .nearest(point)
            .map(|(_, start)| start))
    }
}

impl RestaurantStore for SqliteStore {
    fn restaurants(&self) -> Result<Vec<Restaurant>, StoreError> {
        self.read("read restaurants", load_restaurants)
    }

    fn restaurants_by_id(&self, ids: &[u64]) -> Result<Vec<Restaurant>, StoreError> {
        self.read("read restaurants by id", |connection| {
            let mut statement = connection
                .prepare_cached("SELECT id, lon, lat, type, name FROM restaurants WHERE id = ?1")?;
            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(restaurant) = statement
                    .query_row(params![id], restaurant_from_row)
                    .optional()?
                {
                    found.push(restaurant);
                }
            }
            found.sort_by_key(|restaurant: &Restaurant| restaurant.id);
            found.dedup_by_key(|restaurant| restaurant.id);
            Ok(found)
        })
    }

    fn restaurants_within(
        &self,
        centre: Coord<f64>,
        radius_m: f64,
    ) -> Result<Vec<u64>, StoreError> {
        Ok(self.restaurant_index.within_radius(centre, radius_m))
    }

    fn restaurant_bounds(&self) -> Result<Option<Rect<f64>>, StoreError> {
        let restaurants = self.restaurants()?;
        Ok(bounding_box(
            restaurants.iter().map(|restaurant| restaurant.location),
        ))
    }
}

impl PathStore for SqliteStore {
    fn path_count(&self) -> Result<usize, StoreError> {
        self.read("count paths", |connection| {
            Ok(connection.query_row("SELECT COUNT(*) FROM paths", [], |row| row.get(0))?)
        })
    }

    fn clear_paths(&mut self) -> Result<(), StoreError> {
        self.write("clear paths", |connection| {
            connection.execute_batch("DELETE FROM paths; DELETE FROM catalog_settings;")?;
            Ok(())
        })
    }

    fn insert_paths(&mut self, paths: &[NewPath]) -> Result<Vec<u64>, StoreError> {
        self.write("insert paths", |connection| {
            let tx = connection.transaction()?;
            let mut ids = Vec::with_capacity(paths.len());
            {
                let mut insert = tx.prepare(
                    "INSERT INTO paths (start_lon, start_lat, end_lon, end_lat, target_length, \
                     resolved_length) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for path in paths {
                    let start = normalise_coord(path.start);
                    let end = normalise_coord(path.end);
                    let id = insert.insert(params![
                        start.x,
                        start.y,
                        end.x,
                        end.y,
                        path.target_length,
                        path.resolved_length,
                    ])?;
                    ids.push(row_id(id)?);
                }
            }
            tx.commit()?;
            Ok(ids)
        })
    }

    fn paths_without_routes(&self) -> Result<Vec<Path>, StoreError> {
        self.read("read unrouted paths", |connection| {
            load_paths(
                connection,
                &format!("SELECT {PATH_COLUMNS} FROM paths WHERE routes IS NULL ORDER BY id"),
                [],
            )
        })
    }

    fn set_routes(&mut self, id: u64, routes: Vec<u64>) -> Result<(), StoreError> {
        let updated = self.write("record routes", |connection| {
            let raw = encode_json("routes", id, &routes)?;
            Ok(connection.execute(
                "UPDATE paths SET routes = ?1 WHERE id = ?2",
                params![raw, id],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound { entity: "path", id });
        }
        Ok(())
    }

    fn paths_without_restaurants(&self) -> Result<Vec<Path>, StoreError> {
        self.read("read paths without restaurants", |connection| {
            load_paths(
                connection,
                &format!(
                    "SELECT {PATH_COLUMNS} FROM paths \
                     WHERE routes IS NOT NULL AND restaurants IS NULL ORDER BY id"
                ),
                [],
            )
        })
    }

    fn set_restaurants(
        &mut self,
        id: u64,
        restaurants: Vec<PathRestaurant>,
    ) -> Result<(), StoreError> {
        let updated = self.write("record path restaurants", |connection| {
            let raw = encode_json("restaurants", id, &restaurants)?;
            Ok(connection.execute(
                "UPDATE paths SET restaurants = ?1 WHERE id = ?2",
                params![raw, id],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::NotFound { entity: "path", id });
        }
        Ok(())
    }

    fn find_paths(&self, query: &PathQuery) -> Result<Vec<Path>, StoreError> {
        let candidates = self.read("find paths", |connection| {
            let base = format!(
                "SELECT {PATH_COLUMNS} FROM paths WHERE routes IS NOT NULL \
                 AND restaurants IS NOT NULL AND resolved_length >= ?1 AND resolved_length <= ?2"
            );
            match query.start.map(normalise_coord) {
                Some(start) => load_paths(
                    connection,
                    &format!("{base} AND start_lon = ?3 AND start_lat = ?4 ORDER BY id"),
                    params![query.band.min(), query.band.max(), start.x, start.y],
                ),
                None => load_paths(
                    connection,
                    &format!("{base} ORDER BY id"),
                    params![query.band.min(), query.band.max()],
                ),
            }
        })?;
        Ok(query.select(candidates))
    }

    fn starting_points(&self) -> Result<Vec<Coord<f64>>, StoreError> {
        self.read("read starting points", |connection| {
            let mut statement = connection.prepare(
                "SELECT start_lon, start_lat FROM paths \
                 GROUP BY start_lon, start_lat ORDER BY MIN(id)",
            )?;
            let points = statement
                .query_map([], |row| {
                    Ok(Coord {
                        x: row.get(0)?,
                        y: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(points)
        })
    }
}
