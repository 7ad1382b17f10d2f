//! In-memory property-graph store
//!
//! Server-side stand-in for the graph engine: typed vertex and edge rows
//! with per-row property maps. Rows are keyed by id in ordered maps so
//! query output is deterministic.

use crate::protocol::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Graph-level counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub num_vertices: u64,
    pub num_edges: u64,
    pub num_vertex_properties: u64,
    pub num_edge_properties: u64,
    pub num_vertices_from_vertex_data: u64,
}

impl GraphInfo {
    /// Keyed counter list, in wire order.
    pub fn entries(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("num_vertices", self.num_vertices as i64),
            ("num_edges", self.num_edges as i64),
            ("num_vertex_properties", self.num_vertex_properties as i64),
            ("num_edge_properties", self.num_edge_properties as i64),
            (
                "num_vertices_from_vertex_data",
                self.num_vertices_from_vertex_data as i64,
            ),
        ]
    }
}

/// Property and type names known to a graph, each list sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub vertex_property_names: Vec<String>,
    pub edge_property_names: Vec<String>,
    pub vertex_types: Vec<String>,
    pub edge_types: Vec<String>,
}

/// One vertex with its properties, as returned by data queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexDataRow {
    pub vertex_id: i64,
    pub type_name: String,
    pub properties: HashMap<String, PropertyValue>,
}

/// One edge with its properties, as returned by data queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeDataRow {
    pub edge_id: i64,
    pub src_vertex_id: i64,
    pub dst_vertex_id: i64,
    pub type_name: String,
    pub properties: HashMap<String, PropertyValue>,
}

/// Row filters for data queries. `None` means no filter.
#[derive(Clone, Debug, Default)]
pub struct DataSelector {
    pub ids: Option<Vec<i64>>,
    pub types: Option<Vec<String>>,
    pub columns: Option<Vec<String>>,
}

/// Parsed vertex table ready for insertion: (vertex id, properties) rows.
#[derive(Clone, Debug)]
pub struct VertexTable {
    pub type_name: String,
    pub rows: Vec<(i64, HashMap<String, PropertyValue>)>,
}

/// Parsed edge table ready for insertion: (src, dst, properties) rows.
#[derive(Clone, Debug)]
pub struct EdgeTable {
    pub type_name: String,
    pub rows: Vec<(i64, i64, HashMap<String, PropertyValue>)>,
}

#[derive(Clone, Debug)]
struct VertexRecord {
    type_name: String,
    properties: HashMap<String, PropertyValue>,
}

#[derive(Clone, Debug)]
struct EdgeRecord {
    src: i64,
    dst: i64,
    type_name: String,
    properties: HashMap<String, PropertyValue>,
}

/// In-memory property graph. Edge ids are assigned monotonically across
/// all loads into the graph.
#[derive(Debug, Default)]
pub struct PropertyGraph {
    vertices: BTreeMap<i64, VertexRecord>,
    edges: BTreeMap<i64, EdgeRecord>,
    next_edge_id: i64,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vertex table. Re-adding a vertex id merges its properties;
    /// the latest load's type wins. Returns the number of rows inserted.
    pub fn add_vertex_table(&mut self, table: VertexTable) -> u64 {
        let mut count = 0;
        for (vertex_id, properties) in table.rows {
            let record = self
                .vertices
                .entry(vertex_id)
                .or_insert_with(|| VertexRecord {
                    type_name: table.type_name.clone(),
                    properties: HashMap::new(),
                });
            record.type_name = table.type_name.clone();
            record.properties.extend(properties);
            count += 1;
        }
        count
    }

    /// Insert an edge table, assigning edge ids in row order. Returns the
    /// number of rows inserted.
    pub fn add_edge_table(&mut self, table: EdgeTable) -> u64 {
        let mut count = 0;
        for (src, dst, properties) in table.rows {
            let edge_id = self.next_edge_id;
            self.next_edge_id += 1;
            self.edges.insert(
                edge_id,
                EdgeRecord {
                    src,
                    dst,
                    type_name: table.type_name.clone(),
                    properties,
                },
            );
            count += 1;
        }
        count
    }

    /// Count vertices. With `include_edge_data`, vertices that only appear
    /// as edge endpoints are counted too. Endpoint-only vertices carry no
    /// type, so a type filter only ever matches vertex-data rows.
    pub fn num_vertices(&self, type_filter: Option<&str>, include_edge_data: bool) -> u64 {
        match type_filter {
            Some(type_name) => self
                .vertices
                .values()
                .filter(|record| record.type_name == type_name)
                .count() as u64,
            None => {
                if include_edge_data {
                    let mut seen: HashSet<i64> = self.vertices.keys().copied().collect();
                    for edge in self.edges.values() {
                        seen.insert(edge.src);
                        seen.insert(edge.dst);
                    }
                    seen.len() as u64
                } else {
                    self.vertices.len() as u64
                }
            }
        }
    }

    pub fn num_edges(&self, type_filter: Option<&str>) -> u64 {
        match type_filter {
            Some(type_name) => self
                .edges
                .values()
                .filter(|record| record.type_name == type_name)
                .count() as u64,
            None => self.edges.len() as u64,
        }
    }

    pub fn info(&self) -> GraphInfo {
        GraphInfo {
            num_vertices: self.num_vertices(None, true),
            num_edges: self.num_edges(None),
            num_vertex_properties: self.vertex_property_names().len() as u64,
            num_edge_properties: self.edge_property_names().len() as u64,
            num_vertices_from_vertex_data: self.num_vertices(None, false),
        }
    }

    pub fn schema(&self) -> GraphSchema {
        GraphSchema {
            vertex_property_names: self.vertex_property_names(),
            edge_property_names: self.edge_property_names(),
            vertex_types: sorted_names(self.vertices.values().map(|r| r.type_name.as_str())),
            edge_types: sorted_names(self.edges.values().map(|r| r.type_name.as_str())),
        }
    }

    pub fn vertex_property_names(&self) -> Vec<String> {
        sorted_names(
            self.vertices
                .values()
                .flat_map(|record| record.properties.keys())
                .map(String::as_str),
        )
    }

    pub fn edge_property_names(&self) -> Vec<String> {
        sorted_names(
            self.edges
                .values()
                .flat_map(|record| record.properties.keys())
                .map(String::as_str),
        )
    }

    /// Vertex rows matching the selector, in id order. Only vertices with
    /// vertex data are returned; endpoint-only vertices have no row.
    pub fn vertex_data(&self, selector: &DataSelector) -> Vec<VertexDataRow> {
        let id_filter: Option<HashSet<i64>> =
            selector.ids.as_ref().map(|ids| ids.iter().copied().collect());
        self.vertices
            .iter()
            .filter(|(vertex_id, _)| match &id_filter {
                Some(ids) => ids.contains(vertex_id),
                None => true,
            })
            .filter(|(_, record)| type_matches(&selector.types, &record.type_name))
            .map(|(vertex_id, record)| VertexDataRow {
                vertex_id: *vertex_id,
                type_name: record.type_name.clone(),
                properties: project_columns(&record.properties, &selector.columns),
            })
            .collect()
    }

    /// Edge rows matching the selector, in edge-id order.
    pub fn edge_data(&self, selector: &DataSelector) -> Vec<EdgeDataRow> {
        let id_filter: Option<HashSet<i64>> =
            selector.ids.as_ref().map(|ids| ids.iter().copied().collect());
        self.edges
            .iter()
            .filter(|(edge_id, _)| match &id_filter {
                Some(ids) => ids.contains(edge_id),
                None => true,
            })
            .filter(|(_, record)| type_matches(&selector.types, &record.type_name))
            .map(|(edge_id, record)| EdgeDataRow {
                edge_id: *edge_id,
                src_vertex_id: record.src,
                dst_vertex_id: record.dst,
                type_name: record.type_name.clone(),
                properties: project_columns(&record.properties, &selector.columns),
            })
            .collect()
    }
}

// Conversion helpers between store rows and protobuf rows
impl From<&VertexDataRow> for crate::pb::VertexRow {
    fn from(row: &VertexDataRow) -> Self {
        Self {
            vertex_id: row.vertex_id,
            type_name: row.type_name.clone(),
            properties: row
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), crate::pb::Value::from(value)))
                .collect(),
        }
    }
}

impl From<&crate::pb::VertexRow> for VertexDataRow {
    fn from(row: &crate::pb::VertexRow) -> Self {
        Self {
            vertex_id: row.vertex_id,
            type_name: row.type_name.clone(),
            properties: unmarshal_properties(&row.properties),
        }
    }
}

impl From<&EdgeDataRow> for crate::pb::EdgeRow {
    fn from(row: &EdgeDataRow) -> Self {
        Self {
            edge_id: row.edge_id,
            src_vertex_id: row.src_vertex_id,
            dst_vertex_id: row.dst_vertex_id,
            type_name: row.type_name.clone(),
            properties: row
                .properties
                .iter()
                .map(|(name, value)| (name.clone(), crate::pb::Value::from(value)))
                .collect(),
        }
    }
}

impl From<&crate::pb::EdgeRow> for EdgeDataRow {
    fn from(row: &crate::pb::EdgeRow) -> Self {
        Self {
            edge_id: row.edge_id,
            src_vertex_id: row.src_vertex_id,
            dst_vertex_id: row.dst_vertex_id,
            type_name: row.type_name.clone(),
            properties: unmarshal_properties(&row.properties),
        }
    }
}

fn unmarshal_properties(
    properties: &HashMap<String, crate::pb::Value>,
) -> HashMap<String, PropertyValue> {
    properties
        .iter()
        .filter_map(|(name, value)| {
            PropertyValue::from_wire(value).map(|value| (name.clone(), value))
        })
        .collect()
}

fn type_matches(types: &Option<Vec<String>>, type_name: &str) -> bool {
    match types {
        Some(types) => types.iter().any(|t| t == type_name),
        None => true,
    }
}

fn project_columns(
    properties: &HashMap<String, PropertyValue>,
    columns: &Option<Vec<String>>,
) -> HashMap<String, PropertyValue> {
    match columns {
        Some(columns) => columns
            .iter()
            .filter_map(|column| {
                properties
                    .get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect(),
        None => properties.clone(),
    }
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropertyValue)]) -> HashMap<String, PropertyValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn sample_graph() -> PropertyGraph {
        let mut graph = PropertyGraph::new();
        graph.add_vertex_table(VertexTable {
            type_name: "merchants".to_string(),
            rows: vec![
                (11, props(&[("size", PropertyValue::Int32(44))])),
                (4, props(&[("size", PropertyValue::Int32(112))])),
            ],
        });
        graph.add_vertex_table(VertexTable {
            type_name: "users".to_string(),
            rows: vec![(89021, props(&[("vertical", PropertyValue::Int32(0))]))],
        });
        graph.add_edge_table(EdgeTable {
            type_name: "transactions".to_string(),
            rows: vec![
                (89021, 11, props(&[("volume", PropertyValue::Int32(33))])),
                (99999, 4, props(&[("volume", PropertyValue::Int32(12))])),
            ],
        });
        graph
    }

    #[test]
    fn test_counts() {
        let graph = sample_graph();
        assert_eq!(graph.num_vertices(None, false), 3);
        // Vertex 99999 only appears as an edge endpoint.
        assert_eq!(graph.num_vertices(None, true), 4);
        assert_eq!(graph.num_vertices(Some("merchants"), false), 2);
        assert_eq!(graph.num_vertices(Some("users"), true), 1);
        assert_eq!(graph.num_edges(None), 2);
        assert_eq!(graph.num_edges(Some("transactions")), 2);
        assert_eq!(graph.num_edges(Some("referrals")), 0);
    }

    #[test]
    fn test_info() {
        let info = sample_graph().info();
        assert_eq!(info.num_vertices, 4);
        assert_eq!(info.num_vertices_from_vertex_data, 3);
        assert_eq!(info.num_edges, 2);
        assert_eq!(info.num_vertex_properties, 2);
        assert_eq!(info.num_edge_properties, 1);
    }

    #[test]
    fn test_schema_is_sorted() {
        let schema = sample_graph().schema();
        assert_eq!(schema.vertex_property_names, vec!["size", "vertical"]);
        assert_eq!(schema.edge_property_names, vec!["volume"]);
        assert_eq!(schema.vertex_types, vec!["merchants", "users"]);
        assert_eq!(schema.edge_types, vec!["transactions"]);
    }

    #[test]
    fn test_vertex_data_filters() {
        let graph = sample_graph();

        let all = graph.vertex_data(&DataSelector::default());
        assert_eq!(all.len(), 3);
        // Id order.
        assert_eq!(all[0].vertex_id, 4);
        assert_eq!(all[2].vertex_id, 89021);

        let by_id = graph.vertex_data(&DataSelector {
            ids: Some(vec![11]),
            ..Default::default()
        });
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].type_name, "merchants");

        let by_type = graph.vertex_data(&DataSelector {
            types: Some(vec!["users".to_string()]),
            ..Default::default()
        });
        assert_eq!(by_type.len(), 1);
        assert_eq!(by_type[0].vertex_id, 89021);
    }

    #[test]
    fn test_column_projection() {
        let graph = sample_graph();
        let rows = graph.vertex_data(&DataSelector {
            ids: Some(vec![11]),
            columns: Some(vec!["size".to_string(), "missing".to_string()]),
            ..Default::default()
        });
        assert_eq!(rows[0].properties.len(), 1);
        assert_eq!(
            rows[0].properties.get("size"),
            Some(&PropertyValue::Int32(44))
        );
    }

    #[test]
    fn test_edge_ids_are_monotonic() {
        let graph = sample_graph();
        let edges = graph.edge_data(&DataSelector::default());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_id, 0);
        assert_eq!(edges[1].edge_id, 1);
        assert_eq!(edges[0].src_vertex_id, 89021);
        assert_eq!(edges[0].dst_vertex_id, 11);
    }

    #[test]
    fn test_vertex_merge_on_reload() {
        let mut graph = sample_graph();
        graph.add_vertex_table(VertexTable {
            type_name: "merchants".to_string(),
            rows: vec![(11, props(&[("name", PropertyValue::from("wendys"))]))],
        });
        let rows = graph.vertex_data(&DataSelector {
            ids: Some(vec![11]),
            ..Default::default()
        });
        assert_eq!(rows[0].properties.len(), 2);
        assert_eq!(graph.num_vertices(None, false), 3);
    }
}
