//! Network derivation: the node registry and the frozen set family.
//!
//! From the filtered tables of a single scenario this module builds every index set the model
//! is defined over, validates the node typing rules and warns about destinations no origin
//! can reach.
use crate::axis::Axis;
use crate::error::{PlanningError, ValidationReport};
use crate::input::InputTables;
use crate::table::{Table, WILDCARD};
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::warn;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::HashMap;
use std::rc::Rc;

/// An ordered set of identifiers.
pub type IdSet = IndexSet<Rc<str>>;

/// The label standing in for an empty expansion or attribute catalog.
const EMPTY_CATALOG_LABEL: &str = "NA";

/// A node of the supply-chain network.
#[derive(Clone, Debug)]
pub struct Node {
    /// The node name
    pub name: Rc<str>,
    /// The node's type tag (orthogonal to origin/intermediate/destination)
    pub node_type: Rc<str>,
    /// The groups the node belongs to
    pub groups: Vec<Rc<str>>,
    /// Whether the node is an origin
    pub is_origin: bool,
    /// Whether the node is a destination
    pub is_destination: bool,
    /// Whether the node is an intermediate
    pub is_intermediate: bool,
    /// Whether the node may receive flow sent by origins
    pub can_receive_from_origins: bool,
    /// Whether the node may receive flow sent by intermediates
    pub can_receive_from_intermediates: bool,
    /// Whether the node may send flow to destinations
    pub can_send_to_destinations: bool,
    /// Whether the node may send flow to intermediates
    pub can_send_to_intermediates: bool,
}

/// Identifies one of the index sets the model is defined over.
///
/// Every decision variable's dimension signature is a list of these.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SetKind {
    /// Every node
    Nodes,
    /// Origins and intermediates
    DepartingNodes,
    /// Destinations and intermediates
    ReceivingNodes,
    /// Destination nodes
    Destinations,
    /// Time periods
    Periods,
    /// Product ages
    Ages,
    /// Products
    Products,
    /// Units of measure
    Measures,
    /// Transportation modes
    Modes,
    /// Carrying-capacity expansion options
    CCapacityExpansions,
    /// Transportation-capacity expansion options
    TCapacityExpansions,
    /// Product transportation groups
    TransportationGroups,
    /// Resource kinds
    Resources,
    /// Resource capacity types
    ResourceCapacityTypes,
    /// Resource attributes
    ResourceAttributes,
}

impl SetKind {
    /// The column name used for this dimension in result tables.
    pub fn column_name(self) -> &'static str {
        match self {
            SetKind::Nodes => "NODES",
            SetKind::DepartingNodes => "DEPARTING_NODES",
            SetKind::ReceivingNodes => "RECEIVING_NODES",
            SetKind::Destinations => "DESTINATIONS",
            SetKind::Periods => "PERIODS",
            SetKind::Ages => "AGES",
            SetKind::Products => "PRODUCTS",
            SetKind::Measures => "MEASURES",
            SetKind::Modes => "MODES",
            SetKind::CCapacityExpansions => "C_CAPACITY_EXPANSIONS",
            SetKind::TCapacityExpansions => "T_CAPACITY_EXPANSIONS",
            SetKind::TransportationGroups => "TRANSPORTATION_GROUPS",
            SetKind::Resources => "RESOURCES",
            SetKind::ResourceCapacityTypes => "RESOURCE_CAPACITY_TYPES",
            SetKind::ResourceAttributes => "RESOURCE_ATTRIBUTES",
        }
    }
}

/// The frozen set family of one scenario, plus the node registry.
#[derive(Clone, Debug, Default)]
pub struct NetworkSets {
    /// The node registry, in input order
    pub nodes: IndexMap<Rc<str>, Node>,
    /// All node names
    pub node_names: IdSet,
    /// Origin nodes
    pub origins: IdSet,
    /// Destination nodes
    pub destinations: IdSet,
    /// Intermediate nodes
    pub intermediates: IdSet,
    /// Origins and intermediates
    pub departing_nodes: IdSet,
    /// Destinations and intermediates
    pub receiving_nodes: IdSet,
    /// Node type tags
    pub node_types: IdSet,
    /// Node group tags
    pub node_groups: IdSet,
    /// The time horizon
    pub periods: Axis,
    /// Product ages (one per period, starting at zero)
    pub ages: Axis,
    /// Products
    pub products: IdSet,
    /// Units of measure
    pub measures: IdSet,
    /// Transportation modes
    pub modes: IdSet,
    /// Containers
    pub containers: IdSet,
    /// Carrying-capacity expansion option labels
    pub c_capacity_expansions: IdSet,
    /// Transportation-capacity expansion option labels
    pub t_capacity_expansions: IdSet,
    /// Product transportation groups
    pub transportation_groups: IdSet,
    /// Resource kinds
    pub resources: IdSet,
    /// Resource capacity types
    pub resource_capacity_types: IdSet,
    /// Capacity types named as a parent of some other type
    pub resource_parent_capacity_types: IdSet,
    /// Capacity types that are not parents
    pub resource_child_capacity_types: IdSet,
    /// Resource attributes
    pub resource_attributes: IdSet,
}

impl NetworkSets {
    /// Derive the set family from the filtered tables of one scenario.
    pub fn derive(tables: &InputTables) -> Result<NetworkSets> {
        let mut sets = NetworkSets::default();
        sets.read_nodes(&tables["nodes"], &tables["node_groups"])?;
        sets.validate_nodes()?;

        sets.periods = Axis::from_labels(
            "period",
            column_values(&tables["periods"], "Period")?,
            1,
        )?;
        if sets.periods.is_empty() {
            return Err(
                PlanningError::InputSemantic("The periods table has no rows".to_string()).into(),
            );
        }
        sets.ages = sets.periods.predecessors();

        sets.node_types = catalog(&tables["node_types"], "Node Type")?;
        sets.node_groups = catalog(&tables["node_groups"], "Group")?;
        sets.products = catalog(&tables["products"], "Product")?;
        sets.measures = catalog(&tables["products"], "Measure")?;
        sets.modes = catalog(&tables["transportation_costs"], "Mode")?;
        sets.containers = catalog(&tables["transportation_costs"], "Container")?;
        sets.c_capacity_expansions = catalog_or_placeholder(
            &tables["carrying_expansions"],
            "Incremental Capacity Label",
        )?;
        sets.t_capacity_expansions = catalog_or_placeholder(
            &tables["transportation_expansions"],
            "Incremental Capacity Label",
        )?;
        sets.transportation_groups =
            catalog(&tables["product_transportation_groups"], "Group")?;
        sets.resources = catalog(&tables["resource_costs"], "Resource")?;
        sets.resource_capacity_types =
            catalog(&tables["resource_capacity_types"], "Capacity Type")?;
        sets.resource_parent_capacity_types =
            catalog(&tables["resource_capacity_types"], "Parent Capacity Type")?;
        sets.resource_child_capacity_types = sets
            .resource_capacity_types
            .iter()
            .filter(|c| !sets.resource_parent_capacity_types.contains(*c))
            .cloned()
            .collect();
        sets.resource_attributes = catalog_or_placeholder(
            &tables["resource_attributes"],
            "Resource Attribute",
        )?;

        sets.warn_unreachable_destinations();

        Ok(sets)
    }

    /// Read the node registry and the partition into origins, intermediates and destinations.
    fn read_nodes(&mut self, nodes: &Table, node_groups: &Table) -> Result<()> {
        // Group membership per node
        let mut groups: HashMap<&str, Vec<Rc<str>>> = HashMap::new();
        let node_column = node_groups.column("Node")?;
        let group_column = node_groups.column("Group")?;
        for (row, cells) in node_groups.rows().iter().enumerate() {
            groups
                .entry(cells[node_column].as_str())
                .or_default()
                .push(Rc::from(node_groups.cell(row, group_column)));
        }

        let name_column = nodes.column("Name")?;
        let type_column = nodes.column("Node Type")?;
        let flag = |row: usize, column: &str| -> Result<bool> {
            Ok(nodes.cell(row, nodes.column(column)?) == "X")
        };
        for row in 0..nodes.len() {
            let name: Rc<str> = Rc::from(nodes.cell(row, name_column));
            let node = Node {
                name: Rc::clone(&name),
                node_type: Rc::from(nodes.cell(row, type_column)),
                groups: groups.get(name.as_ref()).cloned().unwrap_or_default(),
                is_origin: flag(row, "Origin Node")?,
                is_destination: flag(row, "Destination Node")?,
                is_intermediate: flag(row, "Intermediate Node")?,
                can_receive_from_origins: flag(row, "Receive from Origins")?,
                can_receive_from_intermediates: flag(row, "Receive from Intermediates")?,
                can_send_to_destinations: flag(row, "Send to Destinations")?,
                can_send_to_intermediates: flag(row, "Send to Intermediates")?,
            };

            self.node_names.insert(Rc::clone(&name));
            if node.is_origin {
                self.origins.insert(Rc::clone(&name));
            }
            if node.is_destination {
                self.destinations.insert(Rc::clone(&name));
            }
            if node.is_intermediate {
                self.intermediates.insert(Rc::clone(&name));
            }
            if node.is_origin || node.is_intermediate {
                self.departing_nodes.insert(Rc::clone(&name));
            }
            if node.is_destination || node.is_intermediate {
                self.receiving_nodes.insert(Rc::clone(&name));
            }
            self.nodes.insert(name, node);
        }

        Ok(())
    }

    /// Check node typing rules: fatal if a node is not exactly one of origin, intermediate,
    /// destination; advisory warnings for contradictory flags or missing groups.
    fn validate_nodes(&self) -> Result<()> {
        let mut report = ValidationReport::new();
        for node in self.nodes.values() {
            let type_count = [node.is_origin, node.is_destination, node.is_intermediate]
                .iter()
                .filter(|&&f| f)
                .count();
            if type_count != 1 {
                report.push(format!(
                    "Node {} must be exactly one of origin, destination or intermediate",
                    node.name
                ));
            }
            if node.is_origin && node.can_receive_from_origins {
                warn!("Origin node {} should not receive from origins", node.name);
            }
            if node.is_destination && node.can_send_to_destinations {
                warn!(
                    "Destination node {} should not send to destinations",
                    node.name
                );
            }
            if node.groups.is_empty() {
                warn!("Node {} is not assigned to any groups", node.name);
            }
        }

        if !report.is_empty() {
            // Node typing failures are structural, not value-level
            let message = report.into_result().unwrap_err().to_string();
            return Err(PlanningError::InputStructural(message).into());
        }
        Ok(())
    }

    /// Warn about destinations no origin can reach through the adjacency flags.
    fn warn_unreachable_destinations(&self) {
        let mut graph: Graph<Rc<str>, ()> = Graph::new();
        let indices: HashMap<&Rc<str>, NodeIndex> = self
            .nodes
            .keys()
            .map(|name| (name, graph.add_node(Rc::clone(name))))
            .collect();
        for node in self.nodes.values() {
            for other in self.nodes.values() {
                let connected = (node.is_origin && other.can_receive_from_origins)
                    || (node.is_intermediate && other.can_receive_from_intermediates);
                if connected {
                    graph.add_edge(indices[&node.name], indices[&other.name], ());
                }
            }
        }

        let mut reachable = IndexSet::new();
        for origin in &self.origins {
            let mut bfs = Bfs::new(&graph, indices[origin]);
            while let Some(index) = bfs.next(&graph) {
                reachable.insert(graph[index].clone());
            }
        }

        let unreachable: Vec<&Rc<str>> = self
            .destinations
            .iter()
            .filter(|d| !reachable.contains(*d))
            .collect();
        if !unreachable.is_empty() {
            warn!("Destinations unreachable from any origin: {unreachable:?}");
        }
    }

    /// The members of an index set.
    pub fn members(&self, kind: SetKind) -> &IdSet {
        match kind {
            SetKind::Nodes => &self.node_names,
            SetKind::DepartingNodes => &self.departing_nodes,
            SetKind::ReceivingNodes => &self.receiving_nodes,
            SetKind::Destinations => &self.destinations,
            SetKind::Periods => self.periods.labels(),
            SetKind::Ages => self.ages.labels(),
            SetKind::Products => &self.products,
            SetKind::Measures => &self.measures,
            SetKind::Modes => &self.modes,
            SetKind::CCapacityExpansions => &self.c_capacity_expansions,
            SetKind::TCapacityExpansions => &self.t_capacity_expansions,
            SetKind::TransportationGroups => &self.transportation_groups,
            SetKind::Resources => &self.resources,
            SetKind::ResourceCapacityTypes => &self.resource_capacity_types,
            SetKind::ResourceAttributes => &self.resource_attributes,
        }
    }

    /// The groups a node belongs to. Unknown nodes belong to none.
    pub fn groups_of(&self, node: &str) -> &[Rc<str>] {
        self.nodes
            .get(node)
            .map(|n| n.groups.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `node` is an origin.
    pub fn is_origin(&self, node: &str) -> bool {
        self.origins.contains(node)
    }
}

/// All values of a column, in row order.
fn column_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let index = table.column(column)?;
    Ok(table.rows().iter().map(|row| row[index].clone()).collect())
}

/// The distinct non-empty, non-wildcard values of a column.
fn catalog(table: &Table, column: &str) -> Result<IdSet> {
    let index = table.column(column)?;
    Ok(table
        .distinct(index)
        .into_iter()
        .filter(|value| !value.is_empty() && value != WILDCARD)
        .map(Rc::from)
        .collect())
}

/// Like [`catalog`], but an empty result is replaced by the `NA` placeholder so dependent
/// variable families keep a well-formed (single-member) dimension.
fn catalog_or_placeholder(table: &Table, column: &str) -> Result<IdSet> {
    let set = catalog(table, column)?;
    if set.is_empty() {
        return Ok(IndexSet::from([Rc::from(EMPTY_CATALOG_LABEL)]));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::basic_tables;
    use rstest::rstest;

    #[rstest]
    fn test_derive_sets(basic_tables: InputTables) {
        let sets = NetworkSets::derive(&basic_tables).unwrap();

        assert_eq!(sets.origins.len(), 1);
        assert!(sets.origins.contains("A"));
        assert!(sets.destinations.contains("B"));
        assert!(sets.departing_nodes.contains("A"));
        assert!(sets.receiving_nodes.contains("B"));
        assert_eq!(sets.periods.len(), 2);
        assert_eq!(sets.ages.number(0), 0);
        assert_eq!(sets.ages.number(1), 1);
        assert!(sets.products.contains("P"));
        assert!(sets.modes.contains("M"));
        // Empty expansion catalogs collapse to the placeholder
        assert!(sets.c_capacity_expansions.contains("NA"));
        assert!(sets.t_capacity_expansions.contains("NA"));
    }

    #[rstest]
    fn test_node_must_have_exactly_one_type(mut basic_tables: InputTables) {
        // Make node A both an origin and a destination
        let nodes = basic_tables.get_mut("nodes").unwrap();
        let column = nodes.column("Destination Node").unwrap();
        let mut broken = nodes.filter_rows(|_| false);
        for row in nodes.rows() {
            let mut row = row.clone();
            row[column] = "X".to_string();
            broken.push_row(row);
        }
        *nodes = broken;

        assert!(NetworkSets::derive(&basic_tables).is_err());
    }
}
