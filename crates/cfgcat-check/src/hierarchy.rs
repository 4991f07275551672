//! Phase 3: parameter type hierarchy.
//!
//! Hierarchy definitions describe along which sets parameters are inherited
//! from one object type to the next. Every entry adds an edge from an object
//! type to its successor type; the union of all edges must be acyclic or
//! parameter resolution would never terminate.

use crate::engine::CheckRun;
use crate::error::CheckError;
use crate::identity::ObjectIndex;
use crate::result::{Finding, finding_class};
use cfgcat_model::pids::hierarchy;
use cfgcat_model::{Catalog, Data, ObjectId, SystemObject, pids};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Object type to successor type, labelled with the set name of the edge.
type HierarchyEdges = BTreeMap<ObjectId, BTreeMap<ObjectId, String>>;

impl<C: Catalog + ?Sized> CheckRun<'_, '_, C> {
    pub(crate) fn check_hierarchies(&mut self, index: &ObjectIndex) -> Result<(), CheckError> {
        let mut edges = HierarchyEdges::new();
        let mut definitions = 0_usize;
        for object in index.check_objects() {
            if !object.is_configuration_object() {
                continue;
            }
            for record in self
                .view
                .records_of_group(object, pids::ATG_HIERARCHY_DEFINITION)?
            {
                definitions += 1;
                self.collect_hierarchy(object, record, &mut edges)?;
            }
        }
        if definitions == 0 {
            return Ok(());
        }
        debug!(definitions, types = edges.len(), "checking parameter hierarchy");

        let graph: BTreeMap<ObjectId, Vec<ObjectId>> = edges
            .iter()
            .map(|(from, successors)| (*from, successors.keys().copied().collect()))
            .collect();
        for (from, to) in back_edges(&graph) {
            let from_label = self.type_label(from)?;
            let to_label = self.type_label(to)?;
            let set_name = edges
                .get(&from)
                .and_then(|successors| successors.get(&to))
                .cloned()
                .unwrap_or_default();
            self.report(Finding::interference(
                finding_class::HIERARCHY_CYCLE,
                format!(
                    "parameter hierarchy loops: {from_label} leads back to {to_label} via set `{set_name}`"
                ),
            ));
        }
        Ok(())
    }

    fn collect_hierarchy(
        &mut self,
        definer: &SystemObject,
        record: &Data,
        edges: &mut HierarchyEdges,
    ) -> Result<(), CheckError> {
        if let Some(root) = record.field(hierarchy::OBJECT_TYPE).and_then(Data::as_text) {
            self.hierarchy_type(definer, root)?;
        }
        let entries = record
            .field(hierarchy::ENTRIES)
            .and_then(Data::as_array)
            .unwrap_or_default();

        for entry in entries {
            let set_name = text_field(entry, hierarchy::SET_NAME);
            let Some(object_type) =
                self.hierarchy_type(definer, text_field(entry, hierarchy::OBJECT_TYPE))?
            else {
                continue;
            };
            let Some(successor) =
                self.hierarchy_type(definer, text_field(entry, hierarchy::SUCCESSOR_TYPE))?
            else {
                continue;
            };

            let set_use = self
                .view
                .object_set_uses(object_type.id)?
                .into_iter()
                .find(|set_use| {
                    set_use
                        .set_use_spec()
                        .is_some_and(|spec| spec.set_name == set_name)
                });
            let Some(set_use) = set_use else {
                self.report(
                    Finding::interference(
                        finding_class::HIERARCHY_SET_NOT_ALLOWED,
                        format!(
                            "hierarchy of {} names set `{set_name}`, which type {} does not declare",
                            definer.label(),
                            object_type.label()
                        ),
                    )
                    .with_object(definer),
                );
                continue;
            };

            let allowed = set_use
                .set_use_spec()
                .map(|spec| spec.set_type)
                .map(|set_type| self.view.object(set_type))
                .transpose()?
                .flatten()
                .and_then(|set_type| set_type.set_type_spec().map(|spec| spec.object_types.clone()))
                .unwrap_or_default();
            let mut permitted = allowed.is_empty();
            for candidate in &allowed {
                if self.view.inherits_from(successor.id, *candidate)? {
                    permitted = true;
                    break;
                }
            }
            if !permitted {
                self.report(
                    Finding::interference(
                        finding_class::HIERARCHY_SUCCESSOR_NOT_ALLOWED,
                        format!(
                            "hierarchy of {} lets {} follow {} in set `{set_name}`, which does not hold that type",
                            definer.label(),
                            successor.label(),
                            object_type.label()
                        ),
                    )
                    .with_object(definer),
                );
                continue;
            }

            edges
                .entry(object_type.id)
                .or_default()
                .insert(successor.id, set_name.to_string());
        }
        Ok(())
    }

    /// Resolve a type pid named by a hierarchy definition.
    fn hierarchy_type(
        &mut self,
        definer: &SystemObject,
        pid: &str,
    ) -> Result<Option<Arc<SystemObject>>, CheckError> {
        let resolved = self
            .view
            .object_by_pid(pid)?
            .filter(|object| object.type_spec().is_some());
        if resolved.is_none() {
            self.report(
                Finding::interference(
                    finding_class::HIERARCHY_UNKNOWN_PID,
                    format!(
                        "hierarchy of {} names `{pid}`, which is not a valid object type",
                        definer.label()
                    ),
                )
                .with_object(definer),
            );
        }
        Ok(resolved)
    }

    fn type_label(&self, id: ObjectId) -> Result<String, CheckError> {
        Ok(self
            .view
            .resolve(id)?
            .map_or_else(|| format!("[id {id}]"), |object| object.label()))
    }
}

fn text_field<'d>(data: &'d Data, name: &str) -> &'d str {
    data.field(name).and_then(Data::as_text).unwrap_or_default()
}

/// Edges closing a cycle, found by depth-first search in key order.
///
/// Every cycle contributes at least one edge; a single simple cycle
/// contributes exactly one.
pub(crate) fn back_edges(graph: &BTreeMap<ObjectId, Vec<ObjectId>>) -> Vec<(ObjectId, ObjectId)> {
    let mut done: BTreeSet<ObjectId> = BTreeSet::new();
    let mut on_path: BTreeSet<ObjectId> = BTreeSet::new();
    let mut found = Vec::new();

    for start in graph.keys() {
        if done.contains(start) {
            continue;
        }
        let mut stack: Vec<(ObjectId, usize)> = vec![(*start, 0)];
        on_path.insert(*start);
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let successor = graph
                .get(&node)
                .and_then(|successors| successors.get(top.1))
                .copied();
            let Some(successor) = successor else {
                on_path.remove(&node);
                done.insert(node);
                stack.pop();
                continue;
            };
            top.1 += 1;
            if on_path.contains(&successor) {
                found.push((node, successor));
            } else if !done.contains(&successor) {
                on_path.insert(successor);
                stack.push((successor, 0));
            }
        }
    }
    found
}
