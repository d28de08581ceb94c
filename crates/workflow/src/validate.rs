use std::collections::HashSet;

use iceos_error::IceError;

use crate::graph::DependencyGraph;
use crate::node::NodeKind;
use crate::{Blueprint, NodeSpec};

/// Validates a blueprint per the invariants in the data model: unique node
/// ids, resolvable dependencies, acyclicity, schema grammar validity, and
/// the airgap/external-IO conflict rule. Does not check that registered
/// tool/agent/LLM names actually resolve in a registry — that is a
/// finalization-time concern handled by the caller holding the registry.
pub fn validate(blueprint: &Blueprint) -> Result<(), IceError> {
    check_unique_ids(&blueprint.nodes)?;
    check_schemas(&blueprint.nodes)?;
    check_airgap(&blueprint.nodes)?;

    let graph = DependencyGraph::from_blueprint(blueprint)?;
    if graph.is_cyclic() {
        return Err(IceError::CircularDependency { node_id: blueprint.nodes[0].id.to_string() });
    }

    Ok(())
}

fn check_unique_ids(nodes: &[NodeSpec]) -> Result<(), IceError> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(&node.id) {
            return Err(IceError::validation(format!("duplicate node id '{}'", node.id)));
        }
    }
    Ok(())
}

fn check_schemas(nodes: &[NodeSpec]) -> Result<(), IceError> {
    for node in nodes {
        if let Some(schema) = &node.input_schema {
            schema.validate_literal()?;
        }
        if let Some(schema) = &node.output_schema {
            schema.validate_literal()?;
        }
        recurse_nested(node)?;
    }
    Ok(())
}

fn recurse_nested(node: &NodeSpec) -> Result<(), IceError> {
    match &node.kind {
        NodeKind::Condition { true_path, false_path, .. } => {
            check_schemas(true_path)?;
            check_schemas(false_path)
        }
        NodeKind::Loop { body, .. } => check_schemas(body),
        NodeKind::Parallel { branches, .. } => {
            for branch in branches {
                check_schemas(branch)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_airgap(nodes: &[NodeSpec]) -> Result<(), IceError> {
    let has_airgap = nodes.iter().any(|n| n.airgap);
    if !has_airgap {
        return Ok(());
    }
    if let Some(offender) = nodes.iter().find(|n| n.requires_external_io) {
        return Err(IceError::AirgapViolation { node_id: offender.id.to_string() });
    }
    Ok(())
}
