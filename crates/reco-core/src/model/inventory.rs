//! Inventario de recursos para el teardown.
//!
//! Se descubre una sola vez (todo lo que cuelga del dataset group raíz) y se
//! guarda en el contexto como listas de ARNs, de modo que el host pueda
//! persistirlo entre steps.

use std::collections::BTreeMap;

use crate::errors::FlowError;
use crate::model::context::{keys, PipelineContext};
use crate::model::handle::ResourceKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInventory {
    pub dataset_group_arn: String,
    by_kind: BTreeMap<ResourceKind, Vec<String>>,
}

/// Campo del contexto donde vive cada lista.
const LIST_FIELDS: [(ResourceKind, &str); 6] = [(ResourceKind::Campaign, keys::CAMPAIGN_ARNS),
                                                (ResourceKind::Recommender, keys::RECOMMENDER_ARNS),
                                                (ResourceKind::Solution, keys::SOLUTION_ARNS),
                                                (ResourceKind::EventTracker, keys::EVENT_TRACKER_ARNS),
                                                (ResourceKind::Dataset, keys::DATASET_ARNS),
                                                (ResourceKind::Schema, keys::SCHEMA_ARNS)];

impl ResourceInventory {
    pub fn new(dataset_group_arn: impl Into<String>) -> Self {
        Self { dataset_group_arn: dataset_group_arn.into(),
               by_kind: BTreeMap::new() }
    }

    /// Agrega un ARN (sin duplicados, conservando orden de descubrimiento).
    pub fn add(&mut self, kind: ResourceKind, arn: impl Into<String>) {
        let arn = arn.into();
        let entry = self.by_kind.entry(kind).or_default();
        if !entry.contains(&arn) {
            entry.push(arn);
        }
    }

    pub fn arns(&self, kind: ResourceKind) -> &[String] {
        if kind == ResourceKind::DatasetGroup {
            return std::slice::from_ref(&self.dataset_group_arn);
        }
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total(&self) -> usize {
        1 + self.by_kind.values().map(Vec::len).sum::<usize>()
    }

    pub fn write_into(&self, ctx: &mut PipelineContext) {
        ctx.set(keys::DATASET_GROUP_ARN, self.dataset_group_arn.as_str());
        for (kind, field) in LIST_FIELDS {
            ctx.set(field, self.arns(kind).to_vec());
        }
    }

    pub fn read_from(ctx: &PipelineContext) -> Result<Self, FlowError> {
        let group = ctx.require_non_empty("INVENTORY", keys::DATASET_GROUP_ARN)?;
        let mut inventory = Self::new(group);
        for (kind, field) in LIST_FIELDS {
            if !ctx.contains(field) {
                return Err(FlowError::missing("INVENTORY", field));
            }
            for arn in ctx.list(field) {
                inventory.add(kind, arn.clone());
            }
        }
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_context_round_trip() {
        let mut inv = ResourceInventory::new("arn:dsg/demo");
        inv.add(ResourceKind::Solution, "arn:solution/a");
        inv.add(ResourceKind::Solution, "arn:solution/a");
        inv.add(ResourceKind::Campaign, "arn:campaign/c");

        let mut ctx = PipelineContext::new();
        inv.write_into(&mut ctx);
        assert_eq!(ctx.list(keys::EVENT_TRACKER_ARNS).len(), 0);
        assert!(ctx.contains(keys::EVENT_TRACKER_ARNS));

        let back = ResourceInventory::read_from(&ctx).unwrap();
        assert_eq!(back, inv);
        assert_eq!(back.arns(ResourceKind::Solution), ["arn:solution/a".to_string()]);
        assert_eq!(back.arns(ResourceKind::DatasetGroup), ["arn:dsg/demo".to_string()]);
        assert_eq!(back.total(), 3);
    }

    #[test]
    fn missing_list_is_a_wiring_error() {
        let ctx = PipelineContext::new().with(keys::DATASET_GROUP_ARN, "arn:dsg/demo");
        assert!(matches!(ResourceInventory::read_from(&ctx), Err(FlowError::MissingField { .. })));
    }
}
