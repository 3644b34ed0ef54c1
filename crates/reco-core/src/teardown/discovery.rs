//! Descubrimiento del inventario a partir del nombre del dataset group.

use log::{debug, info};
use rayon::prelude::*;

use crate::errors::FlowError;
use crate::model::{ResourceHandle, ResourceInventory, ResourceKind};
use crate::provider::{attrs, ProviderError, ResourceProvider};

const STAGE: &str = "DISCOVERY";

/// `list` que trata `NotFound` (padre ya borrado) como lista vacía.
pub(crate) fn list_or_empty(provider: &dyn ResourceProvider,
                            kind: ResourceKind,
                            parent: Option<&str>)
                            -> Result<Vec<ResourceHandle>, ProviderError> {
    match provider.list(kind, parent) {
        Err(ProviderError::NotFound(msg)) => {
            debug!("list:not_found kind={kind} parent={parent:?} msg={msg}");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Lista todo lo que cuelga del grupo `name`. `None` si el grupo no existe.
///
/// Las campañas se listan por solution, en paralelo: son ramas disjuntas.
pub fn discover(provider: &dyn ResourceProvider, name: &str) -> Result<Option<ResourceInventory>, FlowError> {
    let lift = |e| FlowError::provider(STAGE, e);

    let group = list_or_empty(provider, ResourceKind::DatasetGroup, None).map_err(lift)?
                                                                       .into_iter()
                                                                       .find(|g| g.name == name);
    let Some(group) = group else {
        info!("discover:no_group name={name}");
        return Ok(None);
    };
    let parent = Some(group.arn.as_str());
    let mut inventory = ResourceInventory::new(group.arn.as_str());

    for dataset in list_or_empty(provider, ResourceKind::Dataset, parent).map_err(lift)? {
        let desc = provider.describe(ResourceKind::Dataset, &dataset.arn).map_err(lift)?;
        if let Some(schema) = desc.attr_str(attrs::SCHEMA_ARN).filter(|s| !s.is_empty()) {
            inventory.add(ResourceKind::Schema, schema);
        }
        inventory.add(ResourceKind::Dataset, dataset.arn);
    }
    for tracker in list_or_empty(provider, ResourceKind::EventTracker, parent).map_err(lift)? {
        inventory.add(ResourceKind::EventTracker, tracker.arn);
    }
    let solutions: Vec<String> = list_or_empty(provider, ResourceKind::Solution, parent).map_err(lift)?
                                                                                       .into_iter()
                                                                                       .map(|h| h.arn)
                                                                                       .collect();
    let campaigns = solutions.par_iter()
                             .map(|s| list_or_empty(provider, ResourceKind::Campaign, Some(s.as_str())))
                             .collect::<Result<Vec<_>, _>>()
                             .map_err(lift)?;
    for solution in solutions {
        inventory.add(ResourceKind::Solution, solution);
    }
    for campaign in campaigns.into_iter().flatten() {
        inventory.add(ResourceKind::Campaign, campaign.arn);
    }
    for recommender in list_or_empty(provider, ResourceKind::Recommender, parent).map_err(lift)? {
        inventory.add(ResourceKind::Recommender, recommender.arn);
    }

    info!("discover:done name={name} group={} resources={}", inventory.dataset_group_arn, inventory.total());
    Ok(Some(inventory))
}
