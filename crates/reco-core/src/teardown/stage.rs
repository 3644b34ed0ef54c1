use std::fmt;

use crate::model::ResourceKind;

/// Stages de borrado, en orden de ejecución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeardownStage {
    /// Campañas y recommenders.
    Campaign,
    Solution,
    EventTracker,
    Dataset,
    Schema,
    DatasetGroup,
}

impl TeardownStage {
    pub const ORDER: [TeardownStage; 6] = [TeardownStage::Campaign,
                                           TeardownStage::Solution,
                                           TeardownStage::EventTracker,
                                           TeardownStage::Dataset,
                                           TeardownStage::Schema,
                                           TeardownStage::DatasetGroup];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownStage::Campaign => "CAMPAIGN",
            TeardownStage::Solution => "SOLUTION",
            TeardownStage::EventTracker => "EVENT_TRACKER",
            TeardownStage::Dataset => "DATASET",
            TeardownStage::Schema => "SCHEMA",
            TeardownStage::DatasetGroup => "DATASET_GROUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|st| st.as_str() == s.trim())
    }

    pub fn next(&self) -> Option<Self> {
        let idx = Self::ORDER.iter().position(|st| st == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    /// Tipos de recurso que borra este stage.
    pub fn kinds(&self) -> &'static [ResourceKind] {
        match self {
            TeardownStage::Campaign => &[ResourceKind::Campaign, ResourceKind::Recommender],
            TeardownStage::Solution => &[ResourceKind::Solution],
            TeardownStage::EventTracker => &[ResourceKind::EventTracker],
            TeardownStage::Dataset => &[ResourceKind::Dataset],
            TeardownStage::Schema => &[ResourceKind::Schema],
            TeardownStage::DatasetGroup => &[ResourceKind::DatasetGroup],
        }
    }
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_in_reverse_dependency_order() {
        let mut seen = vec![TeardownStage::Campaign];
        while let Some(next) = seen.last().and_then(TeardownStage::next) {
            seen.push(next);
        }
        assert_eq!(seen, TeardownStage::ORDER.to_vec());
        assert_eq!(TeardownStage::parse("EVENT_TRACKER"), Some(TeardownStage::EventTracker));
        assert_eq!(TeardownStage::parse("RECOMMENDER"), None);
    }
}
