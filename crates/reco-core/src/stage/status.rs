use std::fmt;

use serde::{Deserialize, Serialize};

/// Taxonomía de estados de un recurso/stage.
///
/// El backend reporta su propio vocabulario (`CREATE IN_PROGRESS`, ...);
/// `from_backend` lo proyecta sobre estos seis valores. Cualquier valor
/// desconocido queda en `Invalid`, que se trata como no terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Pending,
    Active,
    CreateFailed,
    Deleting,
    Deleted,
    Invalid,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Pending => "PENDING",
            ResourceStatus::Active => "ACTIVE",
            ResourceStatus::CreateFailed => "CREATE_FAILED",
            ResourceStatus::Deleting => "DELETING",
            ResourceStatus::Deleted => "DELETED",
            ResourceStatus::Invalid => "INVALID",
        }
    }

    /// Parsea la forma canónica guardada en el contexto.
    pub fn parse(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "PENDING" => Some(ResourceStatus::Pending),
            "ACTIVE" => Some(ResourceStatus::Active),
            "CREATE_FAILED" => Some(ResourceStatus::CreateFailed),
            "DELETING" => Some(ResourceStatus::Deleting),
            "DELETED" => Some(ResourceStatus::Deleted),
            "INVALID" => Some(ResourceStatus::Invalid),
            _ => None,
        }
    }

    /// Proyección del vocabulario del backend. Espacios y guiones bajos son
    /// intercambiables (`CREATE FAILED` == `CREATE_FAILED`).
    pub fn from_backend(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "ACTIVE" => ResourceStatus::Active,
            "PENDING" | "CREATE_PENDING" | "CREATE_IN_PROGRESS" | "CREATE_STOPPING" | "UPDATE_PENDING" | "UPDATE_IN_PROGRESS" => {
                ResourceStatus::Pending
            }
            "CREATE_FAILED" | "CREATE_STOPPED" | "UPDATE_FAILED" => ResourceStatus::CreateFailed,
            "DELETING" | "DELETE_PENDING" | "DELETE_IN_PROGRESS" => ResourceStatus::Deleting,
            "DELETED" => ResourceStatus::Deleted,
            _ => ResourceStatus::Invalid,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
       .split(|c: char| c == ' ' || c == '_')
       .filter(|p| !p.is_empty())
       .collect::<Vec<_>>()
       .join("_")
       .to_ascii_uppercase()
}

/// Clasificación de un estado contra el conjunto terminal de un stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Éxito terminal: el stage puede avanzar.
    Ready,
    /// No terminal: otro poll más tarde.
    NotReady,
    /// Fallo terminal: el pipeline se detiene.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_backend_vocabulary() {
        assert_eq!(ResourceStatus::from_backend("ACTIVE"), ResourceStatus::Active);
        assert_eq!(ResourceStatus::from_backend("CREATE PENDING"), ResourceStatus::Pending);
        assert_eq!(ResourceStatus::from_backend("CREATE IN_PROGRESS"), ResourceStatus::Pending);
        assert_eq!(ResourceStatus::from_backend("CREATE FAILED"), ResourceStatus::CreateFailed);
        assert_eq!(ResourceStatus::from_backend("create_failed"), ResourceStatus::CreateFailed);
        assert_eq!(ResourceStatus::from_backend("CREATE STOPPED"), ResourceStatus::CreateFailed);
        assert_eq!(ResourceStatus::from_backend("DELETE IN_PROGRESS"), ResourceStatus::Deleting);
        assert_eq!(ResourceStatus::from_backend("SOMETHING NEW"), ResourceStatus::Invalid);
        assert_eq!(ResourceStatus::from_backend(""), ResourceStatus::Invalid);
    }

    #[test]
    fn canonical_form_round_trips_through_context_text() {
        for s in [ResourceStatus::Pending,
                  ResourceStatus::Active,
                  ResourceStatus::CreateFailed,
                  ResourceStatus::Deleting,
                  ResourceStatus::Deleted,
                  ResourceStatus::Invalid]
        {
            assert_eq!(ResourceStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ResourceStatus::parse("Invalid"), Some(ResourceStatus::Invalid));
        assert_eq!(ResourceStatus::parse("CREATE PENDING"), None);
    }
}
