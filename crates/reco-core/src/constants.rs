//! Constantes del motor core.
//!
//! Valores estáticos compartidos por ejecutores, validación y eventos. Los
//! prefijos de recetas replican el formato de ARN del backend.

/// Versión lógica del motor. Se registra en `RunInitialized` para poder
/// distinguir corridas hechas con reglas de transición distintas.
pub const ENGINE_VERSION: &str = "R1.0";

/// Receta usada por `SOLUTION` cuando el contexto no trae `recipe_arn`.
pub const DEFAULT_RECIPE_ARN: &str = "arn:aws:personalize:::recipe/aws-user-personalization";

/// Todo `recipe_arn` suministrado debe comenzar así.
pub const RECIPE_ARN_PREFIX: &str = "arn:aws:personalize:::recipe/";

pub const VOD_RECIPE_PREFIX: &str = "arn:aws:personalize:::recipe/aws-vod-";
pub const ECOMMERCE_RECIPE_PREFIX: &str = "arn:aws:personalize:::recipe/aws-ecomm-";

/// Formato del sufijo de corrida (`{name}-{suffix}` en jobs y campañas).
pub const SUFFIX_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Longitud máxima de nombre aceptada por el backend.
pub const MAX_NAME_LEN: usize = 63;

/// Throughput mínimo por defecto de una campaña.
pub const DEFAULT_MIN_PROVISIONED_TPS: u64 = 1;

/// Resultados por fila de un job batch cuando el contexto no trae `num_results`.
pub const DEFAULT_NUM_RESULTS: u64 = 25;
