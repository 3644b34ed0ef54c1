//! RecoFlow host
//!
//! Lado host de los motores de `reco-core`:
//! - `config`: configuración desde entorno (.env).
//! - `runner`: bucle asíncrono de steps con política de espera.
//! - `notify`: frontera de notificación del resultado.
//! - `errors`: errores de aplicación.

pub mod config;
pub mod errors;
pub mod notify;
pub mod runner;

pub use config::{init_dotenv, AppConfig, Backoff, ConfigError};
pub use errors::AppError;
pub use notify::{LogNotifier, Notification, Notifier, Outcome};
pub use runner::{drive, FlowRunner, WaitPolicy};
